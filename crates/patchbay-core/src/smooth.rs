//! Ramped parameter values for zipper-free automation.
//!
//! The control plane writes a parameter's target into its atomic; the render
//! path owns a [`RampTable`] and walks each ramped parameter toward its target
//! over the unit's ramp time. Changing the ramp time goes through
//! [`RampConfig`], which the render path picks up at the next block.
//!
//! # Example
//!
//! ```
//! use patchbay_core::SmoothedValue;
//!
//! // 10 ms ramp at 44.1 kHz
//! let mut gain = SmoothedValue::new(1.0, 441);
//! gain.set_target(0.5);
//!
//! # let mut buffer = [0.0f32; 512];
//! for sample in buffer.iter_mut() {
//!     *sample *= gain.next_sample();
//! }
//! assert_eq!(gain.current(), 0.5);
//! ```

use crate::lockfree::{AtomicDouble, Generation};
use crate::parameter::{Parameter, ParameterAddress};
use crate::tree::ParameterTree;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Convert a ramp time into a ramp length, never shorter than one sample.
#[inline]
pub fn ramp_samples(ramp_time_secs: f64, sample_rate: f64) -> u32 {
    (ramp_time_secs * sample_rate).round().max(1.0) as u32
}

/// Linear interpolation from the current value to a target over a fixed number of samples.
#[derive(Debug, Clone)]
pub struct SmoothedValue {
    current: f32,
    target: f32,
    step: f32,
    samples_remaining: u32,
    ramp_samples: u32,
}

impl SmoothedValue {
    pub fn new(initial: f32, ramp_samples: u32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            samples_remaining: 0,
            ramp_samples: ramp_samples.max(1),
        }
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        if target == self.target {
            return;
        }

        self.target = target;
        self.samples_remaining = self.ramp_samples;
        self.step = (self.target - self.current) / self.samples_remaining as f32;
    }

    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.samples_remaining = 0;
    }

    /// Call once per sample in the render path.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.step;
            self.samples_remaining -= 1;

            // Snap to avoid floating point drift
            if self.samples_remaining == 0 {
                self.current = self.target;
            }
        }

        self.current
    }

    /// Advance `frames` samples at once.
    #[inline]
    pub fn advance(&mut self, frames: u32) -> f32 {
        if frames >= self.samples_remaining {
            self.skip_to_target();
        } else {
            self.samples_remaining -= frames;
            self.current += self.step * frames as f32;
        }
        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.samples_remaining > 0
    }

    #[inline]
    pub fn samples_remaining(&self) -> u32 {
        self.samples_remaining
    }

    /// Takes effect on the next `set_target()` call.
    #[inline]
    pub fn set_ramp_samples(&mut self, ramp_samples: u32) {
        self.ramp_samples = ramp_samples.max(1);
    }

    #[inline]
    pub fn skip_to_target(&mut self) {
        self.current = self.target;
        self.step = 0.0;
        self.samples_remaining = 0;
    }
}

/// Ramp configuration shared between a unit's control side and its render path.
#[derive(Debug)]
pub struct RampConfig {
    ramp_time: AtomicDouble,
    sample_rate: AtomicDouble,
    samples: AtomicU32,
    generation: Generation,
}

impl RampConfig {
    pub fn new(ramp_time: f64, sample_rate: f64) -> Self {
        Self {
            ramp_time: AtomicDouble::new(ramp_time),
            sample_rate: AtomicDouble::new(sample_rate),
            samples: AtomicU32::new(ramp_samples(ramp_time, sample_rate)),
            generation: Generation::new(),
        }
    }

    pub fn ramp_time(&self) -> f64 {
        self.ramp_time.get()
    }

    /// Stores the new ramp time. Call [`recompute`](Self::recompute) to publish it.
    pub fn set_ramp_time(&self, ramp_time: f64) {
        self.ramp_time.set(ramp_time.max(0.0));
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate.get()
    }

    pub fn set_sample_rate(&self, sample_rate: f64) {
        self.sample_rate.set(sample_rate);
    }

    /// Ramp length in samples as of the last recompute.
    pub fn samples(&self) -> u32 {
        self.samples.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.generation.current()
    }

    /// Recompute the ramp length and publish it to render-side tables.
    pub fn recompute(&self) -> u32 {
        let samples = ramp_samples(self.ramp_time(), self.sample_rate());
        self.samples.store(samples, Ordering::Release);
        self.generation.bump();
        samples
    }
}

struct RampLane {
    parameter: Arc<Parameter>,
    smoothed: SmoothedValue,
}

/// Render-side interpolation state for every ramped parameter of one unit.
///
/// `advance` neither allocates nor locks.
pub struct RampTable {
    config: Arc<RampConfig>,
    seen_generation: u64,
    lanes: Vec<RampLane>,
}

impl RampTable {
    /// Lanes start at the parameters' current values, so anything written before
    /// the table existed applies without a ramp.
    pub fn new(tree: &ParameterTree, config: Arc<RampConfig>) -> Self {
        let samples = config.samples();
        let lanes = tree
            .parameters()
            .filter(|p| p.spec().ramped)
            .map(|p| RampLane {
                parameter: Arc::clone(p),
                smoothed: SmoothedValue::new(p.value(), samples),
            })
            .collect();

        Self {
            seen_generation: config.generation(),
            config,
            lanes,
        }
    }

    /// Advance every lane by `frames` samples toward its parameter's value.
    pub fn advance(&mut self, frames: u32) {
        let generation = self.config.generation();
        if generation != self.seen_generation {
            let samples = self.config.samples();
            for lane in &mut self.lanes {
                lane.smoothed.set_ramp_samples(samples);
            }
            self.seen_generation = generation;
        }

        for lane in &mut self.lanes {
            lane.smoothed.set_target(lane.parameter.value());
            lane.smoothed.advance(frames);
        }
    }

    /// Interpolated value the render path should use right now.
    pub fn value(&self, address: ParameterAddress) -> Option<f32> {
        self.lanes
            .iter()
            .find(|lane| lane.parameter.address() == address)
            .map(|lane| lane.smoothed.current())
    }

    pub fn is_ramping(&self) -> bool {
        self.lanes.iter().any(|lane| lane.smoothed.is_smoothing())
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}
