//! Addressable control parameters.
//!
//! A [`Parameter`] is one named, addressable scalar owned by a unit's
//! [`ParameterTree`](crate::ParameterTree). Its value lives in an atomic so the
//! render path can read it while the control plane writes it.
//!
//! # Example
//!
//! ```
//! use patchbay_core::{ParameterAddress, ParameterRange, ParameterSpec, ParameterUnit};
//!
//! let cutoff = ParameterSpec::new(
//!     "frequency",
//!     "Frequency",
//!     ParameterAddress(0),
//!     ParameterRange::logarithmic(12.0, 20000.0, 500.0),
//! )
//! .with_unit(ParameterUnit::Hertz);
//!
//! // Host automation stores normalized 0.0-1.0
//! let hz = cutoff.range.denormalize(0.5);
//! assert!((cutoff.range.normalize(hz) - 0.5).abs() < 1e-4);
//! ```

use crate::lockfree::AtomicFloat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable numeric address of a parameter within one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParameterAddress(pub u64);

impl fmt::Display for ParameterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a parameter value is scaled between normalized (0-1) and real values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ParameterScale {
    /// `real = min + normalized * (max - min)`
    #[default]
    Linear,

    /// `real = min * (max/min)^normalized`
    ///
    /// Requires `min > 0`; falls back to linear otherwise.
    Logarithmic,

    /// `curve > 1.0` gives more resolution at the low end.
    Exponential { curve: f32 },

    /// Denormalizes to `min` (off) or `max` (on).
    Toggle,

    /// Quantized to integers between `min` and `max`.
    Integer,
}

/// Valid range, default and scaling of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub scale: ParameterScale,
}

impl ParameterRange {
    /// `default` is clamped into `min..=max`.
    pub fn new(min: f32, max: f32, default: f32, scale: ParameterScale) -> Self {
        debug_assert!(max > min, "max must be greater than min");

        Self {
            min,
            max,
            default: default.clamp(min, max),
            scale,
        }
    }

    pub fn linear(min: f32, max: f32, default: f32) -> Self {
        Self::new(min, max, default, ParameterScale::Linear)
    }

    pub fn logarithmic(min: f32, max: f32, default: f32) -> Self {
        debug_assert!(min > 0.0, "logarithmic scale requires min > 0");
        Self::new(min, max, default, ParameterScale::Logarithmic)
    }

    pub fn exponential(min: f32, max: f32, default: f32, curve: f32) -> Self {
        Self::new(min, max, default, ParameterScale::Exponential { curve })
    }

    pub fn toggle(off_value: f32, on_value: f32, default_on: bool) -> Self {
        Self::new(
            off_value,
            on_value,
            if default_on { on_value } else { off_value },
            ParameterScale::Toggle,
        )
    }

    pub fn integer(min: i32, max: i32, default: i32) -> Self {
        Self::new(
            min as f32,
            max as f32,
            default as f32,
            ParameterScale::Integer,
        )
    }

    /// Convert a real value to normalized (0.0-1.0).
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        let value = self.clamp(value);
        let span = self.span();
        if span <= 0.0 {
            return 0.0;
        }

        match self.scale {
            ParameterScale::Logarithmic if self.min > 0.0 => {
                let (log_min, log_max) = (self.min.ln(), self.max.ln());
                (value.ln() - log_min) / (log_max - log_min)
            }
            ParameterScale::Exponential { curve } if curve > 0.0 && curve != 1.0 => {
                ((value - self.min) / span).powf(1.0 / curve)
            }
            ParameterScale::Toggle => {
                if value >= (self.min + self.max) / 2.0 {
                    1.0
                } else {
                    0.0
                }
            }
            ParameterScale::Integer => (value.round() - self.min) / span,
            _ => (value - self.min) / span,
        }
    }

    /// Convert a normalized value (0.0-1.0) to a real value.
    #[inline]
    pub fn denormalize(&self, normalized: f32) -> f32 {
        let normalized = normalized.clamp(0.0, 1.0);
        let span = self.span();

        let value = match self.scale {
            ParameterScale::Logarithmic if self.min > 0.0 => {
                let (log_min, log_max) = (self.min.ln(), self.max.ln());
                (log_min + normalized * (log_max - log_min)).exp()
            }
            ParameterScale::Exponential { curve } if curve > 0.0 && curve != 1.0 => {
                self.min + normalized.powf(curve) * span
            }
            ParameterScale::Toggle => {
                if normalized >= 0.5 {
                    self.max
                } else {
                    self.min
                }
            }
            ParameterScale::Integer => (self.min + normalized * span).round(),
            _ => self.min + normalized * span,
        };
        // exp/ln rounding can land a hair outside the bounds
        self.clamp(value)
    }

    /// Bound `value` to `min..=max`. Non-finite values fall back to the default.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }

    /// Same as [`clamp`](Self::clamp) for the f64 mirrored fields nodes keep.
    #[inline]
    pub fn clamp_f64(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.default as f64;
        }
        value.clamp(self.min as f64, self.max as f64)
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    #[inline]
    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self::linear(0.0, 1.0, 0.5)
    }
}

/// Display unit of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterUnit {
    #[default]
    Generic,
    Hertz,
    Seconds,
    Decibels,
}

impl ParameterUnit {
    pub fn suffix(&self) -> &'static str {
        match self {
            ParameterUnit::Generic => "",
            ParameterUnit::Hertz => "Hz",
            ParameterUnit::Seconds => "s",
            ParameterUnit::Decibels => "dB",
        }
    }
}

/// Static description of a parameter, shared by a unit and the node mirroring it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Identifier used for lookup; unique within a unit.
    pub name: &'static str,
    pub display_name: &'static str,
    pub address: ParameterAddress,
    pub range: ParameterRange,
    pub unit: ParameterUnit,
    /// Whether addressed writes are interpolated over the unit's ramp time.
    pub ramped: bool,
}

impl ParameterSpec {
    pub fn new(
        name: &'static str,
        display_name: &'static str,
        address: ParameterAddress,
        range: ParameterRange,
    ) -> Self {
        Self {
            name,
            display_name,
            address,
            range,
            unit: ParameterUnit::Generic,
            ramped: true,
        }
    }

    pub fn with_unit(mut self, unit: ParameterUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn unramped(mut self) -> Self {
        self.ramped = false;
        self
    }
}

/// Live parameter inside a [`ParameterTree`](crate::ParameterTree).
#[derive(Debug)]
pub struct Parameter {
    spec: ParameterSpec,
    value: AtomicFloat,
    revision: AtomicU64,
}

impl Parameter {
    pub fn new(spec: ParameterSpec, initial: f32) -> Self {
        let initial = spec.range.clamp(initial);
        Self {
            spec,
            value: AtomicFloat::new(initial),
            revision: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    #[inline]
    pub fn address(&self) -> ParameterAddress {
        self.spec.address
    }

    #[inline]
    pub fn spec(&self) -> &ParameterSpec {
        &self.spec
    }

    #[inline]
    pub fn range(&self) -> &ParameterRange {
        &self.spec.range
    }

    /// Current value. Safe to call from the render path.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value.get()
    }

    /// Number of addressed writes this parameter has received.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Addressed write: clamp, store, bump the revision. Returns the stored value.
    ///
    /// NaN and infinities store the default.
    pub(crate) fn store(&self, value: f32) -> f32 {
        let value = self.spec.range.clamp(value);
        self.value.set(value);
        self.revision.fetch_add(1, Ordering::AcqRel);
        value
    }

    /// Raw write that bypasses observers and the revision counter.
    pub(crate) fn store_raw(&self, value: f32) {
        self.value.set(self.spec.range.clamp(value));
    }
}
