//! Boundary with the engine-side processing unit.
//!
//! A processing unit performs the real DSP; this crate never implements that
//! math. What it does own is the unit's control surface: raw (un-ramped) fields
//! used before the unit is set up, the parameter tree once it is, the
//! playing/bypassed flag and the ramp configuration.
//!
//! Concrete units embed a [`UnitCore`] and implement [`ProcessingUnit`] by
//! returning it from [`ProcessingUnit::core`].

use crate::lockfree::{AtomicFlag, AtomicFloat};
use crate::parameter::ParameterSpec;
use crate::smooth::{RampConfig, RampTable};
use crate::tree::ParameterTree;
use crate::Result;
use arc_swap::ArcSwapOption;
use std::any::Any;
use std::sync::Arc;

pub trait ProcessingUnit: Send + Sync + 'static {
    fn core(&self) -> &UnitCore;

    /// Upcast used to recover the concrete unit type from a factory result.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Human-readable type name, used in errors and logs.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// `None` until the unit has been set up once.
    fn parameter_tree(&self) -> Option<Arc<ParameterTree>> {
        self.core().parameter_tree()
    }

    fn is_set_up(&self) -> bool {
        self.core().is_set_up()
    }

    fn is_playing(&self) -> bool {
        self.core().is_playing()
    }

    fn start(&self) {
        self.core().start();
    }

    fn stop(&self) {
        self.core().stop();
    }

    fn ramp_time(&self) -> f64 {
        self.core().ramp().ramp_time()
    }

    /// Store a new ramp time and recompute the ramp table.
    fn set_ramp_time(&self, ramp_time: f64) {
        self.core().ramp().set_ramp_time(ramp_time);
        self.recompute_ramp_table();
    }

    fn recompute_ramp_table(&self) {
        self.core().ramp().recompute();
    }

    fn allocate_render_resources(&self, sample_rate: f64) -> Result<()> {
        self.core().allocate(sample_rate)
    }

    fn deallocate_render_resources(&self) {
        self.core().deallocate();
    }

    /// Write a raw field by parameter name. Returns `false` for unknown names.
    fn set_raw_value(&self, name: &str, value: f32) -> bool {
        self.core().set_raw(name, value)
    }

    fn raw_value(&self, name: &str) -> Option<f32> {
        self.core().raw(name)
    }
}

/// Recover the concrete unit type behind a factory result.
pub fn downcast_unit<U: ProcessingUnit>(unit: Arc<dyn ProcessingUnit>) -> Option<Arc<U>> {
    unit.into_any().downcast::<U>().ok()
}

/// Control-side state shared by every processing unit.
pub struct UnitCore {
    specs: Vec<ParameterSpec>,
    raw: Vec<AtomicFloat>,
    tree: ArcSwapOption<ParameterTree>,
    ramp: Arc<RampConfig>,
    set_up: AtomicFlag,
    playing: AtomicFlag,
}

impl UnitCore {
    /// Raw fields start at each parameter's default. Units start playing.
    pub fn new(specs: Vec<ParameterSpec>, ramp_time: f64, sample_rate: f64) -> Self {
        let raw = specs
            .iter()
            .map(|spec| AtomicFloat::new(spec.range.default))
            .collect();

        Self {
            specs,
            raw,
            tree: ArcSwapOption::empty(),
            ramp: Arc::new(RampConfig::new(ramp_time, sample_rate)),
            set_up: AtomicFlag::new(false),
            playing: AtomicFlag::new(true),
        }
    }

    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    pub fn parameter_tree(&self) -> Option<Arc<ParameterTree>> {
        self.tree.load_full()
    }

    pub fn is_set_up(&self) -> bool {
        self.set_up.get()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    pub fn start(&self) {
        self.playing.set(true);
    }

    pub fn stop(&self) {
        self.playing.set(false);
    }

    pub fn ramp(&self) -> &Arc<RampConfig> {
        &self.ramp
    }

    /// Build the tree on first set-up; later set-ups re-apply the raw fields.
    pub fn allocate(&self, sample_rate: f64) -> Result<()> {
        match self.tree.load_full() {
            Some(tree) => {
                for (spec, raw) in self.specs.iter().zip(&self.raw) {
                    if let Some(param) = tree.get(spec.name) {
                        param.store_raw(raw.get());
                    }
                }
            }
            None => {
                let tree = ParameterTree::new(
                    self.specs
                        .iter()
                        .cloned()
                        .zip(self.raw.iter().map(AtomicFloat::get)),
                )?;
                self.tree.store(Some(Arc::new(tree)));
            }
        }

        self.ramp.set_sample_rate(sample_rate);
        self.ramp.recompute();
        self.set_up.set(true);
        Ok(())
    }

    pub fn deallocate(&self) {
        if let Some(tree) = self.tree.load_full() {
            // Keep raw fields in step with whatever the tree last held.
            for (spec, raw) in self.specs.iter().zip(&self.raw) {
                if let Some(param) = tree.get(spec.name) {
                    raw.set(param.value());
                }
            }
        }
        self.set_up.set(false);
    }

    /// Raw (un-ramped) write. Mirrors into the tree without notifying observers.
    pub fn set_raw(&self, name: &str, value: f32) -> bool {
        let Some(index) = self.specs.iter().position(|spec| spec.name == name) else {
            return false;
        };
        let value = self.specs[index].range.clamp(value);
        self.raw[index].set(value);
        if let Some(tree) = self.tree.load_full() {
            if let Some(param) = tree.get(name) {
                param.store_raw(value);
            }
        }
        true
    }

    /// Live value by name: the tree once it exists, the raw field before.
    pub fn raw(&self, name: &str) -> Option<f32> {
        if let Some(tree) = self.tree.load_full() {
            if let Some(param) = tree.get(name) {
                return Some(param.value());
            }
        }
        let index = self.specs.iter().position(|spec| spec.name == name)?;
        Some(self.raw[index].get())
    }

    /// Render-side ramp state, available once the unit is set up.
    pub fn ramp_table(&self) -> Option<RampTable> {
        let tree = self.tree.load_full()?;
        Some(RampTable::new(&tree, Arc::clone(&self.ramp)))
    }
}
