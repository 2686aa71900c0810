//! Builder for configuring and constructing a `Patchbay`.

use crate::{Patchbay, Result};
use patchbay_core::{ComponentRegistry, Engine, EngineBuilder, InputNode, Settings};
use patchbay_nodes::register_builtin_components;
use std::sync::Arc;

/// Settings not given here come from [`Settings::global`] at build time.
///
/// # Example
///
/// ```ignore
/// use patchbay::prelude::*;
///
/// let patchbay = Patchbay::builder()
///     .sample_rate(48000.0)
///     .ramp_time(0.01)
///     .build()?;
/// ```
#[derive(Default)]
pub struct PatchbayBuilder {
    engine: EngineBuilder,
    registry: Option<Arc<ComponentRegistry>>,
}

impl PatchbayBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.engine = self.engine.settings(settings);
        self
    }

    /// Default: 44100.0
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.engine = self.engine.sample_rate(sample_rate);
        self
    }

    /// Default ramp time for new nodes, in seconds. Default: 0.0002
    pub fn ramp_time(mut self, seconds: f64) -> Self {
        self.engine = self.engine.ramp_time(seconds);
        self
    }

    /// Use a private component registry instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<ComponentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Result<Patchbay> {
        let mut engine = self.engine;
        if let Some(registry) = self.registry {
            engine = engine.registry(registry);
        }
        let engine: Engine = engine.build()?;
        register_builtin_components(engine.registry());

        let input = InputNode::new(&engine);
        tracing::debug!(
            sample_rate = engine.sample_rate(),
            ramp_time = engine.settings().ramp_time,
            "Patchbay ready"
        );
        Ok(Patchbay::from_parts(engine, input))
    }
}
