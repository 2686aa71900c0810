//! Modal resonance filter: a resonant bandpass that models one mode of a
//! struck object, so chains of them can build up physical-modelling bodies.

use crate::UnitNode;
use patchbay_core::{
    ComponentDescription, ComponentRegistry, Engine, Error, FourCharCode, InstantiationOptions,
    Node, NodeId, NodeState, ParameterAddress, ParameterRange, ParameterSpec, ParameterUnit,
    ProcessingUnit, Result, Toggleable, UnitCore, DEFAULT_RAMP_TIME, DEFAULT_SAMPLE_RATE,
};
use std::any::Any;
use std::sync::Arc;

const FREQUENCY: usize = 0;
const QUALITY_FACTOR: usize = 1;

/// Engine-side unit behind a [`ModalResonanceFilter`].
pub struct ModalResonanceFilterUnit {
    core: UnitCore,
}

impl ModalResonanceFilterUnit {
    pub const DESCRIPTION: ComponentDescription = ComponentDescription {
        component_type: ComponentDescription::EFFECT,
        sub_type: FourCharCode::from_bytes(*b"modf"),
        manufacturer: ComponentDescription::MANUFACTURER,
    };

    pub const NAME: &'static str = "Local ModalResonanceFilter";

    pub fn parameter_specs() -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::new(
                "frequency",
                "Resonant Frequency (Hz)",
                ParameterAddress(0),
                ParameterRange::logarithmic(12.0, 20000.0, 500.0),
            )
            .with_unit(ParameterUnit::Hertz),
            ParameterSpec::new(
                "qualityFactor",
                "Quality Factor",
                ParameterAddress(1),
                ParameterRange::linear(0.0, 100.0, 50.0),
            ),
        ]
    }

    pub fn new() -> Self {
        Self {
            core: UnitCore::new(Self::parameter_specs(), DEFAULT_RAMP_TIME, DEFAULT_SAMPLE_RATE),
        }
    }

    pub fn register(registry: &ComponentRegistry) -> bool {
        registry.register_once(Self::DESCRIPTION, Self::NAME, u32::MAX, |_| {
            Ok(Arc::new(Self::new()) as Arc<dyn ProcessingUnit>)
        })
    }
}

impl Default for ModalResonanceFilterUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingUnit for ModalResonanceFilterUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Builder for a [`ModalResonanceFilter`].
#[derive(Clone, Debug)]
pub struct ModalResonanceFilterBuilder {
    frequency: f64,
    quality_factor: f64,
    options: InstantiationOptions,
}

impl Default for ModalResonanceFilterBuilder {
    fn default() -> Self {
        Self {
            frequency: 500.0,
            quality_factor: 50.0,
            options: InstantiationOptions::default(),
        }
    }
}

impl ModalResonanceFilterBuilder {
    /// Resonant frequency in Hz (12.0 to 20000.0)
    pub fn frequency(mut self, hz: f64) -> Self {
        self.frequency = hz;
        self
    }

    /// Quality factor (0.0 to 100.0). Higher rings longer.
    pub fn quality_factor(mut self, q: f64) -> Self {
        self.quality_factor = q;
        self
    }

    pub fn options(mut self, options: InstantiationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self, engine: &Engine, input: &Arc<dyn Node>) -> Arc<ModalResonanceFilter> {
        ModalResonanceFilterUnit::register(engine.registry());
        let inner = UnitNode::spawn(
            engine,
            input,
            ModalResonanceFilterUnit::DESCRIPTION,
            ModalResonanceFilterUnit::parameter_specs(),
            &[self.frequency, self.quality_factor],
            self.options,
        );
        Arc::new(ModalResonanceFilter { inner })
    }
}

#[derive(Debug)]
pub struct ModalResonanceFilter {
    inner: UnitNode<ModalResonanceFilterUnit>,
}

impl ModalResonanceFilter {
    pub fn builder() -> ModalResonanceFilterBuilder {
        ModalResonanceFilterBuilder::default()
    }

    pub fn new(
        engine: &Engine,
        input: &Arc<dyn Node>,
        frequency: f64,
        quality_factor: f64,
    ) -> Arc<Self> {
        Self::builder()
            .frequency(frequency)
            .quality_factor(quality_factor)
            .build(engine, input)
    }

    pub fn frequency(&self) -> f64 {
        self.inner.value(FREQUENCY)
    }

    pub fn set_frequency(&self, hz: f64) {
        self.inner.set_value(FREQUENCY, hz);
    }

    pub fn quality_factor(&self) -> f64 {
        self.inner.value(QUALITY_FACTOR)
    }

    pub fn set_quality_factor(&self, q: f64) {
        self.inner.set_value(QUALITY_FACTOR, q);
    }

    pub fn ramp_time(&self) -> f64 {
        self.inner.ramp_time()
    }

    pub fn set_ramp_time(&self, seconds: f64) {
        self.inner.set_ramp_time(seconds);
    }

    pub fn state(&self) -> NodeState {
        self.inner.state()
    }

    pub fn failure(&self) -> Option<Error> {
        self.inner.failure()
    }

    pub fn unit(&self) -> Option<Arc<ModalResonanceFilterUnit>> {
        self.inner.unit()
    }
}

impl Node for ModalResonanceFilter {
    fn id(&self) -> NodeId {
        self.inner.id()
    }

    fn add_connection_point(&self, downstream: NodeId) {
        self.inner.add_connection_point(downstream);
    }

    fn connection_points(&self) -> Vec<NodeId> {
        self.inner.connection_points()
    }
}

impl Toggleable for ModalResonanceFilter {
    fn is_started(&self) -> bool {
        self.inner.is_started()
    }

    fn start(&self) -> Result<()> {
        self.inner.start()
    }

    fn stop(&self) -> Result<()> {
        self.inner.stop()
    }
}
