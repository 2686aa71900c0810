//! Root-mean-square amplitude tracking.
//!
//! The output looks like a classic VU meter. The render path measures the
//! signal through a one-pole lowpass whose half-power point is the node's only
//! parameter, and reports the raw detector value back into the unit.

use crate::UnitNode;
use patchbay_core::{
    AtomicFloat, ComponentDescription, ComponentRegistry, Engine, Error, FourCharCode,
    InstantiationOptions, Node, NodeId, NodeState, ParameterAddress, ParameterRange,
    ParameterSpec, ParameterUnit, ProcessingUnit, Result, Toggleable, UnitCore,
    DEFAULT_RAMP_TIME, DEFAULT_SAMPLE_RATE,
};
use std::any::Any;
use std::f64::consts::SQRT_2;
use std::sync::Arc;

const HALF_POWER_POINT: usize = 0;

/// Detector output rescaled to the node's amplitude unit: `raw / sqrt(2) * 2`.
#[inline]
pub fn calibrated_amplitude(raw: f64) -> f64 {
    raw / SQRT_2 * 2.0
}

/// Engine-side unit behind an [`AmplitudeTracker`].
pub struct AmplitudeTrackerUnit {
    core: UnitCore,
    amplitude: AtomicFloat,
}

impl AmplitudeTrackerUnit {
    pub const DESCRIPTION: ComponentDescription = ComponentDescription {
        component_type: ComponentDescription::EFFECT,
        sub_type: FourCharCode::from_bytes(*b"rmsq"),
        manufacturer: ComponentDescription::MANUFACTURER,
    };

    pub const NAME: &'static str = "Local AmplitudeTracker";

    pub fn parameter_specs() -> Vec<ParameterSpec> {
        vec![ParameterSpec::new(
            "halfPowerPoint",
            "Half-Power Point",
            ParameterAddress(0),
            ParameterRange::linear(0.0, 20000.0, 10.0),
        )
        .with_unit(ParameterUnit::Hertz)]
    }

    pub fn new() -> Self {
        Self {
            core: UnitCore::new(Self::parameter_specs(), DEFAULT_RAMP_TIME, DEFAULT_SAMPLE_RATE),
            amplitude: AtomicFloat::new(0.0),
        }
    }

    /// Register this kind with `registry` unless it already has a factory.
    pub fn register(registry: &ComponentRegistry) -> bool {
        registry.register_once(Self::DESCRIPTION, Self::NAME, u32::MAX, |_| {
            Ok(Arc::new(Self::new()) as Arc<dyn ProcessingUnit>)
        })
    }

    /// Called by the render path with the detector's latest value.
    #[inline]
    pub fn report_amplitude(&self, raw: f32) {
        self.amplitude.set(raw);
    }

    /// Last reported detector value, before calibration.
    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude.get()
    }
}

impl Default for AmplitudeTrackerUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingUnit for AmplitudeTrackerUnit {
    fn core(&self) -> &UnitCore {
        &self.core
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }

    fn deallocate_render_resources(&self) {
        self.core.deallocate();
        self.amplitude.set(0.0);
    }
}

/// Performs a root-mean-square on its input to report overall amplitude.
///
/// ```ignore
/// let tracker = AmplitudeTracker::new(&engine, &input, 10.0);
/// engine.run_pending_timeout(Duration::from_millis(100));
/// println!("{}", tracker.amplitude());
/// ```
#[derive(Debug)]
pub struct AmplitudeTracker {
    inner: UnitNode<AmplitudeTrackerUnit>,
}

impl AmplitudeTracker {
    pub fn new(engine: &Engine, input: &Arc<dyn Node>, half_power_point: f64) -> Arc<Self> {
        Self::with_options(engine, input, half_power_point, InstantiationOptions::default())
    }

    pub fn with_options(
        engine: &Engine,
        input: &Arc<dyn Node>,
        half_power_point: f64,
        options: InstantiationOptions,
    ) -> Arc<Self> {
        AmplitudeTrackerUnit::register(engine.registry());
        let inner = UnitNode::spawn(
            engine,
            input,
            AmplitudeTrackerUnit::DESCRIPTION,
            AmplitudeTrackerUnit::parameter_specs(),
            &[half_power_point],
            options,
        );
        Arc::new(Self { inner })
    }

    /// Half-power point (Hz) of the detector's lowpass.
    pub fn half_power_point(&self) -> f64 {
        self.inner.value(HALF_POWER_POINT)
    }

    pub fn set_half_power_point(&self, hz: f64) {
        self.inner.set_value(HALF_POWER_POINT, hz);
    }

    /// Detected amplitude; `0.0` until the unit is attached.
    pub fn amplitude(&self) -> f64 {
        self.inner
            .with_unit(0.0, |unit| calibrated_amplitude(unit.amplitude() as f64))
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

    pub fn unit(&self) -> Option<Arc<AmplitudeTrackerUnit>> {
        self.inner.unit()
    }
}

impl Node for AmplitudeTracker {
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

impl Toggleable for AmplitudeTracker {
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
