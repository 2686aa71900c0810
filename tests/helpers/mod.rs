//! Test helpers and fixtures for patchbay integration tests.
//!
//! Every fixture builds its engine on a private component registry so tests
//! can run in parallel without sharing process-wide state.

pub mod tolerances;

use patchbay::prelude::*;
use patchbay::ComponentRegistry;
use patchbay::ProcessingUnit;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Upper bound for an asynchronous instantiation to complete in tests.
pub const ATTACH_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once. Set `RUST_LOG` to see lifecycle logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a basic test patchbay on a private registry.
pub fn test_patchbay() -> Patchbay {
    init_tracing();
    Patchbay::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .registry(Arc::new(ComponentRegistry::new()))
        .build()
        .expect("Failed to create test patchbay")
}

/// Filter on the input bus, already attached.
pub fn attached_filter(
    patchbay: &Patchbay,
    frequency: f64,
    quality_factor: f64,
) -> Arc<ModalResonanceFilter> {
    let filter = patchbay.modal_resonance_filter(&patchbay.input(), frequency, quality_factor);
    patchbay
        .wait_attached(&*filter, ATTACH_TIMEOUT)
        .expect("filter did not attach");
    filter
}

/// Amplitude tracker on the input bus, already attached.
pub fn attached_tracker(patchbay: &Patchbay, half_power_point: f64) -> Arc<AmplitudeTracker> {
    let tracker = patchbay.amplitude_tracker(&patchbay.input(), half_power_point);
    patchbay
        .wait_attached(&*tracker, ATTACH_TIMEOUT)
        .expect("tracker did not attach");
    tracker
}

/// Live engine-side value of a filter parameter.
pub fn unit_value(filter: &ModalResonanceFilter, name: &str) -> f32 {
    filter
        .unit()
        .and_then(|unit| unit.parameter_tree())
        .and_then(|tree| tree.get(name).map(|p| p.value()))
        .expect("parameter not live")
}
