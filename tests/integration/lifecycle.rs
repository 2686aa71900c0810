//! Node construction, asynchronous attachment, failure and teardown.

use crate::helpers::*;
use patchbay::core::Error as CoreError;
use patchbay::prelude::*;
use patchbay::{ComponentRegistry, ModalResonanceFilterUnit, ProcessingUnit};

fn patchbay_with(registry: Arc<ComponentRegistry>) -> Patchbay {
    init_tracing();
    Patchbay::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .registry(registry)
        .build()
        .unwrap()
}

#[test]
fn test_fields_readable_before_attachment() {
    let patchbay = test_patchbay();
    let filter = patchbay.modal_resonance_filter(&patchbay.input(), 700.0, 20.0);

    assert_eq!(filter.state(), NodeState::Instantiating);
    assert_eq!(filter.frequency(), 700.0);
    assert_eq!(filter.quality_factor(), 20.0);
    assert!(filter.unit().is_none());
    assert!(!filter.is_started());
}

#[test]
fn test_attachment_connects_to_input() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);

    assert_eq!(filter.state(), NodeState::Attached);
    assert_eq!(patchbay.input().connection_points(), vec![filter.id()]);
    assert_eq!(patchbay.engine().attached_count(), 1);

    let unit = filter.unit().unwrap();
    assert!(unit.is_set_up());
    assert!(unit.is_playing());
}

#[test]
fn test_nodes_take_engine_sample_rate_and_ramp_time() {
    init_tracing();
    let patchbay = Patchbay::builder()
        .sample_rate(96000.0)
        .ramp_time(0.01)
        .registry(Arc::new(ComponentRegistry::new()))
        .build()
        .unwrap();
    let filter = attached_filter(&patchbay, 500.0, 50.0);

    let unit = filter.unit().unwrap();
    assert_eq!(filter.ramp_time(), 0.01);
    assert_eq!(unit.ramp_time(), 0.01);
    assert_eq!(unit.core().ramp().sample_rate(), 96000.0);
    assert_eq!(unit.core().ramp().samples(), 960);
}

#[test]
fn test_invalid_settings_rejected() {
    let result = Patchbay::builder()
        .sample_rate(10.0)
        .registry(Arc::new(ComponentRegistry::new()))
        .build();
    assert!(matches!(
        result,
        Err(Error::Core(CoreError::InvalidConfig(_)))
    ));
}

#[test]
fn test_stopped_engine_leaves_node_inert() {
    let patchbay = test_patchbay();
    patchbay.shutdown();
    let filter = patchbay.modal_resonance_filter(&patchbay.input(), 500.0, 50.0);

    let result = patchbay.wait_attached(&*filter, ATTACH_TIMEOUT);
    assert_eq!(result, Err(Error::Core(CoreError::EngineStopped)));
    assert_eq!(filter.state(), NodeState::Failed);
    assert!(patchbay.input().connection_points().is_empty());
}

#[test]
fn test_wrong_unit_type_leaves_node_inert() {
    let registry = Arc::new(ComponentRegistry::new());
    registry.register_once(
        ModalResonanceFilterUnit::DESCRIPTION,
        "Impostor",
        1,
        |_| Ok(Arc::new(patchbay::AmplitudeTrackerUnit::new()) as Arc<dyn ProcessingUnit>),
    );
    let patchbay = patchbay_with(registry);
    let filter = patchbay.modal_resonance_filter(&patchbay.input(), 500.0, 50.0);

    let result = patchbay.wait_attached(&*filter, ATTACH_TIMEOUT);
    assert!(matches!(
        result,
        Err(Error::Core(CoreError::UnitTypeMismatch { .. }))
    ));
    assert!(filter.start().is_err());
    assert_eq!(filter.frequency(), 500.0);
}

#[test]
fn test_timeout_does_not_cancel_attachment() {
    let registry = Arc::new(ComponentRegistry::new());
    registry.register_once(
        ModalResonanceFilterUnit::DESCRIPTION,
        "Slow ModalResonanceFilter",
        1,
        |_| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(Arc::new(ModalResonanceFilterUnit::new()) as Arc<dyn ProcessingUnit>)
        },
    );
    let patchbay = patchbay_with(registry);
    let filter = patchbay.modal_resonance_filter(&patchbay.input(), 500.0, 50.0);

    let result = patchbay.wait_attached(&*filter, Duration::from_millis(1));
    assert!(matches!(result, Err(Error::AttachTimeout { .. })));
    assert_eq!(filter.state(), NodeState::Instantiating);

    filter.set_frequency(2000.0);
    patchbay.wait_attached(&*filter, ATTACH_TIMEOUT).unwrap();
    assert_eq!(unit_value(&filter, "frequency"), 2000.0);
}

#[test]
fn test_dropping_node_detaches_unit() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);
    let unit = filter.unit().unwrap();
    let tree = unit.parameter_tree().unwrap();
    assert_eq!(tree.observer_count(), 1);

    drop(filter);

    assert_eq!(patchbay.engine().attached_count(), 0);
    assert!(patchbay.engine().connections().is_empty());
    assert_eq!(tree.observer_count(), 0);
    assert!(!unit.is_set_up());
}

#[test]
fn test_dropping_node_before_attachment_is_safe() {
    let patchbay = test_patchbay();
    let filter = patchbay.modal_resonance_filter(&patchbay.input(), 500.0, 50.0);
    drop(filter);

    // The completion still arrives; it finds no node and does nothing.
    assert_eq!(patchbay.engine().run_pending_timeout(ATTACH_TIMEOUT), 1);
    assert_eq!(patchbay.engine().attached_count(), 0);
    assert!(patchbay.input().connection_points().is_empty());
}
