//! End-to-end workflows over the facade.

use crate::helpers::tolerances::AMPLITUDE_EPSILON;
use crate::helpers::*;
use approx::assert_relative_eq;
use patchbay::prelude::*;
use patchbay::ParameterAddress;
use patchbay::ProcessingUnit;
use proptest::prelude::*;

#[test]
fn test_filter_write_before_attachment() {
    let patchbay = test_patchbay();
    let filter = patchbay.modal_resonance_filter(&patchbay.input(), 500.0, 50.0);
    filter.set_frequency(1000.0);

    patchbay.wait_attached(&*filter, ATTACH_TIMEOUT).unwrap();

    assert_eq!(filter.frequency(), 1000.0);
    assert_eq!(unit_value(&filter, "frequency"), 1000.0);
}

#[test]
fn test_filter_external_quality_change() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);
    let tree = filter.unit().unwrap().parameter_tree().unwrap();
    let host = tree.add_observer(|_, _| {});

    tree.set_value(ParameterAddress(1), 75.0, Some(host)).unwrap();
    let revision = tree.get("qualityFactor").unwrap().revision();
    patchbay.run_pending();

    assert_eq!(filter.quality_factor(), 75.0);
    assert_eq!(tree.get("qualityFactor").unwrap().revision(), revision);
    assert_eq!(unit_value(&filter, "qualityFactor"), 75.0);
}

#[test]
fn test_tracker_stop_then_start() {
    let patchbay = test_patchbay();
    let tracker = attached_tracker(&patchbay, 10.0);

    tracker.stop().unwrap();
    assert!(!tracker.is_started());
    tracker.start().unwrap();
    assert!(tracker.is_started());
}

#[test]
fn test_tracker_feeds_filter_chain() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 440.0, 80.0);
    let upstream: Arc<dyn Node> = filter.clone();
    let tracker = patchbay.amplitude_tracker(&upstream, 20.0);
    patchbay.wait_attached(&*tracker, ATTACH_TIMEOUT).unwrap();

    assert_eq!(filter.connection_points(), vec![tracker.id()]);
    assert_eq!(patchbay.engine().connections().len(), 2);

    let unit = tracker.unit().unwrap();
    unit.report_amplitude(0.25);
    assert_relative_eq!(
        tracker.amplitude(),
        0.25 / std::f64::consts::SQRT_2 * 2.0,
        epsilon = AMPLITUDE_EPSILON
    );
}

#[test]
fn test_global_settings_used_when_unset() {
    let global = patchbay::Settings::global();
    let patchbay = Patchbay::builder()
        .registry(Arc::new(patchbay::ComponentRegistry::new()))
        .build()
        .unwrap();
    assert_eq!(patchbay.sample_rate(), global.sample_rate);
    assert_eq!(patchbay.engine().settings().ramp_time, global.ramp_time);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_amplitude_read_transform(raw in 0.0f32..4.0) {
        let patchbay = test_patchbay();
        let tracker = attached_tracker(&patchbay, 10.0);
        tracker.unit().unwrap().report_amplitude(raw);

        let expected = raw as f64 / 2.0f64.sqrt() * 2.0;
        prop_assert!((tracker.amplitude() - expected).abs() <= AMPLITUDE_EPSILON);
    }
}
