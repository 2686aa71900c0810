//! Start/stop on attached and inert nodes.

use crate::helpers::*;
use patchbay::core::Error as CoreError;
use patchbay::prelude::*;

#[test]
fn test_start_stop_idempotent() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);
    assert!(filter.is_started());

    filter.stop().unwrap();
    filter.stop().unwrap();
    assert!(!filter.is_started());

    filter.start().unwrap();
    filter.start().unwrap();
    assert!(filter.is_started());
}

#[test]
fn test_alternating_calls_transition_every_time() {
    let patchbay = test_patchbay();
    let tracker = attached_tracker(&patchbay, 10.0);

    for _ in 0..4 {
        tracker.bypass().unwrap();
        assert!(!tracker.is_started());
        tracker.play().unwrap();
        assert!(tracker.is_started());
    }
}

#[test]
fn test_toggle_before_attachment_is_rejected() {
    let patchbay = test_patchbay();
    let tracker = patchbay.amplitude_tracker(&patchbay.input(), 10.0);

    assert!(!tracker.is_started());
    assert_eq!(tracker.start(), Err(CoreError::NotYetAttached));
    assert_eq!(tracker.stop(), Err(CoreError::NotYetAttached));

    patchbay.wait_attached(&*tracker, ATTACH_TIMEOUT).unwrap();
    assert!(tracker.is_started());
}

#[test]
fn test_inert_node_reports_defaults() {
    let patchbay = test_patchbay();
    patchbay.shutdown();
    let tracker = patchbay.amplitude_tracker(&patchbay.input(), 15.0);
    assert!(patchbay.wait_attached(&*tracker, ATTACH_TIMEOUT).is_err());

    assert!(!tracker.is_started());
    assert!(matches!(tracker.start(), Err(CoreError::Inert { .. })));
    assert!(matches!(tracker.stop(), Err(CoreError::Inert { .. })));
    assert_eq!(tracker.amplitude(), 0.0);
    assert_eq!(tracker.half_power_point(), 15.0);

    tracker.set_half_power_point(30.0);
    assert_eq!(tracker.half_power_point(), 30.0);
}
