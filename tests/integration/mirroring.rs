//! Node fields and unit parameters staying in sync in both directions.

use crate::helpers::tolerances::PARAMETER_EPSILON;
use crate::helpers::*;
use approx::assert_relative_eq;
use patchbay::prelude::*;
use patchbay::{ParameterAddress, ProcessingUnit};
use proptest::prelude::*;
use std::thread;

#[test]
fn test_last_write_before_attachment_wins() {
    let patchbay = test_patchbay();
    let filter = patchbay.modal_resonance_filter(&patchbay.input(), 500.0, 50.0);
    filter.set_frequency(800.0);
    filter.set_frequency(1200.0);
    filter.set_quality_factor(10.0);

    patchbay.wait_attached(&*filter, ATTACH_TIMEOUT).unwrap();

    let tree = filter.unit().unwrap().parameter_tree().unwrap();
    let frequency = tree.get("frequency").unwrap();
    let quality = tree.get("qualityFactor").unwrap();
    assert_eq!(frequency.value(), 1200.0);
    assert_eq!(quality.value(), 10.0);
    // Applied exactly once, at attachment
    assert_eq!(frequency.revision(), 1);
    assert_eq!(quality.revision(), 1);
}

#[test]
fn test_own_writes_are_not_echoed() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);

    filter.set_frequency(3000.0);
    filter.set_frequency(4000.0);
    assert_eq!(patchbay.run_pending(), 0);
    assert_eq!(filter.frequency(), 4000.0);
    assert_eq!(unit_value(&filter, "frequency"), 4000.0);
}

#[test]
fn test_host_automation_reaches_node() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);
    let tree = filter.unit().unwrap().parameter_tree().unwrap();
    let host = tree.add_observer(|_, _| {});

    tree.set_normalized(ParameterAddress(1), 0.25, Some(host))
        .unwrap();
    // Not applied until the control plane runs
    assert_eq!(filter.quality_factor(), 50.0);

    assert_eq!(patchbay.run_pending(), 1);
    assert_relative_eq!(filter.quality_factor(), 25.0, epsilon = 1e-6);
}

#[test]
fn test_remote_changes_are_coalesced_to_latest() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);
    let tree = filter.unit().unwrap().parameter_tree().unwrap();

    for q in [60.0, 70.0, 80.0] {
        tree.set_value(ParameterAddress(1), q, None).unwrap();
    }
    // One sync task for the whole burst
    assert_eq!(patchbay.run_pending(), 1);

    assert_eq!(filter.quality_factor(), 80.0);
    assert_eq!(tree.get("qualityFactor").unwrap().revision(), 4);
}

#[test]
fn test_host_observer_can_read_node_during_write() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);
    let tree = filter.unit().unwrap().parameter_tree().unwrap();

    let weak = Arc::downgrade(&filter);
    let (seen_tx, seen_rx) = crossbeam_channel::unbounded();
    tree.add_observer(move |_, _| {
        if let Some(filter) = weak.upgrade() {
            let _ = seen_tx.send(filter.quality_factor());
        }
    });

    let worker = Arc::clone(&filter);
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        worker.set_frequency(1000.0);
        let _ = done_tx.send(());
    });

    assert!(done_rx.recv_timeout(Duration::from_secs(3)).is_ok());
    assert_eq!(seen_rx.try_recv(), Ok(50.0));
    assert_eq!(unit_value(&filter, "frequency"), 1000.0);
}

#[test]
fn test_non_finite_writes_are_ignored() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);

    filter.set_frequency(f64::NAN);
    filter.set_quality_factor(f64::INFINITY);
    filter.set_frequency(f64::NEG_INFINITY);

    assert_eq!(filter.frequency(), 500.0);
    assert_eq!(filter.quality_factor(), 50.0);
    assert_eq!(unit_value(&filter, "frequency"), 500.0);
    let tree = filter.unit().unwrap().parameter_tree().unwrap();
    assert_eq!(tree.get("frequency").unwrap().revision(), 1);
    assert_eq!(tree.get("qualityFactor").unwrap().revision(), 1);
}

#[test]
fn test_concurrent_writers_across_nodes() {
    let patchbay = test_patchbay();
    let filters: Vec<_> = (0..4)
        .map(|i| attached_filter(&patchbay, 500.0 + 100.0 * i as f64, 50.0))
        .collect();
    let trees: Vec<_> = filters
        .iter()
        .map(|filter| filter.unit().unwrap().parameter_tree().unwrap())
        .collect();

    // Host observers read back into their node on every change.
    let hosts: Vec<_> = filters
        .iter()
        .zip(&trees)
        .map(|(filter, tree)| {
            let weak = Arc::downgrade(filter);
            let token = tree.add_observer(move |_, _| {
                if let Some(filter) = weak.upgrade() {
                    let _ = filter.frequency();
                }
            });
            (Arc::clone(tree), token)
        })
        .collect();

    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    for (i, filter) in filters.iter().enumerate() {
        let filter = Arc::clone(filter);
        let done = done_tx.clone();
        thread::spawn(move || {
            for step in 0..200 {
                filter.set_frequency(1000.0 + (i * 1000 + step) as f64);
            }
            let _ = done.send(());
        });
    }
    let host_done = done_tx.clone();
    thread::spawn(move || {
        for step in 0..200 {
            for (tree, token) in &hosts {
                tree.set_value(ParameterAddress(1), (step % 100) as f32, Some(*token))
                    .unwrap();
            }
        }
        let _ = host_done.send(());
    });
    drop(done_tx);

    for _ in 0..=filters.len() {
        assert!(done_rx.recv_timeout(Duration::from_secs(10)).is_ok());
    }
    patchbay.run_pending();

    for (i, (filter, tree)) in filters.iter().zip(&trees).enumerate() {
        assert_eq!(filter.frequency(), 1000.0 + (i * 1000 + 199) as f64);
        assert_eq!(filter.frequency() as f32, tree.get("frequency").unwrap().value());
        assert_eq!(
            filter.quality_factor() as f32,
            tree.get("qualityFactor").unwrap().value()
        );
    }
}

#[test]
fn test_torn_down_unit_takes_raw_writes() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);
    let unit = filter.unit().unwrap();
    let tree = unit.parameter_tree().unwrap();

    // The render side releases its resources; the tree keeps its addresses.
    unit.deallocate_render_resources();
    assert!(!unit.is_set_up());

    filter.set_frequency(900.0);
    assert_eq!(unit.raw_value("frequency"), Some(900.0));
    assert_eq!(tree.get("frequency").unwrap().revision(), 1);

    unit.allocate_render_resources(TEST_SAMPLE_RATE).unwrap();
    assert_eq!(tree.get("frequency").unwrap().value(), 900.0);
    assert_eq!(tree.get("frequency").unwrap().address(), ParameterAddress(0));
}

#[test]
fn test_ramp_table_follows_addressed_writes() {
    let patchbay = test_patchbay();
    let filter = attached_filter(&patchbay, 500.0, 50.0);
    filter.set_ramp_time(0.001);

    let unit = filter.unit().unwrap();
    let mut ramps = unit.core().ramp_table().unwrap();
    assert_eq!(unit.core().ramp().samples(), 48);

    filter.set_frequency(980.0);
    ramps.advance(24);
    let midway = ramps.value(ParameterAddress(0)).unwrap();
    assert_relative_eq!(midway, 740.0, epsilon = 1e-2);
    assert!(ramps.is_ramping());

    ramps.advance(24);
    assert_relative_eq!(
        ramps.value(ParameterAddress(0)).unwrap(),
        980.0,
        epsilon = PARAMETER_EPSILON
    );
    assert!(!ramps.is_ramping());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_reads_match_writes(writes in prop::collection::vec(12.0f64..20000.0, 1..24)) {
        let patchbay = test_patchbay();
        let filter = attached_filter(&patchbay, 500.0, 50.0);

        for hz in writes {
            filter.set_frequency(hz);
            prop_assert_eq!(filter.frequency(), hz);
            prop_assert_eq!(unit_value(&filter, "frequency"), hz as f32);
        }
        prop_assert_eq!(patchbay.run_pending(), 0);
    }
}
