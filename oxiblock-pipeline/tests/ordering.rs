//! Integration tests for ordered delivery and backpressure.

use oxiblock_core::OxiBlockError;
use oxiblock_pipeline::{OrderedPipeline, PipelineConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// Payload used by most tests: the unit index plus a delay in milliseconds.
#[derive(Debug, Default, Clone, Copy)]
struct Unit {
    index: usize,
    delay_ms: u64,
}

fn run_units(config: &PipelineConfig, delays: &[u64]) -> (Vec<usize>, Vec<usize>) {
    let computed = Arc::new(Mutex::new(Vec::new()));
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let compute_log = Arc::clone(&computed);
    let deliver_log = Arc::clone(&delivered);

    let mut pipeline = OrderedPipeline::new(
        config,
        Unit::default,
        move |unit: &mut Unit| {
            thread::sleep(Duration::from_millis(unit.delay_ms));
            compute_log.lock().unwrap().push(unit.index);
            Ok(())
        },
        move |unit: &mut Unit, result| {
            assert!(result.is_ok());
            deliver_log.lock().unwrap().push(unit.index);
        },
    )
    .unwrap();

    for (index, &delay_ms) in delays.iter().enumerate() {
        *pipeline.fill_item() = Unit { index, delay_ms };
        pipeline.submit().unwrap();
    }
    let stats = pipeline.drain().unwrap();
    assert_eq!(stats.delivered, delays.len() as u64);

    let computed = computed.lock().unwrap().clone();
    let delivered = delivered.lock().unwrap().clone();
    (computed, delivered)
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_reversed_latencies_deliver_in_order() {
    let k = 8usize;
    let delays: Vec<u64> = (0..k).map(|i| ((k - i) * 5) as u64).collect();
    let config = PipelineConfig::new(k).with_threads(k);

    let (computed, delivered) = run_units(&config, &delays);

    assert_eq!(delivered, (0..k).collect::<Vec<_>>());
    assert_eq!(computed.len(), k);
    // Workers really did finish out of order.
    assert_ne!(computed, delivered);
}

#[test]
fn test_capacity_three_six_units_reversed() {
    let delays = [30, 25, 20, 15, 10, 5];
    let config = PipelineConfig::new(3).with_threads(3);

    let (_, delivered) = run_units(&config, &delays);

    assert_eq!(delivered, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_drain_returns_after_all_callbacks() {
    let k = 20usize;
    let delays: Vec<u64> = (0..k).map(|i| (i % 4) as u64).collect();
    let config = PipelineConfig::new(4).with_threads(4);

    let (computed, delivered) = run_units(&config, &delays);

    assert_eq!(computed.len(), k);
    assert_eq!(delivered.len(), k);
    assert_eq!(delivered, (0..k).collect::<Vec<_>>());
}

#[test]
fn test_single_slot_pipeline_is_sequential() {
    let delays = [3, 1, 2, 0];
    let config = PipelineConfig::new(1).with_threads(2);

    let (computed, delivered) = run_units(&config, &delays);

    assert_eq!(computed, vec![0, 1, 2, 3]);
    assert_eq!(delivered, vec![0, 1, 2, 3]);
}

// ============================================================================
// Backpressure
// ============================================================================

/// A gate that workers block on until the test opens it.
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(false),
            opened: Condvar::new(),
        })
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.opened.wait(open).unwrap();
        }
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

#[test]
fn test_submit_blocks_when_full() {
    let gate = Gate::new();
    let worker_gate = Arc::clone(&gate);
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let deliver_log = Arc::clone(&delivered);

    let mut pipeline = OrderedPipeline::new(
        &PipelineConfig::new(2).with_threads(4),
        || 0usize,
        move |_: &mut usize| {
            worker_gate.wait();
            Ok(())
        },
        move |value: &mut usize, _| deliver_log.lock().unwrap().push(*value),
    )
    .unwrap();

    for i in 0..2 {
        *pipeline.fill_item() = i;
        pipeline.submit().unwrap();
    }
    assert_eq!(pipeline.in_flight(), 2);

    let third_submitted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&third_submitted);
    let submitter = thread::spawn(move || {
        *pipeline.fill_item() = 2;
        pipeline.submit().unwrap();
        flag.store(true, Ordering::SeqCst);
        pipeline
    });

    thread::sleep(Duration::from_millis(100));
    assert!(
        !third_submitted.load(Ordering::SeqCst),
        "submit must block while every slot is in flight"
    );
    assert!(delivered.lock().unwrap().is_empty());

    gate.release();
    let pipeline = submitter.join().unwrap();
    assert!(third_submitted.load(Ordering::SeqCst));

    pipeline.drain().unwrap();
    assert_eq!(*delivered.lock().unwrap(), vec![0, 1, 2]);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_failures_do_not_reorder_siblings() {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let deliver_log = Arc::clone(&delivered);

    let mut pipeline = OrderedPipeline::new(
        &PipelineConfig::new(3).with_threads(3),
        Unit::default,
        |unit: &mut Unit| {
            thread::sleep(Duration::from_millis(unit.delay_ms));
            if unit.index % 3 == 1 {
                return Err(OxiBlockError::codec("test", "odd unit out"));
            }
            Ok(())
        },
        move |unit: &mut Unit, result| {
            deliver_log
                .lock()
                .unwrap()
                .push((unit.index, result.is_err()));
        },
    )
    .unwrap();

    for index in 0..7 {
        *pipeline.fill_item() = Unit {
            index,
            delay_ms: (7 - index) as u64,
        };
        pipeline.submit().unwrap();
    }
    let stats = pipeline.drain().unwrap();

    assert_eq!(stats.errors, 2);
    let delivered = delivered.lock().unwrap().clone();
    assert_eq!(
        delivered,
        vec![
            (0, false),
            (1, true),
            (2, false),
            (3, false),
            (4, true),
            (5, false),
            (6, false)
        ]
    );
}

#[test]
fn test_zero_capacity_rejected() {
    let result = OrderedPipeline::new(
        &PipelineConfig::new(0),
        || (),
        |_: &mut ()| Ok(()),
        |_: &mut (), _| {},
    );
    assert!(matches!(result, Err(OxiBlockError::Capacity { .. })));
}
