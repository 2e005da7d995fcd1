//! Bounded slot pool with in-order completion.
//!
//! Units are executed concurrently on a rayon pool but delivered to the
//! completion callback strictly in submission order. The sequence cursors,
//! the slot states and the completion callback all live behind one mutex;
//! a worker that finishes out of order only parks its result in its slot,
//! and whichever worker completes the slot at `start` delivers every
//! consecutive finished slot behind it.
//!
//! ```text
//!   start                     end
//!     │                        │
//!  ┌──▼──┬──────┬──────┬──────▼┬──────┐
//!  │done │ busy │ done │ idle  │ idle │   capacity = 5
//!  └─────┴──────┴──────┴───────┴──────┘
//!     └─ delivered next, slot 2 waits for slot 1
//! ```
//!
//! Payloads are never allocated per unit. The pool owns `capacity + 1` of
//! them: one is the fill item the caller populates, the rest circulate
//! through the slots and come back once delivered.

use crate::config::PipelineConfig;
use oxiblock_core::error::{OxiBlockError, Result};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, trace};

type ExecuteFn<T> = dyn Fn(&mut T) -> Result<()> + Send + Sync;
type CompleteFn<T> = dyn FnMut(&mut T, Result<()>) + Send;

/// State of one ring slot.
enum SlotState<T> {
    /// Not holding a unit.
    Idle,
    /// Handed to a worker.
    Dispatched { sequence: u64 },
    /// Worker finished; waiting for its turn to be delivered.
    ComputeDone {
        sequence: u64,
        payload: T,
        result: Result<()>,
    },
}

/// Counters reported by [`OrderedPipeline::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStats {
    /// Units submitted.
    pub submitted: u64,
    /// Units whose completion callback ran.
    pub delivered: u64,
    /// Delivered units that carried an error.
    pub errors: u64,
}

/// Everything guarded by the pipeline lock.
struct Cursor<T> {
    slots: Vec<SlotState<T>>,
    released: Vec<T>,
    start: u64,
    end: u64,
    in_flight: usize,
    errors: u64,
    on_complete: Box<CompleteFn<T>>,
}

struct Shared<T> {
    cursor: Mutex<Cursor<T>>,
    slot_freed: Condvar,
    capacity: usize,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Cursor<T>> {
        // Completion callbacks run under catch_unwind, so a poisoned lock
        // still holds consistent cursors.
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Cursor<T>>) -> MutexGuard<'a, Cursor<T>> {
        self.slot_freed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn slot_index(&self, sequence: u64) -> usize {
        (sequence % self.capacity as u64) as usize
    }

    /// Publish a finished unit and deliver every unit that is now in order.
    fn finish(&self, sequence: u64, payload: T, result: Result<()>) {
        let mut cursor = self.lock();
        let index = self.slot_index(sequence);
        debug_assert!(matches!(
            cursor.slots[index],
            SlotState::Dispatched { sequence: s } if s == sequence
        ));
        cursor.slots[index] = SlotState::ComputeDone {
            sequence,
            payload,
            result,
        };

        let mut delivered_any = false;
        loop {
            let head = self.slot_index(cursor.start);
            match std::mem::replace(&mut cursor.slots[head], SlotState::Idle) {
                SlotState::ComputeDone {
                    sequence,
                    mut payload,
                    result,
                } if sequence == cursor.start => {
                    if result.is_err() {
                        cursor.errors += 1;
                    }
                    trace!(sequence, ok = result.is_ok(), "delivering unit");
                    let callback = &mut cursor.on_complete;
                    let outcome = catch_unwind(AssertUnwindSafe(|| callback(&mut payload, result)));
                    if outcome.is_err() {
                        error!(sequence, "completion callback panicked");
                    }
                    cursor.released.push(payload);
                    cursor.start += 1;
                    cursor.in_flight -= 1;
                    delivered_any = true;
                }
                other => {
                    cursor.slots[head] = other;
                    break;
                }
            }
        }

        if delivered_any {
            self.slot_freed.notify_all();
        }
    }
}

/// A fixed-size pool of reusable work slots with ordered completion.
///
/// ```rust
/// use oxiblock_pipeline::{OrderedPipeline, PipelineConfig};
/// use std::sync::{Arc, Mutex};
///
/// let order = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&order);
///
/// let mut pipeline = OrderedPipeline::new(
///     &PipelineConfig::new(3).with_threads(2),
///     || 0u32,
///     |value: &mut u32| {
///         *value *= 10;
///         Ok(())
///     },
///     move |value: &mut u32, _result| sink.lock().unwrap().push(*value),
/// )
/// .unwrap();
///
/// for i in 1..=4 {
///     *pipeline.fill_item() = i;
///     pipeline.submit().unwrap();
/// }
/// pipeline.drain().unwrap();
/// assert_eq!(*order.lock().unwrap(), vec![10, 20, 30, 40]);
/// ```
pub struct OrderedPipeline<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    execute: Arc<ExecuteFn<T>>,
    pool: rayon::ThreadPool,
    fill: T,
    drained: bool,
}

impl<T: Send + 'static> OrderedPipeline<T> {
    /// Create a pipeline whose `capacity + 1` payloads come from `factory`.
    pub fn new<F, E, C>(
        config: &PipelineConfig,
        mut factory: F,
        execute: E,
        on_complete: C,
    ) -> Result<Self>
    where
        F: FnMut() -> T,
        E: Fn(&mut T) -> Result<()> + Send + Sync + 'static,
        C: FnMut(&mut T, Result<()>) + Send + 'static,
    {
        config.validate()?;
        let payloads = (0..=config.capacity).map(|_| factory()).collect();
        Self::with_payloads(config, payloads, execute, on_complete)
    }

    /// Create a pipeline from an explicit payload collection.
    ///
    /// `payloads` must hold exactly `config.capacity + 1` items: one per
    /// slot plus the fill item.
    pub fn with_payloads<E, C>(
        config: &PipelineConfig,
        mut payloads: Vec<T>,
        execute: E,
        on_complete: C,
    ) -> Result<Self>
    where
        E: Fn(&mut T) -> Result<()> + Send + Sync + 'static,
        C: FnMut(&mut T, Result<()>) + Send + 'static,
    {
        config.validate()?;
        let required = config.capacity + 1;
        if payloads.len() != required {
            return Err(OxiBlockError::capacity(payloads.len(), required));
        }

        let pool = config.build_pool()?;
        let fill = payloads.pop().ok_or_else(|| OxiBlockError::capacity(0, required))?;
        let slots = (0..config.capacity).map(|_| SlotState::Idle).collect();

        debug!(
            capacity = config.capacity,
            threads = pool.current_num_threads(),
            "ordered pipeline created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                cursor: Mutex::new(Cursor {
                    slots,
                    released: payloads,
                    start: 0,
                    end: 0,
                    in_flight: 0,
                    errors: 0,
                    on_complete: Box::new(on_complete),
                }),
                slot_freed: Condvar::new(),
                capacity: config.capacity,
            }),
            execute: Arc::new(execute),
            pool,
            fill,
            drained: false,
        })
    }

    /// Maximum number of units in flight.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of units dispatched but not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    /// The payload to populate before the next [`submit`](Self::submit).
    pub fn fill_item(&mut self) -> &mut T {
        &mut self.fill
    }

    /// Dispatch the fill item and return its sequence index.
    ///
    /// Blocks while all slots are in flight. On return the fill item has
    /// been replaced by a payload released by an earlier delivery.
    pub fn submit(&mut self) -> Result<u64> {
        let (sequence, payload) = {
            let mut cursor = self.shared.lock();
            while cursor.in_flight == self.shared.capacity {
                trace!(end = cursor.end, "pipeline full, waiting for a slot");
                cursor = self.shared.wait(cursor);
            }

            let next_fill = cursor
                .released
                .pop()
                .ok_or_else(|| OxiBlockError::capacity(0, 1))?;
            let sequence = cursor.end;
            let index = self.shared.slot_index(sequence);
            cursor.slots[index] = SlotState::Dispatched { sequence };
            cursor.end += 1;
            cursor.in_flight += 1;
            (sequence, std::mem::replace(&mut self.fill, next_fill))
        };

        trace!(sequence, "unit dispatched");
        let shared = Arc::clone(&self.shared);
        let execute = Arc::clone(&self.execute);
        self.pool.spawn(move || {
            let mut payload = payload;
            let result = match catch_unwind(AssertUnwindSafe(|| execute(&mut payload))) {
                Ok(result) => result,
                Err(_) => {
                    error!(sequence, "pipeline worker panicked");
                    Err(OxiBlockError::WorkerPanicked { sequence })
                }
            };
            shared.finish(sequence, payload, result);
        });

        Ok(sequence)
    }

    /// Block until every unit submitted so far has been delivered.
    ///
    /// Unlike [`drain`](Self::drain) the pipeline stays usable.
    pub fn wait_idle(&self) -> PipelineStats {
        let mut cursor = self.shared.lock();
        while cursor.in_flight > 0 {
            cursor = self.shared.wait(cursor);
        }
        PipelineStats {
            submitted: cursor.end,
            delivered: cursor.start,
            errors: cursor.errors,
        }
    }

    /// Wait until every submitted unit has been delivered.
    ///
    /// Consumes the pipeline, so nothing can be submitted afterwards.
    pub fn drain(mut self) -> Result<PipelineStats> {
        let stats = self.wait_idle();
        self.drained = true;
        debug!(
            submitted = stats.submitted,
            errors = stats.errors,
            "ordered pipeline drained"
        );
        Ok(stats)
    }
}

impl<T: Send + 'static> Drop for OrderedPipeline<T> {
    fn drop(&mut self) {
        if !self.drained {
            self.wait_idle();
        }
    }
}
