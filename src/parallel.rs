//! Parallel execution helpers.
//!
//! [`BoundedScheduler`] runs one job per input id on a fixed array of worker
//! slots: the dispatcher blocks while every slot is busy, joins a slot's
//! previous thread before reusing it, and joins everything at the end.
//! Data-parallel loops elsewhere in the crate use Rayon instead.

use log::error;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ScopedJoinHandle};

/// Minimum number of samples before per-sample work is spread over Rayon.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 64;

/// Number of worker threads for a `--threads` value (0 = all cores).
pub fn resolve_threads(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Counters of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub dispatched: usize,
    pub completed: usize,
    pub panicked: usize,
    /// Highest number of jobs active at the same time.
    pub peak_active: usize,
}

struct Slots {
    active: Vec<bool>,
    running: usize,
    peak: usize,
}

fn lock(m: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears a slot's active flag when its job ends, panics included.
struct SlotRelease<'a> {
    slots: &'a Mutex<Slots>,
    freed: &'a Condvar,
    slot: usize,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut s = lock(self.slots);
        s.active[self.slot] = false;
        s.running -= 1;
        drop(s);
        self.freed.notify_all();
    }
}

/// Runs jobs on at most `threads` OS threads at once.
#[derive(Debug, Clone, Copy)]
pub struct BoundedScheduler {
    threads: usize,
}

impl BoundedScheduler {
    /// `threads == 0` uses the available hardware parallelism.
    pub fn new(threads: usize) -> Self {
        Self {
            threads: resolve_threads(threads),
        }
    }

    #[inline]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `job` once per item, dispatching in input order.
    ///
    /// Completion order is unspecified. A panicking job is logged and
    /// counted; the other jobs keep running.
    pub fn run<I, T, F>(&self, items: I, job: F) -> SchedulerStats
    where
        I: IntoIterator<Item = T>,
        T: Send,
        F: Fn(T) + Sync,
    {
        let slots = Mutex::new(Slots {
            active: vec![false; self.threads],
            running: 0,
            peak: 0,
        });
        let freed = Condvar::new();
        let completed = AtomicUsize::new(0);
        let panicked = AtomicUsize::new(0);
        let mut dispatched = 0;

        let settle = |handle: ScopedJoinHandle<'_, ()>| {
            if handle.join().is_ok() {
                completed.fetch_add(1, Ordering::Relaxed);
            } else {
                error!("A scheduled job panicked");
                panicked.fetch_add(1, Ordering::Relaxed);
            }
        };

        thread::scope(|scope| {
            let mut handles: Vec<Option<ScopedJoinHandle<'_, ()>>> =
                (0..self.threads).map(|_| None).collect();

            for item in items {
                let slot = {
                    let mut s = lock(&slots);
                    let slot = loop {
                        if let Some(free) = s.active.iter().position(|a| !a) {
                            break free;
                        }
                        s = freed.wait(s).unwrap_or_else(PoisonError::into_inner);
                    };
                    s.active[slot] = true;
                    s.running += 1;
                    s.peak = s.peak.max(s.running);
                    slot
                };

                if let Some(previous) = handles[slot].take() {
                    settle(previous);
                }

                let job = &job;
                let release = SlotRelease {
                    slots: &slots,
                    freed: &freed,
                    slot,
                };
                handles[slot] = Some(scope.spawn(move || {
                    let _release = release;
                    job(item);
                }));
                dispatched += 1;
            }

            for handle in handles.into_iter().flatten() {
                settle(handle);
            }
        });

        let peak_active = lock(&slots).peak;
        SchedulerStats {
            dispatched,
            completed: completed.into_inner(),
            panicked: panicked.into_inner(),
            peak_active,
        }
    }
}
