//! Worker-pool abstraction. The selector only needs `queue` plus a way to
//! drain outstanding work: pools that can block until idle advertise
//! `supports_wait_done`; for the rest the selector falls back to its
//! countdown barrier.

use parking_lot::{Condvar, Mutex};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// WorkerPool trait
// ---------------------------------------------------------------------------

pub trait WorkerPool: Send + Sync {
    fn queue(&self, task: Task);

    /// Whether `wait_done` blocks until every queued task has finished.
    fn supports_wait_done(&self) -> bool {
        false
    }

    fn wait_done(&self) {}

    /// Return thread resources. Queuing after shutdown is a caller bug.
    fn shutdown(&self);
}

// ---------------------------------------------------------------------------
// RayonPool — the internal pool
// ---------------------------------------------------------------------------

/// Adapter over a dedicated rayon pool sized to the available processors.
/// Rayon has no drain primitive, so `supports_wait_done` stays false and the
/// selector's barrier does the waiting.
pub struct RayonPool {
    pool: rayon::ThreadPool,
}

impl RayonPool {
    pub fn new(n_workers: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_workers)
            .thread_name(|i| format!("leaf-select-{i}"))
            .build()?;
        Ok(Self { pool })
    }
}

impl WorkerPool for RayonPool {
    fn queue(&self, task: Task) {
        self.pool.spawn(move || task());
    }

    fn shutdown(&self) {
        // Threads join when the pool drops; nothing to do eagerly.
    }
}

// ---------------------------------------------------------------------------
// InlinePool — run-on-caller variant
// ---------------------------------------------------------------------------

/// Executes tasks synchronously on the queueing thread. There is never
/// outstanding work, so `wait_done` is trivially supported. Used by
/// deterministic tests and single-threaded embeddings.
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn queue(&self, task: Task) {
        task();
    }

    fn supports_wait_done(&self) -> bool {
        true
    }

    fn shutdown(&self) {}
}

// ---------------------------------------------------------------------------
// Countdown — batchlet completion barrier
// ---------------------------------------------------------------------------

/// Countdown barrier seeded to 1. The seed keeps the count positive while
/// the root descent is still dispatching; `wait_done` retires it, blocks
/// until every dispatched visit has been signaled back, then re-arms.
pub struct Countdown {
    pending: Mutex<u64>,
    idle: Condvar,
}

impl Countdown {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(1),
            idle: Condvar::new(),
        }
    }

    pub fn add(&self, n: u64) {
        *self.pending.lock() += n;
    }

    pub fn signal(&self, n: u64) {
        let mut pending = self.pending.lock();
        debug_assert!(*pending >= n, "countdown signal past zero");
        *pending -= n;
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    /// Block until all added work has been signaled, then re-arm the seed
    /// for the next batchlet.
    pub fn wait_done(&self) {
        let mut pending = self.pending.lock();
        debug_assert!(*pending >= 1, "countdown seed missing");
        *pending -= 1;
        while *pending != 0 {
            self.idle.wait(&mut pending);
        }
        *pending = 1;
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
