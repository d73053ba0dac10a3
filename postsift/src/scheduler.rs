//! Timers behind a trait, so debounce timing can run on tokio in production
//! and on a logical clock in tests.

use crate::session::runtime_handle;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    type Handle: Send;

    /// Run `task` once `delay` has elapsed, unless cancelled first.
    fn schedule(&self, delay: Duration, task: Task) -> Self::Handle;

    /// Cancel a scheduled task. Cancelling one that already ran is a no-op.
    fn cancel(&self, handle: Self::Handle);

    /// Run `task` without delay.
    fn run_now(&self, task: Task) {
        task();
    }
}

/// Scheduler on tokio timers. Tasks run on the blocking pool since they do
/// synchronous search work.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TokioScheduler {
    /// Uses the current runtime, or the process-wide fallback runtime.
    pub fn new() -> Self {
        Self { handle: runtime_handle() }
    }

    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for TokioScheduler {
    type Handle = tokio::task::JoinHandle<()>;

    fn schedule(&self, delay: Duration, task: Task) -> Self::Handle {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // Once the blocking task starts, aborting the timer no longer stops it.
            let _ = tokio::task::spawn_blocking(task).await;
        })
    }

    fn cancel(&self, handle: Self::Handle) {
        handle.abort();
    }

    fn run_now(&self, task: Task) {
        self.handle.spawn_blocking(task);
    }
}

/// Handle to a task on a [`ManualScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualHandle(u64);

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    queue: Vec<(Duration, u64, Task)>,
}

/// Logical-clock scheduler. Nothing runs until [`ManualScheduler::advance`]
/// moves the clock past a task's deadline. Clones share one clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = self.clock.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &clock.now)
            .field("pending", &clock.queue.len())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of scheduled tasks that have neither run nor been cancelled.
    pub fn pending(&self) -> usize {
        self.clock.lock().queue.len()
    }

    /// Move the clock forward, running every task that falls due in
    /// deadline order. Tasks may schedule more tasks; those run too if they
    /// fall due within the same advance.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.lock().now + by;
        loop {
            let task = {
                let mut clock = self.clock.lock();
                let next = clock
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, (due, _, _))| *due <= target)
                    .min_by_key(|(_, (due, id, _))| (*due, *id))
                    .map(|(idx, _)| idx);
                match next {
                    Some(idx) => {
                        let (due, _, task) = clock.queue.remove(idx);
                        clock.now = clock.now.max(due);
                        task
                    }
                    None => {
                        clock.now = target;
                        break;
                    }
                }
            };
            // Run outside the lock so the task can reschedule.
            task();
        }
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn schedule(&self, delay: Duration, task: Task) -> Self::Handle {
        let mut clock = self.clock.lock();
        let id = clock.next_id;
        clock.next_id += 1;
        let due = clock.now + delay;
        clock.queue.push((due, id, task));
        ManualHandle(id)
    }

    fn cancel(&self, handle: Self::Handle) {
        self.clock.lock().queue.retain(|(_, id, _)| *id != handle.0);
    }
}
