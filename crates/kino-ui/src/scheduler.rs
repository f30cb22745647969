//! Deferral until the next paint
//!
//! Some notifications (the "configured" signal of a freshly mounted layout)
//! must only fire once the layout has real dimensions. [`FrameScheduler`]
//! abstracts "run after the next render pass"; any primitive that runs the
//! task later, on the same thread, satisfies it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// Deferred unit of work
pub type Task = Box<dyn FnOnce()>;

/// Runs tasks after the next render/layout pass
pub trait FrameScheduler {
    fn after_next_paint(&self, task: Task);
}

/// Frame queue driven by the embedder.
///
/// Tasks wait until [`DeferredQueue::run_pending`] is called, which the host
/// does once per rendered frame.
#[derive(Default)]
pub struct DeferredQueue {
    tasks: RefCell<VecDeque<Task>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting for the next frame
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run the tasks queued so far. Tasks they schedule wait for the next call.
    pub fn run_pending(&self) -> usize {
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        let count = tasks.len();
        for task in tasks {
            task();
        }
        if count > 0 {
            debug!(tasks = count, "Frame tasks run");
        }
        count
    }
}

impl FrameScheduler for DeferredQueue {
    fn after_next_paint(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Scheduler for hosts running on a tokio `LocalSet`.
///
/// The task is spawned as a local task that yields once before running, so
/// it never runs inside the call that scheduled it. Must be used from within
/// a `LocalSet` context.
#[cfg(feature = "tokio-scheduler")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTaskScheduler;

#[cfg(feature = "tokio-scheduler")]
impl FrameScheduler for LocalTaskScheduler {
    fn after_next_paint(&self, task: Task) {
        tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}
