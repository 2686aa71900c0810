//! Control-plane execution context.
//!
//! Everything that mutates node state runs here: instantiation completions and
//! parameter-observer dispatch are posted as tasks and executed, in order, by
//! whichever thread drains the queue. That thread plays the role of the main
//! thread in a UI host.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

pub type ControlTask = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable, `Send` handle for posting onto a [`ControlQueue`].
#[derive(Clone)]
pub struct ControlHandle {
    tx: Sender<ControlTask>,
}

impl ControlHandle {
    /// Returns `false` if the queue is gone; the task is dropped.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(task)).is_ok()
    }
}

pub struct ControlQueue {
    tx: Sender<ControlTask>,
    rx: Receiver<ControlTask>,
}

impl Default for ControlQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run every task queued so far, including ones those tasks post.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for a task, then drain.
    pub fn run_pending_timeout(&self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                1 + self.run_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }
}
