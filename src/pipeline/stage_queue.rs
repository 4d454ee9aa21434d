//! Bounded-concurrency FIFO task runner.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::Notify;
use tracing::{debug, error};

/// Opaque unit of work. The queue only observes whether it failed.
pub type QueueTask = BoxFuture<'static, anyhow::Result<()>>;

struct QueueState {
    pending: VecDeque<QueueTask>,
    running: usize,
}

/// Runs submitted tasks in submission order, at most `concurrency` at a
/// time. A failing or panicking task never stops the queue.
pub struct StageQueue {
    name: &'static str,
    concurrency: usize,
    state: Mutex<QueueState>,
    idle: Notify,
}

impl StageQueue {
    pub fn new(name: &'static str, concurrency: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            concurrency: concurrency.max(1),
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                running: 0,
            }),
            idle: Notify::new(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Append a task and start it right away if a slot is free.
    /// Must be called from within a tokio runtime.
    pub fn submit(self: &Arc<Self>, task: QueueTask) {
        self.state.lock().unwrap().pending.push_back(task);
        self.pump();
    }

    /// Number of tasks waiting for a slot.
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    /// Number of tasks currently running.
    pub fn running(&self) -> usize {
        self.state.lock().unwrap().running
    }

    /// Resolves once nothing is pending or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            {
                let state = self.state.lock().unwrap();
                if state.running == 0 && state.pending.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }

    fn pump(self: &Arc<Self>) {
        loop {
            let task = {
                let mut state = self.state.lock().unwrap();
                if state.running >= self.concurrency {
                    break;
                }
                let Some(task) = state.pending.pop_front() else {
                    break;
                };
                state.running += 1;
                crate::metrics::set_stage_depth(self.name, state.pending.len(), state.running);
                task
            };

            let queue = self.clone();
            tokio::spawn(async move {
                match AssertUnwindSafe(task).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("{} task failed: {:#}", queue.name, e),
                    Err(_) => error!("{} task panicked", queue.name),
                }
                queue.finish();
            });
        }
    }

    fn finish(self: &Arc<Self>) {
        let now_idle = {
            let mut state = self.state.lock().unwrap();
            state.running -= 1;
            crate::metrics::set_stage_depth(self.name, state.pending.len(), state.running);
            state.running == 0 && state.pending.is_empty()
        };
        if now_idle {
            debug!("{} queue drained", self.name);
            self.idle.notify_waiters();
        }
        self.pump();
    }
}
