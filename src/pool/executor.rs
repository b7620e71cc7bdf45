use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("task pool is stopped")]
    Stopped,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task was dropped before completion")]
    Cancelled,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Queue and running flag share one mutex: a submitter must observe the
/// flag and enqueue under the same critical section, or a stopping pool
/// could accept a task no worker will ever see.
struct PoolState {
    queue: VecDeque<Job>,
    running: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    available: Condvar,
}

/// Completion side of a submitted task.
///
/// The result arrives on a one-shot channel, so the same handle works for
/// async callers (`join().await`) and synchronous ones (`wait()`).
pub struct TaskHandle<R> {
    receiver: oneshot::Receiver<Result<R, TaskError>>,
}

impl<R> TaskHandle<R> {
    pub async fn join(self) -> Result<R, TaskError> {
        self.receiver.await.unwrap_or(Err(TaskError::Cancelled))
    }

    /// Blocking variant of [`join`](Self::join). Must not be called from
    /// the async runtime.
    pub fn wait(self) -> Result<R, TaskError> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(TaskError::Cancelled))
    }
}

pub struct TaskPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskPool {
    /// Spawns `num_threads` workers (at least one).
    pub fn new(num_threads: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue: VecDeque::new(),
                running: true,
            }),
            available: Condvar::new(),
        });

        let workers = (0..num_threads.max(1))
            .map(|worker_id| {
                let shared = shared.clone();
                std::thread::spawn(move || worker_loop(&shared, worker_id))
            })
            .collect();

        Self { shared, workers }
    }

    /// Enqueues a task and returns its completion handle.
    ///
    /// Fails fast with [`SubmitError::Stopped`] once the pool has been
    /// stopped. A panic inside `task` completes the handle with
    /// [`TaskError::Panicked`] instead of unwinding the worker.
    pub fn submit<F, R>(&self, task: F) -> Result<TaskHandle<R>, SubmitError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let job: Job = Box::new(move || {
            let outcome = catch_unwind(AssertUnwindSafe(task))
                .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
            // The submitter may have dropped its handle; that is not our
            // problem to report.
            let _ = sender.send(outcome);
        });

        {
            let mut state = self.shared.state.lock().expect("pool mutex poisoned");
            if !state.running {
                return Err(SubmitError::Stopped);
            }
            state.queue.push_back(job);
        }
        self.shared.available.notify_one();

        Ok(TaskHandle { receiver })
    }

    /// Signals the workers to finish the queued tasks and exit. Idempotent;
    /// further submissions fail immediately.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock().expect("pool mutex poisoned");
            state.running = false;
        }
        self.shared.available.notify_all();
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.stop();
        for worker in self.workers.drain(..) {
            if let Err(payload) = worker.join() {
                tracing::error!("Pool worker exited abnormally: {}", panic_message(payload.as_ref()));
            }
        }
    }
}

fn worker_loop(shared: &Shared, worker_id: usize) {
    tracing::debug!("Pool worker {} started", worker_id);
    loop {
        let job = {
            let mut state = shared.state.lock().expect("pool mutex poisoned");
            loop {
                if let Some(job) = state.queue.pop_front() {
                    break job;
                }
                if !state.running {
                    tracing::debug!("Pool worker {} exiting", worker_id);
                    return;
                }
                state = shared
                    .available
                    .wait(state)
                    .expect("pool mutex poisoned");
            }
        };
        // Run outside the lock so other workers keep dequeuing.
        job();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
