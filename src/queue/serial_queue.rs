//! FIFO task queue with a single task in flight

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error};

/// Number of events a slow subscriber may fall behind before it starts lagging
const EVENT_CAPACITY: usize = 256;

/// Signals broadcast by a [`SerialQueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent<T> {
    /// A task resolved successfully with this value
    Completed(T),
    /// The last pending task settled and the backlog is empty
    Empty,
}

/// Why a queued task produced no value
#[derive(Debug, Error)]
pub enum QueueError<E> {
    /// The task itself failed
    #[error("{0}")]
    Task(E),

    /// The task panicked; the queue keeps running
    #[error("queued task panicked: {0}")]
    Panicked(String),

    /// The worker stopped before the task could run
    #[error("queue worker is no longer running")]
    Closed,
}

type Job<T, E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>;

struct Entry<T, E> {
    job: Job<T, E>,
    reply: oneshot::Sender<Result<T, QueueError<E>>>,
}

/// Runs asynchronous tasks strictly one after another, in the order they were added.
///
/// Each [`add`](Self::add) call gets its own task's outcome back. A failing or
/// panicking task only affects its own caller; the next task still runs.
/// Subscribers see a [`QueueEvent::Completed`] per successful task and one
/// [`QueueEvent::Empty`] every time the pending count drops back to zero.
///
/// The worker is a Tokio task, so the queue must be created inside a runtime.
/// Dropping the queue lets the worker finish what was already added, then stop.
pub struct SerialQueue<T, E> {
    sender: mpsc::UnboundedSender<Entry<T, E>>,
    events: broadcast::Sender<QueueEvent<T>>,
    pending: Arc<AtomicUsize>,
}

impl<T, E> SerialQueue<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let pending = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_worker(receiver, events.clone(), Arc::clone(&pending)));

        Self {
            sender,
            events,
            pending,
        }
    }

    /// Append `task` to the queue.
    ///
    /// The task is enqueued immediately, so submission order is call order even
    /// if the returned futures are awaited in a different order or not at all.
    pub fn add<F, Fut>(&self, task: F) -> BoxFuture<'static, Result<T, QueueError<E>>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (reply, outcome) = oneshot::channel();
        let job: Job<T, E> = Box::new(move || task().boxed());

        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(Entry { job, reply }).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }

        async move { outcome.await.unwrap_or(Err(QueueError::Closed)) }.boxed()
    }

    /// Tasks added but not yet settled, including the one in flight
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent<T>> {
        self.events.subscribe()
    }
}

impl<T, E> Default for SerialQueue<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

async fn run_worker<T, E>(
    mut receiver: mpsc::UnboundedReceiver<Entry<T, E>>,
    events: broadcast::Sender<QueueEvent<T>>,
    pending: Arc<AtomicUsize>,
) where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    while let Some(Entry { job, reply }) = receiver.recv().await {
        let outcome = match AssertUnwindSafe(async move { job().await })
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => {
                // No subscribers is not an error
                let _ = events.send(QueueEvent::Completed(value.clone()));
                Ok(value)
            }
            Ok(Err(e)) => Err(QueueError::Task(e)),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(panic = %message, "Queued task panicked");
                Err(QueueError::Panicked(message))
            }
        };

        // The caller may have stopped waiting
        let _ = reply.send(outcome);

        if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            debug!("Queue drained");
            let _ = events.send(QueueEvent::Empty);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
