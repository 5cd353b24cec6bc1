use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error};

use crate::dispatcher::Dispatcher;
use crate::entity::Entity;
use crate::queue::{Enqueuer, SubmissionItem, dispatch_queue};
use crate::stats::{Stats, StatsSnapshot};
use crate::transport::{Transport, TransportError};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publisher client is not running")]
    ClientClosed,

    #[error("failed to deliver entities: {0}")]
    DeliveryFailed(#[source] TransportError),

    #[error("dispatcher exited before reporting delivery")]
    DispatcherGone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    New,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::New => write!(f, "new"),
            ClientState::Running => write!(f, "running"),
            ClientState::Stopping => write!(f, "stopping"),
            ClientState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Lifecycle and the producer half of the queue live under the same lock, so
/// a submission either lands in the queue before `stop` closes it or is
/// rejected. There is no window in between.
enum Lifecycle {
    New,
    Running { enqueuer: Enqueuer },
    Stopping,
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> ClientState {
        match self {
            Lifecycle::New => ClientState::New,
            Lifecycle::Running { .. } => ClientState::Running,
            Lifecycle::Stopping => ClientState::Stopping,
            Lifecycle::Stopped => ClientState::Stopped,
        }
    }
}

/// Publishes entities to a collector through a single background dispatcher.
///
/// Cloning is cheap and every clone drives the same dispatcher. Sync
/// submissions (`put_entity`, `put_entity_blocking`) wait for their own
/// delivery and report its outcome. Async submissions (`put_entity_async`)
/// return as soon as the entity is queued; a later delivery failure is logged
/// and counted in [`stats`](Self::stats), never returned.
pub struct Client<T: Transport> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    transport: Arc<T>,
    max_merge_size: NonZeroUsize,
    stats: Arc<Stats>,
    lifecycle: Mutex<Lifecycle>,
    /// Flips to `true` once no dispatcher is left to drain the queue.
    drained: watch::Sender<bool>,
}

impl<T> Shared<T> {
    /// Complete a stop whose drain has finished. A client whose dispatcher
    /// died while Running stays Running until `stop` is called.
    fn finish_stopping(&self) {
        let mut lifecycle = self.lifecycle.lock().unwrap();
        if matches!(*lifecycle, Lifecycle::Stopping) {
            *lifecycle = Lifecycle::Stopped;
            debug!("publisher client stopped");
        }
    }
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, max_merge_size: NonZeroUsize) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport: Arc::new(transport),
                max_merge_size,
                stats: Arc::new(Stats::new()),
                lifecycle: Mutex::new(Lifecycle::New),
                drained: watch::Sender::new(false),
            }),
        }
    }

    /// Spawn the dispatcher on the current tokio runtime.
    ///
    /// Calling `start` on a running client does nothing. A client that has
    /// been stopped cannot be restarted.
    pub fn start(&self) -> Result<(), PublishError> {
        let mut lifecycle = self.shared.lifecycle.lock().unwrap();
        match *lifecycle {
            Lifecycle::New => {}
            Lifecycle::Running { .. } => return Ok(()),
            Lifecycle::Stopping | Lifecycle::Stopped => return Err(PublishError::ClientClosed),
        }

        let (enqueuer, queue) = dispatch_queue();
        let dispatcher = Dispatcher::new(
            queue,
            Arc::clone(&self.shared.transport),
            Arc::clone(&self.shared.stats),
            self.shared.max_merge_size,
        );
        let dispatcher = tokio::spawn(dispatcher.run());

        // Owns the Stopping -> Stopped transition, whether or not a `stop`
        // caller is still waiting. Holds the client weakly: dropping every
        // `Client` drops the enqueuer, which ends the dispatcher.
        let shared = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            if let Err(e) = dispatcher.await {
                error!(error = %e, "dispatcher task panicked");
            }
            if let Some(shared) = shared.upgrade() {
                shared.finish_stopping();
                shared.drained.send_replace(true);
            }
        });

        *lifecycle = Lifecycle::Running { enqueuer };
        debug!(
            max_merge_size = self.shared.max_merge_size.get(),
            "publisher client started"
        );
        Ok(())
    }

    /// Reject new submissions, then wait until everything already queued has
    /// been dispatched and the dispatcher has exited.
    ///
    /// Every caller of `stop` returns only once the client is fully stopped.
    /// Dropping the returned future does not interrupt the drain.
    pub async fn stop(&self) {
        {
            let mut lifecycle = self.shared.lifecycle.lock().unwrap();
            match *lifecycle {
                Lifecycle::New => {
                    *lifecycle = Lifecycle::Stopped;
                    self.shared.drained.send_replace(true);
                    return;
                }
                Lifecycle::Running { .. } => {
                    debug!("publisher client stopping, draining queued entities");
                    // Dropping the last producer lets the dispatcher exit once the queue is empty.
                    *lifecycle = Lifecycle::Stopping;
                }
                Lifecycle::Stopping | Lifecycle::Stopped => {}
            }
        }

        let mut drained = self.shared.drained.subscribe();
        let _ = drained.wait_for(|done| *done).await;
        // Only still Stopping if the dispatcher had already died before this call.
        self.shared.finish_stopping();
    }

    /// Submit `entity` and wait until the dispatcher has tried to deliver it.
    ///
    /// The entity is sent on its own, after everything queued before it.
    pub async fn put_entity(&self, entity: Entity) -> Result<(), PublishError> {
        let (item, delivered) = SubmissionItem::sync(entity);
        self.enqueue(item)?;
        Self::delivery_outcome(delivered.await)
    }

    /// Same as [`put_entity`](Self::put_entity) for callers on plain OS threads.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn put_entity_blocking(&self, entity: Entity) -> Result<(), PublishError> {
        let (item, delivered) = SubmissionItem::sync(entity);
        self.enqueue(item)?;
        Self::delivery_outcome(delivered.blocking_recv())
    }

    /// Queue `entity` and return immediately. It may be merged with other
    /// async entities queued around it.
    pub fn put_entity_async(&self, entity: Entity) -> Result<(), PublishError> {
        self.enqueue(SubmissionItem::asynchronous(entity))
    }

    pub fn state(&self) -> ClientState {
        self.shared.lifecycle.lock().unwrap().state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    fn enqueue(&self, item: SubmissionItem) -> Result<(), PublishError> {
        let lifecycle = self.shared.lifecycle.lock().unwrap();
        match &*lifecycle {
            Lifecycle::Running { enqueuer, .. } => enqueuer
                .send(item)
                .map_err(|_| PublishError::DispatcherGone),
            other => {
                debug!(state = %other.state(), "rejecting submission");
                Err(PublishError::ClientClosed)
            }
        }
    }

    fn delivery_outcome(
        delivered: Result<Result<(), TransportError>, oneshot::error::RecvError>,
    ) -> Result<(), PublishError> {
        match delivered {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PublishError::DeliveryFailed(e)),
            Err(_) => Err(PublishError::DispatcherGone),
        }
    }
}
