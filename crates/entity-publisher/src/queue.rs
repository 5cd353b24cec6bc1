use tokio::sync::{mpsc, oneshot};

use crate::entity::Entity;
use crate::transport::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Sync,
    Async,
}

/// How the dispatcher reports back once an item has been sent.
pub(crate) enum Completion {
    /// A caller is parked on the receiving half until the transport returns.
    Sync(oneshot::Sender<Result<(), TransportError>>),
    Async,
}

pub(crate) struct SubmissionItem {
    pub entity: Entity,
    pub completion: Completion,
}

impl SubmissionItem {
    pub fn sync(entity: Entity) -> (Self, oneshot::Receiver<Result<(), TransportError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                entity,
                completion: Completion::Sync(tx),
            },
            rx,
        )
    }

    pub fn asynchronous(entity: Entity) -> Self {
        Self {
            entity,
            completion: Completion::Async,
        }
    }

    pub fn mode(&self) -> Mode {
        match self.completion {
            Completion::Sync(_) => Mode::Sync,
            Completion::Async => Mode::Async,
        }
    }

    pub fn is_async(&self) -> bool {
        self.mode() == Mode::Async
    }
}

/// Producer half. Pushing never blocks; it only fails once the dispatcher is gone.
pub(crate) type Enqueuer = mpsc::UnboundedSender<SubmissionItem>;

/// Consumer half of the dispatch queue, owned by the dispatcher.
///
/// The channel itself cannot be peeked, so an item rejected by
/// [`pop_next_if`](Self::pop_next_if) is parked in `held` and handed out first
/// on the next pop. Logically it never left the head of the queue.
pub(crate) struct DispatchQueue {
    rx: mpsc::UnboundedReceiver<SubmissionItem>,
    held: Option<SubmissionItem>,
}

pub(crate) fn dispatch_queue() -> (Enqueuer, DispatchQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, DispatchQueue { rx, held: None })
}

impl DispatchQueue {
    /// Wait for the next item. Returns `None` once every [`Enqueuer`] has been
    /// dropped and nothing is left to drain.
    pub async fn pop_next(&mut self) -> Option<SubmissionItem> {
        if let Some(item) = self.held.take() {
            return Some(item);
        }
        self.rx.recv().await
    }

    /// Pop the head only if it is already queued and satisfies `accept`.
    /// Never waits.
    pub fn pop_next_if(
        &mut self,
        accept: impl FnOnce(&SubmissionItem) -> bool,
    ) -> Option<SubmissionItem> {
        let item = match self.held.take() {
            Some(item) => item,
            None => self.rx.try_recv().ok()?,
        };
        if accept(&item) {
            Some(item)
        } else {
            self.held = Some(item);
            None
        }
    }
}
