use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{debug, error};

use crate::merge::{self, PendingBatch};
use crate::queue::DispatchQueue;
use crate::stats::Stats;
use crate::transport::Transport;

/// The single consumer of a client's dispatch queue.
///
/// Runs until the queue reports that every producer handle is gone and nothing
/// is left to drain. Transport calls are issued one at a time, so batches reach
/// the collector in the order their entities were enqueued.
pub(crate) struct Dispatcher<T: Transport> {
    queue: DispatchQueue,
    transport: Arc<T>,
    stats: Arc<Stats>,
    max_merge_size: NonZeroUsize,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(
        queue: DispatchQueue,
        transport: Arc<T>,
        stats: Arc<Stats>,
        max_merge_size: NonZeroUsize,
    ) -> Self {
        Self {
            queue,
            transport,
            stats,
            max_merge_size,
        }
    }

    pub async fn run(mut self) {
        debug!(max_merge_size = self.max_merge_size.get(), "dispatcher started");
        while let Some(head) = self.queue.pop_next().await {
            let pending = merge::assemble(head, &mut self.queue, self.max_merge_size);
            self.dispatch(pending).await;
        }
        debug!("dispatch queue drained, dispatcher exiting");
    }

    async fn dispatch(&self, pending: PendingBatch) {
        debug!(entities = pending.batch().len(), "sending entities");
        match pending {
            PendingBatch::Sync { batch, completion } => {
                let result = self.transport.send(&batch).await;
                match &result {
                    Ok(()) => self.stats.record_sent(batch.len()),
                    Err(_) => self.stats.record_sync_failure(),
                }
                // The caller may have stopped waiting; the outcome is theirs to lose.
                let _ = completion.send(result);
            }
            PendingBatch::Async { batch } => {
                match self.transport.send(&batch).await {
                    Ok(()) => self.stats.record_sent(batch.len()),
                    Err(e) => {
                        self.stats.record_async_failure(batch.len());
                        error!(
                            error = %e,
                            entities = batch.len(),
                            first_id = batch.ids().next().unwrap_or_default(),
                            "failed to publish async entities"
                        );
                    }
                }
            }
        }
    }
}
