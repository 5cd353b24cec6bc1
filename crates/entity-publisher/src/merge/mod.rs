use std::num::NonZeroUsize;

use tokio::sync::oneshot;

use crate::entity::{Batch, Entity};
use crate::queue::{Completion, DispatchQueue, SubmissionItem};
use crate::transport::TransportError;

/// A batch ready for the transport, tagged with who is waiting on it.
///
/// A sync submission always travels alone, so its batch carries exactly one
/// entity and exactly one completion.
pub(crate) enum PendingBatch {
    Sync {
        batch: Batch,
        completion: oneshot::Sender<Result<(), TransportError>>,
    },
    Async {
        batch: Batch,
    },
}

impl PendingBatch {
    pub fn batch(&self) -> &Batch {
        match self {
            PendingBatch::Sync { batch, .. } | PendingBatch::Async { batch } => batch,
        }
    }
}

/// Build one batch starting from `head`.
///
/// An async head absorbs the async items queued directly behind it, up to
/// `max_merge_size` entities in total. Merging stops at the first sync item,
/// which stays at the head of `queue`, and never waits for items that have
/// not arrived yet.
pub(crate) fn assemble(
    head: SubmissionItem,
    queue: &mut DispatchQueue,
    max_merge_size: NonZeroUsize,
) -> PendingBatch {
    let SubmissionItem { entity, completion } = head;
    match completion {
        Completion::Sync(completion) => PendingBatch::Sync {
            batch: Batch::single(entity),
            completion,
        },
        Completion::Async => {
            let max = max_merge_size.get();
            let mut entities: Vec<Entity> = Vec::with_capacity(max.min(16));
            entities.push(entity);
            while entities.len() < max {
                match queue.pop_next_if(SubmissionItem::is_async) {
                    Some(item) => entities.push(item.entity),
                    None => break,
                }
            }
            PendingBatch::Async {
                batch: entities.into(),
            }
        }
    }
}
