use crate::indexer::Indexer;
use crate::models::{ContentStatus, ObjectType};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Content lifecycle notification emitted by the CMS
#[derive(Debug, Clone)]
pub enum ContentEvent {
    /// An object was created or updated (including status transitions)
    Changed {
        object_id: u64,
        object_type: ObjectType,
        new_status: ContentStatus,
    },
    /// An object was deleted at the source
    Deleted {
        object_id: u64,
        object_type: ObjectType,
    },
}

/// Non-blocking hand-off for content lifecycle events. The producing caller
/// (the CMS write path) never waits on indexing work.
#[derive(Clone)]
pub struct ContentEventSender {
    tx: mpsc::UnboundedSender<ContentEvent>,
}

impl ContentEventSender {
    pub fn on_object_changed(
        &self,
        object_id: u64,
        object_type: ObjectType,
        new_status: ContentStatus,
    ) {
        self.send(ContentEvent::Changed {
            object_id,
            object_type,
            new_status,
        });
    }

    pub fn on_object_deleted(&self, object_id: u64, object_type: ObjectType) {
        self.send(ContentEvent::Deleted {
            object_id,
            object_type,
        });
    }

    fn send(&self, event: ContentEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Index worker is down; content event dropped");
        }
    }
}

/// Asynchronous worker that applies content events to the index
pub struct IndexWorker;

impl IndexWorker {
    /// Spawn the worker task and return the event sender handed to the CMS
    pub fn spawn(indexer: Arc<Indexer>) -> (ContentEventSender, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ContentEvent>();

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    ContentEvent::Changed {
                        object_id,
                        object_type,
                        new_status,
                    } => {
                        tracing::debug!(
                            object_id,
                            object_type = %object_type,
                            new_status = %new_status,
                            "Applying content change event"
                        );
                        if let Err(e) = indexer.upsert(object_id, object_type).await {
                            tracing::warn!(
                                object_id,
                                object_type = %object_type,
                                error = %e,
                                "Failed to apply content change event"
                            );
                        }
                    }
                    ContentEvent::Deleted {
                        object_id,
                        object_type,
                    } => {
                        if let Err(e) = indexer.remove(object_id, object_type).await {
                            tracing::warn!(
                                object_id,
                                object_type = %object_type,
                                error = %e,
                                "Failed to apply content delete event"
                            );
                        }
                    }
                }
            }
            tracing::info!("Index worker stopped: event channel closed");
        });

        (ContentEventSender { tx }, handle)
    }
}
