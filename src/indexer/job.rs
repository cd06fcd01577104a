use crate::indexer::{IndexError, Indexer};
use crate::models::ObjectType;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Which object types a rebuild covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildTarget {
    All,
    Post,
    Comment,
    User,
}

impl RebuildTarget {
    pub fn types(&self) -> Vec<ObjectType> {
        match self {
            RebuildTarget::All => ObjectType::ALL.to_vec(),
            RebuildTarget::Post => vec![ObjectType::Post],
            RebuildTarget::Comment => vec![ObjectType::Comment],
            RebuildTarget::User => vec![ObjectType::User],
        }
    }
}

impl FromStr for RebuildTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(RebuildTarget::All),
            "post" => Ok(RebuildTarget::Post),
            "comment" => Ok(RebuildTarget::Comment),
            "user" => Ok(RebuildTarget::User),
            other => Err(format!("unknown rebuild target: {other}")),
        }
    }
}

/// Options for a rebuild job
#[derive(Debug, Clone, Default)]
pub struct RebuildOptions {
    /// Batch size override; falls back to the configured default
    pub batch_size: Option<usize>,
    /// Clear existing entries of the target type(s) and restart from zero
    /// instead of resuming from a committed cursor
    pub clear_first: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Rebuild,
    Optimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

/// Progress snapshot for a long-running maintenance job
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub state: JobState,
    pub processed: u64,
    pub total: u64,
    pub errors: u64,
    pub message: Option<String>,
}

impl JobProgress {
    fn pending() -> Self {
        Self {
            state: JobState::Pending,
            processed: 0,
            total: 0,
            errors: 0,
            message: None,
        }
    }
}

/// Handle to a spawned maintenance job: poll progress, request cancellation
#[derive(Clone)]
pub struct JobHandle {
    pub id: Uuid,
    pub kind: JobKind,
    progress: watch::Receiver<JobProgress>,
    cancel: Arc<AtomicBool>,
}

impl JobHandle {
    pub fn progress(&self) -> JobProgress {
        self.progress.borrow().clone()
    }

    /// Request cancellation; the job stops before its next batch
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Wait until the job reaches a terminal state
    pub async fn wait(&self) -> JobProgress {
        let mut rx = self.progress.clone();
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if snapshot.state.is_terminal() {
                return snapshot;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}

/// Registry of maintenance jobs for progress polling over the admin API
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<Uuid, JobHandle>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: JobHandle) -> Uuid {
        let id = handle.id;
        self.jobs.insert(id, handle);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<JobHandle> {
        self.jobs.get(id).map(|h| h.clone())
    }
}

pub(super) struct ProgressTracker {
    tx: watch::Sender<JobProgress>,
    processed: u64,
    total: u64,
    errors: u64,
}

impl ProgressTracker {
    fn new(tx: watch::Sender<JobProgress>) -> Self {
        Self {
            tx,
            processed: 0,
            total: 0,
            errors: 0,
        }
    }

    fn publish(&self, state: JobState, message: Option<String>) {
        self.tx.send_replace(JobProgress {
            state,
            processed: self.processed,
            total: self.total,
            errors: self.errors,
            message,
        });
    }
}

impl Indexer {
    /// Spawn a resumable batched rebuild. The job holds no long-lived lock:
    /// ordinary reads and live upserts proceed while it runs, and a rebuild
    /// racing a live upsert on the same key is resolved by `modified_at`
    /// comparison in the store.
    pub fn spawn_rebuild(&self, target: RebuildTarget, options: RebuildOptions) -> JobHandle {
        let (tx, rx) = watch::channel(JobProgress::pending());
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = JobHandle {
            id: Uuid::new_v4(),
            kind: JobKind::Rebuild,
            progress: rx,
            cancel: cancel.clone(),
        };

        let indexer = self.clone();
        let job_id = handle.id;
        tokio::spawn(async move {
            tracing::info!(job_id = %job_id, ?target, "Rebuild started");
            indexer.run_rebuild(target, options, tx, cancel).await;
        });

        handle
    }

    /// Spawn an optimize job: orphan cleanup followed by store compaction
    pub fn spawn_optimize(&self) -> JobHandle {
        let (tx, rx) = watch::channel(JobProgress::pending());
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = JobHandle {
            id: Uuid::new_v4(),
            kind: JobKind::Optimize,
            progress: rx,
            cancel: cancel.clone(),
        };

        let indexer = self.clone();
        let job_id = handle.id;
        tokio::spawn(async move {
            tracing::info!(job_id = %job_id, "Optimize started");
            let mut tracker = ProgressTracker::new(tx);
            tracker.total = indexer.store().len() as u64;
            tracker.publish(JobState::Running, None);

            match indexer.optimize_inner(&cancel, Some(&mut tracker)).await {
                Ok(removed) => {
                    if cancel.load(Ordering::SeqCst) {
                        tracker.publish(JobState::Cancelled, None);
                    } else {
                        tracker.publish(
                            JobState::Completed,
                            Some(format!("removed {removed} orphaned entries")),
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Optimize failed");
                    tracker.publish(JobState::Failed, Some(e.to_string()));
                }
            }
        });

        handle
    }

    async fn run_rebuild(
        &self,
        target: RebuildTarget,
        options: RebuildOptions,
        tx: watch::Sender<JobProgress>,
        cancel: Arc<AtomicBool>,
    ) {
        let batch_size = options.batch_size.unwrap_or(self.config().batch_size).max(1);
        let types = target.types();
        let mut tracker = ProgressTracker::new(tx);

        for object_type in &types {
            match self.content().count_objects(*object_type).await {
                Ok(count) => tracker.total += count,
                Err(e) => {
                    tracing::error!(error = %e, "Rebuild aborted: cannot enumerate source");
                    tracker.publish(JobState::Failed, Some(e.to_string()));
                    return;
                }
            }
        }
        tracker.publish(JobState::Running, None);

        for object_type in types {
            if options.clear_first {
                if let Err(e) = self
                    .store()
                    .clear_type(object_type)
                    .and_then(|_| self.store().set_rebuild_cursor(object_type, 0))
                {
                    tracker.publish(JobState::Failed, Some(e.to_string()));
                    return;
                }
            }

            let mut offset = self.store().rebuild_cursor(object_type);
            // Work committed by an earlier interrupted run counts as done
            tracker.processed += offset;

            loop {
                if cancel.load(Ordering::SeqCst) {
                    tracing::info!(object_type = %object_type, offset, "Rebuild cancelled");
                    tracker.publish(JobState::Cancelled, None);
                    return;
                }

                let ids = match self
                    .content()
                    .list_objects(object_type, offset, batch_size)
                    .await
                {
                    Ok(ids) => ids,
                    Err(e) => {
                        tracing::error!(error = %e, "Rebuild aborted: batch listing failed");
                        tracker.publish(JobState::Failed, Some(e.to_string()));
                        return;
                    }
                };
                if ids.is_empty() {
                    break;
                }

                for id in &ids {
                    match self.upsert(*id, object_type).await {
                        Ok(_) => {}
                        Err(e) if e.is_per_item() => {
                            tracker.errors += 1;
                            tracing::warn!(
                                object_id = id,
                                object_type = %object_type,
                                error = %e,
                                "Skipping unindexable object"
                            );
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Rebuild aborted: store write failed");
                            tracker.publish(JobState::Failed, Some(e.to_string()));
                            return;
                        }
                    }
                    tracker.processed += 1;
                }

                offset += ids.len() as u64;
                // Commit the cursor only after the whole batch landed, so a
                // resumed rebuild never duplicates work
                if let Err(e) = self.store().set_rebuild_cursor(object_type, offset) {
                    tracker.publish(JobState::Failed, Some(e.to_string()));
                    return;
                }
                tracker.publish(JobState::Running, None);
            }

            if let Err(e) = self.store().clear_rebuild_cursor(object_type) {
                tracker.publish(JobState::Failed, Some(e.to_string()));
                return;
            }
        }

        tracing::info!(
            processed = tracker.processed,
            errors = tracker.errors,
            "Rebuild completed"
        );
        tracker.publish(JobState::Completed, None);
    }

    pub(super) async fn optimize_inner(
        &self,
        cancel: &AtomicBool,
        mut tracker: Option<&mut ProgressTracker>,
    ) -> Result<u64, IndexError> {
        let mut removed = 0;
        let chunk = self.config().batch_size.max(1);

        for keys in self.store().keys().chunks(chunk) {
            if cancel.load(Ordering::SeqCst) {
                return Ok(removed);
            }
            for key in keys {
                let exists = self
                    .content()
                    .object_exists(key.object_id, key.object_type)
                    .await?;
                if !exists && self.store().remove(key)? {
                    removed += 1;
                    tracing::debug!(key = %key, "Removed orphaned entry");
                }
                if let Some(t) = tracker.as_deref_mut() {
                    t.processed += 1;
                }
            }
            if let Some(t) = tracker.as_deref_mut() {
                t.publish(JobState::Running, None);
            }
        }

        self.store().compact()?;
        tracing::info!(removed, "Optimize completed");
        Ok(removed)
    }
}
