//! Import progress events
//!
//! Each import run gets a [`ProgressReporter`]. Every update is broadcast to
//! subscribers (the SSE endpoint) and kept as the run's latest snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, trace};
use utoipa::ToSchema;
use uuid::Uuid;

/// Finished runs kept around for late pollers
const MAX_FINISHED_SNAPSHOTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Validating,
    Parsing,
    Processing,
    Completed,
    Failed,
}

impl ImportStage {
    pub fn is_finished(&self) -> bool {
        matches!(self, ImportStage::Completed | ImportStage::Failed)
    }
}

/// Snapshot of one import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportProgress {
    pub import_id: Uuid,
    pub file_name: String,
    pub stage: ImportStage,
    /// 0 to 100, never decreasing within a run
    pub percentage: u8,
    pub message: String,
    pub processed_rows: usize,
    pub total_rows: usize,
    pub updated_at: DateTime<Utc>,
}

/// Registry and broadcaster of import progress
#[derive(Clone)]
pub struct ProgressService {
    broadcast_tx: broadcast::Sender<ImportProgress>,
    snapshots: Arc<RwLock<HashMap<Uuid, ImportProgress>>>,
}

impl ProgressService {
    pub fn new(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            broadcast_tx,
            snapshots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ImportProgress> {
        self.broadcast_tx.subscribe()
    }

    /// Register a new run and hand out its reporter
    pub fn start_import(&self, file_name: &str) -> ProgressReporter {
        let import_id = Uuid::new_v4();
        debug!(%import_id, file_name, "Tracking import progress");
        ProgressReporter {
            inner: Some(Arc::new(ReporterInner {
                import_id,
                file_name: file_name.to_string(),
                last_percentage: AtomicU8::new(0),
                service: self.clone(),
            })),
        }
    }

    /// Latest snapshot per run, most recent first
    pub async fn snapshots(&self) -> Vec<ImportProgress> {
        let mut all: Vec<ImportProgress> = self.snapshots.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }

    pub async fn get(&self, import_id: &Uuid) -> Option<ImportProgress> {
        self.snapshots.read().await.get(import_id).cloned()
    }

    async fn publish(&self, progress: ImportProgress) {
        {
            let mut snapshots = self.snapshots.write().await;
            snapshots.insert(progress.import_id, progress.clone());
            Self::prune_finished(&mut snapshots);
        }

        // No subscribers is fine
        if self.broadcast_tx.send(progress).is_err() {
            trace!("No progress subscribers");
        }
    }

    fn prune_finished(snapshots: &mut HashMap<Uuid, ImportProgress>) {
        let mut finished: Vec<(DateTime<Utc>, Uuid)> = snapshots
            .values()
            .filter(|p| p.stage.is_finished())
            .map(|p| (p.updated_at, p.import_id))
            .collect();
        if finished.len() <= MAX_FINISHED_SNAPSHOTS {
            return;
        }
        finished.sort();
        let excess = finished.len() - MAX_FINISHED_SNAPSHOTS;
        for (_, id) in finished.into_iter().take(excess) {
            snapshots.remove(&id);
        }
    }
}

impl Default for ProgressService {
    fn default() -> Self {
        Self::new(crate::config::defaults::DEFAULT_PROGRESS_CHANNEL_CAPACITY)
    }
}

struct ReporterInner {
    import_id: Uuid,
    file_name: String,
    last_percentage: AtomicU8,
    service: ProgressService,
}

/// Emission handle held by an import run
#[derive(Clone, Default)]
pub struct ProgressReporter {
    inner: Option<Arc<ReporterInner>>,
}

impl ProgressReporter {
    /// Reporter that drops every update
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn import_id(&self) -> Option<Uuid> {
        self.inner.as_ref().map(|inner| inner.import_id)
    }

    pub async fn report(
        &self,
        stage: ImportStage,
        percentage: u8,
        message: impl Into<String>,
        processed_rows: usize,
        total_rows: usize,
    ) {
        let Some(inner) = &self.inner else {
            return;
        };

        let requested = if stage == ImportStage::Completed {
            100
        } else {
            percentage.min(100)
        };
        let previous = inner.last_percentage.fetch_max(requested, Ordering::SeqCst);

        inner
            .service
            .publish(ImportProgress {
                import_id: inner.import_id,
                file_name: inner.file_name.clone(),
                stage,
                percentage: previous.max(requested),
                message: message.into(),
                processed_rows,
                total_rows,
                updated_at: Utc::now(),
            })
            .await;
    }

    /// Final failure event, keeping the percentage reached so far
    pub async fn fail(&self, message: impl Into<String>) {
        self.report(ImportStage::Failed, 0, message, 0, 0).await;
    }
}

/// Whole-number percentage of `done` over `total`, clamped to 100
pub fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}
