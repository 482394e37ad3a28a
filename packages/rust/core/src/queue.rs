//! Background execution of pipeline runs.
//!
//! [`RunQueue::submit`] spawns a run and returns a [`RunHandle`] right away.
//! The handle can be awaited or dropped; either way the run proceeds to
//! completion and its final status lands in the queue's registry, which
//! keeps the most recent finished runs for inspection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use topicdesk_shared::{ResearchTopic, Result, TopicDeskError};

use crate::pipeline::{Pipeline, RunProgress, RunReport, Stage};

/// Number of finished runs kept in the registry.
const MAX_FINISHED_RUNS: usize = 256;

/// Time-sortable run identifier.
pub type RunId = Uuid;

/// Where a run currently is.
#[derive(Debug, Clone)]
pub enum RunStatus {
    /// Scheduled or executing; `stage` is the stage last entered.
    Running { stage: Option<Stage> },
    Completed(RunReport),
    Failed(String),
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running { .. })
    }
}

/// Registry entry for one run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub topic: ResearchTopic,
    pub submitted_at: DateTime<Utc>,
    pub status: RunStatus,
}

#[derive(Default)]
struct RegistryInner {
    runs: HashMap<RunId, RunRecord>,
    finished: VecDeque<RunId>,
}

#[derive(Default)]
struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, id: RunId, topic: ResearchTopic) {
        self.lock().runs.insert(
            id,
            RunRecord {
                topic,
                submitted_at: Utc::now(),
                status: RunStatus::Running { stage: None },
            },
        );
    }

    fn set_stage(&self, id: RunId, stage: Stage) {
        if let Some(record) = self.lock().runs.get_mut(&id) {
            record.status = RunStatus::Running { stage: Some(stage) };
        }
    }

    fn finish(&self, id: RunId, status: RunStatus) {
        let mut inner = self.lock();
        if let Some(record) = inner.runs.get_mut(&id) {
            record.status = status;
        }
        inner.finished.push_back(id);
        while inner.finished.len() > MAX_FINISHED_RUNS {
            if let Some(evicted) = inner.finished.pop_front() {
                inner.runs.remove(&evicted);
            }
        }
    }
}

/// Feeds stage transitions into the registry.
struct RegistryProgress {
    id: RunId,
    registry: Arc<Registry>,
}

impl RunProgress for RegistryProgress {
    fn stage(&self, stage: Stage) {
        self.registry.set_stage(self.id, stage);
    }

    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// RunQueue
// ---------------------------------------------------------------------------

/// Spawns pipeline runs onto the tokio runtime and tracks them.
pub struct RunQueue {
    pipeline: Arc<Pipeline>,
    registry: Arc<Registry>,
    tasks: Mutex<JoinSet<()>>,
}

/// Handle to a submitted run.
#[derive(Debug)]
pub struct RunHandle {
    pub id: RunId,
    result: oneshot::Receiver<Result<RunReport>>,
}

impl RunHandle {
    /// Wait for the run to finish.
    pub async fn wait(self) -> Result<RunReport> {
        self.result
            .await
            .map_err(|_| TopicDeskError::Internal(format!("run {} ended without a result", self.id)))?
    }
}

impl RunQueue {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            registry: Arc::new(Registry::default()),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Schedule a run for `topic`. Returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, topic: ResearchTopic) -> RunHandle {
        let id = Uuid::now_v7();
        self.registry.insert(id, topic.clone());

        let (tx, rx) = oneshot::channel();
        let pipeline = Arc::clone(&self.pipeline);
        let registry = Arc::clone(&self.registry);
        let span = info_span!("run", run_id = %id);

        let progress = RegistryProgress {
            id,
            registry: Arc::clone(&registry),
        };

        let task = async move {
            // The run executes in its own task so a panic still finishes the record.
            let run = tokio::spawn(
                async move { pipeline.run(&topic, &progress).await }.in_current_span(),
            );
            let result = run.await.unwrap_or_else(|e| {
                Err(TopicDeskError::Internal(format!("run task failed: {e}")))
            });

            match &result {
                Ok(report) => registry.finish(id, RunStatus::Completed(report.clone())),
                Err(e) => {
                    error!(error = %e, "research run failed");
                    registry.finish(id, RunStatus::Failed(e.to_string()));
                }
            }

            // The submitter may have dropped its handle.
            let _ = tx.send(result);
        };

        let mut tasks = self.lock_tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task.instrument(span));

        info!(run_id = %id, in_flight = tasks.len(), "run submitted");

        RunHandle { id, result: rx }
    }

    /// Current status of a run, if it is still in the registry.
    pub fn status(&self, id: RunId) -> Option<RunStatus> {
        self.registry.lock().runs.get(&id).map(|r| r.status.clone())
    }

    /// Full registry record for a run.
    pub fn record(&self, id: RunId) -> Option<RunRecord> {
        self.registry.lock().runs.get(&id).cloned()
    }

    /// Number of runs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.registry
            .lock()
            .runs
            .values()
            .filter(|r| !r.status.is_finished())
            .count()
    }

    /// Wait for every run submitted so far to finish.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.lock_tasks());
        info!(pending = tasks.len(), "waiting for in-flight runs");

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "run task panicked");
            }
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
