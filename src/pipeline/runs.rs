//! In-memory registry of pipeline runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::job::{PipelineJob, RunStatus};

/// State of a single run as seen by pollers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub job_name: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub attempts: u32,
}

impl PipelineRun {
    fn queued(job: &PipelineJob) -> Self {
        Self {
            run_id: job.run_id.clone(),
            job_name: job.job_name.clone(),
            status: RunStatus::Queued,
            created_at: job.created_at,
            started_at: None,
            completed_at: None,
            error: None,
            attempts: job.attempts,
        }
    }
}

/// Shared, thread-safe map of run id to run state.
#[derive(Clone, Default)]
pub struct RunRegistry {
    runs: Arc<RwLock<HashMap<String, PipelineRun>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a job as queued.
    pub async fn register(&self, job: &PipelineJob) -> PipelineRun {
        let run = PipelineRun::queued(job);
        self.runs
            .write()
            .await
            .insert(run.run_id.clone(), run.clone());
        run
    }

    pub async fn get(&self, run_id: &str) -> Option<PipelineRun> {
        self.runs.read().await.get(run_id).cloned()
    }

    pub async fn status(&self, run_id: &str) -> Option<RunStatus> {
        self.runs.read().await.get(run_id).map(|run| run.status)
    }

    /// Lists runs, newest first.
    pub async fn list(&self, limit: usize) -> Vec<PipelineRun> {
        let mut runs: Vec<PipelineRun> = self.runs.read().await.values().cloned().collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(limit);
        runs
    }

    /// Number of runs per status.
    pub async fn counts(&self) -> HashMap<RunStatus, usize> {
        let mut counts = HashMap::new();
        for run in self.runs.read().await.values() {
            *counts.entry(run.status).or_insert(0) += 1;
        }
        counts
    }

    /// Moves a run to `Starting` as a worker picks it up.
    ///
    /// Returns false when the run was canceled while queued, in which case it
    /// must not execute.
    pub async fn mark_starting(&self, run_id: &str, attempts: u32) -> bool {
        let mut runs = self.runs.write().await;
        let Some(run) = runs.get_mut(run_id) else {
            return false;
        };
        if run.status == RunStatus::Canceled {
            return false;
        }
        run.status = RunStatus::Starting;
        run.attempts = attempts;
        true
    }

    pub async fn mark_started(&self, run_id: &str) {
        self.transition(run_id, RunStatus::Started, None).await;
    }

    pub async fn mark_success(&self, run_id: &str) {
        self.transition(run_id, RunStatus::Success, None).await;
    }

    pub async fn mark_failure(&self, run_id: &str, error: impl Into<String>) {
        self.transition(run_id, RunStatus::Failure, Some(error.into()))
            .await;
    }

    /// Puts a run back in the queue for another attempt.
    pub async fn mark_requeued(&self, run_id: &str, error: impl Into<String>) {
        self.transition(run_id, RunStatus::Queued, Some(error.into()))
            .await;
    }

    /// Cancels a run that has not been picked up yet.
    ///
    /// Returns true if the run was queued and is now canceled.
    pub async fn cancel(&self, run_id: &str) -> bool {
        let mut runs = self.runs.write().await;
        match runs.get_mut(run_id) {
            Some(run) if matches!(run.status, RunStatus::Queued | RunStatus::NotStarted) => {
                run.status = RunStatus::Canceled;
                run.completed_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Drops terminal runs that completed more than `retention` ago.
    ///
    /// Pollers of a dropped run fall back to storage. Returns the number of
    /// runs removed.
    pub async fn prune_finished(&self, retention: Duration) -> usize {
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        let cutoff = Utc::now() - retention;

        let mut runs = self.runs.write().await;
        let before = runs.len();
        runs.retain(|_, run| {
            !run.status.is_terminal() || run.completed_at.map_or(true, |done| done > cutoff)
        });
        let removed = before - runs.len();

        if removed > 0 {
            debug!(removed = removed, remaining = runs.len(), "Pruned finished runs");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }

    async fn transition(&self, run_id: &str, status: RunStatus, error: Option<String>) {
        let mut runs = self.runs.write().await;
        let Some(run) = runs.get_mut(run_id) else {
            return;
        };

        let now = Utc::now();
        match status {
            RunStatus::Started => run.started_at = Some(now),
            s if s.is_terminal() => run.completed_at = Some(now),
            _ => {}
        }
        run.status = status;
        if error.is_some() {
            run.error = error;
        }
        debug!(run_id = %run_id, status = %status, "Run status changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = RunRegistry::new();
        let job = PipelineJob::new(json!({}));

        registry.register(&job).await;
        let run = registry.get(&job.run_id).await.unwrap();

        assert_eq!(run.status, RunStatus::Queued);
        assert!(run.started_at.is_none());
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_lifecycle_timestamps() {
        let registry = RunRegistry::new();
        let job = PipelineJob::new(json!({}));
        registry.register(&job).await;

        assert!(registry.mark_starting(&job.run_id, 1).await);
        registry.mark_started(&job.run_id).await;
        assert_eq!(registry.status(&job.run_id).await, Some(RunStatus::Started));

        registry.mark_success(&job.run_id).await;
        let run = registry.get(&job.run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.attempts, 1);
        assert!(run.started_at.is_some());
        assert!(run.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_failure_records_error() {
        let registry = RunRegistry::new();
        let job = PipelineJob::new(json!({}));
        registry.register(&job).await;

        registry.mark_failure(&job.run_id, "boom").await;
        let run = registry.get(&job.run_id).await.unwrap();
        assert_eq!(run.status, RunStatus::Failure);
        assert_eq!(run.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_cancel_only_queued() {
        let registry = RunRegistry::new();
        let queued = PipelineJob::new(json!({}));
        let running = PipelineJob::new(json!({}));
        registry.register(&queued).await;
        registry.register(&running).await;
        registry.mark_starting(&running.run_id, 1).await;

        assert!(registry.cancel(&queued.run_id).await);
        assert!(!registry.cancel(&running.run_id).await);
        assert!(!registry.cancel("missing").await);

        // A canceled run is never started
        assert!(!registry.mark_starting(&queued.run_id, 1).await);
    }

    #[tokio::test]
    async fn test_counts_and_list() {
        let registry = RunRegistry::new();
        for _ in 0..3 {
            registry.register(&PipelineJob::new(json!({}))).await;
        }
        let done = PipelineJob::new(json!({}));
        registry.register(&done).await;
        registry.mark_success(&done.run_id).await;

        let counts = registry.counts().await;
        assert_eq!(counts.get(&RunStatus::Queued), Some(&3));
        assert_eq!(counts.get(&RunStatus::Success), Some(&1));

        assert_eq!(registry.len().await, 4);
        assert_eq!(registry.list(2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_prune_finished_keeps_active_runs() {
        let registry = RunRegistry::new();
        let queued = PipelineJob::new(json!({}));
        let started = PipelineJob::new(json!({}));
        let succeeded = PipelineJob::new(json!({}));
        let failed = PipelineJob::new(json!({}));
        for job in [&queued, &started, &succeeded, &failed] {
            registry.register(job).await;
        }
        registry.mark_started(&started.run_id).await;
        registry.mark_success(&succeeded.run_id).await;
        registry.mark_failure(&failed.run_id, "boom").await;

        // Runs finished just now are still inside a one-hour window
        assert_eq!(registry.prune_finished(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.len().await, 4);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.prune_finished(Duration::from_millis(5)).await, 2);

        assert!(registry.get(&succeeded.run_id).await.is_none());
        assert!(registry.get(&failed.run_id).await.is_none());
        assert_eq!(registry.status(&queued.run_id).await, Some(RunStatus::Queued));
        assert_eq!(registry.status(&started.run_id).await, Some(RunStatus::Started));
    }
}
