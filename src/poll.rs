//! Job poll supervisor
//!
//! Owns the registry of active polling loops, keyed by job id. `watch` is
//! idempotent - an upload acceptance and a job-list refresh can both ask to
//! watch the same job without creating duplicate timers. Each loop performs
//! one status fetch per tick; transport failures are skipped silently and the
//! next tick retries implicitly.
//!
//! A loop that observes a terminal status emits exactly one
//! [`AppEvent::JobFinished`] and then ends itself. The event consumer retires
//! the registry entry, shows the notification, and refreshes the job list -
//! in that order, guaranteed by the single mpsc consumer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::models::{Job, JobStatus};
use crate::api::Transport;
use crate::events::{AppEvent, JobOutcome};

/// Fixed interval between status checks for a watched job
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

// ─────────────────────────────────────────────────────────────────────────────
// Poll handle
// ─────────────────────────────────────────────────────────────────────────────

/// The live watch state for one job: a cancellable polling task
///
/// `stop` takes effect exactly once; later calls (and `Drop` after a stop)
/// are no-ops. Aborting the task cancels the timer deterministically - no
/// further ticks fire. An in-flight status request is simply dropped; its
/// response has no handle left to process it.
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Supervisor
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of active polling loops
///
/// Mutated only from the event-processing task that owns it; at most one
/// live handle exists per job id.
pub struct JobPollSupervisor {
    api: Arc<dyn Transport>,
    events: mpsc::Sender<AppEvent>,
    handles: HashMap<i64, PollHandle>,
}

impl JobPollSupervisor {
    pub fn new(api: Arc<dyn Transport>, events: mpsc::Sender<AppEvent>) -> Self {
        Self {
            api,
            events,
            handles: HashMap::new(),
        }
    }

    /// Register interest in a job's lifecycle. No-op if already watched.
    ///
    /// The first status check fires one full interval after registration,
    /// then every interval.
    pub fn watch(&mut self, job_id: i64) {
        if self.handles.contains_key(&job_id) {
            return;
        }
        tracing::debug!("watching job {job_id}");

        let api = self.api.clone();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now();
            let mut ticks = tokio::time::interval_at(start + POLL_INTERVAL, POLL_INTERVAL);
            loop {
                ticks.tick().await;
                let job = match api.job_status(job_id).await {
                    Ok(job) => job,
                    Err(err) => {
                        // Transient blips are expected mid-import; the next
                        // scheduled tick retries.
                        tracing::debug!("status check for job {job_id} skipped: {err}");
                        continue;
                    }
                };
                let outcome = match job.status {
                    JobStatus::Completed => JobOutcome::Completed {
                        transaction_count: job.transaction_count.unwrap_or(0),
                    },
                    JobStatus::Failed => JobOutcome::Failed {
                        message: job
                            .error_message
                            .unwrap_or_else(|| "unknown error".to_string()),
                    },
                    JobStatus::Queued | JobStatus::Running => continue,
                };
                let _ = events.send(AppEvent::JobFinished { job_id, outcome }).await;
                // Terminal: the job is immutable now, no further ticks
                break;
            }
        });

        self.handles.insert(job_id, PollHandle::new(task));
    }

    /// Cancel interest in a job. Safe to call on an unregistered id.
    pub fn stop(&mut self, job_id: i64) {
        if let Some(mut handle) = self.handles.remove(&job_id) {
            handle.stop();
            tracing::debug!("stopped watching job {job_id}");
        }
    }

    /// Bulk bootstrap: watch every non-terminal job in a freshly fetched
    /// list. Job status is the sole source of truth - nothing about in-flight
    /// jobs is persisted client-side.
    pub fn watch_active(&mut self, jobs: &[Job]) {
        for job in jobs {
            if !job.status.is_terminal() {
                self.watch(job.job_id);
            }
        }
    }

    pub fn is_watching(&self, job_id: i64) -> bool {
        self.handles.contains_key(&job_id)
    }

    pub fn active_count(&self) -> usize {
        self.handles.len()
    }

    /// Page teardown: cancel every polling loop
    pub fn shutdown(&mut self) {
        for (_, mut handle) in self.handles.drain() {
            handle.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{
        BulkDeleteRequest, BulkDeleteResponse, Category, ResultPage, UploadAccepted,
    };
    use crate::api::ApiError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::advance;

    fn job(status: JobStatus) -> Job {
        Job {
            job_id: 1,
            import_id: 1,
            status,
            original_filename: "jan.pdf".into(),
            page_count: None,
            error_message: None,
            created_at: None,
            completed_at: None,
            transaction_count: None,
        }
    }

    fn network_err() -> ApiError {
        ApiError::Http {
            status: 502,
            message: "upstream unavailable".into(),
        }
    }

    /// Scripted transport: pops one job_status response per check.
    /// An exhausted script keeps answering with the last status seen.
    struct ScriptedApi {
        script: Mutex<VecDeque<Result<Job, ApiError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(script: Vec<Result<Job, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedApi {
        async fn job_status(&self, _job_id: i64) -> Result<Job, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(job(JobStatus::Running)))
        }

        async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
            Ok(vec![])
        }

        async fn list_transactions(&self, _query: &str) -> Result<ResultPage, ApiError> {
            Err(network_err())
        }

        async fn bulk_delete(
            &self,
            _req: &BulkDeleteRequest,
        ) -> Result<BulkDeleteResponse, ApiError> {
            Err(network_err())
        }

        async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
            Ok(vec![])
        }

        async fn upload_statement(
            &self,
            _file_name: &str,
            _bytes: Vec<u8>,
        ) -> Result<UploadAccepted, ApiError> {
            Err(network_err())
        }
    }

    /// Let the spawned poll tasks run the tick that `advance` released
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn tick(interval: Duration) {
        advance(interval).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn watch_is_idempotent() {
        let api = ScriptedApi::new(vec![]);
        let (tx, _rx) = mpsc::channel(16);
        let mut sup = JobPollSupervisor::new(api.clone(), tx);

        sup.watch(1);
        sup.watch(1);
        sup.watch(1);
        assert_eq!(sup.active_count(), 1);
        settle().await;

        // Three intervals, one loop: exactly three checks, not nine
        tick(POLL_INTERVAL).await;
        tick(POLL_INTERVAL).await;
        tick(POLL_INTERVAL).await;
        assert_eq!(api.calls(), 3);

        sup.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn no_check_before_first_interval() {
        let api = ScriptedApi::new(vec![]);
        let (tx, _rx) = mpsc::channel(16);
        let mut sup = JobPollSupervisor::new(api.clone(), tx);

        sup.watch(1);
        settle().await;
        tick(POLL_INTERVAL - Duration::from_millis(1)).await;
        assert_eq!(api.calls(), 0);
        tick(Duration::from_millis(1)).await;
        assert_eq!(api.calls(), 1);

        sup.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn completed_job_emits_one_notification_then_stops() {
        // queued, running, then completed with 42 transactions
        let mut done = job(JobStatus::Completed);
        done.transaction_count = Some(42);
        let api = ScriptedApi::new(vec![
            Ok(job(JobStatus::Queued)),
            Ok(job(JobStatus::Running)),
            Ok(done),
        ]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut sup = JobPollSupervisor::new(api.clone(), tx);

        sup.watch(1);
        settle().await;
        tick(POLL_INTERVAL).await;
        tick(POLL_INTERVAL).await;
        assert!(rx.try_recv().is_err(), "no event before terminal status");

        tick(POLL_INTERVAL).await;
        match rx.try_recv() {
            Ok(AppEvent::JobFinished { job_id, outcome }) => {
                assert_eq!(job_id, 1);
                let (_, message) = outcome.notice();
                assert!(message.contains("42"), "message was: {message}");
            }
            other => panic!("expected JobFinished, got {other:?}"),
        }

        // The loop ended itself: further intervals produce no checks
        tick(POLL_INTERVAL).await;
        tick(POLL_INTERVAL).await;
        assert_eq!(api.calls(), 3);
        assert!(rx.try_recv().is_err(), "exactly one notification");

        // Event consumer retires the handle
        sup.stop(1);
        assert_eq!(sup.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_reports_server_message_once() {
        let mut failed = job(JobStatus::Failed);
        failed.error_message = Some("corrupt PDF".into());
        let api = ScriptedApi::new(vec![Ok(failed)]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut sup = JobPollSupervisor::new(api.clone(), tx);

        sup.watch(2);
        settle().await;
        tick(POLL_INTERVAL).await;
        match rx.try_recv() {
            Ok(AppEvent::JobFinished { outcome, .. }) => {
                let (kind, message) = outcome.notice();
                assert_eq!(kind, crate::events::ToastKind::Error);
                assert!(message.contains("corrupt PDF"), "message was: {message}");
            }
            other => panic!("expected JobFinished, got {other:?}"),
        }

        tick(POLL_INTERVAL).await;
        assert_eq!(api.calls(), 1, "no further ticks after failure");
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_skips_tick_and_retries() {
        let mut done = job(JobStatus::Completed);
        done.transaction_count = Some(3);
        let api = ScriptedApi::new(vec![Err(network_err()), Ok(done)]);
        let (tx, mut rx) = mpsc::channel(16);
        let mut sup = JobPollSupervisor::new(api.clone(), tx);

        sup.watch(1);
        settle().await;
        tick(POLL_INTERVAL).await;
        // The failed check surfaced nothing and kept the loop alive
        assert!(rx.try_recv().is_err());
        assert_eq!(api.calls(), 1);

        tick(POLL_INTERVAL).await;
        assert!(matches!(
            rx.try_recv(),
            Ok(AppEvent::JobFinished { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_timer_and_is_noop_on_unknown_ids() {
        let api = ScriptedApi::new(vec![]);
        let (tx, _rx) = mpsc::channel(16);
        let mut sup = JobPollSupervisor::new(api.clone(), tx);

        sup.watch(1);
        settle().await;
        sup.stop(1);
        assert_eq!(sup.active_count(), 0);

        // No further ticks fire after stop
        tick(POLL_INTERVAL).await;
        tick(POLL_INTERVAL).await;
        assert_eq!(api.calls(), 0);

        // Unknown id and double stop are both no-ops
        sup.stop(1);
        sup.stop(999);
    }

    #[tokio::test(start_paused = true)]
    async fn bootstrap_watches_only_non_terminal_jobs() {
        let api = ScriptedApi::new(vec![]);
        let (tx, _rx) = mpsc::channel(16);
        let mut sup = JobPollSupervisor::new(api, tx);

        let jobs = vec![
            Job { job_id: 1, status: JobStatus::Queued, ..job(JobStatus::Queued) },
            Job { job_id: 2, status: JobStatus::Running, ..job(JobStatus::Running) },
            Job { job_id: 3, status: JobStatus::Completed, ..job(JobStatus::Completed) },
            Job { job_id: 4, status: JobStatus::Failed, ..job(JobStatus::Failed) },
        ];
        sup.watch_active(&jobs);

        assert!(sup.is_watching(1));
        assert!(sup.is_watching(2));
        assert!(!sup.is_watching(3));
        assert!(!sup.is_watching(4));
        assert_eq!(sup.active_count(), 2);

        sup.shutdown();
        assert_eq!(sup.active_count(), 0);
    }
}
