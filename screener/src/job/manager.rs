use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{Instrument, info};
use uuid::Uuid;

use crate::advisory::AdvisoryGateway;
use crate::cache::ResultCache;
use crate::job::JobConfig;
use crate::job::pipeline;
use crate::job::status::{JobState, JobStatus, ResultRecord};
use crate::logger::job_span;
use crate::market_data::MarketDataSource;
use crate::time::now;

/// Result of a start request.
#[derive(Debug)]
pub enum StartOutcome {
    Started { job_id: Uuid, handle: JoinHandle<()> },
    AlreadyRunning,
}

/// Collaborators and shared status of the batch job.
///
/// Status writes are short critical sections; nothing awaits while holding
/// the lock.
pub struct JobContext {
    status: RwLock<JobStatus>,

    pub(crate) market: Arc<dyn MarketDataSource>,
    pub(crate) advisory: AdvisoryGateway,
    pub(crate) cache: ResultCache,
    pub(crate) tickers_path: PathBuf,
    pub(crate) config: JobConfig,
}

impl JobContext {
    pub(crate) fn set_progress(&self, progress: impl Into<String>) {
        let progress = progress.into();
        info!(component = "job", %progress, "progress");

        let mut st = self.status.write();
        st.progress = progress;
        st.last_updated = now();
    }

    pub(crate) fn push_result(&self, record: ResultRecord) {
        let mut st = self.status.write();
        st.results.push(record);
        st.last_updated = now();
    }

    /// Marks the job completed. `results` replaces the accumulated records
    /// when given.
    pub(crate) fn complete(&self, progress: impl Into<String>, results: Option<Vec<ResultRecord>>) {
        let mut st = self.status.write();
        if let Some(results) = results {
            st.results = results;
        }
        st.status = JobState::Completed;
        st.progress = progress.into();
        st.last_updated = now();
    }

    pub(crate) fn fail(&self, error: String) {
        let mut st = self.status.write();
        st.status = JobState::Error;
        st.error = Some(error);
        st.last_updated = now();
    }

    pub(crate) fn results(&self) -> Vec<ResultRecord> {
        self.status.read().results.clone()
    }
}

/// Single-flight owner of the batch job.
#[derive(Clone)]
pub struct JobManager {
    ctx: Arc<JobContext>,
}

impl JobManager {
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        advisory: AdvisoryGateway,
        cache: ResultCache,
        tickers_path: PathBuf,
        config: JobConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(JobContext {
                status: RwLock::new(JobStatus::idle(now())),
                market,
                advisory,
                cache,
                tickers_path,
                config,
            }),
        }
    }

    /// Starts a job unless one is already running.
    ///
    /// The running check and the reset happen under one write lock, so two
    /// concurrent callers can never both start. Must be called inside a tokio
    /// runtime.
    pub fn start(&self, force: bool) -> StartOutcome {
        let job_id = Uuid::new_v4();

        {
            let mut st = self.ctx.status.write();
            if st.is_running() {
                info!(component = "job", running = ?st.job_id, "start rejected; job already running");
                return StartOutcome::AlreadyRunning;
            }

            *st = JobStatus {
                status: JobState::Running,
                progress: "Starting...".to_string(),
                results: Vec::new(),
                error: None,
                last_updated: now(),
                job_id: Some(job_id),
            };
        }

        info!(component = "job", event = "start", %job_id, force, "analysis job started");

        let ctx = Arc::clone(&self.ctx);
        let handle = tokio::spawn(pipeline::run(ctx, force).instrument(job_span(&job_id, force)));

        StartOutcome::Started { job_id, handle }
    }

    pub fn snapshot(&self) -> JobStatus {
        self.ctx.status.read().clone()
    }
}
