//! Cron scheduler for the engine's background jobs.
//!
//! Every registered job is single-flight: a tick that fires while the
//! previous run of the same job is still going is skipped, not queued.
//! Runs are wrapped in the configured timeout and receive a child of the
//! scheduler's cancellation token, so `stop()` interrupts them at their
//! next cancellation check.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use skilltrail_domain::Result;
//! use skilltrail_infra::scheduling::{
//!     EngineJob, EngineScheduler, EngineSchedulerConfig, ScheduledJob, SchedulerResult,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct Noop;
//!
//! #[async_trait]
//! impl EngineJob for Noop {
//!     fn name(&self) -> &'static str {
//!         "noop"
//!     }
//!
//!     async fn run(&self, _cancel: CancellationToken) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> SchedulerResult<()> {
//! let mut scheduler = EngineScheduler::new(EngineSchedulerConfig::default())
//!     .with_job(ScheduledJob::new("0 */5 * * * *", Arc::new(Noop)));
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use skilltrail_domain::{Result, SchedulerConfig};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Unit of background work driven by the scheduler.
#[async_trait]
pub trait EngineJob: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, cancel: CancellationToken) -> Result<()>;
}

/// A job together with its six-field cron expression.
#[derive(Clone)]
pub struct ScheduledJob {
    pub cron: String,
    pub job: Arc<dyn EngineJob>,
}

impl ScheduledJob {
    pub fn new(cron: impl Into<String>, job: Arc<dyn EngineJob>) -> Self {
        Self { cron: cron.into(), job }
    }
}

#[derive(Debug, Clone)]
pub struct EngineSchedulerConfig {
    pub job_timeout: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
}

impl Default for EngineSchedulerConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(300),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SchedulerConfig> for EngineSchedulerConfig {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            job_timeout: Duration::from_secs(config.job_timeout_secs.max(1)),
            ..Self::default()
        }
    }
}

/// Owns a `JobScheduler` and the lifecycle of the registered jobs.
pub struct EngineScheduler {
    scheduler: Option<JobScheduler>,
    config: EngineSchedulerConfig,
    jobs: Vec<ScheduledJob>,
    job_ids: Vec<Uuid>,
    cancellation: CancellationToken,
}

impl EngineScheduler {
    pub fn new(config: EngineSchedulerConfig) -> Self {
        Self {
            scheduler: None,
            config,
            jobs: Vec::new(),
            job_ids: Vec::new(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_job(mut self, job: ScheduledJob) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|scheduled| scheduled.job.name()).collect()
    }

    /// Ids assigned by the underlying scheduler; empty while stopped.
    pub fn job_ids(&self) -> &[Uuid] {
        &self.job_ids
    }

    #[instrument(skip(self), fields(jobs = self.jobs.len()))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();
        let (scheduler, job_ids) = self.build_scheduler().await?;

        let start_timeout = self.config.start_timeout;
        tokio::time::timeout(start_timeout, scheduler.start())
            .await
            .map_err(|_| SchedulerError::Timeout {
                operation: "scheduler start",
                seconds: start_timeout.as_secs(),
            })?
            .map_err(SchedulerError::StartFailed)?;

        self.scheduler = Some(scheduler);
        self.job_ids = job_ids;
        info!(jobs = ?self.job_names(), "engine scheduler started");
        Ok(())
    }

    /// Cancel in-flight runs and shut the scheduler down.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let mut scheduler = self.scheduler.take().ok_or(SchedulerError::NotRunning)?;
        self.cancellation.cancel();
        self.job_ids.clear();

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, scheduler.shutdown())
            .await
            .map_err(|_| SchedulerError::Timeout {
                operation: "scheduler stop",
                seconds: stop_timeout.as_secs(),
            })?
            .map_err(SchedulerError::StopFailed)?;

        info!("engine scheduler stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<(JobScheduler, Vec<Uuid>)> {
        let scheduler = JobScheduler::new().await.map_err(SchedulerError::CreationFailed)?;
        let mut job_ids = Vec::with_capacity(self.jobs.len());

        for scheduled in &self.jobs {
            let job = Arc::clone(&scheduled.job);
            let in_flight = Arc::new(AtomicBool::new(false));
            let cancel = self.cancellation.clone();
            let job_timeout = self.config.job_timeout;

            let definition = Job::new_async(scheduled.cron.as_str(), move |_id, _lock| {
                let job = Arc::clone(&job);
                let in_flight = Arc::clone(&in_flight);
                let cancel = cancel.clone();
                Box::pin(async move {
                    run_tick(job, in_flight, cancel, job_timeout).await;
                })
            })
            .map_err(|source| SchedulerError::JobRegistrationFailed {
                name: scheduled.job.name().to_string(),
                cron: scheduled.cron.clone(),
                source,
            })?;

            let job_id = scheduler.add(definition).await.map_err(|source| {
                SchedulerError::JobRegistrationFailed {
                    name: scheduled.job.name().to_string(),
                    cron: scheduled.cron.clone(),
                    source,
                }
            })?;
            debug!(job = scheduled.job.name(), cron = %scheduled.cron, %job_id, "registered job");
            job_ids.push(job_id);
        }

        Ok((scheduler, job_ids))
    }
}

impl Drop for EngineScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("EngineScheduler dropped while running; cancelling jobs");
            self.cancellation.cancel();
        }
    }
}

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Completed,
    Failed,
    TimedOut,
    /// Previous run still in flight.
    Skipped,
    /// Scheduler was stopping.
    Cancelled,
}

/// Clears the in-flight flag when the run ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub(crate) async fn run_tick(
    job: Arc<dyn EngineJob>,
    in_flight: Arc<AtomicBool>,
    cancel: CancellationToken,
    job_timeout: Duration,
) -> TickOutcome {
    let name = job.name();
    if cancel.is_cancelled() {
        return TickOutcome::Cancelled;
    }
    if in_flight.swap(true, Ordering::AcqRel) {
        debug!(job = name, "previous run still in flight; skipping tick");
        return TickOutcome::Skipped;
    }
    let _guard = InFlightGuard(in_flight);

    let run_token = cancel.child_token();
    let started = Instant::now();
    match tokio::time::timeout(job_timeout, job.run(run_token.clone())).await {
        Ok(Ok(())) => {
            debug!(job = name, elapsed_ms = started.elapsed().as_millis() as u64, "job finished");
            TickOutcome::Completed
        }
        Ok(Err(err)) => {
            error!(job = name, error = %err, "job failed");
            TickOutcome::Failed
        }
        Err(_) => {
            run_token.cancel();
            warn!(job = name, timeout_secs = job_timeout.as_secs(), "job timed out");
            TickOutcome::TimedOut
        }
    }
}
