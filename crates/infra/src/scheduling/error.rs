//! Scheduler error types

use skilltrail_domain::SkillTrailError;
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

use crate::errors::InfraError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler already running")]
    AlreadyRunning,

    #[error("scheduler not running")]
    NotRunning,

    #[error("failed to create scheduler: {0}")]
    CreationFailed(#[source] JobSchedulerError),

    #[error("failed to start scheduler: {0}")]
    StartFailed(#[source] JobSchedulerError),

    #[error("failed to stop scheduler: {0}")]
    StopFailed(#[source] JobSchedulerError),

    #[error("failed to register job '{name}' ({cron}): {source}")]
    JobRegistrationFailed {
        name: String,
        cron: String,
        #[source]
        source: JobSchedulerError,
    },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let mapped = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                SkillTrailError::InvalidInput(err.to_string())
            }
            SchedulerError::JobRegistrationFailed { .. } => {
                SkillTrailError::Config(err.to_string())
            }
            _ => SkillTrailError::Internal(err.to_string()),
        };
        InfraError(mapped)
    }
}

impl From<SchedulerError> for SkillTrailError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
