mod impl_oneshot;
pub mod job;
mod utils;

use crate::destination::Destination;
use crate::error::SchedulerError::{AlreadyFinalized, JobNotFoundError};
use crate::error::{DeliveryResult, SchedulerResult};
use crate::job_id::JobId;
use crate::scheduler::inner::job::{JobStatus, ScheduledJob};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(in crate::scheduler) type DeliveryLambda =
    Box<dyn Fn(Destination) -> BoxFuture<'static, DeliveryResult> + Send + Sync>;

pub struct SchedulerInner {
    terminated: bool,
    jobs: HashMap<String, ScheduledJob>,
    deliver: Arc<DeliveryLambda>,
}

impl SchedulerInner {
    pub(super) fn new(deliver: DeliveryLambda) -> Self {
        Self {
            terminated: false,
            jobs: HashMap::new(),
            deliver: Arc::new(deliver),
        }
    }

    /// Transition a job to `Fired` if and only if it is still `Pending`.
    ///
    /// Called from the timer task under the registry lock; the single point
    /// where the fire/cancel race is decided.
    pub(in crate::scheduler) fn claim_fire(&mut self, job_id: &str) -> bool {
        match self.jobs.get_mut(job_id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Fired;
                true
            }
            Some(job) => {
                debug!(
                    "Pickup Notifier: Job with id {} is already {:?}, skipping fire",
                    job_id, job.status
                );
                false
            }
            None => {
                warn!(
                    "Pickup Notifier: Job with id {} missing from registry at fire time",
                    job_id
                );
                false
            }
        }
    }

    pub(super) fn cancel_job(&mut self, job_id: &JobId) -> SchedulerResult<()> {
        match self.jobs.get_mut(job_id.as_str()) {
            Some(job) if job.status == JobStatus::Pending => {
                debug!(
                    "Pickup Notifier: Cancelling job with id {} for conversation {} (was due {})",
                    job_id, job.destination.conversation, job.notify_at
                );
                job.status = JobStatus::Cancelled;
                job.cancellation_token.cancel();
                Ok(())
            }
            Some(job) => {
                warn!(
                    "Pickup Notifier: Job with id {} is already {:?}, nothing to cancel",
                    job_id, job.status
                );
                Err(AlreadyFinalized(job_id.as_str().to_string()))
            }
            None => {
                warn!(
                    "Pickup Notifier: Job with id {} not found for cancellation",
                    job_id
                );
                Err(JobNotFoundError(job_id.as_str().to_string()))
            }
        }
    }

    pub(super) fn job_status(&self, job_id: &JobId) -> SchedulerResult<JobStatus> {
        self.jobs
            .get(job_id.as_str())
            .map(|job| job.status)
            .ok_or_else(|| JobNotFoundError(job_id.as_str().to_string()))
    }

    pub(super) fn shutdown(&mut self) {
        info!("Pickup Notifier: Shutting down scheduler");
        if self.terminated {
            return;
        }
        self.terminated = true;

        for (job_id, job) in self.jobs.iter_mut() {
            if job.status == JobStatus::Pending {
                debug!(
                    "Pickup Notifier: Scheduler shutdown - cancelling job with id {}",
                    job_id
                );
                job.status = JobStatus::Cancelled;
                job.cancellation_token.cancel();
            }
        }
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
