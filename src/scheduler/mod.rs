mod inner;

use crate::destination::Destination;
use crate::error::{DeliveryResult, SchedulerResult};
use crate::instruction::PickupInstruction;
use crate::job_id::JobId;
use crate::scheduler::inner::SchedulerInner;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::sync::{Arc, Mutex};
use tracing::warn;

pub use inner::job::JobStatus;

/// A scheduler that delivers at most one notification per accepted pickup
/// instruction.
///
/// The scheduler is thread-safe and can be shared across threads using `.clone()`.
/// It is meant to be constructed once by the hosting application and passed
/// to wherever incoming messages are handled.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

impl Scheduler {
    /// Create a new scheduler around a delivery callback.
    ///
    /// The callback is supplied by the messaging-transport integration and
    /// is invoked at most once per accepted job, on the tokio runtime. A
    /// failing delivery is logged and swallowed; the scheduler never
    /// retries.
    ///
    /// # Example
    ///
    /// ```
    /// use pickup_notifier::scheduler::Scheduler;
    ///
    /// let scheduler = Scheduler::new(|destination| async move {
    ///     tracing::info!("sending reminder to {}", destination.conversation);
    ///     Ok(())
    /// });
    /// ```
    pub fn new<F, Fut>(deliver: F) -> Self
    where
        F: Fn(Destination) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = DeliveryResult> + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner::new(Box::new(
                move |destination| deliver(destination).boxed(),
            )))),
        }
    }

    /// Schedule one notification for `instruction`, delivered to `destination`.
    ///
    /// The job's timer is armed for `instruction.notify_at() - now`; the call
    /// itself returns as soon as the job is registered and never blocks on
    /// the timer. Two calls are independent even for the same destination -
    /// identity is per returned job id.
    ///
    /// # Arguments
    ///
    /// * `instruction` - The parsed pickup instruction; its notification
    ///   instant already includes the lead time and the fixed buffer
    /// * `destination` - Opaque payload handed to the delivery callback at
    ///   fire time
    /// * `now` - The caller's current instant, injected for testability
    ///
    /// # Returns
    ///
    /// The id of the armed job, or `PastDue` when the notification instant
    /// is not in the future (no job is created in that case)
    pub fn schedule(
        &self,
        instruction: &PickupInstruction,
        destination: Destination,
        now: DateTime<Utc>,
    ) -> SchedulerResult<JobId> {
        let mut inner = self.inner.lock().map_err(|err| {
            warn!("Pickup Notifier: Mutex error on schedule: {}", err);
            crate::error::SchedulerError::MutexError(err.to_string())
        })?;

        inner.schedule_notification(Arc::downgrade(&self.inner), instruction, destination, now)
    }

    /// Cancel a job that has been scheduled.
    ///
    /// # Arguments
    ///
    /// * `job_id` - The id of the job to cancel
    ///
    /// # Returns
    ///
    /// `Ok(())` when a pending job was revoked; `AlreadyFinalized` when the
    /// job has already fired or was already cancelled (no side effect)
    pub fn cancel_job(&self, job_id: &JobId) -> SchedulerResult<()> {
        let mut inner = self.inner.lock().map_err(|err| {
            warn!("Pickup Notifier: Mutex error on cancel_job: {}", err);
            crate::error::SchedulerError::MutexError(err.to_string())
        })?;

        inner.cancel_job(job_id)
    }

    /// Look up the current state of a job.
    pub fn job_status(&self, job_id: &JobId) -> SchedulerResult<JobStatus> {
        let inner = self.inner.lock().map_err(|err| {
            warn!("Pickup Notifier: Mutex error on job_status: {}", err);
            crate::error::SchedulerError::MutexError(err.to_string())
        })?;

        inner.job_status(job_id)
    }

    /// Shutdown the scheduler and cancel all pending jobs.
    ///
    /// Subsequent `schedule` calls are refused. Idempotent.
    ///
    /// # Returns
    ///
    /// A result indicating success or failure for scheduler shutdown
    pub fn shutdown(&self) -> SchedulerResult<()> {
        let mut inner = self.inner.lock().map_err(|err| {
            warn!("Pickup Notifier: Mutex error on shutdown: {}", err);
            crate::error::SchedulerError::MutexError(err.to_string())
        })?;

        inner.shutdown();
        Ok(())
    }
}
