use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::destination::Destination;

/// State of a scheduled notification job.
///
/// `Fired` is entered exactly once, before the delivery callback is
/// awaited, and is terminal regardless of the callback outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Fired,
    Cancelled,
}

pub(in crate::scheduler) struct ScheduledJob {
    pub status: JobStatus,
    pub notify_at: DateTime<Utc>,
    pub destination: Destination,
    pub cancellation_token: CancellationToken,
    #[allow(dead_code)]
    pub join: JoinHandle<()>,
}
