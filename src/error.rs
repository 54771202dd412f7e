use chrono::{DateTime, Utc};

/// Error type returned by the instruction parser
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("No pickup line found in text")]
    NoPickupLine,
    #[error("Unknown timezone abbreviation: {0}")]
    UnknownTimezone(String),
    #[error("Malformed timestamp: {0}")]
    MalformedTimestamp(String),
    #[error("No lead-time offset found in text")]
    NoOffset,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Error type returned by the scheduler
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    #[error("Notification time {notify_at} is not in the future (now: {now})")]
    PastDue {
        notify_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
    #[error("Job already finalized: {0}")]
    AlreadyFinalized(String),
    #[error("Job not found for id: {0}")]
    JobNotFoundError(String),
    #[error("Scheduler has been shut down")]
    Terminated,
    #[error("Mutex error: {0}")]
    MutexError(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Opaque delivery failure reported by the transport integration.
///
/// The scheduler only logs these; they never propagate back to the caller
/// that scheduled the job.
#[derive(thiserror::Error, Debug)]
#[error("Delivery failed: {0}")]
pub struct DeliveryError(String);

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type DeliveryResult = Result<(), DeliveryError>;
