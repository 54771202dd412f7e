use chrono::{DateTime, Duration, Utc};

/// Safety margin always subtracted in addition to the operator lead time.
pub const FIXED_BUFFER_MINUTES: i64 = 10;

/// A parsed pickup-time instruction.
///
/// The notification instant is fixed at construction as
/// `pickup_at - lead_time - FIXED_BUFFER_MINUTES` and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupInstruction {
    pickup_at: DateTime<Utc>,
    lead_time: Duration,
    notify_at: DateTime<Utc>,
}

impl PickupInstruction {
    /// Create an instruction from an absolute pickup instant and a
    /// non-negative lead time.
    pub fn new(pickup_at: DateTime<Utc>, lead_time: Duration) -> Self {
        let notify_at = pickup_at - lead_time - Duration::minutes(FIXED_BUFFER_MINUTES);
        Self {
            pickup_at,
            lead_time,
            notify_at,
        }
    }

    /// The absolute pickup instant, normalized to UTC.
    pub fn pickup_at(&self) -> DateTime<Utc> {
        self.pickup_at
    }

    /// The operator-supplied lead time.
    pub fn lead_time(&self) -> Duration {
        self.lead_time
    }

    /// The instant the notification should fire at.
    pub fn notify_at(&self) -> DateTime<Utc> {
        self.notify_at
    }
}
