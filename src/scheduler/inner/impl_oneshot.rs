use super::utils;
use crate::destination::Destination;
use crate::error::{SchedulerError, SchedulerResult};
use crate::instruction::PickupInstruction;
use crate::job_id::JobId;
use crate::scheduler::inner::job::{JobStatus, ScheduledJob};
use crate::scheduler::inner::{DeliveryLambda, SchedulerInner};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

impl SchedulerInner {
    pub(in crate::scheduler) fn schedule_notification(
        &mut self,
        registry: Weak<Mutex<SchedulerInner>>,
        instruction: &PickupInstruction,
        destination: Destination,
        now: DateTime<Utc>,
    ) -> SchedulerResult<JobId> {
        if self.terminated {
            warn!("Pickup Notifier: Refusing to schedule on a shut down scheduler");
            return Err(SchedulerError::Terminated);
        }

        let notify_at = instruction.notify_at();
        if notify_at <= now {
            warn!(
                "Pickup Notifier: Notification time {} for pickup at {} is not in the future (now: {})",
                notify_at,
                instruction.pickup_at(),
                now
            );
            return Err(SchedulerError::PastDue { notify_at, now });
        }

        let job_id = utils::generate_job_id();

        debug!(
            "Pickup Notifier: Scheduling job with id {} to fire at {} for pickup at {}",
            job_id,
            notify_at,
            instruction.pickup_at()
        );

        let span = info_span!("Pickup Notification Job", job_id = %job_id, notify_at = %notify_at);
        let cancellation_token = CancellationToken::new();
        let cloned_token = cancellation_token.clone();
        let deliver = self.deliver.clone();
        let task_destination = destination.clone();
        let task_job_id = job_id.clone();

        //the past-due check above guarantees a positive offset
        let offset_millis = (notify_at - now).num_milliseconds() as u64;

        let join = tokio::spawn(
            async move {
                select! {
                    _ = tokio::time::sleep(Duration::from_millis(offset_millis)) => {
                        fire(registry, task_job_id, deliver, task_destination).await;
                    }
                    _ = cloned_token.cancelled() => {
                        info!("Pickup Notifier: Job was cancelled while waiting");
                    }
                }
            }
            .instrument(span),
        );

        self.jobs.insert(
            job_id.clone(),
            ScheduledJob {
                status: JobStatus::Pending,
                notify_at,
                destination,
                cancellation_token,
                join,
            },
        );

        Ok(JobId::new(job_id))
    }
}

/// Timer-elapsed path: claim the fire under the registry lock, then await
/// the delivery lambda. Only a `Pending` job may fire, and only once.
async fn fire(
    registry: Weak<Mutex<SchedulerInner>>,
    job_id: String,
    deliver: Arc<DeliveryLambda>,
    destination: Destination,
) {
    //the guard must not be held across the delivery await
    let claimed = match registry.upgrade() {
        Some(inner) => match inner.lock() {
            Ok(mut inner) => inner.claim_fire(&job_id),
            Err(err) => {
                warn!(
                    "Pickup Notifier: Mutex error at fire time for job {}: {}",
                    job_id, err
                );
                false
            }
        },
        //scheduler was dropped while the timer slept
        None => false,
    };
    if !claimed {
        return;
    }

    debug!(
        "Pickup Notifier: Delivering notification for job {}",
        job_id
    );
    if let Err(err) = deliver(destination).await {
        //fire-and-forget: the job stays Fired, no retry, no re-arm
        warn!(
            "Pickup Notifier: Delivery failed for job {}: {}",
            job_id, err
        );
    } else {
        info!(
            "Pickup Notifier: Notification delivered for job {}",
            job_id
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::destination::Destination;
    use crate::error::{DeliveryError, SchedulerError};
    use crate::instruction::{PickupInstruction, FIXED_BUFFER_MINUTES};
    use crate::job_id::JobId;
    use crate::parser;
    use crate::scheduler::{JobStatus, Scheduler};
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::sleep;

    // builds an instruction whose notification instant is `seconds` away from `now`
    fn instruction_firing_in(seconds: i64, now: DateTime<Utc>) -> PickupInstruction {
        let lead_time = ChronoDuration::hours(1);
        let pickup_at = now
            + ChronoDuration::seconds(seconds)
            + lead_time
            + ChronoDuration::minutes(FIXED_BUFFER_MINUTES);
        PickupInstruction::new(pickup_at, lead_time)
    }

    fn counting_scheduler() -> (Scheduler, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let c_counter = Arc::clone(&counter);
        let scheduler = Scheduler::new(move |_destination| {
            let cc_counter = Arc::clone(&c_counter);
            async move {
                cc_counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        (scheduler, counter)
    }

    #[tokio::test]
    async fn scheduled_job_fires_exactly_once() {
        let (scheduler, counter) = counting_scheduler();
        let now = Utc::now();

        let job_id = scheduler
            .schedule(&instruction_firing_in(1, now), Destination::new("chat-1"), now)
            .unwrap();
        assert_eq!(scheduler.job_status(&job_id).unwrap(), JobStatus::Pending);

        sleep(Duration::from_secs(2)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.job_status(&job_id).unwrap(), JobStatus::Fired);
    }

    #[tokio::test]
    async fn parsed_text_flows_through_to_delivery() {
        let (scheduler, counter) = counting_scheduler();

        // notification instant of this text is Jun 2 16:20 UTC
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 16, 19, 59).unwrap();
        let instruction = parser::parse("PU: Mon Jun 02 14:30 EDT, 2h", now).unwrap();

        let job_id = scheduler
            .schedule(&instruction, Destination::new("chat-1"), now)
            .unwrap();

        sleep(Duration::from_secs(2)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.job_status(&job_id).unwrap(), JobStatus::Fired);
    }

    #[tokio::test]
    async fn parsed_text_already_past_is_rejected() {
        let (scheduler, counter) = counting_scheduler();

        let now = Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap();
        let instruction = parser::parse("PU: Mon Jun 02 14:30 EDT, 2h", now).unwrap();

        let result = scheduler.schedule(&instruction, Destination::new("chat-1"), now);
        assert!(matches!(result, Err(SchedulerError::PastDue { .. })));

        sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn past_due_instruction_is_rejected() {
        let (scheduler, counter) = counting_scheduler();
        let now = Utc::now();

        let result = scheduler.schedule(
            &instruction_firing_in(-2, now),
            Destination::new("chat-1"),
            now,
        );
        assert!(matches!(result, Err(SchedulerError::PastDue { .. })));

        sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn notification_instant_equal_to_now_is_rejected() {
        let (scheduler, _counter) = counting_scheduler();
        let now = Utc::now();

        let result = scheduler.schedule(
            &instruction_firing_in(0, now),
            Destination::new("chat-1"),
            now,
        );
        assert!(matches!(result, Err(SchedulerError::PastDue { .. })));
    }

    #[tokio::test]
    async fn cancelled_job_does_not_fire() {
        let (scheduler, counter) = counting_scheduler();
        let now = Utc::now();

        let job_id = scheduler
            .schedule(&instruction_firing_in(2, now), Destination::new("chat-1"), now)
            .unwrap();
        scheduler.cancel_job(&job_id).unwrap();

        sleep(Duration::from_secs(3)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.job_status(&job_id).unwrap(), JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancelling_a_fired_job_is_refused() {
        let (scheduler, counter) = counting_scheduler();
        let now = Utc::now();

        let job_id = scheduler
            .schedule(&instruction_firing_in(1, now), Destination::new("chat-1"), now)
            .unwrap();
        sleep(Duration::from_secs(2)).await;

        assert!(matches!(
            scheduler.cancel_job(&job_id),
            Err(SchedulerError::AlreadyFinalized(_))
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelling_twice_is_refused() {
        let (scheduler, _counter) = counting_scheduler();
        let now = Utc::now();

        let job_id = scheduler
            .schedule(&instruction_firing_in(5, now), Destination::new("chat-1"), now)
            .unwrap();
        scheduler.cancel_job(&job_id).unwrap();

        assert!(matches!(
            scheduler.cancel_job(&job_id),
            Err(SchedulerError::AlreadyFinalized(_))
        ));
    }

    #[tokio::test]
    async fn cancelling_an_unknown_job_is_refused() {
        let (scheduler, _counter) = counting_scheduler();
        let bogus = JobId::new("pickup_job/missing".to_string());

        assert!(matches!(
            scheduler.cancel_job(&bogus),
            Err(SchedulerError::JobNotFoundError(_))
        ));
    }

    #[tokio::test]
    async fn jobs_fire_independently() {
        let (scheduler, counter) = counting_scheduler();
        let now = Utc::now();

        scheduler
            .schedule(&instruction_firing_in(1, now), Destination::new("chat-1"), now)
            .unwrap();
        scheduler
            .schedule(&instruction_firing_in(1, now), Destination::new("chat-2"), now)
            .unwrap();

        sleep(Duration::from_secs(2)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn delivery_failure_still_finalizes_the_job() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let c_attempts = Arc::clone(&attempts);
        let scheduler = Scheduler::new(move |_destination| {
            let cc_attempts = Arc::clone(&c_attempts);
            async move {
                cc_attempts.fetch_add(1, Ordering::SeqCst);
                Err(DeliveryError::new("transport down"))
            }
        });
        let now = Utc::now();

        let job_id = scheduler
            .schedule(&instruction_firing_in(1, now), Destination::new("chat-1"), now)
            .unwrap();
        sleep(Duration::from_secs(2)).await;

        // attempted once, no retry, terminal regardless of the outcome
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.job_status(&job_id).unwrap(), JobStatus::Fired);
    }

    #[tokio::test]
    async fn failing_delivery_does_not_affect_other_jobs() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let c_delivered = Arc::clone(&delivered);
        let scheduler = Scheduler::new(move |destination: Destination| {
            let cc_delivered = Arc::clone(&c_delivered);
            async move {
                if destination.conversation == "broken" {
                    Err(DeliveryError::new("transport down"))
                } else {
                    cc_delivered.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        });
        let now = Utc::now();

        scheduler
            .schedule(&instruction_firing_in(1, now), Destination::new("broken"), now)
            .unwrap();
        scheduler
            .schedule(&instruction_firing_in(1, now), Destination::new("chat-1"), now)
            .unwrap();

        sleep(Duration::from_secs(2)).await;

        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_jobs_and_refuses_new_ones() {
        let (scheduler, counter) = counting_scheduler();
        let now = Utc::now();

        let job_id = scheduler
            .schedule(&instruction_firing_in(1, now), Destination::new("chat-1"), now)
            .unwrap();
        scheduler.shutdown().unwrap();

        sleep(Duration::from_secs(2)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.job_status(&job_id).unwrap(), JobStatus::Cancelled);

        let now = Utc::now();
        let result = scheduler.schedule(
            &instruction_firing_in(5, now),
            Destination::new("chat-1"),
            now,
        );
        assert!(matches!(result, Err(SchedulerError::Terminated)));
    }

    #[tokio::test]
    async fn destination_reaches_the_delivery_callback_unchanged() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let c_seen = Arc::clone(&seen);
        let scheduler = Scheduler::new(move |destination: Destination| {
            let cc_seen = Arc::clone(&c_seen);
            async move {
                cc_seen.lock().unwrap().push(destination);
                Ok(())
            }
        });
        let now = Utc::now();

        let destination = Destination {
            conversation: "chat-7".to_string(),
            reply_to: Some("msg-3".to_string()),
            content: Some("file-9".to_string()),
        };
        scheduler
            .schedule(&instruction_firing_in(1, now), destination.clone(), now)
            .unwrap();

        sleep(Duration::from_secs(2)).await;

        assert_eq!(*seen.lock().unwrap(), vec![destination]);
    }
}
