//! Pickup notification scheduling for chat-style message flows.
//!
//! The crate takes the free-form text attached to an incoming message (a
//! caption, a plain message, anything), extracts a pickup-time instruction
//! from it, and delivers exactly one reminder notification ahead of the
//! pickup through a delivery callback supplied by the hosting application.
//! The messaging transport itself is not part of the crate; the core only
//! sees a piece of text and an opaque destination handle.
//!
//! # Input format
//!
//! A text is accepted when it carries a pickup line and a lead-time offset,
//! anywhere in the text. Matching is case-insensitive. The pickup line is
//!
//! ```text
//! PU: <weekday> <month> <day> [<year>] <HH:MM> <TZ>
//! ```
//!
//! for example `PU: Mon Jun 02 14:30 EDT` or `PU: Fri Dec 19 2026 08:00 PST`.
//! When the year is omitted, the current year is used. `<TZ>` must be one of
//! the supported abbreviations:
//!
//! | Abbreviation | Zone                |
//! |--------------|---------------------|
//! | EDT, EST     | America/New_York    |
//! | CDT, CST     | America/Chicago     |
//! | MDT, MST     | America/Denver      |
//! | PDT, PST     | America/Los_Angeles |
//!
//! The lead-time offset is written as `<N>h`, `<M>m`, or both, for example
//! `2h`, `45m` or `1h 30m`. The notification fires at the pickup time minus
//! the lead time minus a fixed 10 minute buffer.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use pickup_notifier::destination::Destination;
//! use pickup_notifier::scheduler::Scheduler;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = Scheduler::new(|destination| async move {
//!     tracing::info!("sending reminder to {}", destination.conversation);
//!     Ok(())
//! });
//!
//! let now = Utc::now();
//! let instruction = pickup_notifier::parser::parse("PU: Mon Jun 02 14:30 EDT, 2h", now)?;
//! let job_id = scheduler.schedule(&instruction, Destination::new("chat-42"), now)?;
//! tracing::info!("reminder scheduled as {}", job_id);
//! # Ok(())
//! # }
//! ```

pub mod destination;
pub mod error;
pub mod instruction;
pub mod job_id;
pub mod parser;
pub mod scheduler;
