//! Extraction of pickup-time instructions from free-form text.
//!
//! The grammar is fixed (see the crate-level documentation): a `PU:` line
//! carrying weekday, month, day, optional year, 24-hour `HH:MM` and a
//! timezone abbreviation, plus a lead-time offset written as `<N>h` and/or
//! `<M>m` anywhere in the text.

mod timezone;

use crate::error::{ParseError, ParseResult};
use crate::instruction::PickupInstruction;
use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

static PICKUP_LINE: OnceLock<Regex> = OnceLock::new();
static HOURS_TOKEN: OnceLock<Regex> = OnceLock::new();
static MINUTES_TOKEN: OnceLock<Regex> = OnceLock::new();

const WEEKDAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

fn pickup_line_regex() -> &'static Regex {
    PICKUP_LINE.get_or_init(|| {
        Regex::new(
            r"PU:\s*([A-Z]{3})\s+([A-Z]{3})\s+(\d{1,2})(?:\s+(\d{4}))?\s+(\d{2}):(\d{2})\s+([A-Z]+)",
        )
        .expect("hard-coded pickup line pattern compiles")
    })
}

fn hours_token_regex() -> &'static Regex {
    HOURS_TOKEN
        .get_or_init(|| Regex::new(r"\b(\d{1,2})H\b").expect("hard-coded hours pattern compiles"))
}

fn minutes_token_regex() -> &'static Regex {
    MINUTES_TOKEN
        .get_or_init(|| Regex::new(r"\b(\d{1,2})M\b").expect("hard-coded minutes pattern compiles"))
}

/// Parse a pickup-time instruction out of `text`.
///
/// The whole input is uppercased first, so matching is case-insensitive.
/// When the pickup line carries no year, the civil year of `now` (UTC) is
/// used; an instruction that thereby lands in the past is rejected later by
/// the scheduler rather than rolled into the next year.
///
/// # Arguments
///
/// * `text` - The raw message text (caption, message body, ...)
/// * `now` - The reference instant used for year inference
///
/// # Returns
///
/// The parsed instruction, or which part of the grammar was not satisfied
pub fn parse(text: &str, now: DateTime<Utc>) -> ParseResult<PickupInstruction> {
    let upper = text.to_uppercase();
    let pickup_at = parse_pickup_line(&upper, now)?;
    let lead_time = parse_lead_time(&upper)?;
    Ok(PickupInstruction::new(pickup_at, lead_time))
}

fn parse_pickup_line(upper: &str, now: DateTime<Utc>) -> ParseResult<DateTime<Utc>> {
    let captures = pickup_line_regex().captures(upper).ok_or_else(|| {
        warn!("Pickup Notifier: No pickup line found in text {:?}", upper);
        ParseError::NoPickupLine
    })?;

    let weekday = &captures[1];
    if !WEEKDAYS.contains(&weekday) {
        return Err(malformed(format!("unrecognized weekday: {}", weekday)));
    }

    let month = month_number(&captures[2])
        .ok_or_else(|| malformed(format!("unrecognized month: {}", &captures[2])))?;

    let day: u32 = captures[3]
        .parse()
        .map_err(|_| malformed(format!("day out of range: {}", &captures[3])))?;

    let year: i32 = match captures.get(4) {
        Some(year) => year
            .as_str()
            .parse()
            .map_err(|_| malformed(format!("year out of range: {}", year.as_str())))?,
        None => now.year(),
    };

    let hour: u32 = captures[5]
        .parse()
        .map_err(|_| malformed(format!("hour out of range: {}", &captures[5])))?;
    let minute: u32 = captures[6]
        .parse()
        .map_err(|_| malformed(format!("minute out of range: {}", &captures[6])))?;

    let tz_abbr = &captures[7];
    let zone = timezone::zone_for_abbreviation(tz_abbr).ok_or_else(|| {
        warn!(
            "Pickup Notifier: Unknown timezone abbreviation {} in pickup line",
            tz_abbr
        );
        ParseError::UnknownTimezone(tz_abbr.to_string())
    })?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .ok_or_else(|| {
            warn!(
                "Pickup Notifier: Pickup line fields out of range: {}-{:02}-{:02} {:02}:{:02}",
                year, month, day, hour, minute
            );
            malformed(format!(
                "{}-{:02}-{:02} {:02}:{:02} is not a valid civil time",
                year, month, day, hour, minute
            ))
        })?;

    Ok(resolve_local(zone, naive)?.with_timezone(&Utc))
}

/// Localize a naive wall-clock reading in `zone`.
///
/// Daylight-saving edge cases are deterministic: an ambiguous reading
/// resolves to the earlier occurrence, a nonexistent reading skips forward
/// by one hour.
fn resolve_local(zone: Tz, naive: NaiveDateTime) -> ParseResult<DateTime<Tz>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(instant) => Ok(instant),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => match zone.from_local_datetime(&(naive + Duration::hours(1))) {
            LocalResult::Single(instant) => Ok(instant),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest),
            LocalResult::None => Err(malformed(format!(
                "local time {} does not exist in {}",
                naive, zone
            ))),
        },
    }
}

fn parse_lead_time(upper: &str) -> ParseResult<Duration> {
    let hours = offset_component(hours_token_regex(), upper);
    let minutes = offset_component(minutes_token_regex(), upper);

    if hours.is_none() && minutes.is_none() {
        warn!("Pickup Notifier: No lead-time offset found in text {:?}", upper);
        return Err(ParseError::NoOffset);
    }

    let total = Duration::hours(hours.unwrap_or(0)) + Duration::minutes(minutes.unwrap_or(0));
    if total <= Duration::zero() {
        warn!("Pickup Notifier: Lead-time offset in text {:?} totals zero", upper);
        return Err(ParseError::NoOffset);
    }

    Ok(total)
}

fn offset_component(pattern: &Regex, upper: &str) -> Option<i64> {
    pattern
        .captures(upper)
        .and_then(|captures| captures[1].parse().ok())
}

fn month_number(abbr: &str) -> Option<u32> {
    match abbr {
        "JAN" => Some(1),
        "FEB" => Some(2),
        "MAR" => Some(3),
        "APR" => Some(4),
        "MAY" => Some(5),
        "JUN" => Some(6),
        "JUL" => Some(7),
        "AUG" => Some(8),
        "SEP" => Some(9),
        "OCT" => Some(10),
        "NOV" => Some(11),
        "DEC" => Some(12),
        _ => None,
    }
}

fn malformed(detail: String) -> ParseError {
    ParseError::MalformedTimestamp(detail)
}
