use chrono_tz::Tz;

/// Resolve a supported timezone abbreviation to its geographic zone.
///
/// The abbreviation only selects the zone; the zone database decides the
/// actual offset for the date. `14:30 EST` on a July date still resolves
/// through America/New_York's daylight-saving rules.
pub(super) fn zone_for_abbreviation(abbr: &str) -> Option<Tz> {
    match abbr {
        "EDT" | "EST" => Some(Tz::America__New_York),
        "CDT" | "CST" => Some(Tz::America__Chicago),
        "MDT" | "MST" => Some(Tz::America__Denver),
        "PDT" | "PST" => Some(Tz::America__Los_Angeles),
        _ => None,
    }
}
