use chrono::{DateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// A curated timezone choice with a friendly label, grouped by region.
#[derive(Debug, Clone, Serialize)]
pub struct TimezoneOption {
    pub value: &'static str,
    pub label: &'static str,
    pub region: &'static str,
}

const fn tz(value: &'static str, label: &'static str, region: &'static str) -> TimezoneOption {
    TimezoneOption { value, label, region }
}

/// Popular timezones offered in trip settings, grouped by region.
pub const TIMEZONE_OPTIONS: &[TimezoneOption] = &[
    // North America
    tz("America/Los_Angeles", "Los Angeles (Pacific)", "North America"),
    tz("America/Denver", "Denver (Mountain)", "North America"),
    tz("America/Chicago", "Chicago (Central)", "North America"),
    tz("America/New_York", "New York (Eastern)", "North America"),
    tz("America/Toronto", "Toronto", "North America"),
    tz("America/Vancouver", "Vancouver", "North America"),
    tz("America/Phoenix", "Phoenix (Arizona)", "North America"),
    tz("America/Anchorage", "Anchorage (Alaska)", "North America"),
    tz("Pacific/Honolulu", "Honolulu (Hawaii)", "North America"),
    // Europe
    tz("Europe/London", "London", "Europe"),
    tz("Europe/Paris", "Paris", "Europe"),
    tz("Europe/Berlin", "Berlin", "Europe"),
    tz("Europe/Rome", "Rome", "Europe"),
    tz("Europe/Madrid", "Madrid", "Europe"),
    tz("Europe/Amsterdam", "Amsterdam", "Europe"),
    tz("Europe/Zurich", "Zurich", "Europe"),
    tz("Europe/Vienna", "Vienna", "Europe"),
    tz("Europe/Prague", "Prague", "Europe"),
    tz("Europe/Stockholm", "Stockholm", "Europe"),
    tz("Europe/Athens", "Athens", "Europe"),
    tz("Europe/Istanbul", "Istanbul", "Europe"),
    tz("Europe/Moscow", "Moscow", "Europe"),
    // Asia
    tz("Asia/Dubai", "Dubai", "Asia"),
    tz("Asia/Kolkata", "Mumbai / Delhi", "Asia"),
    tz("Asia/Bangkok", "Bangkok", "Asia"),
    tz("Asia/Singapore", "Singapore", "Asia"),
    tz("Asia/Hong_Kong", "Hong Kong", "Asia"),
    tz("Asia/Shanghai", "Shanghai / Beijing", "Asia"),
    tz("Asia/Taipei", "Taipei", "Asia"),
    tz("Asia/Seoul", "Seoul", "Asia"),
    tz("Asia/Tokyo", "Tokyo", "Asia"),
    // Australia & Pacific
    tz("Australia/Perth", "Perth", "Australia & Pacific"),
    tz("Australia/Adelaide", "Adelaide", "Australia & Pacific"),
    tz("Australia/Sydney", "Sydney", "Australia & Pacific"),
    tz("Australia/Melbourne", "Melbourne", "Australia & Pacific"),
    tz("Australia/Brisbane", "Brisbane", "Australia & Pacific"),
    tz("Pacific/Auckland", "Auckland", "Australia & Pacific"),
    // South America
    tz("America/Sao_Paulo", "Sao Paulo", "South America"),
    tz("America/Buenos_Aires", "Buenos Aires", "South America"),
    tz("America/Lima", "Lima", "South America"),
    tz("America/Bogota", "Bogota", "South America"),
    tz("America/Santiago", "Santiago", "South America"),
    // Africa & Middle East
    tz("Africa/Cairo", "Cairo", "Africa & Middle East"),
    tz("Africa/Johannesburg", "Johannesburg", "Africa & Middle East"),
    tz("Africa/Lagos", "Lagos", "Africa & Middle East"),
    tz("Asia/Jerusalem", "Jerusalem / Tel Aviv", "Africa & Middle East"),
];

/// Group the curated options by region, preserving table order.
pub fn grouped_timezones() -> Vec<(&'static str, Vec<&'static TimezoneOption>)> {
    let mut grouped: Vec<(&'static str, Vec<&'static TimezoneOption>)> = Vec::new();
    for option in TIMEZONE_OPTIONS {
        match grouped.iter_mut().find(|(region, _)| *region == option.region) {
            Some((_, entries)) => entries.push(option),
            None => grouped.push((option.region, vec![option])),
        }
    }
    grouped
}

/// Offset of `zone` from UTC in seconds at the given instant, accounting for
/// that zone's DST rules. `None` for unrecognized identifiers.
fn offset_seconds(zone: &str, at: DateTime<Utc>) -> Option<i32> {
    let tz: Tz = zone.parse().ok()?;
    Some(at.with_timezone(&tz).offset().fix().local_minus_utc())
}

/// Signed hour difference between two zones at an instant: positive when the
/// destination (`to_zone`) is ahead of home (`from_zone`). Unrecognized zone
/// identifiers are absorbed as 0, never an error.
pub fn offset_hours(from_zone: &str, to_zone: &str, at: DateTime<Utc>) -> f64 {
    match (offset_seconds(from_zone, at), offset_seconds(to_zone, at)) {
        (Some(from), Some(to)) => f64::from(to - from) / 3600.0,
        _ => 0.0,
    }
}

/// Format an hour offset as a readable label: `"same time"`, `"+9h"`, `"-5h 30m"`.
pub fn format_offset(hours: f64) -> String {
    if hours == 0.0 {
        return "same time".to_string();
    }
    let sign = if hours > 0.0 { '+' } else { '-' };
    let abs = hours.abs();
    let whole = abs.floor() as i64;
    let minutes = ((abs - abs.floor()) * 60.0).round() as i64;

    if minutes == 0 {
        format!("{sign}{whole}h")
    } else {
        format!("{sign}{whole}h {minutes}m")
    }
}

/// Short zone label at an instant (e.g. "EST", "CET", or "+07" for zones
/// without a letter abbreviation). Falls back to the raw identifier when the
/// zone is unrecognized.
pub fn abbreviation(zone: &str, at: DateTime<Utc>) -> String {
    match zone.parse::<Tz>() {
        Ok(tz) => at.with_timezone(&tz).format("%Z").to_string(),
        Err(_) => zone.to_string(),
    }
}

/// Replace the clock portion of a stored date with an `HH:MM` time-of-day
/// string, preserving the date's calendar day. Proposals store the date and
/// the destination-local time separately; this yields the effective instant
/// used for display ordering. A missing or malformed time leaves the date
/// untouched.
pub fn combine_date_and_time(date: DateTime<Utc>, time: Option<&str>) -> DateTime<Utc> {
    let Some(time) = time else { return date };
    let Ok(parsed) = NaiveTime::parse_from_str(time, "%H:%M") else {
        return date;
    };
    date.date_naive().and_time(parsed).and_utc()
}

/// Format a time of day in a zone, e.g. "3:05 PM". Falls back to UTC for
/// unrecognized zones.
pub fn format_time_in(zone: &str, at: DateTime<Utc>) -> String {
    match zone.parse::<Tz>() {
        Ok(tz) => at.with_timezone(&tz).format("%-I:%M %p").to_string(),
        Err(_) => at.format("%-I:%M %p").to_string(),
    }
}

/// Format a date in a zone, e.g. "Sat, Mar 14". Falls back to UTC for
/// unrecognized zones.
pub fn format_date_in(zone: &str, at: DateTime<Utc>) -> String {
    match zone.parse::<Tz>() {
        Ok(tz) => at.with_timezone(&tz).format("%a, %b %-d").to_string(),
        Err(_) => at.format("%a, %b %-d").to_string(),
    }
}

/// A stored proposal time is a wall-clock reading in the destination zone.
/// Reinterpret it there, then render the same instant on the home clock, so
/// members at home see when an activity actually happens for them. Falls back
/// to treating the wall clock as UTC when the destination zone is unknown or
/// the reading lands in a DST gap.
pub fn format_in_home_zone(
    home_zone: &str,
    destination_zone: &str,
    wall: DateTime<Utc>,
) -> String {
    let Ok(dest) = destination_zone.parse::<Tz>() else {
        return format_time_in(home_zone, wall);
    };
    match dest.from_local_datetime(&wall.naive_utc()).single() {
        Some(instant) => format_time_in(home_zone, instant.with_timezone(&Utc)),
        None => format_time_in(home_zone, wall),
    }
}

/// Best-effort destination timezone from a city/destination name.
pub fn suggest_timezone_for_city(city: &str) -> Option<&'static str> {
    let city = city.to_lowercase();

    const CITY_ZONES: &[(&str, &str)] = &[
        // North America
        ("los angeles", "America/Los_Angeles"),
        ("san francisco", "America/Los_Angeles"),
        ("seattle", "America/Los_Angeles"),
        ("las vegas", "America/Los_Angeles"),
        ("san diego", "America/Los_Angeles"),
        ("denver", "America/Denver"),
        ("phoenix", "America/Phoenix"),
        ("chicago", "America/Chicago"),
        ("houston", "America/Chicago"),
        ("dallas", "America/Chicago"),
        ("austin", "America/Chicago"),
        ("new york", "America/New_York"),
        ("nyc", "America/New_York"),
        ("boston", "America/New_York"),
        ("miami", "America/New_York"),
        ("atlanta", "America/New_York"),
        ("toronto", "America/Toronto"),
        ("vancouver", "America/Vancouver"),
        ("honolulu", "Pacific/Honolulu"),
        ("hawaii", "Pacific/Honolulu"),
        // Europe
        ("london", "Europe/London"),
        ("paris", "Europe/Paris"),
        ("berlin", "Europe/Berlin"),
        ("munich", "Europe/Berlin"),
        ("rome", "Europe/Rome"),
        ("milan", "Europe/Rome"),
        ("florence", "Europe/Rome"),
        ("venice", "Europe/Rome"),
        ("madrid", "Europe/Madrid"),
        ("barcelona", "Europe/Madrid"),
        ("amsterdam", "Europe/Amsterdam"),
        ("zurich", "Europe/Zurich"),
        ("geneva", "Europe/Zurich"),
        ("vienna", "Europe/Vienna"),
        ("prague", "Europe/Prague"),
        ("stockholm", "Europe/Stockholm"),
        ("copenhagen", "Europe/Stockholm"),
        ("athens", "Europe/Athens"),
        ("istanbul", "Europe/Istanbul"),
        ("moscow", "Europe/Moscow"),
        ("lisbon", "Europe/London"),
        ("dublin", "Europe/London"),
        ("edinburgh", "Europe/London"),
        // Asia
        ("tokyo", "Asia/Tokyo"),
        ("osaka", "Asia/Tokyo"),
        ("kyoto", "Asia/Tokyo"),
        ("seoul", "Asia/Seoul"),
        ("shanghai", "Asia/Shanghai"),
        ("beijing", "Asia/Shanghai"),
        ("hong kong", "Asia/Hong_Kong"),
        ("taipei", "Asia/Taipei"),
        ("singapore", "Asia/Singapore"),
        ("bangkok", "Asia/Bangkok"),
        ("dubai", "Asia/Dubai"),
        ("mumbai", "Asia/Kolkata"),
        ("delhi", "Asia/Kolkata"),
        ("bangalore", "Asia/Kolkata"),
        // Australia & Pacific
        ("sydney", "Australia/Sydney"),
        ("melbourne", "Australia/Melbourne"),
        ("brisbane", "Australia/Brisbane"),
        ("perth", "Australia/Perth"),
        ("auckland", "Pacific/Auckland"),
        // South America
        ("rio", "America/Sao_Paulo"),
        ("sao paulo", "America/Sao_Paulo"),
        ("buenos aires", "America/Buenos_Aires"),
        ("lima", "America/Lima"),
        // Africa & Middle East
        ("cairo", "Africa/Cairo"),
        ("johannesburg", "Africa/Johannesburg"),
        ("tel aviv", "Asia/Jerusalem"),
        ("jerusalem", "Asia/Jerusalem"),
    ];

    CITY_ZONES
        .iter()
        .find(|(name, _)| city.contains(name))
        .map(|(_, zone)| *zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_offset_tokyo_ahead_of_new_york() {
        // January: EST is UTC-5, Tokyo is UTC+9 year-round
        let hours = offset_hours("America/New_York", "Asia/Tokyo", at(2025, 1, 15));
        assert_eq!(hours, 14.0);
    }

    #[test]
    fn test_offset_respects_independent_dst_rules() {
        // July: New York observes DST (UTC-4), Tokyo never does
        let hours = offset_hours("America/New_York", "Asia/Tokyo", at(2025, 7, 15));
        assert_eq!(hours, 13.0);
    }

    #[test]
    fn test_offset_antisymmetric() {
        let zones = ["America/Los_Angeles", "Europe/Paris", "Asia/Kolkata", "Pacific/Auckland"];
        let instants = [at(2025, 1, 15), at(2025, 7, 15)];
        for a in zones {
            for b in zones {
                for t in instants {
                    assert_eq!(offset_hours(a, b, t), -offset_hours(b, a, t));
                }
            }
        }
    }

    #[test]
    fn test_offset_half_hour_zone() {
        // Kolkata is UTC+5:30, London in January is UTC+0
        let hours = offset_hours("Europe/London", "Asia/Kolkata", at(2025, 1, 15));
        assert_eq!(hours, 5.5);
    }

    #[test]
    fn test_offset_unknown_zone_absorbed() {
        assert_eq!(offset_hours("Not/AZone", "Asia/Tokyo", at(2025, 1, 15)), 0.0);
        assert_eq!(offset_hours("Asia/Tokyo", "Not/AZone", at(2025, 1, 15)), 0.0);
    }

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0.0), "same time");
        assert_eq!(format_offset(9.0), "+9h");
        assert_eq!(format_offset(-5.0), "-5h");
        assert_eq!(format_offset(5.5), "+5h 30m");
        assert_eq!(format_offset(-9.5), "-9h 30m");
    }

    #[test]
    fn test_abbreviation_known_and_unknown() {
        assert_eq!(abbreviation("America/New_York", at(2025, 1, 15)), "EST");
        assert_eq!(abbreviation("America/New_York", at(2025, 7, 15)), "EDT");
        assert_eq!(abbreviation("Not/AZone", at(2025, 1, 15)), "Not/AZone");
    }

    #[test]
    fn test_combine_date_and_time() {
        let date = Utc.with_ymd_and_hms(2025, 3, 14, 23, 45, 0).unwrap();
        let combined = combine_date_and_time(date, Some("09:30"));
        assert_eq!(combined, Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap());
        // The calendar day never shifts
        assert_eq!(combined.date_naive(), date.date_naive());
    }

    #[test]
    fn test_combine_date_and_time_absent_or_malformed() {
        let date = at(2025, 3, 14);
        assert_eq!(combine_date_and_time(date, None), date);
        assert_eq!(combine_date_and_time(date, Some("late morning")), date);
    }

    #[test]
    fn test_format_in_home_zone_converts_destination_wall_clock() {
        // 09:30 in Tokyo (UTC+9) is 00:30 UTC, which is 7:30 PM the previous
        // evening in New York (EST, UTC-5).
        let wall = Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap();
        let label = format_in_home_zone("America/New_York", "Asia/Tokyo", wall);
        assert_eq!(label, "7:30 PM");
    }

    #[test]
    fn test_format_in_home_zone_unknown_destination_reads_as_utc() {
        let wall = Utc.with_ymd_and_hms(2025, 1, 15, 14, 0, 0).unwrap();
        let label = format_in_home_zone("America/New_York", "Not/AZone", wall);
        assert_eq!(label, "9:00 AM");
    }

    #[test]
    fn test_suggest_timezone_for_city() {
        assert_eq!(suggest_timezone_for_city("Tokyo"), Some("Asia/Tokyo"));
        assert_eq!(suggest_timezone_for_city("trip to new york!"), Some("America/New_York"));
        assert_eq!(suggest_timezone_for_city("Atlantis"), None);
    }

    #[test]
    fn test_grouped_timezones_covers_all_options() {
        let grouped = grouped_timezones();
        let total: usize = grouped.iter().map(|(_, entries)| entries.len()).sum();
        assert_eq!(total, TIMEZONE_OPTIONS.len());
        assert_eq!(grouped[0].0, "North America");
    }
}
