// src/ingest/dates.rs
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Parse a feed date: RFC 3339, RFC 2822, then the looser ISO-8601 / W3C-DTF
/// forms that `dc:date` carries (date only, minute precision, no offset).
pub fn parse_instant(ts: &str) -> Option<OffsetDateTime> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    OffsetDateTime::parse(ts, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc2822))
        .ok()
        .or_else(|| parse_rfc2822_named_zone(ts))
        .or_else(|| parse_w3c_dtf(ts))
}

/// Render as RFC 3339 in UTC with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub fn to_iso(dt: OffsetDateTime) -> Option<String> {
    dt.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .ok()
}

/// Normalize any parsable feed date to `to_iso` form.
pub fn normalize_date(ts: &str) -> Option<String> {
    parse_instant(ts).and_then(to_iso)
}

/// Sort key in unix nanoseconds; `None` for unparsable input.
pub fn sort_key(ts: &str) -> Option<i128> {
    parse_instant(ts).map(|dt| dt.unix_timestamp_nanos())
}

// Offset-less values are read as UTC.
fn parse_w3c_dtf(ts: &str) -> Option<OffsetDateTime> {
    let mut s = ts.to_string();
    if s.len() > 10 && s.as_bytes()[10] == b' ' {
        s.replace_range(10..11, "T");
    }
    if let Some(head) = s.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        s = format!("{head}+00:00");
    }

    if let Ok(dt) = OffsetDateTime::parse(&s, &Rfc3339) {
        return Some(dt);
    }
    if let Ok(dt) = OffsetDateTime::parse(
        &s,
        format_description!(
            "[year]-[month]-[day]T[hour]:[minute][offset_hour sign:mandatory]:[offset_minute]"
        ),
    ) {
        return Some(dt);
    }
    PrimitiveDateTime::parse(
        &s,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .or_else(|_| PrimitiveDateTime::parse(&s, format_description!("[year]-[month]-[day]T[hour]:[minute]")))
    .map(PrimitiveDateTime::assume_utc)
    .ok()
    .or_else(|| {
        Date::parse(&s, format_description!("[year]-[month]-[day]"))
            .ok()
            .map(|d| d.midnight().assume_utc())
    })
}

// RFC 2822 parsing in `time` only accepts numeric offsets plus "GMT"/"UT";
// plenty of feeds still emit US zone names.
fn parse_rfc2822_named_zone(ts: &str) -> Option<OffsetDateTime> {
    let (head, zone) = ts.rsplit_once(' ')?;
    let offset = match zone.to_ascii_uppercase().as_str() {
        "UTC" | "UT" | "GMT" | "Z" => "+0000",
        "EST" => "-0500",
        "EDT" => "-0400",
        "CST" => "-0600",
        "CDT" => "-0500",
        "MST" => "-0700",
        "MDT" => "-0600",
        "PST" => "-0800",
        "PDT" => "-0700",
        _ => return None,
    };
    OffsetDateTime::parse(&format!("{head} {offset}"), &Rfc2822).ok()
}
