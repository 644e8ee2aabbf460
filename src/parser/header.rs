use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// Classification of a single preprocessed transcript line
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LineKind {
    /// A new-message header with a resolved timestamp and sender
    Header {
        timestamp: NaiveDateTime,
        sender: String,
        body: String,
    },
    /// A timestamped line without a sender colon, e.g. a group-name banner.
    /// Closes the open message and is itself dropped.
    Banner,
    /// Anything else folds into the currently open message
    Continuation,
}

// Bracketed ISO grammar: [2025-10-08, 22:07:34] Sender: body
fn iso_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[(\d{4})-(\d{2})-(\d{2}),\s*(\d{2}):(\d{2}):(\d{2})\]\s+(.*)$")
            .expect("invalid iso header regex")
    })
}

// Slash-date 12-hour grammar: 8/10/25, 10:07 PM - Sender: body
// Seconds are optional, years may be 2 or 4 digits.
fn slash_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{1,2})/(\d{1,2})/(\d{2,4}),\s*(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([AaPp])\.?[Mm]\.?\s*-\s+(.*)$",
        )
        .expect("invalid slash header regex")
    })
}

/// Classify one line against both supported header grammars.
///
/// Malformed timestamps that fail calendar resolution are demoted to
/// continuations, so parsing degrades instead of aborting.
pub(crate) fn classify_line(line: &str) -> LineKind {
    if let Some(caps) = iso_header_re().captures(line) {
        let date = NaiveDate::from_ymd_opt(
            field(&caps, 1),
            field(&caps, 2) as u32,
            field(&caps, 3) as u32,
        );
        let time = NaiveTime::from_hms_opt(
            field(&caps, 4) as u32,
            field(&caps, 5) as u32,
            field(&caps, 6) as u32,
        );
        return match (date, time) {
            (Some(date), Some(time)) => split_sender(date.and_time(time), &caps[7]),
            _ => LineKind::Continuation,
        };
    }

    if let Some(caps) = slash_header_re().captures(line) {
        let day = field(&caps, 1) as u32;
        let month = field(&caps, 2) as u32;
        let mut year = field(&caps, 3);
        if year < 100 {
            year += 2000;
        }
        let hour = to_24h(field(&caps, 4) as u32, &caps[7]);
        let minute = field(&caps, 5) as u32;
        let second = caps
            .get(6)
            .map(|m| m.as_str().parse().unwrap_or(0))
            .unwrap_or(0);

        let date = NaiveDate::from_ymd_opt(year, month, day);
        let time = NaiveTime::from_hms_opt(hour, minute, second);
        return match (date, time) {
            (Some(date), Some(time)) => split_sender(date.and_time(time), &caps[8]),
            _ => LineKind::Continuation,
        };
    }

    LineKind::Continuation
}

fn field(caps: &regex::Captures<'_>, idx: usize) -> i32 {
    caps[idx].parse().unwrap_or(0)
}

/// 12-hour to 24-hour: 12 AM is midnight, PM adds 12 unless already 12
fn to_24h(hour: u32, meridiem: &str) -> u32 {
    let pm = meridiem.eq_ignore_ascii_case("p");
    match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    }
}

/// Split the post-timestamp rest into sender and body at the first colon.
/// No colon means a sender-less system line.
fn split_sender(timestamp: NaiveDateTime, rest: &str) -> LineKind {
    match rest.split_once(':') {
        Some((sender, body)) => LineKind::Header {
            timestamp,
            sender: sender.trim().to_string(),
            body: body.trim().to_string(),
        },
        None => LineKind::Banner,
    }
}
