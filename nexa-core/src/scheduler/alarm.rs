//! Alarm time parsing.
//!
//! Accepted forms (case, dots and spaces ignored):
//!
//! ```text
//! 07:30  19:05        24-hour
//! 7:30am  7:30 p.m.   12-hour with minutes
//! 7am  11 pm          12-hour, on the hour
//! ```

use chrono::{DateTime, Days, NaiveTime, TimeZone};

use crate::error::{NexaError, Result};

/// Parse a spoken/typed alarm time.
pub fn parse_alarm_time(text: &str) -> Result<NaiveTime> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .flat_map(char::to_lowercase)
        .collect();
    let bad = || NexaError::Format(format!("unrecognised time {text:?}"));

    let (body, meridiem) = if let Some(body) = compact.strip_suffix("am") {
        (body, Some(false))
    } else if let Some(body) = compact.strip_suffix("pm") {
        (body, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let (hour, minute) = match body.split_once(':') {
        Some((h, m)) if m.len() == 2 => (parse_digits(h).ok_or_else(bad)?, parse_digits(m).ok_or_else(bad)?),
        Some(_) => return Err(bad()),
        None if meridiem.is_some() => (parse_digits(body).ok_or_else(bad)?, 0),
        None => return Err(bad()),
    };

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return Err(bad());
            }
            (hour % 12) + if pm { 12 } else { 0 }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(bad)
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// The first instant strictly after `now` whose wall-clock time is `time`.
pub fn next_occurrence<Tz: TimeZone>(time: NaiveTime, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(time)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        match date.checked_add_days(Days::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }
    // Wall-clock time skipped by a DST transition on every candidate day.
    now.clone() + chrono::Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn twenty_four_hour_forms() {
        assert_eq!(parse_alarm_time("07:30").unwrap(), hm(7, 30));
        assert_eq!(parse_alarm_time("19:05").unwrap(), hm(19, 5));
        assert_eq!(parse_alarm_time("0:00").unwrap(), hm(0, 0));
    }

    #[test]
    fn twelve_hour_forms() {
        assert_eq!(parse_alarm_time("7:30am").unwrap(), hm(7, 30));
        assert_eq!(parse_alarm_time("7:30 PM").unwrap(), hm(19, 30));
        assert_eq!(parse_alarm_time("6 a.m.").unwrap(), hm(6, 0));
        assert_eq!(parse_alarm_time("12 am").unwrap(), hm(0, 0));
        assert_eq!(parse_alarm_time("12:15pm").unwrap(), hm(12, 15));
    }

    #[test]
    fn rejects_garbage() {
        for text in ["", "tomorrow", "25:00", "7:5", "13pm", "0am", "7", "7:60", "7:300"] {
            assert!(
                matches!(parse_alarm_time(text), Err(NexaError::Format(_))),
                "{text:?} should not parse"
            );
        }
    }

    #[test]
    fn next_occurrence_is_today_or_tomorrow() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(hm(9, 15), &now),
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 15, 0).unwrap()
        );
        assert_eq!(
            next_occurrence(hm(7, 0), &now),
            Utc.with_ymd_and_hms(2024, 3, 11, 7, 0, 0).unwrap()
        );
        assert_eq!(
            next_occurrence(hm(8, 0), &now),
            Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap()
        );
    }
}
