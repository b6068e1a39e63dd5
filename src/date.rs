//! Date heuristics for time-like cells.
//!
//! Cells holding instants come in whatever layout the spreadsheet author
//! typed. [`parse_date`] tries a fixed list of layouts in order and never
//! fails: blank cells and unrecognized text map to two distinct sentinel
//! instants, see [`DateSentinel`].

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::value::Instant;

/// The layouts tried by [`parse_date`], in priority order.
pub const LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y/%-m/%-d %-H:%-M:%-S",
    "%m/%d/%y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%-m/%-d/%y %-H:%-M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Character shape each entry of [`LAYOUTS`] must have, checked before
/// parsing. `D` is one digit, `d` is one or two digits, `F` is a run of
/// digits; anything else is literal.
const SHAPES: &[&str] = &[
    "DDDD-DD-DD d:DD:DD",
    "DDDD/d/d d:d:d",
    "DD/DD/DD d:DD",
    "DDDD/DD/DD d:DD:DD",
    "d/d/DD d:d",
    "DDDD-DD-DDTd:DD:DD",
    "DDDD-DD-DDTd:DD:DD.F",
];

/// Text that spreadsheets use for an unset instant.
pub const ZERO_DATE_TEXT: &str = "0000-00-00 00:00:00";

/// The two instants [`parse_date`] substitutes when it cannot read a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSentinel {
    /// Blank or zero-date text: `1970-01-01 00:00:00` local
    Blank,
    /// Text matching no layout: `1971-01-01 00:00:00` local
    Unrecognized,
}

impl DateSentinel {
    /// The instant standing in for this case.
    pub fn instant(self) -> Instant {
        let year = match self {
            DateSentinel::Blank => 1970,
            DateSentinel::Unrecognized => 1971,
        };
        let naive = NaiveDate::from_ymd_opt(year, 1, 1)
            .unwrap_or_default()
            .and_time(NaiveTime::default());
        local(naive)
    }
}

/// Which sentinel `instant` is, if any.
pub fn sentinel_of(instant: &Instant) -> Option<DateSentinel> {
    [DateSentinel::Blank, DateSentinel::Unrecognized]
        .into_iter()
        .find(|s| s.instant() == *instant)
}

/// Reads `text` as a local instant. Never fails.
///
/// ```
/// use cellcast::{parse_date, sentinel_of, DateSentinel};
///
/// assert_eq!(sentinel_of(&parse_date("")), Some(DateSentinel::Blank));
/// assert_eq!(sentinel_of(&parse_date("soon")), Some(DateSentinel::Unrecognized));
/// assert_eq!(parse_date("2023-08-13 00:00:00").format("%F").to_string(), "2023-08-13");
/// ```
pub fn parse_date(text: &str) -> Instant {
    if text.is_empty() || text == ZERO_DATE_TEXT {
        return DateSentinel::Blank.instant();
    }
    try_parse_date(text).unwrap_or_else(|| {
        log::trace!("parse_date: no layout matches {text:?}");
        DateSentinel::Unrecognized.instant()
    })
}

/// Tries each layout in order and returns the first match, as local time.
///
/// Field widths are fixed: `2023-8-3 9:5:1` matches no layout, and neither
/// does text with surrounding whitespace or a signed year.
pub fn try_parse_date(text: &str) -> Option<Instant> {
    LAYOUTS.iter().zip(SHAPES).find_map(|(layout, shape)| {
        if !has_shape(text, shape) {
            return None;
        }
        NaiveDateTime::parse_from_str(text, layout)
            .ok()
            .map(|naive| {
                log::trace!("try_parse_date: {text:?} matched {layout:?}");
                local(naive)
            })
    })
}

fn has_shape(text: &str, shape: &str) -> bool {
    let mut rest = text.as_bytes();
    for p in shape.bytes() {
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        let taken = match p {
            b'D' if digits >= 1 => 1,
            b'd' if digits >= 1 => digits.min(2),
            b'F' if digits >= 1 => digits,
            b'D' | b'd' | b'F' => return false,
            lit if rest.first() == Some(&lit) => 1,
            _ => return false,
        };
        rest = &rest[taken..];
    }
    rest.is_empty()
}

/// Like [`parse_date`] but `None` for unrecognized text. Blank text is
/// still the blank sentinel.
pub(crate) fn parse_date_strict(text: &str) -> Option<Instant> {
    if text.is_empty() || text == ZERO_DATE_TEXT {
        return Some(DateSentinel::Blank.instant());
    }
    try_parse_date(text)
}

/// Interprets a wall-clock time in the local zone. Times skipped by a DST
/// transition are taken as UTC.
fn local(naive: NaiveDateTime) -> Instant {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
        .fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd_hms(i: Instant) -> (i32, u32, u32, u32, u32, u32) {
        (i.year(), i.month(), i.day(), i.hour(), i.minute(), i.second())
    }

    #[test]
    fn layouts_in_order() {
        let cases = [
            ("2023-08-13 09:05:01", (2023, 8, 13, 9, 5, 1)),
            ("2023/8/3 9:5:1", (2023, 8, 3, 9, 5, 1)),
            ("08/13/23 09:05", (2023, 8, 13, 9, 5, 0)),
            ("2023/08/13 09:05:01", (2023, 8, 13, 9, 5, 1)),
            ("8/3/23 9:05", (2023, 8, 3, 9, 5, 0)),
            ("2023-08-13T09:05:01", (2023, 8, 13, 9, 5, 1)),
            ("2023-08-13T09:05:01.250", (2023, 8, 13, 9, 5, 1)),
        ];
        for (text, expected) in cases {
            let parsed = try_parse_date(text).unwrap_or_else(|| panic!("{text} did not parse"));
            assert_eq!(ymd_hms(parsed), expected, "{text}");
        }
    }

    #[test]
    fn every_layout_has_a_shape() {
        assert_eq!(LAYOUTS.len(), SHAPES.len());
    }

    #[test]
    fn shapes() {
        assert!(has_shape("2023-08-13 9:05:01", SHAPES[0]));
        assert!(!has_shape("2023-08-1309:05:01", SHAPES[0]));
        assert!(!has_shape("2023-08-13 09:05:011", SHAPES[0]));
        assert!(has_shape("2023/12/31 23:59:59", SHAPES[1]));
        assert!(!has_shape("2023/123/1 1:1:1", SHAPES[1]));
        assert!(has_shape("2023-08-13T09:05:01.2961605775", SHAPES[6]));
        assert!(!has_shape("2023-08-13T09:05:01.", SHAPES[6]));
    }

    #[test]
    fn fractional_seconds_are_kept() {
        let parsed = try_parse_date("2023-08-13T09:05:01.250").unwrap();
        assert_eq!(parsed.nanosecond(), 250_000_000);
    }

    #[test]
    fn sentinels_are_distinct() {
        assert_ne!(DateSentinel::Blank.instant(), DateSentinel::Unrecognized.instant());
        assert_eq!(sentinel_of(&parse_date(ZERO_DATE_TEXT)), Some(DateSentinel::Blank));
        assert_eq!(
            sentinel_of(&parse_date("13/13/13 25:00")),
            Some(DateSentinel::Unrecognized)
        );
        assert_eq!(sentinel_of(&parse_date("2023-08-13 00:00:00")), None);
    }

    #[test]
    fn strict_rejects_unrecognized_text() {
        assert_eq!(parse_date_strict("garbage"), None);
        assert_eq!(parse_date_strict(""), Some(DateSentinel::Blank.instant()));
    }
}
