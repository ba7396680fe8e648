//! Locale-tolerant date/time parsing for statement cells.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Parses free-form date/time text into a wall-clock timestamp
pub trait DateTimeParser: Send + Sync {
    fn parse(&self, raw: &str) -> Option<NaiveDateTime>;
}

/// Which component comes first in ambiguous numeric dates like `01/02/2023`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    DayFirst,
    MonthFirst,
}

const DAY_FIRST_DATETIME: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y %I:%M:%S %p",
    "%d/%m/%Y %I:%M %p",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d-%m-%Y %I:%M:%S %p",
    "%d-%m-%Y %I:%M %p",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const MONTH_FIRST_DATETIME: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    "%m-%d-%Y %I:%M:%S %p",
    "%m-%d-%Y %I:%M %p",
];

const DAY_FIRST_DATE: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
const MONTH_FIRST_DATE: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];

const DAY_FIRST_SHORT_YEAR: &[&str] = &["%d/%m/%y %H:%M:%S", "%d/%m/%y %H:%M", "%d/%m/%y", "%d-%m-%y"];
const MONTH_FIRST_SHORT_YEAR: &[&str] = &["%m/%d/%y %H:%M:%S", "%m/%d/%y %H:%M", "%m/%d/%y", "%m-%d-%y"];

/// Order-independent layouts: ISO-like and month-name forms
const UNAMBIGUOUS_DATETIME: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %I:%M:%S %p",
    "%d-%b-%Y %I:%M %p",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %I:%M %p",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %I:%M %p",
];

const UNAMBIGUOUS_DATE: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%y",
];

/// Format-list parser in the spirit of spreadsheet "general" date parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientDateTimeParser {
    pub order: DateOrder,
}

impl LenientDateTimeParser {
    pub fn new(order: DateOrder) -> Self {
        Self { order }
    }

    fn ordered<'a>(&self, day_first: &'a [&'a str], month_first: &'a [&'a str]) -> [&'a [&'a str]; 2] {
        match self.order {
            DateOrder::DayFirst => [day_first, month_first],
            DateOrder::MonthFirst => [month_first, day_first],
        }
    }
}

impl DateTimeParser for LenientDateTimeParser {
    fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let folded = fold_bengali_digits(raw);
        let cleaned = folded.trim();
        if cleaned.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(cleaned) {
            return Some(dt.naive_local());
        }
        let without_z = cleaned.trim_end_matches('Z');

        let four_digit = self
            .ordered(DAY_FIRST_DATETIME, MONTH_FIRST_DATETIME)
            .into_iter()
            .flatten()
            .chain(UNAMBIGUOUS_DATETIME);
        for fmt in four_digit {
            if let Ok(dt) = NaiveDateTime::parse_from_str(without_z, fmt) {
                if plausible_year(dt.year()) {
                    return Some(dt);
                }
            }
        }

        let dates = self
            .ordered(DAY_FIRST_DATE, MONTH_FIRST_DATE)
            .into_iter()
            .flatten()
            .chain(UNAMBIGUOUS_DATE);
        for fmt in dates {
            if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
                if plausible_year(d.year()) {
                    return d.and_hms_opt(0, 0, 0);
                }
            }
        }

        for fmt in self
            .ordered(DAY_FIRST_SHORT_YEAR, MONTH_FIRST_SHORT_YEAR)
            .into_iter()
            .flatten()
        {
            if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, fmt) {
                return Some(dt);
            }
            if let Ok(d) = NaiveDate::parse_from_str(cleaned, fmt) {
                return d.and_hms_opt(0, 0, 0);
            }
        }

        None
    }
}

// `%Y` happily reads "23" as year 23; leave short years to the `%y` layouts.
fn plausible_year(year: i32) -> bool {
    (1900..=2200).contains(&year)
}

/// Bengali digits (০-৯) to ASCII, everything else untouched
pub fn fold_bengali_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{09E6}'..='\u{09EF}' => {
                char::from(b'0' + (c as u32 - 0x09E6) as u8)
            }
            _ => c,
        })
        .collect()
}
