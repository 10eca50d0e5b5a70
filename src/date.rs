//! Date normalisation for the policy date fields.
//!
//! LLM output renders dates in whatever shape the source document used. We
//! accept a fixed, ordered list of shapes and render the first one that
//! parses as `DD/MM/YYYY`. Matching is strict: the whole input must have the
//! exact shape (two-digit day and month, four- or two-digit year, literal
//! separators) *and* name a real calendar day. `chrono` alone is lenient
//! about digit counts, so each format pairs an anchored shape regex with the
//! chrono pattern that does the calendar validation. Two-digit years skip
//! chrono's `%y` (which pivots at 70) and are expanded with a pivot at 69.
//!
//! Format order is the tie-breaker: `01/02/2020` is read as `DD/MM/YYYY`
//! because no month-first shape appears earlier in the list.

use crate::record::NOT_AVAILABLE;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Output format for every normalised date.
pub const OUTPUT_FORMAT: &str = "%d/%m/%Y";

/// One accepted input shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    IsoDash,
    /// `YYYY/MM/DD`
    IsoSlash,
    /// `YYYY.MM.DD`
    IsoDot,
    /// `DD/MM/YYYY`
    DaySlash,
    /// `DD-MM-YYYY`
    DayDash,
    /// `MMM DD, YYYY`
    MonthName,
    /// `DD-MM-YY`
    DayDashShortYear,
    /// `DD/MM/YY`
    DaySlashShortYear,
}

impl DateFormat {
    /// All accepted shapes, in priority order.
    pub const ORDERED: [DateFormat; 8] = [
        DateFormat::IsoDash,
        DateFormat::IsoSlash,
        DateFormat::IsoDot,
        DateFormat::DaySlash,
        DateFormat::DayDash,
        DateFormat::MonthName,
        DateFormat::DayDashShortYear,
        DateFormat::DaySlashShortYear,
    ];

    /// Human-readable pattern, as documented.
    pub fn pattern(self) -> &'static str {
        match self {
            DateFormat::IsoDash => "YYYY-MM-DD",
            DateFormat::IsoSlash => "YYYY/MM/DD",
            DateFormat::IsoDot => "YYYY.MM.DD",
            DateFormat::DaySlash => "DD/MM/YYYY",
            DateFormat::DayDash => "DD-MM-YYYY",
            DateFormat::MonthName => "MMM DD, YYYY",
            DateFormat::DayDashShortYear => "DD-MM-YY",
            DateFormat::DaySlashShortYear => "DD/MM/YY",
        }
    }

    fn chrono_format(self) -> &'static str {
        match self {
            DateFormat::IsoDash => "%Y-%m-%d",
            DateFormat::IsoSlash => "%Y/%m/%d",
            DateFormat::IsoDot => "%Y.%m.%d",
            DateFormat::DaySlash => "%d/%m/%Y",
            DateFormat::DayDash => "%d-%m-%Y",
            DateFormat::MonthName => "%b %d, %Y",
            // two-digit years are pivoted by hand in `parse`
            DateFormat::DayDashShortYear | DateFormat::DaySlashShortYear => "",
        }
    }

    fn shape(self) -> &'static Regex {
        match self {
            DateFormat::IsoDash => &RE_ISO_DASH,
            DateFormat::IsoSlash => &RE_ISO_SLASH,
            DateFormat::IsoDot => &RE_ISO_DOT,
            DateFormat::DaySlash => &RE_DAY_SLASH,
            DateFormat::DayDash => &RE_DAY_DASH,
            DateFormat::MonthName => &RE_MONTH_NAME,
            DateFormat::DayDashShortYear => &RE_DAY_DASH_YY,
            DateFormat::DaySlashShortYear => &RE_DAY_SLASH_YY,
        }
    }

    /// Parse `input` strictly against this shape.
    pub fn parse(self, input: &str) -> Option<NaiveDate> {
        let caps = self.shape().captures(input)?;
        match self {
            DateFormat::DayDashShortYear | DateFormat::DaySlashShortYear => {
                let day: u32 = caps[1].parse().ok()?;
                let month: u32 = caps[2].parse().ok()?;
                let yy: i32 = caps[3].parse().ok()?;
                NaiveDate::from_ymd_opt(expand_short_year(yy), month, day)
            }
            _ => NaiveDate::parse_from_str(input, self.chrono_format()).ok(),
        }
    }
}

static RE_ISO_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static RE_ISO_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}/\d{2}/\d{2}$").unwrap());
static RE_ISO_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}\.\d{2}\.\d{2}$").unwrap());
static RE_DAY_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap());
static RE_DAY_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}-\d{2}-\d{4}$").unwrap());
static RE_MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec) \d{2}, \d{4}$").unwrap()
});
static RE_DAY_DASH_YY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-(\d{2})-(\d{2})$").unwrap());
static RE_DAY_SLASH_YY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{2})$").unwrap());

/// Two-digit years: 69–99 are 19xx, 00–68 are 20xx.
fn expand_short_year(yy: i32) -> i32 {
    if yy >= 69 {
        1900 + yy
    } else {
        2000 + yy
    }
}

/// Parse `input` against the first matching accepted shape.
pub fn parse_date(input: &str) -> Option<(DateFormat, NaiveDate)> {
    DateFormat::ORDERED
        .iter()
        .find_map(|fmt| fmt.parse(input).map(|d| (*fmt, d)))
}

/// Normalise a loosely formatted date to `DD/MM/YYYY`, or `"NA"`.
pub fn normalize_date(input: &str) -> String {
    match parse_date(input) {
        Some((_, date)) => date.format(OUTPUT_FORMAT).to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}
