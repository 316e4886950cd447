// 🔤 Field Value Codecs - dates, amounts and cleared-status markers
//
// Every codec is a pure function of its configuration: parse returns either
// a typed value or a CodecError, format is the exact inverse for values the
// codec produced.

use crate::error::CodecError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// DATE FORMATS
// ============================================================================

/// Candidate date layouts, named by their pattern strings in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateFormat {
    #[serde(rename = "MM/DD/YY")]
    MonthDayShortYear,
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYear,
    #[serde(rename = "DD/MM/YY")]
    DayMonthShortYear,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYear,
    #[serde(rename = "YYYY-MM-DD")]
    Iso,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    MonthFirst,
    DayFirst,
    YearFirst,
}

impl DateFormat {
    /// Default priority: US month-first layouts before day-first ones.
    pub const DEFAULT_PRIORITY: [DateFormat; 5] = [
        DateFormat::MonthDayShortYear,
        DateFormat::MonthDayYear,
        DateFormat::DayMonthShortYear,
        DateFormat::DayMonthYear,
        DateFormat::Iso,
    ];

    /// Day-first priority for European producers.
    pub const DAY_FIRST_PRIORITY: [DateFormat; 5] = [
        DateFormat::DayMonthShortYear,
        DateFormat::DayMonthYear,
        DateFormat::MonthDayShortYear,
        DateFormat::MonthDayYear,
        DateFormat::Iso,
    ];

    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::MonthDayShortYear => "MM/DD/YY",
            DateFormat::MonthDayYear => "MM/DD/YYYY",
            DateFormat::DayMonthShortYear => "DD/MM/YY",
            DateFormat::DayMonthYear => "DD/MM/YYYY",
            DateFormat::Iso => "YYYY-MM-DD",
        }
    }

    pub fn from_pattern(pattern: &str) -> Result<Self, CodecError> {
        DateFormat::DEFAULT_PRIORITY
            .iter()
            .copied()
            .find(|f| f.pattern().eq_ignore_ascii_case(pattern.trim()))
            .ok_or_else(|| CodecError::UnknownDateFormat {
                value: pattern.to_string(),
            })
    }

    fn layout(&self) -> Layout {
        match self {
            DateFormat::MonthDayShortYear | DateFormat::MonthDayYear => Layout::MonthFirst,
            DateFormat::DayMonthShortYear | DateFormat::DayMonthYear => Layout::DayFirst,
            DateFormat::Iso => Layout::YearFirst,
        }
    }

    fn year_digits(&self) -> usize {
        match self {
            DateFormat::MonthDayShortYear | DateFormat::DayMonthShortYear => 2,
            _ => 4,
        }
    }

    /// Whether the digit groups of an input have this format's shape.
    fn claims(&self, parts: &[&str; 3]) -> bool {
        let short = |s: &str| (1..=2).contains(&s.len());
        match self.layout() {
            Layout::YearFirst => parts[0].len() == 4 && short(parts[1]) && short(parts[2]),
            _ => short(parts[0]) && short(parts[1]) && parts[2].len() == self.year_digits(),
        }
    }
}

// ============================================================================
// DATE CODEC
// ============================================================================

/// Tries the configured formats in priority order.
///
/// Formats sharing a shape (`MM/DD/YYYY` and `DD/MM/YYYY` both read
/// `NN/NN/NNNN`) are ranked: the first listed format claiming the input's
/// shape decides the reading, so `15/03/2023` is rejected under month-first
/// priority instead of silently flipping to day-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateCodec {
    pub formats: Vec<DateFormat>,

    /// Two-digit years below the pivot land in the 2000s, the rest in the 1900s
    pub pivot_year: u32,
}

impl DateCodec {
    pub fn new() -> Self {
        DateCodec {
            formats: DateFormat::DEFAULT_PRIORITY.to_vec(),
            pivot_year: 69,
        }
    }

    pub fn day_first() -> Self {
        DateCodec {
            formats: DateFormat::DAY_FIRST_PRIORITY.to_vec(),
            ..DateCodec::new()
        }
    }

    pub fn with_formats(formats: Vec<DateFormat>) -> Self {
        DateCodec {
            formats,
            ..DateCodec::new()
        }
    }

    pub fn with_pivot_year(mut self, pivot_year: u32) -> Self {
        self.pivot_year = pivot_year;
        self
    }

    pub fn parse(&self, raw: &str) -> Result<NaiveDate, CodecError> {
        let invalid = || CodecError::InvalidDate {
            value: raw.to_string(),
        };

        let normalized = normalize_date_text(raw);
        let groups: Vec<&str> = normalized.split(['/', '-', '.']).collect();
        if groups.len() != 3 || groups.iter().any(|g| g.is_empty() || !g.bytes().all(|b| b.is_ascii_digit())) {
            return Err(invalid());
        }
        let parts = [groups[0], groups[1], groups[2]];

        let mut claimed: Vec<(Layout, usize)> = Vec::new();
        for format in &self.formats {
            if !format.claims(&parts) {
                continue;
            }
            let shape_taken = claimed
                .iter()
                .any(|(layout, digits)| *digits == format.year_digits() && *layout != format.layout());
            if shape_taken {
                continue;
            }
            claimed.push((format.layout(), format.year_digits()));

            if let Some(date) = self.build(format, &parts) {
                return Ok(date);
            }
        }

        Err(invalid())
    }

    fn build(&self, format: &DateFormat, parts: &[&str; 3]) -> Option<NaiveDate> {
        let num = |s: &str| s.parse::<u32>().ok();
        let (year, month, day) = match format.layout() {
            Layout::MonthFirst => (num(parts[2])?, num(parts[0])?, num(parts[1])?),
            Layout::DayFirst => (num(parts[2])?, num(parts[1])?, num(parts[0])?),
            Layout::YearFirst => (num(parts[0])?, num(parts[1])?, num(parts[2])?),
        };
        let year = if format.year_digits() == 2 {
            self.expand_year(year)
        } else {
            year
        };
        NaiveDate::from_ymd_opt(year as i32, month, day)
    }

    fn expand_year(&self, two_digit: u32) -> u32 {
        if two_digit < self.pivot_year {
            2000 + two_digit
        } else {
            1900 + two_digit
        }
    }

    pub fn format(&self, date: NaiveDate, format: DateFormat) -> String {
        format_date(date, format)
    }
}

impl Default for DateCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a date in one of the fixed layouts (zero padded).
pub fn format_date(date: NaiveDate, format: DateFormat) -> String {
    let year = if format.year_digits() == 2 {
        format!("{:02}", date.year().rem_euclid(100))
    } else {
        format!("{:04}", date.year())
    };
    match format.layout() {
        Layout::MonthFirst => format!("{:02}/{:02}/{}", date.month(), date.day(), year),
        Layout::DayFirst => format!("{:02}/{:02}/{}", date.day(), date.month(), year),
        Layout::YearFirst => format!("{}-{:02}-{:02}", year, date.month(), date.day()),
    }
}

/// Quicken writes `3/15'23`, `3/15/'23` and ` 3/ 5/23`; fold them all to `3/15/23`.
fn normalize_date_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = if c == '\'' { '/' } else { c };
        if c.is_whitespace() {
            continue;
        }
        let is_sep = matches!(c, '/' | '-' | '.');
        if is_sep && out.ends_with(['/', '-', '.']) {
            continue;
        }
        out.push(c);
    }
    out
}

// ============================================================================
// AMOUNT CODEC
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "AmountCodecConfig")]
pub struct AmountCodec {
    /// `.` (default) or `,`
    pub decimal_separator: char,

    /// Grouping characters stripped on input, never written on output
    pub thousands_separators: Vec<char>,

    /// Fixed number of decimals used when rendering amounts
    pub decimals: usize,
}

impl AmountCodec {
    pub fn new() -> Self {
        AmountCodec {
            decimal_separator: '.',
            thousands_separators: vec![','],
            decimals: 2,
        }
    }

    /// Comma-decimal convention (`1.234,56`); thousands become `.` and space.
    pub fn comma_decimal() -> Self {
        AmountCodec {
            decimal_separator: ',',
            thousands_separators: vec!['.', ' '],
            decimals: 2,
        }
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    /// Grouping characters that go with a decimal separator.
    pub fn default_thousands(decimal_separator: char) -> Vec<char> {
        let candidates: &[char] = if decimal_separator == ',' { &['.', ' '] } else { &[','] };
        candidates.iter().copied().filter(|&c| c != decimal_separator).collect()
    }

    pub fn parse(&self, raw: &str) -> Result<f64, CodecError> {
        let invalid = || CodecError::InvalidAmount {
            value: raw.to_string(),
        };

        // An ambiguous codec cannot tell grouping from decimals
        if self.thousands_separators.contains(&self.decimal_separator) {
            return Err(invalid());
        }

        let mut cleaned = String::with_capacity(raw.len());
        for c in raw.trim().chars() {
            if self.thousands_separators.contains(&c) {
                continue;
            }
            if c == self.decimal_separator {
                cleaned.push('.');
            } else {
                cleaned.push(c);
            }
        }

        let digits = cleaned.strip_prefix(['-', '+']).unwrap_or(&cleaned);
        let well_formed = digits.bytes().any(|b| b.is_ascii_digit())
            && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
            && digits.matches('.').count() <= 1;
        if !well_formed {
            return Err(invalid());
        }

        let value = cleaned.parse::<f64>().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(value)
    }

    /// Fixed-decimals rendering used for every monetary field.
    pub fn format(&self, value: f64) -> String {
        let mut text = format!("{:.*}", self.decimals, value);
        if text.starts_with('-') && text[1..].bytes().all(|b| b == b'0' || b == b'.') {
            text.remove(0);
        }
        self.localize(text)
    }

    /// Shortest rendering for prices, quantities and rates (`10`, `0.5`, `150.125`).
    pub fn format_number(&self, value: f64) -> String {
        let mut text = format!("{:.6}", value);
        if text.contains('.') {
            while text.ends_with('0') {
                text.pop();
            }
            if text.ends_with('.') {
                text.pop();
            }
        }
        if text == "-0" {
            text = "0".to_string();
        }
        self.localize(text)
    }

    fn localize(&self, text: String) -> String {
        if self.decimal_separator == '.' {
            text
        } else {
            text.replace('.', &self.decimal_separator.to_string())
        }
    }
}

impl Default for AmountCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialized form of `AmountCodec`. Missing grouping characters follow
/// the decimal separator, and so does a grouping set that collides with it.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AmountCodecConfig {
    decimal_separator: Option<char>,
    thousands_separators: Option<Vec<char>>,
    decimals: Option<usize>,
}

impl From<AmountCodecConfig> for AmountCodec {
    fn from(config: AmountCodecConfig) -> Self {
        let decimal_separator = config.decimal_separator.unwrap_or('.');
        let thousands_separators = match config.thousands_separators {
            Some(chars) if !chars.contains(&decimal_separator) => chars,
            _ => AmountCodec::default_thousands(decimal_separator),
        };
        AmountCodec {
            decimal_separator,
            thousands_separators,
            decimals: config.decimals.unwrap_or(2),
        }
    }
}

// ============================================================================
// CLEARED STATUS
// ============================================================================

/// The five canonical reconciliation states, one per source glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClearedStatus {
    #[default]
    Uncleared,
    /// `*`
    Cleared,
    /// `c`
    ClearedAlt,
    /// `X`
    Reconciled,
    /// `R`
    ReconciledAlt,
}

impl ClearedStatus {
    pub fn parse(raw: &str) -> Result<Self, CodecError> {
        match raw.trim() {
            "" => Ok(ClearedStatus::Uncleared),
            "*" => Ok(ClearedStatus::Cleared),
            "c" | "C" => Ok(ClearedStatus::ClearedAlt),
            "x" | "X" => Ok(ClearedStatus::Reconciled),
            "r" | "R" => Ok(ClearedStatus::ReconciledAlt),
            other => Err(CodecError::InvalidClearedStatus {
                value: other.to_string(),
            }),
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            ClearedStatus::Uncleared => "",
            ClearedStatus::Cleared => "*",
            ClearedStatus::ClearedAlt => "c",
            ClearedStatus::Reconciled => "X",
            ClearedStatus::ReconciledAlt => "R",
        }
    }

    pub fn is_cleared(&self) -> bool {
        !matches!(self, ClearedStatus::Uncleared)
    }

    pub fn is_reconciled(&self) -> bool {
        matches!(self, ClearedStatus::Reconciled | ClearedStatus::ReconciledAlt)
    }
}

// ============================================================================
// TESTS
// ============================================================================
