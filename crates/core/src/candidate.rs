use serde::{Deserialize, Serialize};
use std::fmt;

use super::date::CanonicalDate;

/// The textual date forms the extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// `2025-12-31`, `2025/12/31`, `2025.12.31`
    Ymd,
    /// `31-12-2025`
    Dmy,
    /// `31/12/25`
    DmyShort,
    /// `12/2025`
    My,
    /// `12/25`
    MyShort,
    /// `DEC 2025`
    MonthYear,
    /// `15 DEC 2025`
    DayMonthYear,
    /// `DEC 15, 2025`
    MonthDayYear,
}

impl PatternKind {
    pub const ALL: [PatternKind; 8] = [
        PatternKind::Ymd,
        PatternKind::Dmy,
        PatternKind::DmyShort,
        PatternKind::My,
        PatternKind::MyShort,
        PatternKind::MonthYear,
        PatternKind::DayMonthYear,
        PatternKind::MonthDayYear,
    ];

    /// Forms that print only a month and a year. Common for expiry dates.
    pub fn is_month_year_only(self) -> bool {
        matches!(self, PatternKind::My | PatternKind::MyShort | PatternKind::MonthYear)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::Ymd => "ymd",
            PatternKind::Dmy => "dmy",
            PatternKind::DmyShort => "dmy_short",
            PatternKind::My => "my",
            PatternKind::MyShort => "my_short",
            PatternKind::MonthYear => "month_year",
            PatternKind::DayMonthYear => "day_month_year",
            PatternKind::MonthDayYear => "month_day_year",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PatternKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("Unknown pattern kind: '{s}'"))
    }
}

/// One date-shaped reading pulled out of OCR text, already scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateCandidate {
    /// Exact substring matched in the OCR text.
    pub raw_match: String,
    pub normalized: CanonicalDate,
    /// 0.0–1.0
    pub confidence: f32,
    /// Whether the source line carried an expiry marker (EXP, BEST BEFORE, ...).
    pub has_expiry_keyword: bool,
    pub source_line: String,
    pub pattern_kind: PatternKind,
}
