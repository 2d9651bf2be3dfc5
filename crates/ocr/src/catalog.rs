use std::sync::OnceLock;

use expiry_core::PatternKind;
use regex::{Regex, RegexSet};

// ── Static tables ─────────────────────────────────────────────────────────────

/// Markers that put a date on the same line in expiry context.
const EXPIRY_KEYWORDS: &[&str] = &[
    r"\bEXP\b",
    r"\bEXPIRY\b",
    r"\bEXPIRES?\b",
    r"\bEXP\.?\s*DATE\b",
    r"\bUSE\s*BY\b",
    r"\bBEST\s*BEFORE\b",
    r"\bBB\b",
    r"\bBBD\b",
    r"\bBBE\b",
    r"\bVALID\s*TILL\b",
    r"\bVALID\s*UNTIL\b",
    r"\bE\.?\s*$",
    r"\bEXP\.?\s*$",
];

/// Markers for dates and numbers that are never the expiry: manufacture,
/// packing, batch/lot and price lines.
const IGNORE_KEYWORDS: &[&str] = &[
    r"\bMFG\b",
    r"\bMFD\b",
    r"\bMANUFACTURED\b",
    r"\bMANUF\b",
    r"\bPKD\b",
    r"\bPACKED\b",
    r"\bPACKAGED\b",
    r"\bBATCH\b",
    r"\bLOT\b",
    r"\bB\.?\s*NO\b",
    r"\bL\.?\s*NO\b",
    r"\bMRP\b",
    r"\bPRICE\b",
    r"\bRS\.?\b",
    r"\bINR\b",
    r"\bPROD\b",
    r"\bPRODUCTION\b",
    r"\bDOM\b",
];

const MONTHS: &str = "(?:JAN(?:UARY)?|FEB(?:RUARY)?|MAR(?:CH)?|APR(?:IL)?|MAY|JUN(?:E)?|JUL(?:Y)?|AUG(?:UST)?|SEP(?:TEMBER)?|OCT(?:OBER)?|NOV(?:EMBER)?|DEC(?:EMBER)?)";

fn date_pattern(kind: PatternKind) -> String {
    const DAY: &str = "(0?[1-9]|[12]\\d|3[01])";
    const MONTH: &str = "(0?[1-9]|1[0-2])";
    const YEAR: &str = "(20[2-4]\\d)";
    const SEP: &str = "[-/.]";
    match kind {
        PatternKind::Ymd => format!(r"\b{YEAR}{SEP}{MONTH}{SEP}{DAY}\b"),
        PatternKind::Dmy => format!(r"\b{DAY}{SEP}{MONTH}{SEP}{YEAR}\b"),
        PatternKind::DmyShort => format!(r"\b{DAY}{SEP}{MONTH}{SEP}([2-4]\d)\b"),
        PatternKind::My => format!(r"\b{MONTH}{SEP}{YEAR}\b"),
        PatternKind::MyShort => format!(r"\b{MONTH}{SEP}([2-4]\d)\b"),
        PatternKind::MonthYear => format!(r"\b({MONTHS})[-\s.]*(\d{{4}})\b"),
        PatternKind::DayMonthYear => format!(r"\b(\d{{1,2}})\s*[-\s.]*({MONTHS})[-\s.]*(\d{{4}})\b"),
        PatternKind::MonthDayYear => format!(r"\b({MONTHS})\s*(\d{{1,2}})[,\s]+(\d{{4}})\b"),
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("invalid regex")
}

// ── Keyword sets ──────────────────────────────────────────────────────────────

/// Which keyword list a marker came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Expiry,
    Ignore,
}

/// A case-insensitive keyword list, usable both for membership and for
/// locating each marker in a line.
pub struct KeywordSet {
    set: RegexSet,
    patterns: Vec<Regex>,
}

impl KeywordSet {
    fn new(patterns: &[&str]) -> Self {
        let set = RegexSet::new(patterns.iter().map(|p| format!("(?i){p}"))).expect("invalid regex");
        let patterns = patterns.iter().map(|p| compile(p)).collect();
        Self { set, patterns }
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.set.is_match(line)
    }

    /// Byte offsets where any marker of this set begins.
    pub fn positions(&self, line: &str) -> Vec<usize> {
        self.spans(line).into_iter().map(|(start, _)| start).collect()
    }

    /// Byte ranges `(start, end)` of every marker of this set.
    pub fn spans(&self, line: &str) -> Vec<(usize, usize)> {
        self.set
            .matches(line)
            .into_iter()
            .flat_map(|i| self.patterns[i].find_iter(line).map(|m| (m.start(), m.end())))
            .collect()
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Date patterns and keyword lists. Built once, read-only afterwards.
pub struct PatternCatalog {
    entries: Vec<(Regex, PatternKind)>,
    pub expiry: KeywordSet,
    pub ignore: KeywordSet,
}

impl PatternCatalog {
    pub fn build() -> Self {
        let entries = PatternKind::ALL
            .into_iter()
            .map(|kind| (compile(&date_pattern(kind)), kind))
            .collect();
        Self {
            entries,
            expiry: KeywordSet::new(EXPIRY_KEYWORDS),
            ignore: KeywordSet::new(IGNORE_KEYWORDS),
        }
    }

    /// The process-wide catalog.
    pub fn shared() -> &'static PatternCatalog {
        static CATALOG: OnceLock<PatternCatalog> = OnceLock::new();
        CATALOG.get_or_init(PatternCatalog::build)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Regex, PatternKind)> {
        self.entries.iter().map(|(re, kind)| (re, *kind))
    }

    /// Every keyword occurrence in `line`, ordered by position. Where an
    /// expiry and an ignore marker start at the same offset the ignore one wins.
    pub fn signals(&self, line: &str) -> Vec<(usize, Signal)> {
        let mut found: Vec<(usize, Signal)> = self
            .ignore
            .positions(line)
            .into_iter()
            .map(|p| (p, Signal::Ignore))
            .chain(self.expiry.positions(line).into_iter().map(|p| (p, Signal::Expiry)))
            .collect();
        // Ignore sorts before Expiry at equal offsets; dedup keeps the first.
        found.sort_by_key(|&(pos, signal)| (pos, signal == Signal::Expiry));
        found.dedup_by_key(|&mut (pos, _)| pos);
        found
    }

    /// True when an ignore marker and an expiry marker sit next to each other
    /// with only separators between them (`MFG/EXP:`, `PKD & EXP`). Dates on
    /// such a line cannot be attributed to either label.
    pub fn has_combined_label(&self, line: &str) -> bool {
        let expiry = self.expiry.spans(line);
        let ignore = self.ignore.spans(line);
        let adjacent = |(_, end): (usize, usize), (start, _): (usize, usize)| {
            start >= end && line[end..start].chars().all(is_label_separator)
        };
        ignore
            .iter()
            .any(|&i| expiry.iter().any(|&e| adjacent(i, e) || adjacent(e, i)))
    }
}

/// Characters allowed between the halves of a combined label like `MFG/EXP:`.
fn is_label_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '/' | ':' | '&' | ',' | '-' | '.')
}


/// Month number from an English month name or its three-letter prefix.
pub fn month_from_name(name: &str) -> Option<u8> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_uppercase();
    match prefix.as_str() {
        "JAN" => Some(1),
        "FEB" => Some(2),
        "MAR" => Some(3),
        "APR" => Some(4),
        "MAY" => Some(5),
        "JUN" => Some(6),
        "JUL" => Some(7),
        "AUG" => Some(8),
        "SEP" => Some(9),
        "OCT" => Some(10),
        "NOV" => Some(11),
        "DEC" => Some(12),
        _ => None,
    }
}
