use chrono::NaiveDate;
use expiry_core::{DateCandidate, PatternKind};

use crate::catalog::{PatternCatalog, Signal};
use crate::normalize::normalize;
use crate::score::Scorer;

/// A pattern hit before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMatch {
    pub text: String,
    /// Capture groups in pattern order, group 0 excluded.
    pub groups: Vec<String>,
    pub kind: PatternKind,
    pub has_expiry_keyword: bool,
    pub source_line: String,
    /// Byte offset of the match end within the scanned segment.
    end: usize,
}

/// A slice of a line to run the date patterns over.
struct Segment<'l> {
    text: &'l str,
    /// Keep only the matches closest to the end of the slice.
    last_date_only: bool,
}

/// Drop every match that ends before the last one. Overlapping forms of the
/// final date (`31/12/2026` and its `12/2026` tail) share that end and stay.
fn keep_last_date(found: &mut Vec<RawMatch>) {
    let Some(last_end) = found.iter().map(|m| m.end).max() else { return };
    found.retain(|m| m.end == last_end);
}

/// Scans OCR text for date-shaped substrings.
pub struct Extractor<'a> {
    catalog: &'a PatternCatalog,
}

impl<'a> Extractor<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self { catalog }
    }

    /// Every pattern match in `text`, line by line, without deduplication.
    pub fn scan(&self, text: &str) -> Vec<RawMatch> {
        let mut matches = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let has_expiry = self.catalog.expiry.is_match(line);
            for segment in self.scannable_segments(line, has_expiry) {
                let mut found = Vec::new();
                self.match_segment(segment.text, line, has_expiry, &mut found);
                if segment.last_date_only {
                    keep_last_date(&mut found);
                }
                matches.extend(found);
            }
        }
        matches
    }

    /// Scan, normalize and score. Matches that do not normalize are dropped.
    pub fn candidates(&self, text: &str, scorer: &Scorer, today: NaiveDate) -> Vec<DateCandidate> {
        self.scan(text)
            .into_iter()
            .filter_map(|m| {
                let groups: Vec<&str> = m.groups.iter().map(String::as_str).collect();
                let normalized = normalize(m.kind, &groups)?;
                let confidence = scorer.score(normalized, m.kind, m.has_expiry_keyword, today);
                Some(DateCandidate {
                    raw_match: m.text,
                    normalized,
                    confidence,
                    has_expiry_keyword: m.has_expiry_keyword,
                    source_line: m.source_line,
                    pattern_kind: m.kind,
                })
            })
            .collect()
    }

    /// The parts of a line that may hold an expiry date.
    ///
    /// Lines without an ignore marker are scanned whole. Lines with an ignore
    /// marker and no expiry marker are dropped, as are lines with a combined
    /// label such as `MFG/EXP:`. Other lines carrying both are cut at every
    /// marker and only the pieces led by an expiry marker are kept. An expiry
    /// marker with no digits after it (`06/2025 E.`) labels the date right
    /// before it instead.
    fn scannable_segments<'l>(&self, line: &'l str, has_expiry: bool) -> Vec<Segment<'l>> {
        if !self.catalog.ignore.is_match(line) {
            return vec![Segment { text: line, last_date_only: false }];
        }
        if !has_expiry || self.catalog.has_combined_label(line) {
            return Vec::new();
        }

        let signals = self.catalog.signals(line);
        let mut segments = Vec::new();
        for (i, &(start, signal)) in signals.iter().enumerate() {
            if signal != Signal::Expiry {
                continue;
            }
            let end = signals.get(i + 1).map_or(line.len(), |&(next, _)| next);
            let piece = &line[start..end];
            if piece.bytes().any(|b| b.is_ascii_digit()) {
                segments.push(Segment { text: piece, last_date_only: false });
                continue;
            }
            // The piece before is already kept when another expiry marker leads it.
            let previous = i.checked_sub(1).map(|p| signals[p]);
            if previous.map_or(true, |(_, s)| s == Signal::Ignore) {
                let from = previous.map_or(0, |(p, _)| p);
                segments.push(Segment { text: &line[from..start], last_date_only: true });
            }
        }
        segments
    }

    fn match_segment(&self, segment: &str, line: &str, has_expiry: bool, out: &mut Vec<RawMatch>) {
        for (re, kind) in self.catalog.entries() {
            for caps in re.captures_iter(segment) {
                let Some(whole) = caps.get(0) else { continue };
                let groups = caps
                    .iter()
                    .skip(1)
                    .map(|g| g.map_or_else(String::new, |g| g.as_str().to_string()))
                    .collect();
                out.push(RawMatch {
                    text: whole.as_str().to_string(),
                    groups,
                    kind,
                    has_expiry_keyword: has_expiry,
                    source_line: line.to_string(),
                    end: whole.end(),
                });
            }
        }
    }
}
