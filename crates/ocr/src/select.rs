use expiry_core::DateCandidate;

/// Pick the most plausible expiry date out of every candidate seen.
///
/// Candidates from expiry-marked lines always win over unmarked ones, even
/// when an unmarked candidate scored higher. Within the chosen group the
/// highest confidence wins; ties keep input order.
pub fn select_best(candidates: &[DateCandidate]) -> Option<&DateCandidate> {
    let mut ranked: Vec<&DateCandidate> = candidates.iter().collect();
    // Stable sort keeps pass order among equal scores.
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    ranked
        .iter()
        .find(|c| c.has_expiry_keyword)
        .or_else(|| ranked.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expiry_core::{CanonicalDate, PatternKind};

    fn cand(date: &str, confidence: f32, keyword: bool) -> DateCandidate {
        DateCandidate {
            raw_match: date.to_string(),
            normalized: date.parse::<CanonicalDate>().unwrap(),
            confidence,
            has_expiry_keyword: keyword,
            source_line: date.to_string(),
            pattern_kind: PatternKind::Ymd,
        }
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn keyword_candidate_beats_higher_unmarked_score() {
        let all = vec![cand("2026-01-01", 0.9, false), cand("2026-06-01", 0.6, true)];
        let best = select_best(&all).unwrap();
        assert_eq!(best.normalized.to_string(), "2026-06-01");
    }

    #[test]
    fn best_keyword_candidate_among_several() {
        let all = vec![
            cand("2026-01-01", 0.7, true),
            cand("2026-02-01", 0.95, true),
            cand("2026-03-01", 1.0, false),
        ];
        assert_eq!(select_best(&all).unwrap().normalized.to_string(), "2026-02-01");
    }

    #[test]
    fn without_keywords_global_best_wins() {
        let all = vec![cand("2026-01-01", 0.55, false), cand("2027-01-01", 0.6, false)];
        assert_eq!(select_best(&all).unwrap().normalized.to_string(), "2027-01-01");
    }

    #[test]
    fn ties_keep_input_order() {
        let all = vec![
            cand("2026-01-01", 0.6, false),
            cand("2026-02-01", 0.6, false),
            cand("2026-03-01", 0.6, false),
        ];
        assert_eq!(select_best(&all).unwrap().normalized.to_string(), "2026-01-01");
    }
}
