use chrono::NaiveDate;
use expiry_core::{CanonicalDate, PatternKind};

use crate::config::ScoringWeights;

/// Confidence heuristics for a single candidate. Pure: the result depends only
/// on the candidate's own signals, the weights and the supplied `today`.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn score(
        &self,
        date: CanonicalDate,
        kind: PatternKind,
        has_expiry_keyword: bool,
        today: NaiveDate,
    ) -> f32 {
        let w = &self.weights;
        let mut score = w.base;

        if has_expiry_keyword {
            score += w.keyword_boost;
        }
        if kind.is_month_year_only() {
            score += w.month_year_boost;
        }

        // Dates like Feb 30 have no distance to today and get no adjustment.
        if let Some(delta) = date.days_from(today) {
            if delta < 0 {
                score += w.expired_boost;
            } else if delta <= w.plausible_window_days {
                score += w.plausible_boost;
            } else {
                score -= w.far_future_penalty;
            }
        }

        score.clamp(0.0, 1.0)
    }
}
