//! RICE scoring.
//!
//! ```text
//! score = reach × impact × (confidence / 100) / effort_months
//! ```
//!
//! A zero effort yields a score of `0` rather than a division fault. No
//! rounding, clamping or range checks are applied; out-of-range inputs give
//! the arithmetic result.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::Card;

/// The four RICE inputs of a card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiceFields {
    pub reach: i64,
    pub impact: f64,
    pub confidence: f64,
    pub effort_months: f64,
}

impl RiceFields {
    pub fn score(&self) -> f64 {
        rice_score(
            self.reach as f64,
            self.impact,
            self.confidence,
            self.effort_months,
        )
    }
}

/// Compute the RICE score.
pub fn rice_score(reach: f64, impact: f64, confidence: f64, effort_months: f64) -> f64 {
    if effort_months == 0.0 {
        return 0.0;
    }
    reach * impact * (confidence / 100.0) / effort_months
}

/// Cards ordered by descending RICE score.
///
/// Stable: equal scores keep their collection order. NaN scores sort last.
pub fn rank_by_rice(cards: &[Card]) -> Vec<&Card> {
    let mut ranked: Vec<&Card> = cards.iter().collect();
    ranked.sort_by(|a, b| {
        let (sa, sb) = (a.rice_score(), b.rice_score());
        match (sa.is_nan(), sb.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => sb.partial_cmp(&sa).unwrap_or(Ordering::Equal),
        }
    });
    ranked
}
