use std::cmp::Ordering;

use super::config::ScoringConfig;
use super::MatchCandidate;

/// Descending composite, then ascending load, then staff id.
pub(crate) fn rank_order(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| a.current_load.cmp(&b.current_load))
        .then_with(|| a.staff_id.cmp(&b.staff_id))
}

/// Flags the leading candidate when it clears the threshold. Expects `ranked` sorted.
pub(crate) fn mark_recommendation(ranked: &mut [MatchCandidate], config: &ScoringConfig) {
    for candidate in ranked.iter_mut() {
        candidate.is_recommended = false;
    }

    if let Some(top) = ranked.first_mut() {
        top.is_recommended = top.composite_score >= config.recommendation_threshold;
    }
}
