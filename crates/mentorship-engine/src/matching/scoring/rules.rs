use std::collections::HashSet;

use super::super::domain::{normalize_category, CategoryWeight, StaffMember};
use super::config::ScoringConfig;

/// The student's dominant categories, heaviest first, deduplicated after normalization.
pub(crate) fn top_categories(categories: &[CategoryWeight], limit: usize) -> Vec<String> {
    let mut weighted: Vec<(String, f32)> = categories
        .iter()
        .filter(|category| category.weight.is_finite() && category.weight > 0.0)
        .map(|category| (normalize_category(&category.name), category.weight))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    // Stable sort keeps input order among equal weights.
    weighted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut seen = HashSet::new();
    weighted
        .into_iter()
        .filter(|(name, _)| seen.insert(name.clone()))
        .map(|(name, _)| name)
        .take(limit)
        .collect()
}

/// Top categories covered by the staff member's specializations.
pub(crate) fn matched_categories(top: &[String], staff: &StaffMember) -> Vec<String> {
    let specializations: HashSet<String> = staff
        .specializations
        .iter()
        .map(|specialization| normalize_category(specialization))
        .collect();

    top.iter()
        .filter(|category| specializations.contains(category.as_str()))
        .cloned()
        .collect()
}

pub(crate) fn affinity(matched: usize, config: &ScoringConfig) -> f32 {
    if config.top_categories == 0 {
        return 0.0;
    }
    (matched as f32 / config.top_categories as f32).clamp(0.0, 1.0)
}

/// Fraction of capacity still free. Zero-capacity staff count as fully loaded.
pub(crate) fn capacity_headroom(remaining: i64, max_capacity: u32) -> f32 {
    if max_capacity == 0 {
        return 0.0;
    }
    (remaining.max(0) as f32 / max_capacity as f32).clamp(0.0, 1.0)
}

pub(crate) fn composite(affinity: f32, headroom: f32, config: &ScoringConfig) -> f32 {
    config.affinity_weight * affinity + config.headroom_weight * headroom
}
