use serde::{Deserialize, Serialize};

/// Weights and thresholds for ranking staff against a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub affinity_weight: f32,
    pub headroom_weight: f32,
    pub top_categories: usize,
    pub recommendation_threshold: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            affinity_weight: 0.7,
            headroom_weight: 0.3,
            top_categories: 3,
            recommendation_threshold: 0.5,
        }
    }
}
