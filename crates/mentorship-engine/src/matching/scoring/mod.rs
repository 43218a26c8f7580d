mod config;
mod policy;
mod rules;

pub use config::ScoringConfig;

use serde::{Deserialize, Serialize};

use super::capacity::StaffLoadIndex;
use super::domain::{CategoryWeight, StaffId, StaffMember, Student};

/// Stateless ranker applying the scoring configuration to a staff pool.
#[derive(Debug, Clone, Default)]
pub struct MatchScorer {
    config: ScoringConfig,
}

impl MatchScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Ranks `staff_pool` for a student with the given category distribution.
    ///
    /// Identical inputs always produce identical output, including the recommendation flag.
    pub fn rank(
        &self,
        student_categories: &[CategoryWeight],
        staff_pool: &[StaffMember],
        loads: &StaffLoadIndex,
    ) -> Vec<MatchCandidate> {
        let top = rules::top_categories(student_categories, self.config.top_categories);

        let mut ranked: Vec<MatchCandidate> = staff_pool
            .iter()
            .map(|staff| {
                let matched_categories = rules::matched_categories(&top, staff);
                let affinity_score = rules::affinity(matched_categories.len(), &self.config);
                let capacity_headroom =
                    rules::capacity_headroom(loads.remaining(staff), staff.max_capacity);

                MatchCandidate {
                    staff_id: staff.id.clone(),
                    staff_name: staff.name.clone(),
                    affinity_score,
                    capacity_headroom,
                    composite_score: rules::composite(
                        affinity_score,
                        capacity_headroom,
                        &self.config,
                    ),
                    current_load: loads.load(&staff.id),
                    max_capacity: staff.max_capacity,
                    matched_categories,
                    is_recommended: false,
                }
            })
            .collect();

        ranked.sort_by(policy::rank_order);
        policy::mark_recommendation(&mut ranked, &self.config);
        ranked
    }
}

/// Ranking entry computed fresh per request; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub staff_id: StaffId,
    pub staff_name: String,
    pub affinity_score: f32,
    pub capacity_headroom: f32,
    pub composite_score: f32,
    pub current_load: u32,
    pub max_capacity: u32,
    pub matched_categories: Vec<String>,
    pub is_recommended: bool,
}

/// Ranks `staff_pool` for `student` using its stored categories and the default weights.
pub fn rank_candidates(
    student: &Student,
    staff_pool: &[StaffMember],
    loads: &StaffLoadIndex,
) -> Vec<MatchCandidate> {
    MatchScorer::default().rank(&student.categories, staff_pool, loads)
}
