use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::allocator::{
    AllocationError, AllocationOutcome, AllocationPolicy, AssignmentAllocator,
    BulkAllocationReport, CapacityMode, Reassignment,
};
use super::capacity::{self, AssignmentStats, StaffLoadIndex, StaffLoadView};
use super::domain::{
    Assignment, AssignmentId, CategoryWeight, RiskLevel, StaffId, StaffRole, Student, StudentId,
};
use super::eligibility::{self, EligibilityFilters};
use super::repository::{CategoryOracle, DirectoryStore, StoreError};
use super::scoring::{MatchCandidate, MatchScorer, ScoringConfig};

/// Preconditions for committing a recommendation without a human choosing the staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoAssignPolicy {
    pub minimum_risk: RiskLevel,
    pub require_counselor_for_mentor: bool,
}

impl Default for AutoAssignPolicy {
    fn default() -> Self {
        Self {
            minimum_risk: RiskLevel::Medium,
            require_counselor_for_mentor: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub scoring: ScoringConfig,
    pub allocation: AllocationPolicy,
    pub auto_assign: AutoAssignPolicy,
}

/// Where the categories used for a ranking came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    Oracle,
    Stored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecommendation {
    pub student_id: StudentId,
    pub student_name: String,
    pub role: StaffRole,
    pub categories: Vec<CategoryWeight>,
    pub category_source: CategorySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub candidates: Vec<MatchCandidate>,
}

impl MatchRecommendation {
    pub fn recommended(&self) -> Option<&MatchCandidate> {
        self.candidates
            .iter()
            .find(|candidate| candidate.is_recommended)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoAssignment {
    pub recommendation: MatchRecommendation,
    pub outcome: AllocationOutcome,
}

/// Service composing the directory, category oracle, scorer and allocator.
pub struct MatchingService<S, O> {
    store: Arc<S>,
    oracle: Arc<O>,
    scorer: MatchScorer,
    allocator: AssignmentAllocator<S>,
    auto_assign: AutoAssignPolicy,
}

impl<S, O> MatchingService<S, O>
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    pub fn new(store: Arc<S>, oracle: Arc<O>, config: MatchingConfig) -> Self {
        let allocator = AssignmentAllocator::new(store.clone(), config.allocation);

        Self {
            store,
            oracle,
            scorer: MatchScorer::new(config.scoring),
            allocator,
            auto_assign: config.auto_assign,
        }
    }

    pub fn allocator(&self) -> &AssignmentAllocator<S> {
        &self.allocator
    }

    pub fn scorer(&self) -> &MatchScorer {
        &self.scorer
    }

    /// Students that may receive a new `role` assignment, in directory order.
    pub async fn eligible_pool(
        &self,
        role: StaffRole,
        filters: &EligibilityFilters,
    ) -> Result<Vec<Student>, MatchingServiceError> {
        let students = self.store.list_students(filters.department()).await?;
        let active = self.store.list_active_assignments(role).await?;
        Ok(eligibility::eligible_students(
            &students, &active, role, filters,
        ))
    }

    pub async fn eligible_range(
        &self,
        role: StaffRole,
        filters: &EligibilityFilters,
        start: i64,
        end: i64,
    ) -> Result<Vec<Student>, MatchingServiceError> {
        let pool = self.eligible_pool(role, filters).await?;
        Ok(eligibility::select_range(&pool, start, end))
    }

    /// Rank staff of `role` for one student.
    pub async fn recommend(
        &self,
        student_id: &StudentId,
        role: StaffRole,
    ) -> Result<MatchRecommendation, MatchingServiceError> {
        let student = self.student(student_id).await?;
        self.recommend_for(&student, role, false).await
    }

    /// Commit the recommended staff member, if the student qualifies and a strong match exists.
    pub async fn auto_assign(
        &self,
        student_id: &StudentId,
        role: StaffRole,
    ) -> Result<AutoAssignment, MatchingServiceError> {
        let student = self.student(student_id).await?;

        if student.risk_level < self.auto_assign.minimum_risk {
            return Err(MatchingServiceError::RiskBelowThreshold {
                actual: student.risk_level,
                minimum: self.auto_assign.minimum_risk,
            });
        }

        if role == StaffRole::Mentor && self.auto_assign.require_counselor_for_mentor {
            let counseling = self
                .store
                .list_active_assignments(StaffRole::Counselor)
                .await?;
            if Assignment::active_for(&counseling, &student.id, StaffRole::Counselor).is_none() {
                return Err(MatchingServiceError::CounselorRequired(student.id));
            }
        }

        // Under strict capacity a full staff member can never be committed, so it is not offered.
        let only_open = self.allocator.policy().capacity_mode == CapacityMode::Strict;
        let recommendation = self.recommend_for(&student, role, only_open).await?;
        let staff_id = recommendation
            .recommended()
            .map(|candidate| candidate.staff_id.clone())
            .ok_or_else(|| MatchingServiceError::NoRecommendation(student.id.clone()))?;

        let outcome = self
            .allocator
            .assign_single(&student.id, &staff_id, role)
            .await?;
        info!(
            student = %student.id,
            staff = %staff_id,
            role = role.label(),
            "auto-assignment committed"
        );

        Ok(AutoAssignment {
            recommendation,
            outcome,
        })
    }

    pub async fn assign_single(
        &self,
        student_id: &StudentId,
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<AllocationOutcome, MatchingServiceError> {
        Ok(self
            .allocator
            .assign_single(student_id, staff_id, role)
            .await?)
    }

    pub async fn assign_bulk(
        &self,
        student_ids: &[StudentId],
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<BulkAllocationReport, MatchingServiceError> {
        Ok(self
            .allocator
            .assign_bulk(student_ids, staff_id, role)
            .await?)
    }

    /// Select `[start, end)` of the eligible pool and assign it to one staff member.
    pub async fn assign_range(
        &self,
        role: StaffRole,
        filters: &EligibilityFilters,
        start: i64,
        end: i64,
        staff_id: &StaffId,
    ) -> Result<BulkAllocationReport, MatchingServiceError> {
        let selected: Vec<StudentId> = self
            .eligible_range(role, filters, start, end)
            .await?
            .into_iter()
            .map(|student| student.id)
            .collect();

        self.assign_bulk(&selected, staff_id, role).await
    }

    pub async fn reassign(
        &self,
        student_id: &StudentId,
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<Reassignment, MatchingServiceError> {
        Ok(self.allocator.reassign(student_id, staff_id, role).await?)
    }

    pub async fn end_assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<(), MatchingServiceError> {
        Ok(self.allocator.end_assignment(assignment_id).await?)
    }

    pub async fn roster(&self, role: StaffRole) -> Result<Vec<StaffLoadView>, MatchingServiceError> {
        let staff = self.store.list_staff(role).await?;
        let active = self.store.list_active_assignments(role).await?;
        Ok(capacity::staff_roster(&staff, &active))
    }

    pub async fn stats(&self, role: StaffRole) -> Result<AssignmentStats, MatchingServiceError> {
        let students = self.store.list_students(None).await?;
        let active = self.store.list_active_assignments(role).await?;
        Ok(capacity::assignment_stats(&students, &active, role))
    }

    async fn student(&self, student_id: &StudentId) -> Result<Student, MatchingServiceError> {
        self.store
            .student(student_id)
            .await?
            .ok_or_else(|| MatchingServiceError::StudentNotFound(student_id.clone()))
    }

    async fn recommend_for(
        &self,
        student: &Student,
        role: StaffRole,
        only_open: bool,
    ) -> Result<MatchRecommendation, MatchingServiceError> {
        let mut staff = self.store.list_staff(role).await?;
        let active = self.store.list_active_assignments(role).await?;
        let loads = StaffLoadIndex::from_assignments(&active);
        if only_open {
            staff.retain(|member| loads.remaining(member) > 0);
        }

        let (categories, confidence, category_source) =
            match self.oracle.category_profile(&student.id).await {
                Ok(profile) if !profile.categories.is_empty() => (
                    profile.categories,
                    Some(profile.confidence),
                    CategorySource::Oracle,
                ),
                Ok(_) => (student.categories.clone(), None, CategorySource::Stored),
                Err(err) => {
                    warn!(
                        student = %student.id,
                        %err,
                        "category oracle failed, ranking with stored categories"
                    );
                    (student.categories.clone(), None, CategorySource::Stored)
                }
            };

        let candidates = self.scorer.rank(&categories, &staff, &loads);

        Ok(MatchRecommendation {
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            role,
            categories,
            category_source,
            confidence,
            candidates,
        })
    }
}

/// Error raised by the matching service.
#[derive(Debug, thiserror::Error)]
pub enum MatchingServiceError {
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("auto-assignment requires at least {} risk, student is {}", .minimum.label(), .actual.label())]
    RiskBelowThreshold {
        actual: RiskLevel,
        minimum: RiskLevel,
    },
    #[error("student {0} must be assigned to a counselor first")]
    CounselorRequired(StudentId),
    #[error("no candidate is a strong enough match for student {0}")]
    NoRecommendation(StudentId),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
