use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::capacity;
use super::domain::{Assignment, AssignmentId, StaffId, StaffMember, StaffRole, StudentId};
use super::repository::{DirectoryStore, StoreError};

/// Whether full staff members may still receive students.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityMode {
    /// Over-capacity assignments commit with a warning attached.
    #[default]
    Advisory,
    /// Over-capacity assignments are rejected.
    Strict,
}

impl CapacityMode {
    pub const fn label(self) -> &'static str {
        match self {
            CapacityMode::Advisory => "advisory",
            CapacityMode::Strict => "strict",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "advisory" => Some(Self::Advisory),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPolicy {
    pub capacity_mode: CapacityMode,
}

/// Lifecycle of a single assignment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationState {
    Requested,
    Validated,
    Committed,
    Rejected,
}

impl AllocationState {
    pub const fn label(self) -> &'static str {
        match self {
            AllocationState::Requested => "requested",
            AllocationState::Validated => "validated",
            AllocationState::Committed => "committed",
            AllocationState::Rejected => "rejected",
        }
    }
}

/// Validation failures. Reported per item in bulk operations, never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("student already assigned: active {role} assignment {existing} with {staff_id}")]
    DuplicateAssignment {
        existing: AssignmentId,
        staff_id: StaffId,
        role: StaffRole,
    },
    #[error("{staff_id} is at capacity ({current_load}/{max_capacity})")]
    CapacityExceeded {
        staff_id: StaffId,
        current_load: u32,
        max_capacity: u32,
    },
    #[error("student {student_id} not found")]
    UnknownStudent { student_id: StudentId },
    #[error("staff member {staff_id} not found")]
    UnknownStaff { staff_id: StaffId },
    #[error("staff member {staff_id} is a {actual}, not a {expected}")]
    RoleMismatch {
        staff_id: StaffId,
        expected: StaffRole,
        actual: StaffRole,
    },
    #[error("student {student_id} has no active {role} assignment")]
    NoActiveAssignment {
        student_id: StudentId,
        role: StaffRole,
    },
}

impl RejectionReason {
    pub const fn code(&self) -> &'static str {
        match self {
            RejectionReason::DuplicateAssignment { .. } => "duplicate_assignment",
            RejectionReason::CapacityExceeded { .. } => "capacity_exceeded",
            RejectionReason::UnknownStudent { .. } => "unknown_student",
            RejectionReason::UnknownStaff { .. } => "unknown_staff",
            RejectionReason::RoleMismatch { .. } => "role_mismatch",
            RejectionReason::NoActiveAssignment { .. } => "no_active_assignment",
        }
    }
}

/// Error raised by the allocator.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error(transparent)]
    Rejected(#[from] RejectionReason),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A directory failure stopped a bulk request; `report` holds what was settled before it.
    #[error("bulk assignment aborted after {} committed: {source}", .report.committed.len())]
    BulkAborted {
        report: Box<BulkAllocationReport>,
        #[source]
        source: StoreError,
    },
}

/// Attached to advisory-mode commits that push a staff member to or past capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityWarning {
    pub student_id: StudentId,
    pub staff_id: StaffId,
    pub load_before: u32,
    pub max_capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationOutcome {
    pub assignment: Assignment,
    /// `false` when an identical ACTIVE assignment already existed.
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_warning: Option<CapacityWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkRejection {
    pub student_id: StudentId,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkAllocationReport {
    pub staff_id: StaffId,
    pub role: StaffRole,
    pub committed: Vec<Assignment>,
    pub rejected: Vec<BulkRejection>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CapacityWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    /// Assignment marked ENDED, absent when the student already held the requested pairing.
    pub ended: Option<AssignmentId>,
    pub outcome: AllocationOutcome,
}

/// Commits student to staff pairings against the directory.
pub struct AssignmentAllocator<S> {
    store: Arc<S>,
    policy: AllocationPolicy,
}

impl<S> AssignmentAllocator<S>
where
    S: DirectoryStore + 'static,
{
    pub fn new(store: Arc<S>, policy: AllocationPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Assign one student. Retrying an identical request returns the existing assignment.
    pub async fn assign_single(
        &self,
        student_id: &StudentId,
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<AllocationOutcome, AllocationError> {
        debug!(
            student = %student_id,
            staff = %staff_id,
            role = role.label(),
            state = AllocationState::Requested.label(),
            "assignment requested"
        );

        let result = self.try_assign(student_id, staff_id, role).await;
        if let Err(AllocationError::Rejected(reason)) = &result {
            warn!(
                student = %student_id,
                staff = %staff_id,
                role = role.label(),
                state = AllocationState::Rejected.label(),
                reason = reason.code(),
                "assignment rejected"
            );
        }
        result
    }

    /// Assign each student independently, in input order, to the same staff member.
    ///
    /// Validation failures land in `rejected`. A directory failure aborts the batch and comes
    /// back as [`AllocationError::BulkAborted`] carrying the items settled so far.
    pub async fn assign_bulk(
        &self,
        student_ids: &[StudentId],
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<BulkAllocationReport, AllocationError> {
        let mut report = BulkAllocationReport {
            staff_id: staff_id.clone(),
            role,
            committed: Vec::new(),
            rejected: Vec::new(),
            warnings: Vec::new(),
        };
        let mut seen = HashSet::new();

        for student_id in student_ids {
            if !seen.insert(student_id) {
                debug!(student = %student_id, "skipping repeated student in bulk request");
                continue;
            }

            match self.assign_single(student_id, staff_id, role).await {
                Ok(outcome) => {
                    if let Some(warning) = outcome.capacity_warning {
                        report.warnings.push(warning);
                    }
                    report.committed.push(outcome.assignment);
                }
                Err(AllocationError::Rejected(reason)) => report.rejected.push(BulkRejection {
                    student_id: student_id.clone(),
                    reason,
                }),
                Err(AllocationError::Store(source)) => {
                    warn!(
                        staff = %staff_id,
                        committed = report.committed.len(),
                        failed_student = %student_id,
                        err = %source,
                        "bulk assignment aborted"
                    );
                    return Err(AllocationError::BulkAborted {
                        report: Box::new(report),
                        source,
                    });
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            staff = %staff_id,
            role = role.label(),
            committed = report.committed.len(),
            rejected = report.rejected.len(),
            "bulk assignment finished"
        );
        Ok(report)
    }

    pub async fn end_assignment(&self, assignment_id: &AssignmentId) -> Result<(), AllocationError> {
        self.store.end_assignment(assignment_id).await?;
        info!(assignment = %assignment_id, "assignment ended");
        Ok(())
    }

    /// Ends the student's current assignment for `role`, then commits the new pairing.
    ///
    /// The new staff member is validated before anything is ended. If the commit fails after
    /// the end step, the student is left without an ACTIVE assignment and the error is returned.
    pub async fn reassign(
        &self,
        student_id: &StudentId,
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<Reassignment, AllocationError> {
        let staff = self.staff_for(staff_id, role).await?;
        self.ensure_student(student_id).await?;
        let active = self.store.list_active_assignments(role).await?;

        let current = Assignment::active_for(&active, student_id, role)
            .cloned()
            .ok_or_else(|| RejectionReason::NoActiveAssignment {
                student_id: student_id.clone(),
                role,
            })?;

        if &current.staff_id == staff_id {
            return Ok(Reassignment {
                ended: None,
                outcome: AllocationOutcome {
                    assignment: current,
                    created: false,
                    capacity_warning: None,
                },
            });
        }

        self.check_capacity(&staff, student_id, &active)?;

        self.store.end_assignment(&current.id).await?;
        info!(
            student = %student_id,
            assignment = %current.id,
            "prior assignment ended for reassignment"
        );

        let outcome = self.assign_single(student_id, staff_id, role).await?;
        Ok(Reassignment {
            ended: Some(current.id),
            outcome,
        })
    }

    async fn try_assign(
        &self,
        student_id: &StudentId,
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<AllocationOutcome, AllocationError> {
        let staff = self.staff_for(staff_id, role).await?;
        self.ensure_student(student_id).await?;
        let active = self.store.list_active_assignments(role).await?;

        if let Some(existing) = Assignment::active_for(&active, student_id, role) {
            return resolve_existing(existing.clone(), staff_id);
        }

        let capacity_warning = self.check_capacity(&staff, student_id, &active)?;
        debug!(
            student = %student_id,
            staff = %staff_id,
            state = AllocationState::Validated.label(),
            "assignment validated"
        );

        match self
            .store
            .create_assignment(student_id, staff_id, role)
            .await
        {
            Ok(assignment) => {
                info!(
                    student = %student_id,
                    staff = %staff_id,
                    role = role.label(),
                    assignment = %assignment.id,
                    over_capacity = capacity_warning.is_some(),
                    state = AllocationState::Committed.label(),
                    "assignment committed"
                );
                Ok(AllocationOutcome {
                    assignment,
                    created: true,
                    capacity_warning,
                })
            }
            // Another request committed between validation and insert.
            Err(StoreError::Conflict { existing }) => resolve_existing(*existing, staff_id),
            Err(err) => Err(err.into()),
        }
    }

    async fn staff_for(
        &self,
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<StaffMember, AllocationError> {
        let staff = self
            .store
            .staff(staff_id)
            .await?
            .ok_or_else(|| RejectionReason::UnknownStaff {
                staff_id: staff_id.clone(),
            })?;

        if staff.role != role {
            return Err(RejectionReason::RoleMismatch {
                staff_id: staff_id.clone(),
                expected: role,
                actual: staff.role,
            }
            .into());
        }

        Ok(staff)
    }

    async fn ensure_student(&self, student_id: &StudentId) -> Result<(), AllocationError> {
        match self.store.student(student_id).await? {
            Some(_) => Ok(()),
            None => Err(RejectionReason::UnknownStudent {
                student_id: student_id.clone(),
            }
            .into()),
        }
    }

    fn check_capacity(
        &self,
        staff: &StaffMember,
        student_id: &StudentId,
        active: &[Assignment],
    ) -> Result<Option<CapacityWarning>, RejectionReason> {
        let current_load = capacity::load_of(&staff.id, active);
        if current_load < staff.max_capacity {
            return Ok(None);
        }

        match self.policy.capacity_mode {
            CapacityMode::Strict => Err(RejectionReason::CapacityExceeded {
                staff_id: staff.id.clone(),
                current_load,
                max_capacity: staff.max_capacity,
            }),
            CapacityMode::Advisory => Ok(Some(CapacityWarning {
                student_id: student_id.clone(),
                staff_id: staff.id.clone(),
                load_before: current_load,
                max_capacity: staff.max_capacity,
            })),
        }
    }
}

fn resolve_existing(
    existing: Assignment,
    staff_id: &StaffId,
) -> Result<AllocationOutcome, AllocationError> {
    if &existing.staff_id == staff_id {
        debug!(assignment = %existing.id, "returning existing identical assignment");
        return Ok(AllocationOutcome {
            assignment: existing,
            created: false,
            capacity_warning: None,
        });
    }

    Err(RejectionReason::DuplicateAssignment {
        existing: existing.id,
        staff_id: existing.staff_id,
        role: existing.role,
    }
    .into())
}
