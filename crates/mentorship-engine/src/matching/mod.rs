//! Student to mentor/counselor matching and assignment.
//!
//! Eligibility filtering and range selection work over snapshots handed in by the caller. The
//! scorer ranks a staff pool for one student, and the allocator commits pairings against a
//! [`DirectoryStore`] that enforces one ACTIVE assignment per (student, role).

pub mod allocator;
pub mod capacity;
pub mod domain;
pub mod eligibility;
pub mod memory;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use allocator::{
    AllocationError, AllocationOutcome, AllocationPolicy, AssignmentAllocator,
    BulkAllocationReport, BulkRejection, CapacityMode, CapacityWarning, Reassignment,
    RejectionReason,
};
pub use capacity::{AssignmentStats, StaffLoadIndex, StaffLoadView};
pub use domain::{
    normalize_category, Assignment, AssignmentId, AssignmentStatus, CategoryProfile,
    CategoryWeight, RiskLevel, StaffId, StaffMember, StaffRole, Student, StudentId,
};
pub use eligibility::{eligible_students, select_range, EligibilityFilters, InvalidFilter};
pub use memory::InMemoryDirectory;
pub use repository::{CategoryOracle, DirectoryStore, OracleError, StoreError};
pub use router::matching_router;
pub use scoring::{rank_candidates, MatchCandidate, MatchScorer, ScoringConfig};
pub use service::{
    AutoAssignPolicy, AutoAssignment, CategorySource, MatchRecommendation, MatchingConfig,
    MatchingService, MatchingServiceError,
};
