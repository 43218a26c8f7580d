use async_trait::async_trait;

use super::domain::{
    Assignment, AssignmentId, CategoryProfile, StaffId, StaffMember, StaffRole, Student, StudentId,
};

/// Directory of students, staff and assignments backing the engine.
///
/// `create_assignment` must check for an existing ACTIVE assignment of the same
/// (student, role) and insert as one atomic step, answering [`StoreError::Conflict`] with the
/// existing record when one is present.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn list_students(&self, department: Option<&str>) -> Result<Vec<Student>, StoreError>;
    async fn student(&self, id: &StudentId) -> Result<Option<Student>, StoreError>;
    async fn list_staff(&self, role: StaffRole) -> Result<Vec<StaffMember>, StoreError>;
    async fn staff(&self, id: &StaffId) -> Result<Option<StaffMember>, StoreError>;
    async fn list_active_assignments(&self, role: StaffRole)
        -> Result<Vec<Assignment>, StoreError>;
    async fn create_assignment(
        &self,
        student_id: &StudentId,
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<Assignment, StoreError>;
    async fn end_assignment(&self, id: &AssignmentId) -> Result<(), StoreError>;
}

/// Error enumeration for directory failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("student {} already holds active assignment {}", .existing.student_id, .existing.id)]
    Conflict { existing: Box<Assignment> },
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Source of problem-category distributions for students.
#[async_trait]
pub trait CategoryOracle: Send + Sync {
    async fn category_profile(&self, student_id: &StudentId)
        -> Result<CategoryProfile, OracleError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("no category profile for student {0}")]
    NoProfile(StudentId),
    #[error("category oracle unavailable: {0}")]
    Unavailable(String),
}
