use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::matching::allocator::{AllocationPolicy, CapacityMode};
use crate::matching::domain::{
    Assignment, AssignmentId, CategoryProfile, CategoryWeight, RiskLevel, StaffId, StaffMember,
    StaffRole, Student, StudentId,
};
use crate::matching::memory::InMemoryDirectory;
use crate::matching::repository::{CategoryOracle, DirectoryStore, OracleError, StoreError};
use crate::matching::service::{MatchingConfig, MatchingService};

pub(super) type MemoryService = MatchingService<InMemoryDirectory, InMemoryDirectory>;

pub(super) fn student_id(value: &str) -> StudentId {
    StudentId(value.to_string())
}

pub(super) fn staff_id(value: &str) -> StaffId {
    StaffId(value.to_string())
}

pub(super) fn student(
    id: &str,
    name: &str,
    department: &str,
    semester: u8,
    risk_level: RiskLevel,
    categories: &[(&str, f32)],
) -> Student {
    Student {
        id: student_id(id),
        student_code: format!("{}-{}", department, id.trim_start_matches('s')),
        name: name.to_string(),
        department: Some(department.to_string()),
        semester: Some(semester),
        risk_level,
        categories: categories
            .iter()
            .map(|(name, weight)| CategoryWeight::new(*name, *weight))
            .collect(),
    }
}

pub(super) fn staff(
    id: &str,
    name: &str,
    role: StaffRole,
    specializations: &[&str],
    max_capacity: u32,
) -> StaffMember {
    StaffMember {
        id: staff_id(id),
        name: name.to_string(),
        role,
        department: Some("CSE".to_string()),
        specializations: specializations.iter().map(|s| s.to_string()).collect(),
        max_capacity,
    }
}

pub(super) fn students() -> Vec<Student> {
    vec![
        student(
            "s1",
            "Asha Patel",
            "CSE",
            3,
            RiskLevel::High,
            &[("mental_health", 0.6), ("academic_struggles", 0.4)],
        ),
        student(
            "s2",
            "Ben Okafor",
            "CSE",
            3,
            RiskLevel::Medium,
            &[("financial_stress", 0.7), ("career_confusion", 0.3)],
        ),
        student(
            "s3",
            "Chen Li",
            "MECH",
            5,
            RiskLevel::Low,
            &[("family_issues", 0.5)],
        ),
        student(
            "s4",
            "Dana Reyes",
            "CSE",
            5,
            RiskLevel::Critical,
            &[("mental_health", 0.9), ("substance_abuse", 0.1)],
        ),
    ]
}

pub(super) fn staff_pool() -> Vec<StaffMember> {
    vec![
        staff("m1", "Maya Singh", StaffRole::Mentor, &["mental_health"], 2),
        staff(
            "m2",
            "Noah Berg",
            StaffRole::Mentor,
            &["academic_struggles", "mental_health"],
            2,
        ),
        staff(
            "c1",
            "Olivia Hart",
            StaffRole::Counselor,
            &["Mental Health", "substance abuse"],
            3,
        ),
        staff(
            "c2",
            "Peter Quinn",
            StaffRole::Counselor,
            &["financial_stress", "career_confusion"],
            1,
        ),
    ]
}

pub(super) fn directory() -> InMemoryDirectory {
    InMemoryDirectory::new(students(), staff_pool())
}

pub(super) fn strict_config() -> MatchingConfig {
    MatchingConfig {
        allocation: AllocationPolicy {
            capacity_mode: CapacityMode::Strict,
        },
        ..MatchingConfig::default()
    }
}

pub(super) fn build_service(config: MatchingConfig) -> (MemoryService, Arc<InMemoryDirectory>) {
    let directory = Arc::new(directory());
    let service = MatchingService::new(directory.clone(), directory.clone(), config);
    (service, directory)
}

/// Commits a pairing straight through the store, bypassing allocator validation.
pub(super) async fn seed_assignment(
    directory: &InMemoryDirectory,
    student: &str,
    staff: &str,
    role: StaffRole,
) -> Assignment {
    directory
        .create_assignment(&student_id(student), &staff_id(staff), role)
        .await
        .expect("seed assignment")
}

pub(super) fn active_count(directory: &InMemoryDirectory, student: &str, role: StaffRole) -> usize {
    directory
        .assignments()
        .expect("assignments readable")
        .iter()
        .filter(|assignment| {
            assignment.is_active() && assignment.role == role && assignment.student_id.0 == student
        })
        .count()
}

pub(super) struct UnavailableDirectory;

#[async_trait]
impl DirectoryStore for UnavailableDirectory {
    async fn list_students(&self, _department: Option<&str>) -> Result<Vec<Student>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn student(&self, _id: &StudentId) -> Result<Option<Student>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn list_staff(&self, _role: StaffRole) -> Result<Vec<StaffMember>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn staff(&self, _id: &StaffId) -> Result<Option<StaffMember>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn list_active_assignments(
        &self,
        _role: StaffRole,
    ) -> Result<Vec<Assignment>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn create_assignment(
        &self,
        _student_id: &StudentId,
        _staff_id: &StaffId,
        _role: StaffRole,
    ) -> Result<Assignment, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    async fn end_assignment(&self, _id: &AssignmentId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Delegates to an in-memory directory but can hide commits or fail them for one student.
pub(super) struct ScriptedDirectory {
    pub(super) inner: InMemoryDirectory,
    pub(super) stale_snapshots: bool,
    pub(super) fail_commit_for: Option<StudentId>,
}

impl ScriptedDirectory {
    pub(super) fn stale() -> Self {
        Self {
            inner: directory(),
            stale_snapshots: true,
            fail_commit_for: None,
        }
    }

    pub(super) fn failing_for(student: &str) -> Self {
        Self {
            inner: directory(),
            stale_snapshots: false,
            fail_commit_for: Some(student_id(student)),
        }
    }
}

#[async_trait]
impl DirectoryStore for ScriptedDirectory {
    async fn list_students(&self, department: Option<&str>) -> Result<Vec<Student>, StoreError> {
        self.inner.list_students(department).await
    }

    async fn student(&self, id: &StudentId) -> Result<Option<Student>, StoreError> {
        self.inner.student(id).await
    }

    async fn list_staff(&self, role: StaffRole) -> Result<Vec<StaffMember>, StoreError> {
        self.inner.list_staff(role).await
    }

    async fn staff(&self, id: &StaffId) -> Result<Option<StaffMember>, StoreError> {
        self.inner.staff(id).await
    }

    async fn list_active_assignments(
        &self,
        role: StaffRole,
    ) -> Result<Vec<Assignment>, StoreError> {
        if self.stale_snapshots {
            return Ok(Vec::new());
        }
        self.inner.list_active_assignments(role).await
    }

    async fn create_assignment(
        &self,
        student_id: &StudentId,
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<Assignment, StoreError> {
        if self.fail_commit_for.as_ref() == Some(student_id) {
            return Err(StoreError::Unavailable("write timeout".to_string()));
        }
        self.inner.create_assignment(student_id, staff_id, role).await
    }

    async fn end_assignment(&self, id: &AssignmentId) -> Result<(), StoreError> {
        self.inner.end_assignment(id).await
    }
}

pub(super) struct FailingOracle;

#[async_trait]
impl CategoryOracle for FailingOracle {
    async fn category_profile(
        &self,
        _student_id: &StudentId,
    ) -> Result<CategoryProfile, OracleError> {
        Err(OracleError::Unavailable("model offline".to_string()))
    }
}

/// Reports a fixed distribution for every student.
pub(super) struct FixedOracle(pub(super) Vec<CategoryWeight>);

#[async_trait]
impl CategoryOracle for FixedOracle {
    async fn category_profile(
        &self,
        _student_id: &StudentId,
    ) -> Result<CategoryProfile, OracleError> {
        Ok(CategoryProfile {
            categories: self.0.clone(),
            confidence: 0.82,
        })
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
