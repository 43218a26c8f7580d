use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::domain::{
    Assignment, AssignmentId, AssignmentStatus, CategoryProfile, StaffId, StaffMember, StaffRole,
    Student, StudentId,
};
use super::repository::{CategoryOracle, DirectoryStore, OracleError, StoreError};

/// Process-local directory. The uniqueness check and insert share one lock acquisition.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    students: Vec<Student>,
    staff: Vec<StaffMember>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    sequence: u64,
}

impl DirectoryState {
    fn next_assignment_id(&mut self) -> AssignmentId {
        self.sequence += 1;
        AssignmentId(format!("asg-{:06}", self.sequence))
    }
}

impl InMemoryDirectory {
    pub fn new(students: Vec<Student>, staff: Vec<StaffMember>) -> Self {
        Self {
            state: Mutex::new(DirectoryState {
                students,
                staff,
                ..DirectoryState::default()
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, DirectoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("directory lock poisoned".to_string()))
    }

    /// Every assignment ever recorded, ACTIVE and ENDED, in creation order.
    pub fn assignments(&self) -> Result<Vec<Assignment>, StoreError> {
        Ok(self.lock()?.assignments.values().cloned().collect())
    }

    pub fn upsert_student(&self, student: Student) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        match state.students.iter_mut().find(|existing| existing.id == student.id) {
            Some(existing) => *existing = student,
            None => state.students.push(student),
        }
        Ok(())
    }

    pub fn upsert_staff(&self, member: StaffMember) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        match state.staff.iter_mut().find(|existing| existing.id == member.id) {
            Some(existing) => *existing = member,
            None => state.staff.push(member),
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn list_students(&self, department: Option<&str>) -> Result<Vec<Student>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .students
            .iter()
            .filter(|student| match department {
                Some(department) => student.department.as_deref() == Some(department),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn student(&self, id: &StudentId) -> Result<Option<Student>, StoreError> {
        let state = self.lock()?;
        Ok(state.students.iter().find(|student| &student.id == id).cloned())
    }

    async fn list_staff(&self, role: StaffRole) -> Result<Vec<StaffMember>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .staff
            .iter()
            .filter(|member| member.role == role)
            .cloned()
            .collect())
    }

    async fn staff(&self, id: &StaffId) -> Result<Option<StaffMember>, StoreError> {
        let state = self.lock()?;
        Ok(state.staff.iter().find(|member| &member.id == id).cloned())
    }

    async fn list_active_assignments(
        &self,
        role: StaffRole,
    ) -> Result<Vec<Assignment>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .assignments
            .values()
            .filter(|assignment| assignment.is_active() && assignment.role == role)
            .cloned()
            .collect())
    }

    async fn create_assignment(
        &self,
        student_id: &StudentId,
        staff_id: &StaffId,
        role: StaffRole,
    ) -> Result<Assignment, StoreError> {
        let mut state = self.lock()?;

        if !state.students.iter().any(|student| &student.id == student_id) {
            return Err(StoreError::NotFound(format!("student {student_id}")));
        }
        if !state.staff.iter().any(|member| &member.id == staff_id) {
            return Err(StoreError::NotFound(format!("staff {staff_id}")));
        }

        if let Some(existing) = state.assignments.values().find(|assignment| {
            assignment.is_active() && assignment.role == role && &assignment.student_id == student_id
        }) {
            return Err(StoreError::Conflict {
                existing: Box::new(existing.clone()),
            });
        }

        let assignment = Assignment {
            id: state.next_assignment_id(),
            student_id: student_id.clone(),
            staff_id: staff_id.clone(),
            role,
            status: AssignmentStatus::Active,
            created_at: Utc::now(),
            ended_at: None,
        };
        state
            .assignments
            .insert(assignment.id.clone(), assignment.clone());
        Ok(assignment)
    }

    async fn end_assignment(&self, id: &AssignmentId) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let assignment = state
            .assignments
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("assignment {id}")))?;

        if assignment.is_active() {
            assignment.status = AssignmentStatus::Ended;
            assignment.ended_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// Serves each student's stored distribution, so the directory doubles as a category source.
#[async_trait]
impl CategoryOracle for InMemoryDirectory {
    async fn category_profile(
        &self,
        student_id: &StudentId,
    ) -> Result<CategoryProfile, OracleError> {
        let state = self
            .state
            .lock()
            .map_err(|_| OracleError::Unavailable("directory lock poisoned".to_string()))?;
        let student = state
            .students
            .iter()
            .find(|student| &student.id == student_id)
            .ok_or_else(|| OracleError::NoProfile(student_id.clone()))?;

        if student.categories.is_empty() {
            return Err(OracleError::NoProfile(student_id.clone()));
        }

        Ok(CategoryProfile {
            categories: student.categories.clone(),
            confidence: 1.0,
        })
    }
}
