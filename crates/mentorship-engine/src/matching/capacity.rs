use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::domain::{Assignment, StaffId, StaffMember, StaffRole, Student, StudentId};

/// Number of ACTIVE assignments referencing `staff_id`.
pub fn load_of(staff_id: &StaffId, active_assignments: &[Assignment]) -> u32 {
    active_assignments
        .iter()
        .filter(|assignment| assignment.is_active() && &assignment.staff_id == staff_id)
        .count() as u32
}

/// Unused capacity; negative when the staff member is over-assigned.
pub fn remaining_capacity(staff: &StaffMember, active_assignments: &[Assignment]) -> i64 {
    i64::from(staff.max_capacity) - i64::from(load_of(&staff.id, active_assignments))
}

/// Load per staff member for a single snapshot of assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffLoadIndex {
    loads: HashMap<StaffId, u32>,
}

impl StaffLoadIndex {
    pub fn from_assignments(assignments: &[Assignment]) -> Self {
        let mut loads: HashMap<StaffId, u32> = HashMap::new();
        for assignment in assignments.iter().filter(|assignment| assignment.is_active()) {
            *loads.entry(assignment.staff_id.clone()).or_default() += 1;
        }
        Self { loads }
    }

    pub fn load(&self, staff_id: &StaffId) -> u32 {
        self.loads.get(staff_id).copied().unwrap_or(0)
    }

    pub fn remaining(&self, staff: &StaffMember) -> i64 {
        i64::from(staff.max_capacity) - i64::from(self.load(&staff.id))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffLoadView {
    pub staff_id: StaffId,
    pub name: String,
    pub role: StaffRole,
    pub role_label: &'static str,
    pub department: Option<String>,
    pub current_load: u32,
    pub max_capacity: u32,
    pub remaining_capacity: i64,
    pub utilization_pct: f32,
    pub over_capacity: bool,
}

/// Load view for every staff member, in the order given.
pub fn staff_roster(staff: &[StaffMember], active_assignments: &[Assignment]) -> Vec<StaffLoadView> {
    let index = StaffLoadIndex::from_assignments(active_assignments);

    staff
        .iter()
        .map(|member| {
            let current_load = index.load(&member.id);
            let utilization_pct = if member.max_capacity == 0 {
                0.0
            } else {
                current_load as f32 / member.max_capacity as f32 * 100.0
            };

            StaffLoadView {
                staff_id: member.id.clone(),
                name: member.name.clone(),
                role: member.role,
                role_label: member.role.label(),
                department: member.department.clone(),
                current_load,
                max_capacity: member.max_capacity,
                remaining_capacity: index.remaining(member),
                utilization_pct,
                over_capacity: current_load > member.max_capacity,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentStats {
    pub role: StaffRole,
    pub total_students: usize,
    pub assigned_students: usize,
    pub unassigned_students: usize,
    pub assignment_rate_pct: f32,
}

/// Coverage of `students` by ACTIVE assignments for `role`.
pub fn assignment_stats(
    students: &[Student],
    active_assignments: &[Assignment],
    role: StaffRole,
) -> AssignmentStats {
    let covered: HashSet<&StudentId> = active_assignments
        .iter()
        .filter(|assignment| assignment.is_active() && assignment.role == role)
        .map(|assignment| &assignment.student_id)
        .collect();

    let total_students = students.len();
    let assigned_students = students
        .iter()
        .filter(|student| covered.contains(&student.id))
        .count();
    let assignment_rate_pct = if total_students == 0 {
        0.0
    } else {
        assigned_students as f32 / total_students as f32 * 100.0
    };

    AssignmentStats {
        role,
        total_students,
        assigned_students,
        unassigned_students: total_students - assigned_students,
        assignment_rate_pct,
    }
}
