use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{Assignment, StaffRole, Student, StudentId};

/// Narrowing options gathered by the caller. Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityFilters {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default, alias = "search")]
    pub search_term: Option<String>,
}

/// Raised when a filter value cannot be coerced. Recovered locally as "matches nothing".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidFilter {
    #[error("semester filter '{0}' is not a number")]
    Semester(String),
}

impl EligibilityFilters {
    pub fn department(&self) -> Option<&str> {
        non_blank(self.department.as_deref())
    }

    pub fn search_term(&self) -> Option<&str> {
        non_blank(self.search_term.as_deref())
    }

    pub fn semester(&self) -> Result<Option<u8>, InvalidFilter> {
        match non_blank(self.semester.as_deref()) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<u8>()
                .map(Some)
                .map_err(|_| InvalidFilter::Semester(raw.to_string())),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

enum SemesterMatch {
    Any,
    Exactly(u8),
    Nothing,
}

/// Students without an ACTIVE assignment for `role` that satisfy every set filter, in input order.
pub fn eligible_students(
    all_students: &[Student],
    existing_assignments: &[Assignment],
    role: StaffRole,
    filters: &EligibilityFilters,
) -> Vec<Student> {
    let assigned: HashSet<&StudentId> = existing_assignments
        .iter()
        .filter(|assignment| assignment.is_active() && assignment.role == role)
        .map(|assignment| &assignment.student_id)
        .collect();

    let semester = match filters.semester() {
        Ok(None) => SemesterMatch::Any,
        Ok(Some(value)) => SemesterMatch::Exactly(value),
        Err(err) => {
            debug!(%err, "treating invalid filter as matching no students");
            SemesterMatch::Nothing
        }
    };
    let department = filters.department();
    let search_term = filters.search_term().map(str::to_lowercase);

    all_students
        .iter()
        .filter(|student| !assigned.contains(&student.id))
        .filter(|student| match department {
            Some(department) => student.department.as_deref() == Some(department),
            None => true,
        })
        .filter(|student| match semester {
            SemesterMatch::Any => true,
            SemesterMatch::Exactly(value) => student.semester == Some(value),
            SemesterMatch::Nothing => false,
        })
        .filter(|student| match &search_term {
            Some(term) => {
                student.name.to_lowercase().contains(term.as_str())
                    || student.student_code.to_lowercase().contains(term.as_str())
            }
            None => true,
        })
        .cloned()
        .collect()
}

/// Picks positions `[start, end)` (1-indexed) from an already ordered pool.
///
/// `start` is clamped to at least 1 and the end to the pool length; an empty or inverted
/// range selects nothing.
pub fn select_range<T: Clone>(pool: &[T], start: i64, end: i64) -> Vec<T> {
    let from = (start.max(1) - 1) as usize;
    let to = if end <= 1 {
        0
    } else {
        ((end - 1) as u64).min(pool.len() as u64) as usize
    };

    if from >= to {
        return Vec::new();
    }

    pool[from..to].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_unset() {
        let filters = EligibilityFilters {
            department: Some("  ".to_string()),
            semester: Some(String::new()),
            search_term: Some(" ".to_string()),
        };
        assert_eq!(filters.department(), None);
        assert_eq!(filters.semester(), Ok(None));
        assert_eq!(filters.search_term(), None);
    }

    #[test]
    fn semester_coercion_reports_invalid_values() {
        let filters = EligibilityFilters {
            semester: Some("third".to_string()),
            ..EligibilityFilters::default()
        };
        assert_eq!(
            filters.semester(),
            Err(InvalidFilter::Semester("third".to_string()))
        );

        let filters = EligibilityFilters {
            semester: Some(" 4 ".to_string()),
            ..EligibilityFilters::default()
        };
        assert_eq!(filters.semester(), Ok(Some(4)));
    }

    #[test]
    fn select_range_handles_degenerate_bounds() {
        let pool: Vec<u32> = (1..=4).collect();
        assert!(select_range(&pool, 3, 3).is_empty());
        assert!(select_range(&pool, 5, 2).is_empty());
        assert!(select_range(&pool, 1, 1).is_empty());
        assert!(select_range(&Vec::<u32>::new(), 1, 10).is_empty());
        assert_eq!(select_range(&pool, 4, 99), vec![4]);
    }
}
