use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for student records held by the directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for mentors and counselors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StaffId(pub String);

/// Identifier wrapper for committed assignments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StaffId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dropout risk tier produced by the external risk model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// Case-insensitive lookup used by roster imports and configuration.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Role a staff member plays towards a student. Mentors and counselors share one record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Mentor,
    Counselor,
}

impl StaffRole {
    pub const fn label(self) -> &'static str {
        match self {
            StaffRole::Mentor => "mentor",
            StaffRole::Counselor => "counselor",
        }
    }

    pub fn ordered() -> [StaffRole; 2] {
        [StaffRole::Counselor, StaffRole::Mentor]
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mentor" | "mentors" => Some(Self::Mentor),
            "counselor" | "counselors" | "counsellor" => Some(Self::Counselor),
            _ => None,
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of a problem-category distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeight {
    pub name: String,
    pub weight: f32,
}

impl CategoryWeight {
    pub fn new(name: impl Into<String>, weight: f32) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Output of the category oracle for a single student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub categories: Vec<CategoryWeight>,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub student_code: String,
    pub name: String,
    pub department: Option<String>,
    pub semester: Option<u8>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub categories: Vec<CategoryWeight>,
}

/// Mentor or counselor, discriminated by `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    pub role: StaffRole,
    pub department: Option<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    pub max_capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Ended,
}

impl AssignmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Ended => "ended",
        }
    }
}

/// Student to staff pairing. Only `status` and `ended_at` ever change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub student_id: StudentId,
    pub staff_id: StaffId,
    pub role: StaffRole,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }

    /// The student's current assignment for `role`, if any.
    pub fn active_for<'a>(
        assignments: &'a [Assignment],
        student_id: &StudentId,
        role: StaffRole,
    ) -> Option<&'a Assignment> {
        assignments.iter().find(|assignment| {
            assignment.is_active() && assignment.role == role && &assignment.student_id == student_id
        })
    }
}

/// Folds a category or specialization label into a comparable key.
///
/// `"Mental Health"`, `"mental-health"` and `"mental_health"` all normalize to `mental_health`.
pub fn normalize_category(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
