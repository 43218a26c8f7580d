use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use mentorship_engine::config::AppConfig;
use mentorship_engine::error::AppError;
use mentorship_engine::matching::{
    CapacityMode, CategoryWeight, InMemoryDirectory, RiskLevel, StaffId, StaffMember, StaffRole,
    Student, StudentId,
};
use mentorship_engine::roster::RosterImporter;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Roster files shared by every subcommand that needs a directory.
#[derive(clap::Args, Debug, Default, Clone)]
pub(crate) struct RosterArgs {
    /// Student roster CSV (requires --staff)
    #[arg(long, requires = "staff")]
    pub(crate) students: Option<PathBuf>,
    /// Staff roster CSV (requires --students)
    #[arg(long, requires = "students")]
    pub(crate) staff: Option<PathBuf>,
}

impl RosterArgs {
    /// Imports the given files, or falls back to the bundled sample cohort.
    pub(crate) fn load_directory(&self) -> Result<InMemoryDirectory, AppError> {
        match (&self.students, &self.staff) {
            (Some(students), Some(staff)) => {
                Ok(RosterImporter::directory_from_paths(students, staff)?)
            }
            _ => {
                info!("no roster files given, using sample cohort");
                Ok(sample_directory())
            }
        }
    }
}

pub(crate) fn apply_capacity_override(config: &mut AppConfig, strict_capacity: bool) {
    if strict_capacity {
        config.matching.allocation.capacity_mode = CapacityMode::Strict;
    }
}

pub(crate) fn parse_role(raw: &str) -> Result<StaffRole, String> {
    StaffRole::from_label(raw)
        .ok_or_else(|| format!("'{raw}' is not a staff role (expected mentor or counselor)"))
}

fn sample_student(
    id: &str,
    name: &str,
    semester: u8,
    risk_level: RiskLevel,
    categories: &[(&str, f32)],
) -> Student {
    Student {
        id: StudentId(id.to_string()),
        student_code: format!("CSE{}", id.trim_start_matches("stu-")),
        name: name.to_string(),
        department: Some("CSE".to_string()),
        semester: Some(semester),
        risk_level,
        categories: categories
            .iter()
            .map(|(name, weight)| CategoryWeight::new(*name, *weight))
            .collect(),
    }
}

fn sample_staff(
    id: &str,
    name: &str,
    role: StaffRole,
    specializations: &[&str],
    max_capacity: u32,
) -> StaffMember {
    StaffMember {
        id: StaffId(id.to_string()),
        name: name.to_string(),
        role,
        department: Some("CSE".to_string()),
        specializations: specializations.iter().map(|s| s.to_string()).collect(),
        max_capacity,
    }
}

/// Small CSE cohort used by `demo` and by `serve`/`recommend` when no roster files are given.
pub(crate) fn sample_directory() -> InMemoryDirectory {
    let students = vec![
        sample_student(
            "stu-101",
            "Aarav Mehta",
            3,
            RiskLevel::High,
            &[("mental_health", 0.55), ("academic_struggles", 0.3), ("peer_pressure", 0.15)],
        ),
        sample_student(
            "stu-102",
            "Bianca Torres",
            3,
            RiskLevel::Critical,
            &[("financial_stress", 0.6), ("family_issues", 0.4)],
        ),
        sample_student(
            "stu-103",
            "Chidi Nwosu",
            5,
            RiskLevel::Medium,
            &[("career_confusion", 0.7), ("time_management", 0.3)],
        ),
        sample_student(
            "stu-104",
            "Divya Rao",
            5,
            RiskLevel::Low,
            &[("time_management", 0.8)],
        ),
        sample_student(
            "stu-105",
            "Elena Petrova",
            7,
            RiskLevel::High,
            &[("substance_abuse", 0.5), ("mental_health", 0.5)],
        ),
        sample_student(
            "stu-106",
            "Farid Haddad",
            7,
            RiskLevel::Medium,
            &[("relationship_issues", 0.6), ("mental_health", 0.4)],
        ),
    ];

    let staff = vec![
        sample_staff(
            "cns-1",
            "Dr. Grace Lin",
            StaffRole::Counselor,
            &["mental_health", "substance_abuse", "relationship_issues"],
            4,
        ),
        sample_staff(
            "cns-2",
            "Hector Alvarez",
            StaffRole::Counselor,
            &["financial_stress", "family_issues", "career_confusion"],
            3,
        ),
        sample_staff(
            "mnt-1",
            "Ines Duarte",
            StaffRole::Mentor,
            &["academic_struggles", "time_management"],
            3,
        ),
        sample_staff(
            "mnt-2",
            "Jamal Carter",
            StaffRole::Mentor,
            &["career_confusion", "peer_pressure", "mental_health"],
            2,
        ),
    ];

    InMemoryDirectory::new(students, staff)
}
