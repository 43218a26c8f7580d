use crate::infra::{apply_capacity_override, parse_role, RosterArgs};
use chrono::Utc;
use clap::Args;
use mentorship_engine::config::AppConfig;
use mentorship_engine::error::AppError;
use mentorship_engine::matching::{
    AssignmentStats, BulkAllocationReport, EligibilityFilters, InMemoryDirectory,
    MatchRecommendation, MatchingService, RiskLevel, StaffId, StaffLoadView, StaffRole, StudentId,
};
use std::sync::Arc;

type DemoService = MatchingService<InMemoryDirectory, InMemoryDirectory>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reject assignments to staff at capacity instead of warning
    #[arg(long)]
    pub(crate) strict_capacity: bool,
    #[command(flatten)]
    pub(crate) roster: RosterArgs,
}

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// Student id to rank staff for
    #[arg(long)]
    pub(crate) student: String,
    /// Staff role to rank (mentor or counselor)
    #[arg(long, value_parser = parse_role, default_value = "counselor")]
    pub(crate) role: StaffRole,
    #[command(flatten)]
    pub(crate) roster: RosterArgs,
}

fn build_service(roster: &RosterArgs, strict_capacity: bool) -> Result<DemoService, AppError> {
    let mut config = AppConfig::load()?;
    apply_capacity_override(&mut config, strict_capacity);

    let directory = Arc::new(roster.load_directory()?);
    Ok(MatchingService::new(
        directory.clone(),
        directory,
        config.matching,
    ))
}

pub(crate) async fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let service = build_service(&args.roster, false)?;

    match service
        .recommend(&StudentId(args.student.clone()), args.role)
        .await
    {
        Ok(recommendation) => render_recommendation(&recommendation),
        Err(err) => println!("Recommendation unavailable: {}", err),
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = build_service(&args.roster, args.strict_capacity)?;

    println!(
        "Mentorship matching demo ({})",
        Utc::now().format("%Y-%m-%d")
    );

    let pool = match service
        .eligible_pool(StaffRole::Counselor, &EligibilityFilters::default())
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            println!("  Eligible pool unavailable: {}", err);
            return Ok(());
        }
    };
    println!("\nStudents awaiting a counselor");
    for (position, student) in pool.iter().enumerate() {
        println!(
            "  {:>2}. {} ({}) | semester {} | risk {}",
            position + 1,
            student.name,
            student.student_code,
            student
                .semester
                .map(|semester| semester.to_string())
                .unwrap_or_else(|| "-".to_string()),
            student.risk_level.label()
        );
    }

    println!("\nAuto-assigning counselors to students at HIGH risk or above");
    for student in pool
        .iter()
        .filter(|student| student.risk_level >= RiskLevel::High)
    {
        match service.auto_assign(&student.id, StaffRole::Counselor).await {
            Ok(assigned) => {
                let staff = assigned.outcome.assignment.staff_id.clone();
                let name = assigned
                    .recommendation
                    .recommended()
                    .map(|candidate| candidate.staff_name.as_str())
                    .unwrap_or("-");
                println!(
                    "  - {} -> {} ({}){}",
                    student.name,
                    name,
                    staff,
                    if assigned.outcome.capacity_warning.is_some() {
                        " [over capacity]"
                    } else {
                        ""
                    }
                );
            }
            Err(err) => println!("  - {}: {}", student.name, err),
        }
    }

    if let Some(first) = pool.first() {
        println!("\nMentor ranking for {}", first.name);
        match service.recommend(&first.id, StaffRole::Mentor).await {
            Ok(recommendation) => render_recommendation(&recommendation),
            Err(err) => println!("  Recommendation unavailable: {}", err),
        }
        match service.auto_assign(&first.id, StaffRole::Mentor).await {
            Ok(assigned) => println!(
                "  Auto-assigned mentor {}",
                assigned.outcome.assignment.staff_id
            ),
            Err(err) => println!("  Mentor auto-assignment skipped: {}", err),
        }
    }

    if let Some(mentor) = first_staff_id(&service, StaffRole::Mentor).await {
        println!("\nRange assignment: eligible mentees 1-2 to {}", mentor);
        match service
            .assign_range(
                StaffRole::Mentor,
                &EligibilityFilters::default(),
                1,
                3,
                &mentor,
            )
            .await
        {
            Ok(report) => render_bulk_report(&report),
            Err(err) => println!("  Range assignment failed: {}", err),
        }
    }

    for role in StaffRole::ordered() {
        match (service.roster(role).await, service.stats(role).await) {
            (Ok(roster), Ok(stats)) => render_roster(role, &roster, &stats),
            (Err(err), _) | (_, Err(err)) => {
                println!("\n{} roster unavailable: {}", role.label(), err)
            }
        }
    }

    Ok(())
}

async fn first_staff_id(service: &DemoService, role: StaffRole) -> Option<StaffId> {
    service
        .roster(role)
        .await
        .ok()?
        .into_iter()
        .find(|view| view.remaining_capacity > 0)
        .map(|view| view.staff_id)
}

fn render_recommendation(recommendation: &MatchRecommendation) {
    let categories: Vec<String> = recommendation
        .categories
        .iter()
        .map(|category| format!("{} {:.0}%", category.name, category.weight * 100.0))
        .collect();
    println!(
        "  {} ({}) | categories: {}",
        recommendation.student_name,
        recommendation.student_id,
        if categories.is_empty() {
            "none".to_string()
        } else {
            categories.join(", ")
        }
    );

    if recommendation.candidates.is_empty() {
        println!("  No {}s available", recommendation.role.label());
        return;
    }

    for candidate in &recommendation.candidates {
        println!(
            "  {} {} | score {:.2} (affinity {:.2}, headroom {:.2}) | load {}/{} | matched: {}",
            if candidate.is_recommended { "*" } else { "-" },
            candidate.staff_name,
            candidate.composite_score,
            candidate.affinity_score,
            candidate.capacity_headroom,
            candidate.current_load,
            candidate.max_capacity,
            if candidate.matched_categories.is_empty() {
                "none".to_string()
            } else {
                candidate.matched_categories.join(", ")
            }
        );
    }
}

fn render_bulk_report(report: &BulkAllocationReport) {
    println!(
        "  {} committed | {} rejected | {} capacity warnings",
        report.committed.len(),
        report.rejected.len(),
        report.warnings.len()
    );
    for rejection in &report.rejected {
        println!("    - {}: {}", rejection.student_id, rejection.reason);
    }
}

fn render_roster(role: StaffRole, roster: &[StaffLoadView], stats: &AssignmentStats) {
    println!(
        "\n{} coverage: {}/{} students ({:.0}%)",
        role.label(),
        stats.assigned_students,
        stats.total_students,
        stats.assignment_rate_pct
    );
    for view in roster {
        println!(
            "  - {}: {}/{} ({:.0}% utilized){}",
            view.name,
            view.current_load,
            view.max_capacity,
            view.utilization_pct,
            if view.over_capacity {
                " [over capacity]"
            } else {
                ""
            }
        );
    }
}
