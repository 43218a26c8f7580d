use super::common::*;

use crate::matching::capacity::{
    assignment_stats, load_of, remaining_capacity, staff_roster, StaffLoadIndex,
};
use crate::matching::domain::StaffRole;
use crate::matching::repository::DirectoryStore;

#[tokio::test]
async fn load_counts_only_active_assignments() {
    let directory = directory();
    seed_assignment(&directory, "s1", "m1", StaffRole::Mentor).await;
    let ended = seed_assignment(&directory, "s2", "m1", StaffRole::Mentor).await;
    directory
        .end_assignment(&ended.id)
        .await
        .expect("end succeeds");

    let active = directory
        .list_active_assignments(StaffRole::Mentor)
        .await
        .expect("list succeeds");

    assert_eq!(load_of(&staff_id("m1"), &active), 1);
    assert_eq!(load_of(&staff_id("m2"), &active), 0);

    let index = StaffLoadIndex::from_assignments(&active);
    assert_eq!(index.load(&staff_id("m1")), 1);
}

#[tokio::test]
async fn remaining_capacity_goes_negative_when_over_assigned() {
    let directory = directory();
    for student in ["s1", "s2", "s3"] {
        seed_assignment(&directory, student, "c2", StaffRole::Counselor).await;
    }
    let active = directory
        .list_active_assignments(StaffRole::Counselor)
        .await
        .expect("list succeeds");
    let peter = staff_pool()
        .into_iter()
        .find(|member| member.id.0 == "c2")
        .expect("c2 present");

    assert_eq!(remaining_capacity(&peter, &active), -2);
}

#[tokio::test]
async fn roster_reports_utilization_per_staff_member() {
    let directory = directory();
    seed_assignment(&directory, "s1", "m1", StaffRole::Mentor).await;
    seed_assignment(&directory, "s2", "m1", StaffRole::Mentor).await;
    seed_assignment(&directory, "s4", "m1", StaffRole::Mentor).await;

    let mentors = directory
        .list_staff(StaffRole::Mentor)
        .await
        .expect("list succeeds");
    let active = directory
        .list_active_assignments(StaffRole::Mentor)
        .await
        .expect("list succeeds");

    let roster = staff_roster(&mentors, &active);
    assert_eq!(roster.len(), 2);

    let maya = &roster[0];
    assert_eq!(maya.staff_id, staff_id("m1"));
    assert_eq!(maya.current_load, 3);
    assert_eq!(maya.remaining_capacity, -1);
    assert!(maya.over_capacity);
    assert!((maya.utilization_pct - 150.0).abs() < 1e-3);

    let noah = &roster[1];
    assert_eq!(noah.current_load, 0);
    assert_eq!(noah.role_label, "mentor");
    assert!(!noah.over_capacity);
}

#[tokio::test]
async fn stats_summarise_coverage_for_role() {
    let directory = directory();
    seed_assignment(&directory, "s1", "c1", StaffRole::Counselor).await;
    seed_assignment(&directory, "s3", "c2", StaffRole::Counselor).await;
    seed_assignment(&directory, "s2", "m1", StaffRole::Mentor).await;

    let active = directory
        .list_active_assignments(StaffRole::Counselor)
        .await
        .expect("list succeeds");
    let stats = assignment_stats(&students(), &active, StaffRole::Counselor);

    assert_eq!(stats.total_students, 4);
    assert_eq!(stats.assigned_students, 2);
    assert_eq!(stats.unassigned_students, 2);
    assert!((stats.assignment_rate_pct - 50.0).abs() < 1e-3);
}

#[test]
fn stats_on_empty_directory_report_zero_rate() {
    let stats = assignment_stats(&[], &[], StaffRole::Mentor);
    assert_eq!(stats.total_students, 0);
    assert_eq!(stats.assignment_rate_pct, 0.0);
}
