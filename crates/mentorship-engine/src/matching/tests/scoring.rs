use super::common::*;

use crate::matching::capacity::StaffLoadIndex;
use crate::matching::domain::{CategoryWeight, RiskLevel, StaffRole};
use crate::matching::repository::DirectoryStore;
use crate::matching::scoring::{rank_candidates, MatchScorer, ScoringConfig};

fn mentors() -> Vec<crate::matching::domain::StaffMember> {
    staff_pool()
        .into_iter()
        .filter(|member| member.role == StaffRole::Mentor)
        .collect()
}

#[test]
fn broader_specialization_overlap_ranks_first() {
    let asha = student(
        "s1",
        "Asha Patel",
        "CSE",
        3,
        RiskLevel::High,
        &[("mental_health", 0.6), ("academic_struggles", 0.4)],
    );

    let ranked = rank_candidates(&asha, &mentors(), &StaffLoadIndex::default());

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].staff_id, staff_id("m2"));
    assert!((ranked[0].affinity_score - 2.0 / 3.0).abs() < 1e-4);
    assert_eq!(
        ranked[0].matched_categories,
        vec!["mental_health".to_string(), "academic_struggles".to_string()]
    );
    assert_eq!(ranked[1].staff_id, staff_id("m1"));
    assert!((ranked[1].affinity_score - 1.0 / 3.0).abs() < 1e-4);
    assert_eq!(ranked[0].capacity_headroom, ranked[1].capacity_headroom);
}

#[tokio::test]
async fn ranking_is_sorted_and_deterministic() {
    let directory = directory();
    seed_assignment(&directory, "s2", "c1", StaffRole::Counselor).await;
    let active = directory
        .list_active_assignments(StaffRole::Counselor)
        .await
        .expect("list succeeds");
    let loads = StaffLoadIndex::from_assignments(&active);
    let counselors = directory
        .list_staff(StaffRole::Counselor)
        .await
        .expect("list succeeds");
    let dana = &students()[3];

    let first = rank_candidates(dana, &counselors, &loads);
    let second = rank_candidates(dana, &counselors, &loads);

    assert_eq!(
        serde_json::to_vec(&first).expect("serialize"),
        serde_json::to_vec(&second).expect("serialize")
    );
    assert!(first
        .windows(2)
        .all(|pair| pair[0].composite_score >= pair[1].composite_score));
}

#[test]
fn at_most_one_candidate_is_recommended() {
    let tied = vec![
        staff("m1", "Maya Singh", StaffRole::Mentor, &["mental_health"], 4),
        staff("m3", "Ravi Rao", StaffRole::Mentor, &["mental_health"], 4),
        staff("m2", "Noah Berg", StaffRole::Mentor, &["mental_health"], 4),
    ];
    let categories = vec![CategoryWeight::new("mental_health", 1.0)];
    let scorer = MatchScorer::new(ScoringConfig {
        recommendation_threshold: 0.0,
        ..ScoringConfig::default()
    });

    let ranked = scorer.rank(&categories, &tied, &StaffLoadIndex::default());

    assert_eq!(
        ranked.iter().filter(|candidate| candidate.is_recommended).count(),
        1
    );
    // Equal scores and loads fall back to staff id.
    let order: Vec<&str> = ranked.iter().map(|c| c.staff_id.0.as_str()).collect();
    assert_eq!(order, vec!["m1", "m2", "m3"]);
    assert!(ranked[0].is_recommended);
}

#[test]
fn weak_matches_are_not_recommended() {
    let categories = vec![CategoryWeight::new("family_issues", 0.9)];

    let ranked = MatchScorer::default().rank(&categories, &mentors(), &StaffLoadIndex::default());

    // Full headroom alone only reaches 0.3.
    assert!(ranked.iter().all(|candidate| !candidate.is_recommended));
    assert!(ranked
        .iter()
        .all(|candidate| candidate.matched_categories.is_empty()));
}

#[tokio::test]
async fn full_staff_stay_ranked_with_zero_headroom() {
    let directory = directory();
    seed_assignment(&directory, "s1", "c2", StaffRole::Counselor).await;
    let active = directory
        .list_active_assignments(StaffRole::Counselor)
        .await
        .expect("list succeeds");
    let counselors = directory
        .list_staff(StaffRole::Counselor)
        .await
        .expect("list succeeds");
    let ben = &students()[1];

    let ranked = rank_candidates(ben, &counselors, &StaffLoadIndex::from_assignments(&active));

    let peter = ranked
        .iter()
        .find(|candidate| candidate.staff_id == staff_id("c2"))
        .expect("full counselor still ranked");
    assert_eq!(peter.capacity_headroom, 0.0);
    assert_eq!(peter.current_load, 1);
    assert!((peter.affinity_score - 2.0 / 3.0).abs() < 1e-4);
}

#[test]
fn category_labels_match_across_spellings() {
    let categories = vec![
        CategoryWeight::new("Mental Health", 0.5),
        CategoryWeight::new("substance-abuse", 0.3),
        CategoryWeight::new("ignored", 0.0),
    ];
    let counselors: Vec<_> = staff_pool()
        .into_iter()
        .filter(|member| member.role == StaffRole::Counselor)
        .collect();

    let ranked = MatchScorer::default().rank(&categories, &counselors, &StaffLoadIndex::default());

    assert_eq!(ranked[0].staff_id, staff_id("c1"));
    assert_eq!(
        ranked[0].matched_categories,
        vec!["mental_health".to_string(), "substance_abuse".to_string()]
    );
}
