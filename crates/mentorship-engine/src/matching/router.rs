use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::allocator::{AllocationError, RejectionReason};
use super::domain::{AssignmentId, StaffId, StaffRole, StudentId};
use super::eligibility::EligibilityFilters;
use super::repository::{CategoryOracle, DirectoryStore, StoreError};
use super::service::{MatchingService, MatchingServiceError};

/// Router builder exposing eligibility, matching and allocation endpoints.
pub fn matching_router<S, O>(service: Arc<MatchingService<S, O>>) -> Router
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    Router::new()
        .route(
            "/api/v1/assignments/:role/eligible",
            get(eligible_handler::<S, O>),
        )
        .route("/api/v1/assignments/:role", post(assign_handler::<S, O>))
        .route(
            "/api/v1/assignments/:role/bulk",
            post(bulk_assign_handler::<S, O>),
        )
        .route(
            "/api/v1/assignments/:role/range",
            post(range_assign_handler::<S, O>),
        )
        .route(
            "/api/v1/assignments/:role/reassign",
            post(reassign_handler::<S, O>),
        )
        .route(
            "/api/v1/assignments/:role/stats",
            get(stats_handler::<S, O>),
        )
        .route(
            "/api/v1/assignment-records/:assignment_id/end",
            post(end_handler::<S, O>),
        )
        .route("/api/v1/staff/:role/roster", get(roster_handler::<S, O>))
        .route(
            "/api/v1/matches/:role/:student_id",
            get(recommend_handler::<S, O>),
        )
        .route(
            "/api/v1/matches/:role/:student_id/auto",
            post(auto_assign_handler::<S, O>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct EligibleQuery {
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default)]
    pub(crate) semester: Option<String>,
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) start: Option<i64>,
    #[serde(default)]
    pub(crate) end: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    pub(crate) student_id: StudentId,
    pub(crate) staff_id: StaffId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BulkAssignRequest {
    pub(crate) student_ids: Vec<StudentId>,
    pub(crate) staff_id: StaffId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RangeAssignRequest {
    pub(crate) staff_id: StaffId,
    pub(crate) start: i64,
    pub(crate) end: i64,
    #[serde(flatten)]
    pub(crate) filters: EligibilityFilters,
}

pub(crate) async fn eligible_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path(role): Path<StaffRole>,
    Query(query): Query<EligibleQuery>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    let filters = EligibilityFilters {
        department: query.department,
        semester: query.semester,
        search_term: query.search,
    };

    let result = match (query.start, query.end) {
        (None, None) => service.eligible_pool(role, &filters).await,
        (start, end) => {
            service
                .eligible_range(role, &filters, start.unwrap_or(1), end.unwrap_or(i64::MAX))
                .await
        }
    };

    match result {
        Ok(students) => (StatusCode::OK, Json(students)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assign_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path(role): Path<StaffRole>,
    Json(request): Json<AssignRequest>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    match service
        .assign_single(&request.student_id, &request.staff_id, role)
        .await
    {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(outcome)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn bulk_assign_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path(role): Path<StaffRole>,
    Json(request): Json<BulkAssignRequest>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    match service
        .assign_bulk(&request.student_ids, &request.staff_id, role)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn range_assign_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path(role): Path<StaffRole>,
    Json(request): Json<RangeAssignRequest>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    match service
        .assign_range(
            role,
            &request.filters,
            request.start,
            request.end,
            &request.staff_id,
        )
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reassign_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path(role): Path<StaffRole>,
    Json(request): Json<AssignRequest>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    match service
        .reassign(&request.student_id, &request.staff_id, role)
        .await
    {
        Ok(reassignment) => (StatusCode::OK, Json(reassignment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn end_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path(assignment_id): Path<String>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    match service.end_assignment(&AssignmentId(assignment_id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn stats_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path(role): Path<StaffRole>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    match service.stats(role).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn roster_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path(role): Path<StaffRole>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    match service.roster(role).await {
        Ok(roster) => (StatusCode::OK, Json(roster)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recommend_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path((role, student_id)): Path<(StaffRole, String)>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    match service.recommend(&StudentId(student_id), role).await {
        Ok(recommendation) => (StatusCode::OK, Json(recommendation)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn auto_assign_handler<S, O>(
    State(service): State<Arc<MatchingService<S, O>>>,
    Path((role, student_id)): Path<(StaffRole, String)>,
) -> Response
where
    S: DirectoryStore + 'static,
    O: CategoryOracle + 'static,
{
    match service.auto_assign(&StudentId(student_id), role).await {
        Ok(assignment) => {
            let status = if assignment.outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(assignment)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: MatchingServiceError) -> Response {
    let (status, code) = match &err {
        MatchingServiceError::StudentNotFound(_) => (StatusCode::NOT_FOUND, "student_not_found"),
        MatchingServiceError::RiskBelowThreshold { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "risk_below_threshold")
        }
        MatchingServiceError::CounselorRequired(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "counselor_required")
        }
        MatchingServiceError::NoRecommendation(_) => (StatusCode::CONFLICT, "no_recommendation"),
        MatchingServiceError::Allocation(AllocationError::Rejected(reason)) => {
            (rejection_status(reason), reason.code())
        }
        MatchingServiceError::Allocation(AllocationError::Store(store))
        | MatchingServiceError::Allocation(AllocationError::BulkAborted { source: store, .. })
        | MatchingServiceError::Store(store) => store_status(store),
    };

    let mut payload = json!({
        "error": err.to_string(),
        "code": code,
    });
    if let MatchingServiceError::Allocation(AllocationError::BulkAborted { report, .. }) = &err {
        payload["report"] = json!(report);
    }
    (status, Json(payload)).into_response()
}

fn rejection_status(reason: &RejectionReason) -> StatusCode {
    match reason {
        RejectionReason::DuplicateAssignment { .. } => StatusCode::CONFLICT,
        RejectionReason::CapacityExceeded { .. } | RejectionReason::RoleMismatch { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RejectionReason::UnknownStudent { .. } | RejectionReason::UnknownStaff { .. } => {
            StatusCode::NOT_FOUND
        }
        RejectionReason::NoActiveAssignment { .. } => StatusCode::CONFLICT,
    }
}

fn store_status(err: &StoreError) -> (StatusCode, &'static str) {
    match err {
        StoreError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        StoreError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
    }
}
