use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Actor,
    entities::timesheet::Model as TimesheetModel,
    errors::ServiceError,
    services::{BulkAction, BulkApprovalResult},
    workflow::ApprovalStage,
    ApiResponse, ApiResult, AppState,
};

use super::validation_messages;

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
pub struct ApproveTimesheetRequest {
    /// Stage the caller believes it is approving
    pub stage: Option<ApprovalStage>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RejectTimesheetRequest {
    #[validate(length(min = 1, max = 2000, message = "a rejection reason is required"))]
    pub reason: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct BulkTimesheetRequest {
    #[validate(length(min = 1, max = 500, message = "between 1 and 500 timesheet ids"))]
    pub timesheet_ids: Vec<Uuid>,
    pub action: BulkAction,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

fn validate<T: Validate>(request: &T) -> Result<(), ServiceError> {
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(validation_messages(&e).join("; ")))
}

/// Get a single timesheet
pub async fn get_timesheet(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<TimesheetModel> {
    let timesheet = state.services.timesheets.get(id).await?;
    Ok(Json(ApiResponse::success(timesheet)))
}

/// Submit a draft or rejected timesheet
pub async fn submit_timesheet(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> ApiResult<TimesheetModel> {
    let timesheet = state.services.timesheets.submit(id, &actor).await?;
    Ok(Json(ApiResponse::success(timesheet)))
}

/// Approve the next stage of a timesheet
pub async fn approve_timesheet(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    body: Option<Json<ApproveTimesheetRequest>>,
) -> ApiResult<TimesheetModel> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    validate(&request)?;

    let timesheet = state
        .services
        .timesheets
        .approve(id, &actor, request.stage, request.notes)
        .await?;
    Ok(Json(ApiResponse::success(timesheet)))
}

/// Reject a timesheet with a reason
pub async fn reject_timesheet(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    payload: Result<Json<RejectTimesheetRequest>, JsonRejection>,
) -> ApiResult<TimesheetModel> {
    let Json(request) = payload?;
    validate(&request)?;

    let timesheet = state
        .services
        .timesheets
        .reject(id, &actor, &request.reason)
        .await?;
    Ok(Json(ApiResponse::success(timesheet)))
}

/// Approve or reject many timesheets; failures are reported per id
pub async fn bulk_approve_timesheets(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<BulkTimesheetRequest>, JsonRejection>,
) -> ApiResult<BulkApprovalResult> {
    let Json(request) = payload?;
    validate(&request)?;

    let result = state
        .services
        .timesheets
        .bulk(&request.timesheet_ids, request.action, &actor, request.notes)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
