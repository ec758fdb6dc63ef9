use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Actor,
    entities::{advance_payment::Model as AdvanceModel, advance_payment_history::Model as HistoryModel},
    errors::ServiceError,
    services::RepaymentOutcome,
    workflow::AdvanceSummary,
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

use super::validation_messages;

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RepayAdvanceRequest {
    /// Decimal string or JSON number
    #[serde(default)]
    pub amount: Value,
    /// Advance the repayment is made against
    pub advance_id: Option<Uuid>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Reads a decimal amount sent either as a string or as a JSON number
fn parse_amount(raw: &Value) -> Result<Decimal, ServiceError> {
    let parsed = match raw {
        Value::String(s) => parse_decimal(s.trim()),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    };
    parsed.ok_or_else(|| {
        ServiceError::InvalidAmount(format!("amount must be a decimal number, got {}", raw))
    })
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u64>,
    pub limit: Option<u32>,
}

/// List an employee's advances
pub async fn list_advances(
    State(state): State<AppState>,
    _actor: Actor,
    Path(employee_id): Path<Uuid>,
) -> ApiResult<Vec<AdvanceModel>> {
    let advances = state.services.advances.list(employee_id).await?;
    Ok(Json(ApiResponse::success(advances)))
}

/// Totals advanced, repaid and outstanding for an employee
pub async fn advance_summary(
    State(state): State<AppState>,
    _actor: Actor,
    Path(employee_id): Path<Uuid>,
) -> ApiResult<AdvanceSummary> {
    let summary = state.services.advances.summary(employee_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

/// Record a repayment, spread smallest advance first
pub async fn repay_advances(
    State(state): State<AppState>,
    actor: Actor,
    Path(employee_id): Path<Uuid>,
    payload: Result<Json<RepayAdvanceRequest>, JsonRejection>,
) -> ApiResult<RepaymentOutcome> {
    let Json(request) = payload?;
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(validation_messages(&e).join("; ")))?;
    let amount = parse_amount(&request.amount)?;

    let outcome = state
        .services
        .advances
        .repay(
            employee_id,
            amount,
            request.advance_id,
            request.notes,
            &actor,
        )
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Paged repayment history for an employee
pub async fn repayment_history(
    State(state): State<AppState>,
    _actor: Actor,
    Path(employee_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<PaginatedResponse<HistoryModel>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = state.config.page_size(query.limit);

    let (items, total) = state
        .services
        .advances
        .history(employee_id, page, limit)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        items, total, page, limit,
    ))))
}
