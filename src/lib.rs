//! Workforce API library
//!
//! Timesheet approval and employee advance repayment workflows, served over
//! HTTP on top of sea-orm.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod repositories;
pub mod services;
pub mod tracing;
pub mod workflow;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{PermissionChecker, RolePermissionChecker};
use crate::workflow::{Clock, SystemClock};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Production wiring: wall clock and the role-based approval table
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        Self::with_collaborators(
            db,
            config,
            event_sender,
            Arc::new(SystemClock),
            Arc::new(RolePermissionChecker),
        )
    }

    pub fn with_collaborators(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
        clock: Arc<dyn Clock>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        let services =
            handlers::AppServices::new(db.clone(), event_sender.clone(), clock, permissions);
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let timesheets = Router::new()
        .route(
            "/timesheets/bulk-approve",
            post(handlers::timesheets::bulk_approve_timesheets),
        )
        .route("/timesheets/:id", get(handlers::timesheets::get_timesheet))
        .route(
            "/timesheets/:id/submit",
            post(handlers::timesheets::submit_timesheet),
        )
        .route(
            "/timesheets/:id/approve",
            post(handlers::timesheets::approve_timesheet),
        )
        .route(
            "/timesheets/:id/reject",
            post(handlers::timesheets::reject_timesheet),
        );

    let advances = Router::new()
        .route(
            "/employees/:employee_id/advances",
            get(handlers::advances::list_advances),
        )
        .route(
            "/employees/:employee_id/advances/summary",
            get(handlers::advances::advance_summary),
        )
        .route(
            "/employees/:employee_id/advances/repay",
            post(handlers::advances::repay_advances),
        )
        .route(
            "/employees/:employee_id/advances/history",
            get(handlers::advances::repayment_history),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .merge(timesheets)
        .merge(advances)
}

/// Full application router minus the deployment-specific outer layers
/// (CORS, compression, timeouts), which `main` adds from config.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "workforce-api",
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
