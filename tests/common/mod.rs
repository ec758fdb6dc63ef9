#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use workforce_api::{
    auth::RolePermissionChecker,
    config::AppConfig,
    db,
    entities::{advance_payment, timesheet, AdvanceStatus, TimesheetStatus},
    events,
    repositories::{AdvanceRepository, TimesheetRepository},
    workflow::FixedClock,
    AppState,
};

/// Instant every test request observes as "now"
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
}

/// Application harness backed by a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("workforce_test.db").display()
        );

        let mut cfg = AppConfig::new(url, "127.0.0.1".to_string(), 18_080, "test".to_string());
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.api_default_page_size = 2;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::with_collaborators(
            Arc::new(pool),
            cfg,
            event_sender,
            Arc::new(FixedClock(fixed_now())),
            Arc::new(RolePermissionChecker),
        );
        let router = workforce_api::app_router(state.clone());

        Self {
            router,
            state,
            _dir: dir,
            _event_task: event_task,
        }
    }

    /// Send a request as `actor` holding `roles`; `None` omits the identity headers.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        actor: Option<(&str, &str)>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((actor_id, roles)) = actor {
            builder = builder
                .header("x-actor-id", actor_id)
                .header("x-actor-roles", roles);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is json")
        };
        (status, json)
    }

    pub async fn seed_timesheet(&self, status: TimesheetStatus) -> timesheet::Model {
        let now = fixed_now() - chrono::Duration::days(1);
        let model = timesheet::Model {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            hours_worked: Decimal::from(8),
            overtime_hours: Decimal::from(2),
            status,
            approved_by: None,
            approved_at: None,
            submitted_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            rejection_stage: None,
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        TimesheetRepository::new(self.state.db.clone())
            .create(self.state.db.as_ref(), model)
            .await
            .expect("seed timesheet")
    }

    /// Seeds an advance; `age_days` orders creation times for tie-breaks.
    pub async fn seed_advance(
        &self,
        employee_id: Uuid,
        amount: i64,
        repaid: i64,
        status: AdvanceStatus,
        monthly_deduction: Option<i64>,
        age_days: i64,
    ) -> advance_payment::Model {
        let created = fixed_now() - chrono::Duration::days(age_days);
        let model = advance_payment::Model {
            id: Uuid::new_v4(),
            employee_id,
            amount: Decimal::from(amount),
            repaid_amount: Decimal::from(repaid),
            monthly_deduction: monthly_deduction.map(Decimal::from),
            status,
            purpose: "Medical".to_string(),
            reason: None,
            notes: None,
            repayment_date: None,
            created_at: created,
            updated_at: created,
            deleted_at: None,
        };
        AdvanceRepository::new(self.state.db.clone())
            .create(self.state.db.as_ref(), model)
            .await
            .expect("seed advance")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Reads a decimal that may be serialized as a string or a number
pub fn decimal_at(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("expected decimal, got {other}"),
    }
}
