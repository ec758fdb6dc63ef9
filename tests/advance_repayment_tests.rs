mod common;

use axum::http::{Method, StatusCode};
use common::{decimal_at, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;
use workforce_api::entities::AdvanceStatus;

const CASHIER: (&str, &str) = ("cashier-4", "ACCOUNTS");

fn repay_uri(employee_id: Uuid) -> String {
    format!("/api/v1/employees/{}/advances/repay", employee_id)
}

#[tokio::test]
async fn repayment_fills_smallest_advance_first() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();
    let a = app
        .seed_advance(employee_id, 1000, 200, AdvanceStatus::PartiallyRepaid, None, 30)
        .await;
    let b = app
        .seed_advance(employee_id, 500, 0, AdvanceStatus::Approved, None, 10)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            &repay_uri(employee_id),
            Some(json!({ "amount": "650", "notes": "March payroll" })),
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let allocations = body["data"]["allocations"].as_array().unwrap();
    assert_eq!(allocations.len(), 2);
    assert_eq!(allocations[0]["advance_id"], b.id.to_string());
    assert_eq!(decimal_at(&allocations[0]["applied"]), dec!(500));
    assert_eq!(allocations[0]["status"], "fully_repaid");
    assert_eq!(allocations[1]["advance_id"], a.id.to_string());
    assert_eq!(decimal_at(&allocations[1]["applied"]), dec!(150));
    assert_eq!(allocations[1]["status"], "partially_repaid");

    let history = body["data"]["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["advance_payment_id"], b.id.to_string());
    assert_eq!(history[0]["recorded_by"], "cashier-4");
    assert_eq!(history[1]["notes"], "March payroll");
    assert_eq!(
        decimal_at(&body["data"]["summary"]["remaining_balance"]),
        dec!(650)
    );

    let stored = app.state.services.advances.list(employee_id).await.unwrap();
    let stored_a = stored.iter().find(|adv| adv.id == a.id).unwrap();
    let stored_b = stored.iter().find(|adv| adv.id == b.id).unwrap();
    assert_eq!(stored_a.repaid_amount, dec!(350));
    assert_eq!(stored_a.status, AdvanceStatus::PartiallyRepaid);
    assert_eq!(stored_b.repaid_amount, dec!(500));
    assert_eq!(stored_b.status, AdvanceStatus::FullyRepaid);
    assert!(stored_b.repayment_date.is_some());
}

#[tokio::test]
async fn below_monthly_deduction_is_rejected_without_changes() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();
    let advance = app
        .seed_advance(employee_id, 1000, 0, AdvanceStatus::Approved, Some(200), 5)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            &repay_uri(employee_id),
            Some(json!({ "amount": "100", "advance_id": advance.id })),
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "below_minimum_repayment");

    let summary = app.state.services.advances.summary(employee_id).await.unwrap();
    assert_eq!(summary.total_repaid, dec!(0));
    let (history, total) = app
        .state
        .services
        .advances
        .history(employee_id, 1, 10)
        .await
        .unwrap();
    assert!(history.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn repayment_above_outstanding_is_rejected() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();
    app.seed_advance(employee_id, 1000, 200, AdvanceStatus::PartiallyRepaid, None, 30)
        .await;
    app.seed_advance(employee_id, 500, 0, AdvanceStatus::Approved, None, 10)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            &repay_uri(employee_id),
            Some(json!({ "amount": "1400" })),
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "exceeds_outstanding_balance");

    let summary = app.state.services.advances.summary(employee_id).await.unwrap();
    assert_eq!(summary.remaining_balance, dec!(1300));
}

#[tokio::test]
async fn non_positive_amount_is_invalid() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();
    app.seed_advance(employee_id, 500, 0, AdvanceStatus::Approved, None, 1)
        .await;

    for amount in ["0", "-25"] {
        let (status, body) = app
            .request(
                Method::POST,
                &repay_uri(employee_id),
                Some(json!({ "amount": amount })),
                Some(CASHIER),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_amount");
    }
}

#[tokio::test]
async fn non_numeric_amount_is_invalid() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();
    app.seed_advance(employee_id, 500, 0, AdvanceStatus::Approved, None, 1)
        .await;

    for body in [json!({ "amount": "abc" }), json!({ "amount": null }), json!({})] {
        let (status, response) = app
            .request(Method::POST, &repay_uri(employee_id), Some(body), Some(CASHIER))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["code"], "invalid_amount");
    }
}

#[tokio::test]
async fn malformed_body_is_a_json_error() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            &repay_uri(Uuid::new_v4()),
            Some(json!({ "amount": "10", "advance_id": "not-a-uuid" })),
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn sub_cent_amount_is_rejected_without_changes() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();
    app.seed_advance(employee_id, 500, 0, AdvanceStatus::Approved, None, 1)
        .await;

    for amount in ["0.004", "499.999"] {
        let (status, body) = app
            .request(
                Method::POST,
                &repay_uri(employee_id),
                Some(json!({ "amount": amount })),
                Some(CASHIER),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_amount");
    }

    let summary = app.state.services.advances.summary(employee_id).await.unwrap();
    assert_eq!(summary.total_repaid, dec!(0));
}

#[tokio::test]
async fn targeting_an_ineligible_advance_is_not_found() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();
    app.seed_advance(employee_id, 500, 0, AdvanceStatus::Approved, None, 3)
        .await;
    let pending = app
        .seed_advance(employee_id, 800, 0, AdvanceStatus::Pending, None, 2)
        .await;

    let (status, _) = app
        .request(
            Method::POST,
            &repay_uri(employee_id),
            Some(json!({ "amount": "100", "advance_id": pending.id })),
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn employee_without_advances() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();

    let (status, _) = app
        .request(
            Method::POST,
            &repay_uri(employee_id),
            Some(json!({ "amount": "100" })),
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/employees/{}/advances/summary", employee_id),
            None,
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal_at(&body["data"]["total_advanced"]), dec!(0));
    assert_eq!(decimal_at(&body["data"]["remaining_balance"]), dec!(0));

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/employees/{}/advances", employee_id),
            None,
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn summary_counts_every_status() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();
    app.seed_advance(employee_id, 1000, 200, AdvanceStatus::PartiallyRepaid, None, 30)
        .await;
    app.seed_advance(employee_id, 300, 300, AdvanceStatus::FullyRepaid, None, 20)
        .await;
    app.seed_advance(employee_id, 250, 0, AdvanceStatus::Pending, None, 1)
        .await;
    app.seed_advance(Uuid::new_v4(), 9000, 0, AdvanceStatus::Approved, None, 1)
        .await;

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/employees/{}/advances/summary", employee_id),
            None,
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal_at(&body["data"]["total_advanced"]), dec!(1550));
    assert_eq!(decimal_at(&body["data"]["total_repaid"]), dec!(500));
    assert_eq!(decimal_at(&body["data"]["remaining_balance"]), dec!(1050));
}

#[tokio::test]
async fn history_is_paginated() {
    let app = TestApp::new().await;
    let employee_id = Uuid::new_v4();
    app.seed_advance(employee_id, 100, 0, AdvanceStatus::Approved, None, 3)
        .await;
    app.seed_advance(employee_id, 200, 0, AdvanceStatus::Approved, None, 2)
        .await;
    app.seed_advance(employee_id, 300, 0, AdvanceStatus::Approved, None, 1)
        .await;

    // One repayment touching all three advances writes three history rows.
    let (status, body) = app
        .request(
            Method::POST,
            &repay_uri(employee_id),
            Some(json!({ "amount": "450" })),
            Some(CASHIER),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let history_uri = format!("/api/v1/employees/{}/advances/history", employee_id);
    let (status, body) = app
        .request(Method::GET, &history_uri, None, Some(CASHIER))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["limit"], 2);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .request(
            Method::GET,
            &format!("{}?page=2&limit=2", history_uri),
            None,
            Some(CASHIER),
        )
        .await;
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn advances_require_an_actor() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/employees/{}/advances", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
