//! Integration tests for the audit workflow endpoints.
//!
//! Covers plan creation, portal submissions, corrective actions, their
//! resolution onto the canonical asset, and consolidated notifications.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{TimeZone, Utc};
use common::{
    asset, empty_post, get_request, json_request, json_request_as, parse_response_body,
    TestHarness, AUDITOR, OSAKA, OUTSIDER, OWNER, SECOND_OWNER, TOKYO,
};
use domain::models::AssetStatus;
use serde_json::json;

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let harness = TestHarness::new();

    let response = harness.send(get_request("/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");

    let response = harness.send(get_request("/api/health/live")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness.send(get_request("/api/health/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let harness = TestHarness::new();
    let request = axum::http::Request::builder()
        .uri("/api/health/live")
        .header("x-request-id", "req-42")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = harness.send(request).await;
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-42"
    );
}

// ============================================================================
// Audit plan creation
// ============================================================================

#[tokio::test]
async fn test_create_plan_fans_out_assignments_and_snapshots() {
    let harness = TestHarness::seeded().await;
    harness.store.insert_asset(asset(103, "Osaka Branch", None)).await;
    harness
        .store
        .insert_asset(asset(104, "Osaka Branch", Some(OUTSIDER)))
        .await;

    let response = harness
        .send(json_request_as(
            Method::POST,
            "/api/v1/audit-plans",
            json!({
                "name": "FY2025 Full Audit",
                "startDate": "2025-01-01",
                "dueDate": "2025-02-01",
                "locationIds": [TOKYO, OSAKA],
                "auditorIds": [AUDITOR, OWNER, SECOND_OWNER],
            }),
            AUDITOR,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["assignmentCount"], 6);
    assert_eq!(body["auditAssetCount"], 5);
    assert_eq!(body["plan"]["status"], "Planning");
    assert_eq!(body["plan"]["createdBy"], AUDITOR);

    let plan_id = body["plan"]["id"].as_i64().unwrap();
    let response = harness
        .send(get_request(&format!("/api/v1/audit-plans/{}/assets", plan_id)))
        .await;
    let assets = parse_response_body(response).await;
    let assets = assets.as_array().unwrap();
    assert_eq!(assets.len(), 5);
    for audit_asset in assets {
        assert_eq!(audit_asset["originalLocation"], audit_asset["currentLocation"]);
        assert_eq!(audit_asset["auditStatus"], false);
        assert_eq!(audit_asset["resolved"], false);
    }
}

#[tokio::test]
async fn test_create_plan_single_location_sends_kickoff_mail() {
    let harness = TestHarness::seeded().await;

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/audit-plans",
            json!({
                "name": "Q1 Audit",
                "startDate": "2025-01-01",
                "dueDate": "2025-02-01",
                "locationIds": [TOKYO],
                "auditorIds": [AUDITOR],
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["assignmentCount"], 1);
    assert_eq!(body["auditAssetCount"], 2);
    assert!(body["notificationsSent"].as_u64().unwrap() >= 1);
    assert_eq!(harness.mailer.sent_to("tanaka@example.com").len(), 1);
}

#[tokio::test]
async fn test_create_plan_reports_every_violation() {
    let harness = TestHarness::seeded().await;

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/audit-plans",
            json!({
                "name": "",
                "startDate": "2025-02-01",
                "dueDate": "2025-01-01",
                "locationIds": [TOKYO],
                "auditorIds": [AUDITOR],
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Audit plan name is required"));
    assert!(message.contains("Due date must be after the start date"));
}

#[tokio::test]
async fn test_create_plan_rejects_malformed_json() {
    let harness = TestHarness::seeded().await;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/audit-plans")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"name\": "))
        .unwrap();

    let response = harness.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_plan_returns_not_found() {
    let harness = TestHarness::seeded().await;

    let response = harness.send(get_request("/api/v1/audit-plans/999")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_malformed_actor_header_is_rejected() {
    let harness = TestHarness::seeded().await;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/audit-plans")
        .header("content-type", "application/json")
        .header("x-actor-id", "not-a-number")
        .body(axum::body::Body::from("{}"))
        .unwrap();

    let response = harness.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Portal access
// ============================================================================

#[tokio::test]
async fn test_issue_token_includes_portal_url() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/access-tokens",
            json!({ "employeeId": OWNER, "auditPlanId": plan_id }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    let token = body["token"].as_str().unwrap();
    assert!(body["portalUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://assets.example.com"));
    assert!(body["portalUrl"].as_str().unwrap().contains(token));
}

#[tokio::test]
async fn test_outsider_cannot_get_token() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/access-tokens",
            json!({ "employeeId": OUTSIDER, "auditPlanId": plan_id }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_open_portal_shows_visible_assets() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;

    let auditor_token = harness.issue_token(AUDITOR, plan_id).await;
    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/portal/access",
            json!({ "token": auditor_token }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["plan"]["name"], "Q1 Audit");
    assert_eq!(body["auditAssets"].as_array().unwrap().len(), 2);

    let owner_token = harness.issue_token(OWNER, plan_id).await;
    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/portal/access",
            json!({ "token": owner_token }),
        ))
        .await;
    let body = parse_response_body(response).await;
    let visible = body["auditAssets"].as_array().unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0]["assetId"], 100);
    assert_eq!(visible[0]["assetCode"], "PC-0100");
}

#[tokio::test]
async fn test_unknown_and_revoked_tokens_are_unauthorized() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/portal/access",
            json!({ "token": "no-such-token" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = harness.issue_token(OWNER, plan_id).await;
    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/portal/logout",
            json!({ "token": token }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/portal/access",
            json!({ "token": token }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let token = harness.issue_token(OWNER, plan_id).await;

    harness
        .clock
        .set(Utc.with_ymd_and_hms(2025, 1, 18, 9, 0, 0).unwrap());

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/portal/access",
            json!({ "token": token }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Submissions
// ============================================================================

#[tokio::test]
async fn test_missing_asset_full_cycle_resolves_to_storage() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;
    let token = harness.issue_token(AUDITOR, plan_id).await;

    let response = harness.submit(&token, audit_asset_id, "Missing", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["auditAsset"]["currentStatus"], "欠落");
    assert_eq!(body["auditAsset"]["auditStatus"], true);
    let action = &body["correctiveAction"];
    assert_eq!(action["assignedTo"], AUDITOR);
    assert_eq!(action["status"], "pending");
    let action_id = action["id"].as_i64().unwrap();

    // The first submission moves the plan along
    let response = harness
        .send(get_request(&format!("/api/v1/audit-plans/{}", plan_id)))
        .await;
    let plan = parse_response_body(response).await;
    assert_eq!(plan["status"], "In Progress");

    let response = harness
        .send(get_request(&format!(
            "/api/v1/corrective-actions/{}/resolution-status",
            action_id
        )))
        .await;
    let body = parse_response_body(response).await;
    assert_eq!(body["resolutionStatus"], "保管中");

    let response = harness
        .send(json_request_as(
            Method::PUT,
            &format!("/api/v1/corrective-actions/{}/status", action_id),
            json!({ "status": "completed", "notes": "Found in storage room" }),
            AUDITOR,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "completed");

    let canonical = harness.store.asset(100).await.unwrap();
    assert_eq!(canonical.status, AssetStatus::InStorage);
    assert_eq!(canonical.updated_by, Some(AUDITOR));

    let response = harness
        .send(get_request(&format!("/api/v1/audit-plans/{}/assets", plan_id)))
        .await;
    let assets = parse_response_body(response).await;
    let resolved = assets
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["assetId"] == 100)
        .unwrap();
    assert_eq!(resolved["resolved"], true);
}

#[tokio::test]
async fn test_broken_asset_resolves_back_to_in_use() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;
    let token = harness.issue_token(OWNER, plan_id).await;

    let response = harness.submit(&token, audit_asset_id, "Broken", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let action_id = body["correctiveAction"]["id"].as_i64().unwrap();

    let response = harness
        .send(get_request(&format!(
            "/api/v1/corrective-actions/{}/resolution-status",
            action_id
        )))
        .await;
    let body = parse_response_body(response).await;
    assert_eq!(body["resolutionStatus"], "利用中");
}

#[tokio::test]
async fn test_submission_on_resolved_asset_is_conflict() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;
    let token = harness.issue_token(AUDITOR, plan_id).await;

    let response = harness.submit(&token, audit_asset_id, "In Use", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness
        .send(empty_post(&format!(
            "/api/v1/audit-assets/{}/resolve",
            audit_asset_id
        )))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let before = harness.audit_asset_json(plan_id, 100).await;
    let response = harness.submit(&token, audit_asset_id, "Broken", None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "conflict");

    let after = harness.audit_asset_json(plan_id, 100).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_repeated_resolve_leaves_asset_unchanged() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 101).await;
    let token = harness.issue_token(AUDITOR, plan_id).await;

    let response = harness.submit(&token, audit_asset_id, "Broken", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/api/v1/audit-assets/{}/resolve", audit_asset_id);
    let response = harness.send(empty_post(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = harness.store.asset(101).await.unwrap();
    let log_len = harness.store.audit_log().await.len();

    harness.clock.advance(chrono::Duration::hours(2));
    let response = harness.send(empty_post(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = harness.store.asset(101).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(harness.store.audit_log().await.len(), log_len);
}

#[tokio::test]
async fn test_asset_listing_filters() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;
    let token = harness.issue_token(AUDITOR, plan_id).await;

    let response = harness.submit(&token, audit_asset_id, "Missing", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/api/v1/audit-plans/{}/assets?discrepancies=true", plan_id);
    let body = parse_response_body(harness.send(get_request(&uri)).await).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["assetId"], 100);

    let uri = format!("/api/v1/audit-plans/{}/assets?unaudited=true", plan_id);
    let body = parse_response_body(harness.send(get_request(&uri)).await).await;
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["assetId"], 101);
}

#[tokio::test]
async fn test_resolve_unaudited_asset_is_conflict() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 101).await;

    let response = harness
        .send(empty_post(&format!(
            "/api/v1/audit-assets/{}/resolve",
            audit_asset_id
        )))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reassignment_only_for_unassigned_assets() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let token = harness.issue_token(AUDITOR, plan_id).await;

    let owned = harness.audit_asset_id(plan_id, 100).await;
    let response = harness
        .submit(&token, owned, "In Use", Some(OUTSIDER))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let unowned = harness.audit_asset_id(plan_id, 101).await;
    let response = harness
        .submit(&token, unowned, "In Use", Some(OUTSIDER))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["auditAsset"]["currentUser"], "Kato Ken");

    let canonical = harness.store.asset(101).await.unwrap();
    assert_eq!(canonical.user_id, Some(OUTSIDER));
}

#[tokio::test]
async fn test_unknown_status_is_validation_error() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;
    let token = harness.issue_token(AUDITOR, plan_id).await;

    let response = harness.submit(&token, audit_asset_id, "Lost", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_statistics_and_completion() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let token = harness.issue_token(AUDITOR, plan_id).await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;
    harness.submit(&token, audit_asset_id, "In Use", None).await;

    let response = harness
        .send(get_request(&format!("/api/v1/audit-plans/{}/statistics", plan_id)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = parse_response_body(response).await;
    assert_eq!(stats["totalAssets"], 2);
    assert_eq!(stats["auditedAssets"], 1);
    assert_eq!(stats["unauditedAssets"], 1);

    let response = harness
        .send(empty_post(&format!("/api/v1/audit-plans/{}/complete", plan_id)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness
        .send(get_request(&format!("/api/v1/audit-plans/{}", plan_id)))
        .await;
    let plan = parse_response_body(response).await;
    assert_eq!(plan["status"], "Completed");

    let other = harness.audit_asset_id(plan_id, 101).await;
    let response = harness.submit(&token, other, "In Use", None).await;
    assert!(matches!(
        response.status(),
        StatusCode::CONFLICT | StatusCode::UNAUTHORIZED
    ));
}

// ============================================================================
// Corrective actions
// ============================================================================

#[tokio::test]
async fn test_create_corrective_action_validation() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/corrective-actions",
            json!({
                "auditAssetId": audit_asset_id,
                "issue": "",
                "action": "",
                "assignedTo": 999,
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Issue must be 1-2000 characters"));
    assert!(message.contains("Action must be 1-2000 characters"));
    assert!(message.contains("Unknown assignee id: 999"));
}

#[tokio::test]
async fn test_completed_action_cannot_reopen() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;
    let action_id = harness.create_action(audit_asset_id, OWNER).await;

    let uri = format!("/api/v1/corrective-actions/{}/status", action_id);
    let response = harness
        .send(json_request(Method::PUT, &uri, json!({ "status": "completed" })))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness
        .send(json_request(Method::PUT, &uri, json!({ "status": "in_progress" })))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_bulk_status_reports_per_id() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;
    let first = harness.create_action(audit_asset_id, OWNER).await;
    let second = harness.create_action(audit_asset_id, OWNER).await;

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/corrective-actions/bulk-status",
            json!({ "ids": [first, second, 999], "status": "in_progress" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["updated"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["results"].as_array().unwrap().len(), 3);

    let response = harness
        .send(get_request(&format!("/api/v1/corrective-actions/{}", first)))
        .await;
    let action = parse_response_body(response).await;
    assert_eq!(action["status"], "in_progress");
}

#[tokio::test]
async fn test_bulk_notify_sends_one_mail_per_employee() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let a100 = harness.audit_asset_id(plan_id, 100).await;
    let a101 = harness.audit_asset_id(plan_id, 101).await;

    let mut ids = Vec::new();
    for audit_asset_id in [a100, a100, a101] {
        ids.push(harness.create_action(audit_asset_id, OWNER).await);
    }
    ids.push(harness.create_action(a101, SECOND_OWNER).await);

    let sato_before = harness.mailer.sent_to("sato@example.com").len();
    let suzuki_before = harness.mailer.sent_to("suzuki@example.com").len();

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/corrective-actions/bulk-notify",
            json!({ "ids": ids }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let summary = parse_response_body(response).await;
    assert_eq!(summary["totalActions"], 4);
    assert_eq!(summary["employeesNotified"], 2);

    let sato = harness.mailer.sent_to("sato@example.com");
    assert_eq!(sato.len(), sato_before + 1);
    assert_eq!(sato.last().unwrap().action_count(), 3);

    let suzuki = harness.mailer.sent_to("suzuki@example.com");
    assert_eq!(suzuki.len(), suzuki_before + 1);
    assert_eq!(suzuki.last().unwrap().action_count(), 1);
}

#[tokio::test]
async fn test_bulk_notify_requires_ids() {
    let harness = TestHarness::seeded().await;

    let response = harness
        .send(json_request(
            Method::POST,
            "/api/v1/corrective-actions/bulk-notify",
            json!({ "ids": [] }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Reminders
// ============================================================================

#[tokio::test]
async fn test_overdue_sweep_marks_and_notifies() {
    let harness = TestHarness::seeded().await;
    let plan_id = harness.create_tokyo_plan().await;
    let audit_asset_id = harness.audit_asset_id(plan_id, 100).await;
    let action_id = harness.create_action(audit_asset_id, OWNER).await;
    let before = harness.mailer.sent_to("sato@example.com").len();

    harness
        .clock
        .set(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());

    let response = harness
        .send(empty_post("/api/v1/reminders/corrective-actions/overdue"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["markedOverdue"], 1);
    assert_eq!(body["notifications"]["employeesNotified"], 1);
    assert_eq!(harness.mailer.sent_to("sato@example.com").len(), before + 1);

    let response = harness
        .send(get_request(&format!("/api/v1/corrective-actions/{}", action_id)))
        .await;
    let action = parse_response_body(response).await;
    assert_eq!(action["status"], "overdue");
}

#[tokio::test]
async fn test_audit_reminders_follow_configured_days() {
    let harness = TestHarness::seeded().await;
    harness.create_tokyo_plan().await;

    let response = harness.send(empty_post("/api/v1/reminders/audit")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["plansDue"], 0);

    // Seven days before the 2025-02-01 due date
    harness
        .clock
        .set(Utc.with_ymd_and_hms(2025, 1, 25, 9, 0, 0).unwrap());

    let response = harness.send(empty_post("/api/v1/reminders/audit")).await;
    let body = parse_response_body(response).await;
    assert_eq!(body["plansDue"], 1);
    assert!(body["remindersSent"].as_u64().unwrap() >= 1);
}

impl TestHarness {
    async fn audit_asset_json(&self, plan_id: i64, asset_id: i64) -> serde_json::Value {
        let response = self
            .send(get_request(&format!("/api/v1/audit-plans/{}/assets", plan_id)))
            .await;
        let body = parse_response_body(response).await;
        body.as_array()
            .unwrap()
            .iter()
            .find(|a| a["assetId"] == asset_id)
            .cloned()
            .unwrap()
    }

    async fn create_action(&self, audit_asset_id: i64, assigned_to: i64) -> i64 {
        let response = self
            .send(json_request(
                Method::POST,
                "/api/v1/corrective-actions",
                json!({
                    "auditAssetId": audit_asset_id,
                    "issue": "Label missing",
                    "action": "Reprint asset label",
                    "assignedTo": assigned_to,
                }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = parse_response_body(response).await;
        body["id"].as_i64().unwrap()
    }
}
