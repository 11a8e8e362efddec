//! Router tests over an in-memory SQLite store with a pinned clock.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use lien_core::{clock::FixedClock, service::DeadlineService};
use lien_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

async fn router() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
  let service = DeadlineService::new(Arc::new(store)).with_clock(FixedClock(now));
  api_router(Arc::new(service))
}

async fn send(
  router: &Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let builder = Request::builder().method(method).uri(uri);
  let req = match body {
    Some(v) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  let resp = router.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

fn facts() -> Value {
  json!({
    "role": "general_contractor",
    "project_type": "commercial",
    "jurisdiction": "tx",
    "project_start": "2024-05-20",
    "completion": "2024-06-01",
  })
}

async fn create_project(router: &Router, user_id: Uuid) -> String {
  let (status, body) = send(
    router,
    "POST",
    "/projects",
    Some(json!({ "user_id": user_id, "name": "Clinic" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  body["project_id"].as_str().unwrap().to_owned()
}

async fn project_with_deadlines(router: &Router, user_id: Uuid) -> String {
  let id = create_project(router, user_id).await;
  let (status, _) =
    send(router, "POST", &format!("/projects/{id}/deadlines"), Some(facts())).await;
  assert_eq!(status, StatusCode::CREATED);
  id
}

fn find<'a>(views: &'a Value, category: &str) -> &'a Value {
  views
    .as_array()
    .unwrap()
    .iter()
    .find(|v| v["category"] == category)
    .unwrap_or_else(|| panic!("no {category} in {views}"))
}

// ── Projects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn project_crud() {
  let r = router().await;
  let user = Uuid::new_v4();
  let id = create_project(&r, user).await;

  let (status, body) = send(&r, "GET", &format!("/projects/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Clinic");

  let (status, body) =
    send(&r, "GET", &format!("/projects?user_id={user}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);

  let (status, _) = send(&r, "DELETE", &format!("/projects/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (status, body) = send(&r, "GET", &format!("/projects/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains(&id));
}

#[tokio::test]
async fn blank_project_name_is_rejected() {
  let r = router().await;
  let (status, _) = send(
    &r,
    "POST",
    "/projects",
    Some(json!({ "user_id": Uuid::new_v4(), "name": "  " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Project deadlines ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_deadlines_returns_report_and_views() {
  let r = router().await;
  let id = create_project(&r, Uuid::new_v4()).await;

  let (status, report) =
    send(&r, "POST", &format!("/projects/{id}/deadlines"), Some(facts())).await;
  assert_eq!(status, StatusCode::CREATED);
  let outcomes: Vec<_> = report["results"]
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["outcome"].as_str().unwrap())
    .collect();
  assert_eq!(outcomes, vec!["created"; 4]);

  let (status, views) =
    send(&r, "GET", &format!("/projects/{id}/deadlines"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(views.as_array().unwrap().len(), 4);

  let notice = find(&views, "preliminary_notice");
  assert_eq!(notice["deadline_date"], "2024-06-15");
  assert_eq!(notice["status"], "upcoming");
  assert_eq!(notice["urgency"], "urgent");
  assert_eq!(notice["days_remaining"], 0);

  let lien = find(&views, "mechanics_lien");
  assert_eq!(lien["deadline_date"], "2024-09-01");
  assert_eq!(lien["urgency"], "normal");
}

#[tokio::test]
async fn creating_twice_is_a_conflict_with_report() {
  let r = router().await;
  let id = project_with_deadlines(&r, Uuid::new_v4()).await;

  let (status, body) =
    send(&r, "POST", &format!("/projects/{id}/deadlines"), Some(facts())).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].is_string());
  assert_eq!(body["report"]["results"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn deadlines_for_unknown_project_is_404() {
  let r = router().await;
  let ghost = Uuid::new_v4();

  let (status, _) = send(&r, "GET", &format!("/projects/{ghost}/deadlines"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) =
    send(&r, "POST", &format!("/projects/{ghost}/deadlines"), Some(facts())).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unsupported_jurisdiction_is_unprocessable() {
  let r = router().await;
  let id = create_project(&r, Uuid::new_v4()).await;
  let mut body = facts();
  body["jurisdiction"] = json!("ZZ");

  let (status, _) =
    send(&r, "POST", &format!("/projects/{id}/deadlines"), Some(body)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn update_deadlines_recomputes() {
  let r = router().await;
  let id = project_with_deadlines(&r, Uuid::new_v4()).await;
  let mut moved = facts();
  moved["completion"] = json!("2024-06-20");

  let (status, report) =
    send(&r, "PUT", &format!("/projects/{id}/deadlines"), Some(moved)).await;
  assert_eq!(status, StatusCode::OK);
  let lien = report["results"]
    .as_array()
    .unwrap()
    .iter()
    .find(|r| r["category"] == "mechanics_lien")
    .unwrap();
  assert_eq!(lien["outcome"], "updated");
  assert_eq!(lien["deadline"]["deadline_date"], "2024-09-20");
}

// ── Deadline status ─────────────────────────────────────────────────────────

#[tokio::test]
async fn complete_then_reopen() {
  let r = router().await;
  let id = project_with_deadlines(&r, Uuid::new_v4()).await;
  let (_, views) = send(&r, "GET", &format!("/projects/{id}/deadlines"), None).await;
  let deadline_id = find(&views, "preliminary_notice")["deadline_id"]
    .as_str()
    .unwrap()
    .to_owned();

  let (status, view) = send(
    &r,
    "POST",
    &format!("/deadlines/{deadline_id}/status"),
    Some(json!({ "status": "completed", "note": "sent certified" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["status"], "completed");
  assert_eq!(view["note"], "sent certified");

  let (status, _) = send(
    &r,
    "POST",
    &format!("/deadlines/{deadline_id}/status"),
    Some(json!({ "status": "upcoming" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, view) =
    send(&r, "POST", &format!("/deadlines/{deadline_id}/reopen"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(view["status"], "upcoming");

  let (status, _) =
    send(&r, "POST", &format!("/deadlines/{deadline_id}/reopen"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn delete_deadline() {
  let r = router().await;
  let id = project_with_deadlines(&r, Uuid::new_v4()).await;
  let (_, views) = send(&r, "GET", &format!("/projects/{id}/deadlines"), None).await;
  let deadline_id = find(&views, "funds_trapping")["deadline_id"]
    .as_str()
    .unwrap()
    .to_owned();

  let (status, _) = send(&r, "DELETE", &format!("/deadlines/{deadline_id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = send(&r, "GET", &format!("/deadlines/{deadline_id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Users and reminders ─────────────────────────────────────────────────────

#[tokio::test]
async fn user_deadlines_and_stats() {
  let r = router().await;
  let user = Uuid::new_v4();
  project_with_deadlines(&r, user).await;
  project_with_deadlines(&r, user).await;
  project_with_deadlines(&r, Uuid::new_v4()).await;

  let (status, views) = send(&r, "GET", &format!("/users/{user}/deadlines"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(views.as_array().unwrap().len(), 8);

  let (status, stats) = send(&r, "GET", &format!("/users/{user}/stats"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["total"], 8);
  assert_eq!(stats["upcoming"], 8);
  assert_eq!(stats["urgent"], 4);
  assert_eq!(stats["by_category"]["mechanics_lien"], 2);
  assert_eq!(stats["next_deadline"]["deadline_date"], "2024-06-15");
}

#[tokio::test]
async fn reminders_respect_window() {
  let r = router().await;
  project_with_deadlines(&r, Uuid::new_v4()).await;

  let (status, due) = send(&r, "GET", "/reminders", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(due.as_array().unwrap().len(), 2);

  let (_, due) = send(&r, "GET", "/reminders?window_days=16", None).await;
  assert_eq!(due.as_array().unwrap().len(), 3);
  assert_eq!(find(&due, "retention_release")["days_remaining"], 16);
}

// ── Calculate ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn calculate_evaluates_without_persisting() {
  let r = router().await;
  let body = json!({
    "role": "subcontractor",
    "project_type": "residential",
    "jurisdiction": "TX",
    "last_work": "2024-01-15",
  });

  let (status, result) = send(&r, "POST", "/calculate", Some(body)).await;
  assert_eq!(status, StatusCode::OK);
  let deadlines = result["deadlines"].as_array().unwrap();
  assert_eq!(deadlines.len(), 1);
  assert_eq!(deadlines[0]["deadline_type"], "mechanics_lien");
  assert_eq!(deadlines[0]["deadline_date"], "2024-05-15");
  assert_eq!(deadlines[0]["status"], "overdue");
  assert_eq!(result["skipped"].as_array().unwrap().len(), 3);

  let (_, due) = send(&r, "GET", "/reminders?window_days=365", None).await;
  assert!(due.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn calculate_single_category() {
  let r = router().await;
  let mut body = facts();
  body["categories"] = json!(["retention_release"]);

  let (status, result) = send(&r, "POST", "/calculate", Some(body)).await;
  assert_eq!(status, StatusCode::OK);
  let deadlines = result["deadlines"].as_array().unwrap();
  assert_eq!(deadlines.len(), 1);
  assert_eq!(deadlines[0]["deadline_date"], "2024-07-01");
  assert_eq!(deadlines[0]["days_remaining"], 16);
}

#[tokio::test]
async fn calculate_unknown_jurisdiction() {
  let r = router().await;
  let mut body = facts();
  body["jurisdiction"] = json!("ZZ");

  let (status, result) = send(&r, "POST", "/calculate", Some(body)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(result["error"].as_str().unwrap().contains("ZZ"));
}

#[tokio::test]
async fn calculate_named_category_without_its_trigger_is_unprocessable() {
  let r = router().await;
  let body = json!({
    "role": "subcontractor",
    "project_type": "residential",
    "jurisdiction": "TX",
    "project_start": "2024-01-05",
    "categories": ["mechanics_lien"],
  });

  let (status, result) = send(&r, "POST", "/calculate", Some(body)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(result["error"].as_str().unwrap().contains("mechanics_lien"));
}
