use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode},
};
use chrono::NaiveDate;
use config::{File, FileFormat};
use lien_core::{
  deadline::Category,
  facts::{DateFact, Jurisdiction, ProjectFacts, ProjectType, Role},
  rules::RuleTable,
  service::DeadlineService,
};
use lien_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use crate::{ServerConfig, app, expand_tilde, load_rules};

const CALIFORNIA: &str = r#"
[[CA.preliminary_notice]]
trigger = "work_start"
offset  = { kind = "days", days = 20 }

[[CA.mechanics_lien]]
when    = { kind = "role", roles = ["general_contractor"] }
trigger = "completion"
offset  = { kind = "days", days = 60 }

[[CA.mechanics_lien]]
trigger = "completion"
offset  = { kind = "days", days = 30 }
"#;

fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

#[test]
fn defaults_apply_without_a_file() {
  let cfg = ServerConfig::default();
  assert_eq!(cfg.urgent_within_days, 7);
  assert_eq!(cfg.busy_timeout().as_millis(), 5000);
  assert!(cfg.rules_path.is_none());
}

#[test]
fn partial_file_keeps_other_defaults() {
  let cfg: ServerConfig = config::Config::builder()
    .add_source(File::from_str("port = 9000\nurgent_within_days = 14", FileFormat::Toml))
    .build()
    .unwrap()
    .try_deserialize()
    .unwrap();
  assert_eq!(cfg.port, 9000);
  assert_eq!(cfg.policy().urgent_within_days, 14);
  assert_eq!(cfg.host, "127.0.0.1");
}

#[test]
fn load_rejects_a_negative_urgency_window() {
  let path = std::env::temp_dir().join(format!("lien-{}.toml", uuid::Uuid::new_v4()));
  std::fs::write(&path, "urgent_within_days = -1\n").unwrap();

  let result = ServerConfig::load(&path);
  std::fs::remove_file(&path).unwrap();
  assert!(result.is_err());
}

#[test]
fn rules_file_adds_a_jurisdiction() {
  let extra = load_rules(File::from_str(CALIFORNIA, FileFormat::Toml)).unwrap();
  let mut rules = RuleTable::baseline();
  rules.merge(extra);

  assert!(rules.supports(&Jurisdiction::new("TX")));
  assert!(rules.supports(&Jurisdiction::new("ca")));

  let sub = ProjectFacts::new(Role::Subcontractor, ProjectType::Commercial, "CA")
    .with_date(DateFact::WorkStart, d(2024, 3, 1))
    .with_date(DateFact::Completion, d(2024, 6, 1));
  let notice = rules.apply(Category::PreliminaryNotice, &sub).unwrap();
  assert_eq!(notice.deadline_date, d(2024, 3, 21));
  let lien = rules.apply(Category::MechanicsLien, &sub).unwrap();
  assert_eq!(lien.deadline_date, d(2024, 7, 1));

  let gc = ProjectFacts { role: Role::GeneralContractor, ..sub };
  let lien = rules.apply(Category::MechanicsLien, &gc).unwrap();
  assert_eq!(lien.deadline_date, d(2024, 7, 31));
  assert!(rules.apply(Category::FundsTrapping, &gc).is_err());
}

#[test]
fn tilde_expands_to_home() {
  let Ok(home) = std::env::var("HOME") else { return };
  let expanded = expand_tilde(std::path::Path::new("~/lien.db"));
  assert_eq!(expanded, std::path::PathBuf::from(home).join("lien.db"));
  assert_eq!(
    expand_tilde(std::path::Path::new("/tmp/lien.db")),
    std::path::PathBuf::from("/tmp/lien.db")
  );
}

#[tokio::test]
async fn app_serves_health_and_nested_api() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let service = DeadlineService::new(Arc::new(store));
  let router = app(Arc::new(service));

  let resp = router
    .clone()
    .oneshot(Request::get("/health").body(Body::empty()).unwrap())
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let health: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(health["jurisdictions"], serde_json::json!(["TX"]));

  let resp = router
    .oneshot(
      Request::get(format!("/api/projects?user_id={}", uuid::Uuid::new_v4()))
        .body(Body::empty())
        .unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
}
