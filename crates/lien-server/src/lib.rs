//! Wiring for the `lien-server` binary: configuration, rule loading, and the
//! top-level router.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::{Json, Router, routing::get};
use lien_core::{
  rules::RuleTable,
  service::DeadlineService,
  status::UrgencyPolicy,
  store::DeadlineStore,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `LIEN_*`
/// environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// Upcoming deadlines this many days out or fewer are flagged urgent.
  pub urgent_within_days:    u32,
  pub store_busy_timeout_ms: u64,
  /// Extra jurisdictions, merged over the built-in table.
  pub rules_path:            Option<PathBuf>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "127.0.0.1".to_string(),
      port:                  8080,
      store_path:            PathBuf::from("~/.local/share/lien/lien.db"),
      urgent_within_days:    UrgencyPolicy::default().urgent_within_days,
      store_busy_timeout_ms: 5000,
      rules_path:            None,
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `LIEN_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("LIEN"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn busy_timeout(&self) -> Duration {
    Duration::from_millis(self.store_busy_timeout_ms)
  }

  pub fn policy(&self) -> UrgencyPolicy {
    UrgencyPolicy { urgent_within_days: self.urgent_within_days }
  }

  /// The built-in table with the rules file, if any, merged on top.
  pub fn rules(&self) -> anyhow::Result<RuleTable> {
    let mut rules = RuleTable::baseline();
    if let Some(path) = &self.rules_path {
      let path = expand_tilde(path);
      let extra = load_rules(config::File::from(path.as_path()))
        .with_context(|| format!("failed to load rules from {path:?}"))?;
      rules.merge(extra);
    }
    Ok(rules)
  }
}

/// Read a rule table from any `config` source.
pub fn load_rules<T>(source: T) -> anyhow::Result<RuleTable>
where
  T: config::Source + Send + Sync + 'static,
{
  let table = config::Config::builder()
    .add_source(source)
    .build()?
    .try_deserialize()?;
  Ok(table)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Health {
  pub status:        &'static str,
  pub jurisdictions: Vec<String>,
}

/// The API nested under `/api`, plus a liveness check, wrapped in request
/// tracing.
pub fn app<S>(service: Arc<DeadlineService<S>>) -> Router
where
  S: DeadlineStore + 'static,
{
  let health = Health {
    status:        "ok",
    jurisdictions: service
      .rules()
      .jurisdictions()
      .map(ToString::to_string)
      .collect(),
  };

  Router::new()
    .route("/health", get(move || async move { Json(health) }))
    .nest("/api", lien_api::api_router(service))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests;
