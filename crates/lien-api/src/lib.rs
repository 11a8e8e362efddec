//! JSON REST API for the lien deadline tracker.
//!
//! Exposes an axum [`Router`] backed by a [`DeadlineService`] over any
//! [`lien_core::store::DeadlineStore`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lien_api::api_router(service.clone()))
//! ```

pub mod calculate;
pub mod deadlines;
pub mod error;
pub mod projects;
pub mod reminders;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use lien_core::{service::DeadlineService, store::DeadlineStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: Arc<DeadlineService<S>>) -> Router<()>
where
  S: DeadlineStore + 'static,
{
  Router::new()
    // Projects
    .route("/projects", get(projects::list::<S>).post(projects::create::<S>))
    .route(
      "/projects/{id}",
      get(projects::get_one::<S>).delete(projects::delete_one::<S>),
    )
    .route(
      "/projects/{id}/deadlines",
      get(projects::deadlines::<S>)
        .post(projects::create_deadlines::<S>)
        .put(projects::update_deadlines::<S>),
    )
    // Users
    .route("/users/{id}/deadlines", get(users::deadlines::<S>))
    .route("/users/{id}/stats", get(users::stats::<S>))
    // Deadlines
    .route(
      "/deadlines/{id}",
      get(deadlines::get_one::<S>).delete(deadlines::delete_one::<S>),
    )
    .route("/deadlines/{id}/status", post(deadlines::set_status::<S>))
    .route("/deadlines/{id}/reopen", post(deadlines::reopen::<S>))
    // Reminders and stateless evaluation
    .route("/reminders", get(reminders::handler::<S>))
    .route("/calculate", post(calculate::handler::<S>))
    .with_state(service)
}

#[cfg(test)]
mod tests;
