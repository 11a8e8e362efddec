//! Core types, the deadline rule engine, and the lifecycle service for the
//! lien deadline tracker.
//!
//! This crate has no HTTP or database dependencies.
//! Storage backends implement [`store::DeadlineStore`]; the HTTP surface
//! lives in `lien-api`.

// Native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod calendar;
pub mod clock;
pub mod deadline;
pub mod error;
pub mod facts;
pub mod rules;
pub mod service;
pub mod status;
pub mod store;

pub use error::{Error, Result};
