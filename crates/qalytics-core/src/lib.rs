//! Core types and trait definitions for QAlytics, a quality-metrics tracker
//! for PnLs and their Sub-PnLs.
//!
//! This crate is free of HTTP and database dependencies. The aggregation and
//! history-replay arithmetic lives here as pure functions so storage backends
//! only have to move rows.

// Native `async fn` in traits; the `Send` bounds are spelled out on the
// returned futures in `store`.
#![allow(async_fn_in_trait)]

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod history;
pub mod metrics;
pub mod store;
pub mod view;

pub use error::{DomainError, Error, Result};

/// Row identifier used by every entity.
pub type Id = i64;
