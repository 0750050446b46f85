//! Daxpilot Core Library
//!
//! Routes prompts between two local models, turns questions into DAX and
//! runs it against Power BI / Fabric semantic models, and derives insights
//! from text analytics results.

pub mod analytics;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod dax;
pub mod error;
pub mod executor;
pub mod foundry;
pub mod github;
pub mod http;
pub mod insights;
pub mod protocol;
pub mod routing;
pub mod session;

pub use error::{ServiceError, ServiceResult};

/// Returns the version of the Daxpilot Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
