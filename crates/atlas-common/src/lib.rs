//! Atlas Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the Bee Atlas workspace.
//!
//! # Overview
//!
//! This crate provides the functionality used across all Bee Atlas workspace
//! members:
//!
//! - **Error Handling**: the `AtlasError` type and `Result` alias
//! - **Logging**: tracing configuration and initialization
//!
//! # Example
//!
//! ```no_run
//! use atlas_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::default())?;
//!     info!("Application started");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{AtlasError, Result};
