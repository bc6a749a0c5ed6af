//! Flowspec Common Library
//!
//! Shared types for the Flowspec test harness: process-instance handles,
//! lifecycle states, read-model records, the capability interfaces an
//! orchestration engine and its query service must provide, and the error
//! type used across the workspace.

pub mod capability;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use capability::{ReadModel, TestEngine};
pub use error::{Error, Result};
pub use types::*;

/// Flowspec version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
