//! Flowspec CLI
//!
//! Offline tooling over spec files and result reports: validating and
//! inspecting specs, listing deployable resources, and rendering reports.

pub mod commands;
pub mod output;
