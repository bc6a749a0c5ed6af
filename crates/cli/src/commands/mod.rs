//! CLI Commands

pub mod kinds;
pub mod report;
pub mod resources;
pub mod show;
pub mod validate;
