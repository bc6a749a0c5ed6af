//! Persisting spec results as JSON reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use flowspec_common::Result;

use crate::runner::TestSpecResult;

/// File name of the report inside the report directory
pub const REPORT_FILE: &str = "test-results.json";

/// A spec result with summary counts, as written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub result: TestSpecResult,
}

impl Report {
    pub fn new(result: TestSpecResult) -> Self {
        Self {
            generated_at: Utc::now(),
            total: result.test_results.len(),
            passed: result.passed(),
            failed: result.failed(),
            result,
        }
    }
}

/// Write test results to `<dir>/test-results.json`
pub fn write_results(dir: &Path, result: &TestSpecResult) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(&Report::new(result.clone()))?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

/// Read a report written by [`write_results`]
pub fn read_results(path: &Path) -> Result<Report> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
