//! Report Command
//!
//! Renders a `test-results.json` written by the runner.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use flowspec_runner::report::{read_results, REPORT_FILE};
use flowspec_runner::{RunnerConfig, TestResult};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ReportArgs {
    /// Report file (defaults to `test-results.json` in the configured report directory)
    pub file: Option<PathBuf>,
}

/// Test result row for display
#[derive(Serialize)]
pub struct TestResultInfo {
    pub test_case: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    pub message: String,
}

impl From<&TestResult> for TestResultInfo {
    fn from(result: &TestResult) -> Self {
        let failed_step = result
            .failed_action
            .as_ref()
            .map(|action| action.kind())
            .or_else(|| result.failed_verification.as_ref().map(|v| v.kind()))
            .map(str::to_string);

        Self {
            test_case: result.test_case.name.clone(),
            success: result.success,
            duration_ms: result.duration_ms,
            failed_step,
            message: result.message.clone(),
        }
    }
}

impl TableDisplay for TestResultInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Test Case", "Result", "Duration", "Failed Step", "Message"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.test_case.clone(),
            if self.success { "passed" } else { "failed" }.to_string(),
            format!("{} ms", self.duration_ms),
            self.failed_step.clone().unwrap_or_default(),
            self.message.clone(),
        ]
    }
}

/// Returns whether every test case passed
pub fn execute(args: ReportArgs, config: &RunnerConfig, format: OutputFormat) -> Result<bool> {
    let path = args
        .file
        .unwrap_or_else(|| config.report_dir.join(REPORT_FILE));
    let report = read_results(&path)
        .with_context(|| format!("Failed to read report {}", path.display()))?;

    let rows: Vec<TestResultInfo> = report
        .result
        .test_results
        .iter()
        .map(TestResultInfo::from)
        .collect();
    print_list(&rows, format);

    if !format.is_structured() {
        let summary = format!(
            "{}/{} passed ({})",
            report.passed,
            report.total,
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if report.failed == 0 {
            println!("{} {}", "✓".green(), summary);
        } else {
            println!("{} {}", "✗".red(), summary.bold());
        }
    }

    Ok(report.failed == 0)
}
