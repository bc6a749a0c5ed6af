//! Validate Command
//!
//! Loads spec files the way the runner does and reports configuration errors
//! without touching an engine.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use flowspec_runner::spec::spec_files;
use flowspec_runner::TestSpec;

use crate::output::{print_list, print_success, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ValidateArgs {
    /// Spec files or directories containing `*.yaml`/`*.yml` specs
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

/// Validation outcome of one spec file
#[derive(Serialize, Clone)]
pub struct ValidationResult {
    pub file: String,
    pub valid: bool,
    pub test_cases: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableDisplay for ValidationResult {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Valid", "Test Cases", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.file.clone(),
            if self.valid { "✓" } else { "✗" }.to_string(),
            self.test_cases.to_string(),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

/// Expand directories into the spec files below them
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(spec_files(path));
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("No such file or directory: {}", path.display());
        }
    }
    Ok(files)
}

pub fn validate_file(path: &Path) -> ValidationResult {
    debug!("Validating {}", path.display());
    match TestSpec::from_file(path) {
        Ok(spec) => ValidationResult {
            file: path.display().to_string(),
            valid: true,
            test_cases: spec.test_cases.len(),
            error: None,
        },
        Err(e) => ValidationResult {
            file: path.display().to_string(),
            valid: false,
            test_cases: 0,
            error: Some(e.to_string()),
        },
    }
}

/// Returns whether every spec is valid
pub fn execute(args: ValidateArgs, format: OutputFormat) -> Result<bool> {
    let files = collect_files(&args.paths)?;
    let results: Vec<ValidationResult> = files.iter().map(|f| validate_file(f)).collect();
    let valid = results.iter().all(|r| r.valid);

    if format.is_structured() {
        print_list(&results, format);
        return Ok(valid);
    }

    for result in &results {
        match &result.error {
            None => println!(
                "{} {} {}",
                "✓".green(),
                result.file,
                format!("({} test cases)", result.test_cases).dimmed()
            ),
            Some(error) => println!("{} {} - {}", "✗".red(), result.file, error),
        }
    }

    let invalid = results.iter().filter(|r| !r.valid).count();
    println!();
    if invalid == 0 {
        print_success(&format!("{} spec(s) valid", results.len()));
    } else {
        println!("{} {} of {} spec(s) invalid", "✗".red(), invalid, results.len());
    }
    Ok(valid)
}
