//! Show Command

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use flowspec_runner::{TestCase, TestSpec};

use crate::output::{print_info, print_list, OutputFormat, TableDisplay};

const DESCRIPTION_DISPLAY_LENGTH: usize = 60;

#[derive(Args)]
pub struct ShowArgs {
    /// Spec file
    pub file: PathBuf,

    /// List the steps of this test case instead of the test cases
    #[arg(short, long)]
    pub test_case: Option<String>,
}

/// Test case summary for display
#[derive(Serialize)]
pub struct TestCaseInfo {
    pub name: String,
    pub actions: usize,
    pub verifications: usize,
    pub description: String,
}

impl From<&TestCase> for TestCaseInfo {
    fn from(test_case: &TestCase) -> Self {
        Self {
            name: test_case.name.clone(),
            actions: test_case.actions.len(),
            verifications: test_case.verifications.len(),
            description: test_case.description.clone(),
        }
    }
}

impl TableDisplay for TestCaseInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Actions", "Verifications", "Description"]
    }

    fn row(&self) -> Vec<String> {
        let description = if self.description.chars().count() > DESCRIPTION_DISPLAY_LENGTH {
            let short: String = self.description.chars().take(DESCRIPTION_DISPLAY_LENGTH).collect();
            format!("{}…", short)
        } else {
            self.description.clone()
        };
        vec![
            self.name.clone(),
            self.actions.to_string(),
            self.verifications.to_string(),
            description,
        ]
    }
}

/// One action or verification of a test case
#[derive(Serialize)]
pub struct StepInfo {
    pub index: usize,
    pub step: &'static str,
    pub kind: &'static str,
    pub details: String,
}

impl TableDisplay for StepInfo {
    fn headers() -> Vec<&'static str> {
        vec!["#", "Step", "Kind", "Details"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            self.step.to_string(),
            self.kind.to_string(),
            self.details.clone(),
        ]
    }
}

pub fn steps(test_case: &TestCase) -> Vec<StepInfo> {
    let actions = test_case.actions.iter().map(|action| ("action", action.kind(), action.to_string()));
    let verifications = test_case
        .verifications
        .iter()
        .map(|verification| ("verification", verification.kind(), verification.to_string()));

    actions
        .chain(verifications)
        .enumerate()
        .map(|(i, (step, kind, details))| StepInfo {
            index: i + 1,
            step,
            kind,
            details,
        })
        .collect()
}

pub fn execute(args: ShowArgs, format: OutputFormat) -> Result<()> {
    let spec = TestSpec::from_file(&args.file)
        .with_context(|| format!("Failed to load spec {}", args.file.display()))?;

    match args.test_case {
        Some(name) => {
            let test_case = spec
                .test_case(&name)
                .with_context(|| format!("No test case named '{}' in {}", name, args.file.display()))?;
            print_list(&steps(test_case), format);
        }
        None => {
            if !format.is_structured() {
                print_info(&format!("Resources: {}", spec.resources.join(", ")));
            }
            let test_cases: Vec<TestCaseInfo> = spec.test_cases.iter().map(TestCaseInfo::from).collect();
            print_list(&test_cases, format);
        }
    }
    Ok(())
}
