//! Declarative YAML test specification

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use flowspec_common::Result;

use crate::action::Action;
use crate::registry::{parse_action, parse_verification, ActionDocument, VerificationDocument};
use crate::verification::Verification;

/// A complete, validated test suite.
///
/// Its serialized form is [`SpecDocument`], so deserializing a `TestSpec`
/// validates every step the same way [`TestSpec::from_yaml`] does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SpecDocument", into = "SpecDocument")]
pub struct TestSpec {
    /// Process resources deployed before every test case, in order
    pub resources: Vec<String>,

    /// Test cases, run in order
    pub test_cases: Vec<TestCase>,
}

/// One scenario: actions applied in order, then verifications checked in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TestCaseDocument", into = "TestCaseDocument")]
pub struct TestCase {
    pub name: String,
    pub description: String,
    pub actions: Vec<Action>,
    pub verifications: Vec<Verification>,
}

/// Spec document before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecDocument {
    #[serde(default)]
    pub resources: Vec<String>,

    pub test_cases: Vec<TestCaseDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseDocument {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub actions: Vec<ActionDocument>,

    #[serde(default)]
    pub verifications: Vec<VerificationDocument>,
}

impl TryFrom<SpecDocument> for TestSpec {
    type Error = flowspec_common::Error;

    fn try_from(document: SpecDocument) -> Result<Self> {
        let test_cases = document
            .test_cases
            .into_iter()
            .map(TestCase::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(TestSpec {
            resources: document.resources,
            test_cases,
        })
    }
}

impl TryFrom<TestCaseDocument> for TestCase {
    type Error = flowspec_common::Error;

    fn try_from(document: TestCaseDocument) -> Result<Self> {
        let actions = document
            .actions
            .iter()
            .map(parse_action)
            .collect::<Result<Vec<_>>>()?;
        let verifications = document
            .verifications
            .iter()
            .map(parse_verification)
            .collect::<Result<Vec<_>>>()?;

        Ok(TestCase {
            name: document.name,
            description: document.description,
            actions,
            verifications,
        })
    }
}

impl From<TestSpec> for SpecDocument {
    fn from(spec: TestSpec) -> Self {
        SpecDocument {
            resources: spec.resources,
            test_cases: spec.test_cases.into_iter().map(TestCaseDocument::from).collect(),
        }
    }
}

impl From<TestCase> for TestCaseDocument {
    fn from(test_case: TestCase) -> Self {
        TestCaseDocument {
            name: test_case.name,
            description: test_case.description,
            actions: test_case.actions.iter().map(ActionDocument::from).collect(),
            verifications: test_case
                .verifications
                .iter()
                .map(VerificationDocument::from)
                .collect(),
        }
    }
}

impl TestSpec {
    /// Parse and validate a spec from a YAML string.
    ///
    /// Every action and verification of every test case is validated here;
    /// a spec that loads cannot fail later on an unknown kind or a missing
    /// parameter.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let document: SpecDocument = serde_yaml::from_str(yaml)?;
        let spec = TestSpec::try_from(document)?;
        debug!("Loaded spec with {} test case(s)", spec.test_cases.len());
        Ok(spec)
    }

    /// Parse a spec from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all specs from a directory
    pub fn load_all(dir: &Path) -> Result<Vec<Self>> {
        spec_files(dir)
            .iter()
            .map(|path| Self::from_file(path))
            .collect()
    }

    /// Serialize back to the document format
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn test_case(&self, name: &str) -> Option<&TestCase> {
        self.test_cases.iter().find(|case| case.name == name)
    }
}

/// YAML files below `dir`, sorted by path
pub fn spec_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
