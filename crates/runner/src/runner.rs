//! Spec and test-case execution

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use flowspec_common::{
    ElementInstance, Error, Incident, ProcessInstanceKey, ProcessInstanceState, ReadModel, Result,
    TestEngine, Variable,
};

use crate::action::{Action, ActionEnv, ActionOutcome};
use crate::config::{AdapterFailurePolicy, RunnerConfig};
use crate::context::ContextRegistry;
use crate::poll::{poll_until, Clock, PollOutcome, PollPolicy, SystemClock};
use crate::resource::{DirectoryResourceResolver, ResourceResolver};
use crate::spec::{TestCase, TestSpec};
use crate::verification::Verification;

/// Diagnostic snapshot of one process instance after a test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutput {
    pub key: ProcessInstanceKey,
    pub alias: String,
    pub state: Option<ProcessInstanceState>,
    pub element_instances: Vec<ElementInstance>,
    pub variables: Vec<Variable>,
    pub incidents: Vec<Incident>,
}

/// Result of running a single test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_case: TestCase,
    pub success: bool,
    /// Failure message, empty on success
    pub message: String,
    /// Verifications that held, in declared order
    pub successful_verifications: Vec<Verification>,
    /// First verification that did not hold in time
    pub failed_verification: Option<Verification>,
    /// Action that failed the test case before verification started
    pub failed_action: Option<Action>,
    pub output: Vec<TestOutput>,
    pub duration_ms: u64,
}

impl TestResult {
    /// A test case that failed before any of its steps could report
    fn failed(test_case: &TestCase, message: String, duration_ms: u64) -> Self {
        Self {
            test_case: test_case.clone(),
            success: false,
            message,
            successful_verifications: Vec::new(),
            failed_verification: None,
            failed_action: None,
            output: Vec::new(),
            duration_ms,
        }
    }
}

/// Milliseconds in a duration, saturating at `u64::MAX`
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Result of running a whole spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpecResult {
    pub spec: TestSpec,
    pub test_results: Vec<TestResult>,
}

impl TestSpecResult {
    pub fn passed(&self) -> usize {
        self.test_results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.test_results.len() - self.passed()
    }

    pub fn success(&self) -> bool {
        self.test_results.iter().all(|r| r.success)
    }
}

/// How far a test case got before it stopped
#[derive(Default)]
struct Verdict {
    failure: Option<String>,
    successful_verifications: Vec<Verification>,
    failed_verification: Option<Verification>,
    failed_action: Option<Action>,
}

impl Verdict {
    fn fail_action(mut self, action: &Action, message: String) -> Self {
        self.failed_action = Some(action.clone());
        self.failure = Some(message);
        self
    }

    fn fail_verification(mut self, verification: &Verification, message: String) -> Self {
        self.failed_verification = Some(verification.clone());
        self.failure = Some(message);
        self
    }
}

/// Drives an engine through the test cases of a spec.
///
/// Test cases run strictly one after another. Each gets a fresh
/// [`ContextRegistry`] that is dropped when the test case ends.
pub struct SpecRunner<E, R> {
    engine: E,
    read_model: R,
    resolver: Box<dyn ResourceResolver>,
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
    adapter_failure: AdapterFailurePolicy,
}

impl<E: TestEngine, R: ReadModel> SpecRunner<E, R> {
    /// Create a runner with default configuration
    pub fn new(engine: E, read_model: R) -> Self {
        Self::with_config(engine, read_model, &RunnerConfig::default())
    }

    /// Create a runner with custom configuration
    pub fn with_config(engine: E, read_model: R, config: &RunnerConfig) -> Self {
        Self {
            engine,
            read_model,
            resolver: Box::new(DirectoryResourceResolver::new(config.resource_dir.clone())),
            clock: Arc::new(SystemClock),
            policy: config.poll_policy(),
            adapter_failure: config.adapter_failure,
        }
    }

    pub fn with_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_adapter_failure(mut self, adapter_failure: AdapterFailurePolicy) -> Self {
        self.adapter_failure = adapter_failure;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn read_model(&self) -> &R {
        &self.read_model
    }

    pub fn into_parts(self) -> (E, R) {
        (self.engine, self.read_model)
    }

    /// Parse a YAML spec and run it
    pub fn run_spec_yaml(&mut self, yaml: &str) -> Result<TestSpecResult> {
        debug!("Reading the spec");
        let spec = TestSpec::from_yaml(yaml)?;
        self.run_spec(&spec)
    }

    /// Load a spec file and run it
    pub fn run_spec_file(&mut self, path: &Path) -> Result<TestSpecResult> {
        debug!("Reading the spec from {}", path.display());
        let spec = TestSpec::from_file(path)?;
        self.run_spec(&spec)
    }

    /// Run every test case of the spec, bracketed by the suite hooks.
    ///
    /// A failed verification only fails its test case. Errors that abort the
    /// run (missing resources, engine failures under
    /// [`AdapterFailurePolicy::AbortRun`]) are returned after the suite's
    /// `after_all` hook had its chance to release the engine.
    pub fn run_spec(&mut self, spec: &TestSpec) -> Result<TestSpecResult> {
        info!("Running {} test(s)...", spec.test_cases.len());
        self.engine.before_all()?;

        let mut test_results = Vec::with_capacity(spec.test_cases.len());
        for test_case in &spec.test_cases {
            match self.run_test_case(&spec.resources, test_case) {
                Ok(result) => {
                    if result.success {
                        info!("✓ {} ({} ms)", test_case.name, result.duration_ms);
                    } else {
                        error!("✗ {} - {}", test_case.name, result.message);
                    }
                    test_results.push(result);
                }
                Err(e) => {
                    error!("✗ {} - aborting the run: {}", test_case.name, e);
                    if let Err(hook_error) = self.engine.after_all() {
                        warn!("after_all hook failed while aborting: {}", hook_error);
                    }
                    return Err(e);
                }
            }
        }

        self.engine.after_all()?;

        let result = TestSpecResult {
            spec: spec.clone(),
            test_results,
        };
        info!(
            "All tests finished [{}/{} passed]",
            result.passed(),
            result.test_results.len()
        );
        Ok(result)
    }

    /// Run one test case without the suite hooks, for test-framework integrations
    pub fn run_single_test_case(
        &mut self,
        resources: &[String],
        test_case: &TestCase,
    ) -> Result<TestResult> {
        debug!("Running a single test");
        self.run_test_case(resources, test_case)
    }

    fn run_test_case(&mut self, resources: &[String], test_case: &TestCase) -> Result<TestResult> {
        debug!("Preparing the test [name: '{}']", test_case.name);
        let start = self.clock.now();

        let outcome = self
            .engine
            .before_each()
            .and_then(|_| self.deploy(&test_case.name, resources))
            .and_then(|_| self.execute(test_case))
            .or_else(|e| -> Result<TestResult> {
                let message = self.recover(e)?;
                Ok(TestResult::failed(test_case, message, self.elapsed_ms(start)))
            });

        // after_each runs whatever happened above
        let after = self.engine.after_each();

        let result = match (outcome, after) {
            (Ok(result), Ok(())) => result,
            (Ok(result), Err(hook_error)) => {
                let message = self.recover(hook_error)?;
                if result.success {
                    TestResult {
                        success: false,
                        message,
                        ..result
                    }
                } else {
                    warn!("after_each hook failed: {}", message);
                    result
                }
            }
            (Err(e), after) => {
                if let Err(hook_error) = after {
                    warn!("after_each hook failed: {}", hook_error);
                }
                return Err(e);
            }
        };

        debug!(
            "Test finished [name: '{}', success: '{}', message: '{}']",
            test_case.name, result.success, result.message
        );
        Ok(result)
    }

    fn deploy(&mut self, test_name: &str, resources: &[String]) -> Result<()> {
        debug!(
            "Deploying resources for the test. [name: '{}', resources: {}]",
            test_name,
            resources.join(", ")
        );
        for name in resources {
            let content = self.resolver.get_resource(name)?;
            self.engine.deploy_resource(name, &content)?;
        }
        Ok(())
    }

    fn execute(&mut self, test_case: &TestCase) -> Result<TestResult> {
        debug!(
            "Run the test [name: '{}', description: '{}']",
            test_case.name, test_case.description
        );
        let start = self.clock.now();
        let mut contexts = ContextRegistry::new();

        let verdict = self.run_steps(test_case, &mut contexts)?;

        let output = match self.collect_output(&contexts) {
            Ok(output) => output,
            Err(e) => {
                let message = self.recover(e)?;
                warn!("Could not collect the test output: {}", message);
                Vec::new()
            }
        };

        let duration_ms = self.elapsed_ms(start);

        Ok(TestResult {
            test_case: test_case.clone(),
            success: verdict.failure.is_none(),
            message: verdict.failure.unwrap_or_default(),
            successful_verifications: verdict.successful_verifications,
            failed_verification: verdict.failed_verification,
            failed_action: verdict.failed_action,
            output,
            duration_ms,
        })
    }

    fn run_steps(&mut self, test_case: &TestCase, contexts: &mut ContextRegistry) -> Result<Verdict> {
        let verdict = Verdict::default();

        for action in &test_case.actions {
            let mut env = ActionEnv {
                engine: &mut self.engine,
                read_model: &self.read_model,
                clock: self.clock.as_ref(),
                policy: self.policy,
            };
            let message = match action.execute(&mut env, contexts) {
                Ok(ActionOutcome::Completed) => continue,
                Ok(ActionOutcome::TimedOut { message }) => message,
                Err(e) => self.recover(e)?,
            };
            return Ok(verdict.fail_action(action, message));
        }

        if contexts.is_empty() {
            let known = match self.engine.list_known_handles() {
                Ok(known) => known,
                Err(e) => {
                    let message = self.recover(e)?;
                    return Ok(Verdict {
                        failure: Some(message),
                        ..verdict
                    });
                }
            };
            for key in known {
                let alias = contexts.register_default(key);
                debug!("Discovered process instance [key: {}, alias: '{}']", key, alias);
            }
        }

        let mut verdict = verdict;
        let contexts: &ContextRegistry = contexts;
        for verification in &test_case.verifications {
            let read_model = &self.read_model;
            let outcome = poll_until(self.clock.as_ref(), &self.policy, || {
                verification.verify(read_model, contexts)
            });

            match outcome {
                Ok(PollOutcome::Fulfilled { .. }) => {
                    verdict.successful_verifications.push(verification.clone());
                }
                Ok(PollOutcome::TimedOut { last, .. }) => {
                    return Ok(verdict.fail_verification(verification, last.failure_message));
                }
                Err(e) => {
                    let message = self.recover(e)?;
                    return Ok(verdict.fail_verification(verification, message));
                }
            }
        }

        Ok(verdict)
    }

    fn elapsed_ms(&self, start: Instant) -> u64 {
        duration_ms(self.clock.now().saturating_duration_since(start))
    }

    /// Turn a step error into a test-case failure message, or give it back
    /// when it has to abort the run
    fn recover(&self, error: Error) -> Result<String> {
        if error.is_context_resolution() {
            return Ok(error.to_string());
        }
        match (&error, self.adapter_failure) {
            (Error::AdapterCall { .. }, AdapterFailurePolicy::FailTestCase) => Ok(error.to_string()),
            _ => Err(error),
        }
    }

    fn collect_output(&self, contexts: &ContextRegistry) -> Result<Vec<TestOutput>> {
        contexts
            .iter()
            .map(|(alias, key)| {
                Ok(TestOutput {
                    key,
                    alias: alias.to_string(),
                    state: self.read_model.instance_state(key)?,
                    element_instances: self.read_model.element_instances(key)?,
                    variables: self.read_model.instance_variables(key)?,
                    incidents: self.read_model.incidents(key)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }
}
