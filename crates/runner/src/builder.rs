//! Building specs in code instead of YAML

use serde_json::Value;

use flowspec_common::{
    ElementInstanceState, ElementSelector, IncidentState, ProcessInstanceState, Result,
};

use crate::action::Action;
use crate::registry::{self, ActionDocument, VerificationDocument};
use crate::spec::{TestCase, TestSpec};
use crate::verification::Verification;

const EMPTY_VARIABLES: &str = "{}";

/// Builds a [`TestSpec`]
#[derive(Debug, Clone, Default)]
pub struct TestSpecBuilder {
    resources: Vec<String>,
    test_cases: Vec<TestCase>,
}

impl TestSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, name: impl Into<String>) -> Self {
        self.resources.push(name.into());
        self
    }

    pub fn test_case(mut self, test_case: TestCase) -> Self {
        self.test_cases.push(test_case);
        self
    }

    pub fn build(self) -> TestSpec {
        TestSpec {
            resources: self.resources,
            test_cases: self.test_cases,
        }
    }
}

/// Builds a [`TestCase`]
///
/// Steps go through the same registry checks as a loaded document when the
/// test case is built, so an empty element selector or malformed variables
/// passed to [`TestCaseBuilder::action`] are rejected there.
#[derive(Debug, Clone)]
pub struct TestCaseBuilder {
    name: String,
    description: String,
    actions: Vec<Action>,
    verifications: Vec<Verification>,
}

impl TestCaseBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            actions: Vec::new(),
            verifications: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn verification(mut self, verification: Verification) -> Self {
        self.verifications.push(verification);
        self
    }

    pub fn create_instance(self, process_id: impl Into<String>) -> Self {
        self.action(Action::CreateInstance {
            process_id: process_id.into(),
            variables: EMPTY_VARIABLES.to_string(),
            alias: None,
        })
    }

    pub fn create_instance_with(
        self,
        process_id: impl Into<String>,
        variables: Value,
        alias: Option<&str>,
    ) -> Self {
        self.action(Action::CreateInstance {
            process_id: process_id.into(),
            variables: variables.to_string(),
            alias: alias.map(str::to_string),
        })
    }

    pub fn complete_task(self, job_type: impl Into<String>) -> Self {
        self.complete_task_with(job_type, Value::Object(Default::default()))
    }

    pub fn complete_task_with(self, job_type: impl Into<String>, variables: Value) -> Self {
        self.action(Action::CompleteTask {
            job_type: job_type.into(),
            variables: variables.to_string(),
        })
    }

    pub fn publish_message(
        self,
        message_name: impl Into<String>,
        correlation_key: impl Into<String>,
        variables: Value,
    ) -> Self {
        self.action(Action::PublishMessage {
            message_name: message_name.into(),
            correlation_key: correlation_key.into(),
            variables: variables.to_string(),
        })
    }

    pub fn throw_error(
        self,
        job_type: impl Into<String>,
        error_code: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        self.action(Action::ThrowError {
            job_type: job_type.into(),
            error_code: error_code.into(),
            error_message: error_message.into(),
        })
    }

    pub fn cancel_instance(self, process_instance: Option<&str>) -> Self {
        self.action(Action::CancelInstance {
            process_instance: process_instance.map(str::to_string),
        })
    }

    pub fn await_element_state(self, element: ElementSelector, state: ElementInstanceState) -> Self {
        self.action(Action::AwaitElementInstanceState {
            state,
            element,
            process_instance: None,
        })
    }

    pub fn verify_process_state(self, state: ProcessInstanceState) -> Self {
        self.verification(Verification::ProcessInstanceState {
            state,
            process_instance: None,
        })
    }

    pub fn verify_element_state(self, element: ElementSelector, state: ElementInstanceState) -> Self {
        self.verification(Verification::ElementInstanceState {
            state,
            element,
            process_instance: None,
        })
    }

    pub fn verify_variable(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.verification(Verification::ProcessInstanceVariable {
            name: name.into(),
            value: value.into(),
            scope: ElementSelector::default(),
            process_instance: None,
        })
    }

    pub fn verify_no_variable(self, name: impl Into<String>) -> Self {
        self.verification(Verification::NoProcessInstanceVariable {
            name: name.into(),
            scope: ElementSelector::default(),
            process_instance: None,
        })
    }

    pub fn verify_incident(
        self,
        error_type: impl Into<String>,
        element: ElementSelector,
        state: IncidentState,
    ) -> Self {
        self.verification(Verification::IncidentState {
            state,
            error_type: error_type.into(),
            error_message: None,
            element,
            process_instance: None,
        })
    }

    pub fn build(self) -> Result<TestCase> {
        let actions = self
            .actions
            .iter()
            .map(|action| registry::parse_action(&ActionDocument::from(action)))
            .collect::<Result<Vec<_>>>()?;
        let verifications = self
            .verifications
            .iter()
            .map(|verification| {
                registry::parse_verification(&VerificationDocument::from(verification))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TestCase {
            name: self.name,
            description: self.description,
            actions,
            verifications,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowspec_common::Error;
    use serde_json::json;

    #[test]
    fn test_built_spec_matches_yaml_spec() {
        let built = TestSpecBuilder::new()
            .resource("demo.bpmn")
            .test_case(
                TestCaseBuilder::new("message")
                    .description("Correlate a message")
                    .create_instance_with("demo3", json!({"key": "k1"}), None)
                    .publish_message("continue", "k1", json!({}))
                    .verify_element_state(
                        ElementSelector::by_id("end"),
                        ElementInstanceState::Completed,
                    )
                    .build()
                    .unwrap(),
            )
            .build();

        let yaml = r#"
resources: [demo.bpmn]
testCases:
  - name: message
    description: Correlate a message
    actions:
      - action: create-instance
        args: { bpmn_process_id: demo3, variables: '{"key":"k1"}' }
      - action: publish-message
        args: { message_name: continue, correlation_key: k1, variables: '{}' }
    verifications:
      - verification: element-instance-state
        args: { element_id: end, state: completed }
"#;
        assert_eq!(built, TestSpec::from_yaml(yaml).unwrap());
    }

    #[test]
    fn test_built_spec_round_trips_through_yaml() {
        let spec = TestSpecBuilder::new()
            .test_case(
                TestCaseBuilder::new("incident")
                    .create_instance("demo-incident")
                    .throw_error("a", "E-1", "failed")
                    .verify_incident(
                        "UNHANDLED_ERROR_EVENT",
                        ElementSelector::by_name("A"),
                        IncidentState::Created,
                    )
                    .verify_no_variable("result")
                    .build()
                    .unwrap(),
            )
            .build();

        let yaml = spec.to_yaml().unwrap();
        assert_eq!(TestSpec::from_yaml(&yaml).unwrap(), spec);
    }

    #[test]
    fn test_empty_element_selector_is_rejected() {
        let err = TestCaseBuilder::new("await")
            .create_instance("demo")
            .await_element_state(ElementSelector::default(), ElementInstanceState::Activated)
            .build()
            .unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "Missing required parameter 'element_id' or 'element_name' for action 'await-element-instance-state'"
        );
    }

    #[test]
    fn test_empty_element_selector_in_verification_is_rejected() {
        let err = TestCaseBuilder::new("verify")
            .verify_element_state(ElementSelector::default(), ElementInstanceState::Completed)
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_malformed_variables_are_rejected() {
        let err = TestCaseBuilder::new("create")
            .action(Action::CreateInstance {
                process_id: "demo".to_string(),
                variables: "{not json".to_string(),
                alias: None,
            })
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument { ref argument, .. } if argument == "variables"));
    }
}
