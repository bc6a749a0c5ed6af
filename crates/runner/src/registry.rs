//! Discriminator registry for actions and verifications
//!
//! A spec document names each step by a discriminator string and passes its
//! parameters as an untyped string map. This module is the single place
//! where that open shape is turned into the closed [`Action`] and
//! [`Verification`] variants (and back). Construction validates eagerly, so
//! every unknown kind, missing parameter or malformed value is reported
//! while the spec is loaded, never in the middle of a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use flowspec_common::{ElementSelector, Error, Result, UnknownState};

use crate::action::Action;
use crate::verification::Verification;

/// Untyped parameters of a step, as written in the spec document
pub type Args = BTreeMap<String, String>;

const BPMN_PROCESS_ID: &str = "bpmn_process_id";
const VARIABLES: &str = "variables";
const PROCESS_INSTANCE_ALIAS: &str = "process_instance_alias";
const PROCESS_INSTANCE: &str = "process_instance";
const JOB_TYPE: &str = "job_type";
const MESSAGE_NAME: &str = "message_name";
const CORRELATION_KEY: &str = "correlation_key";
const ERROR_CODE: &str = "error_code";
const ERROR_MESSAGE: &str = "error_message";
const ERROR_TYPE: &str = "error_type";
const STATE: &str = "state";
const ELEMENT_ID: &str = "element_id";
const ELEMENT_NAME: &str = "element_name";
const NAME: &str = "name";
const VALUE: &str = "value";

const EMPTY_VARIABLES: &str = "{}";

/// An action as it appears in the spec document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDocument {
    pub action: String,
    #[serde(default)]
    pub args: Args,
}

/// A verification as it appears in the spec document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDocument {
    pub verification: String,
    #[serde(default)]
    pub args: Args,
}

type ActionConstructor = fn(&ArgReader<'_>) -> Result<Action>;
type VerificationConstructor = fn(&ArgReader<'_>) -> Result<Verification>;

/// Known action kinds
const ACTIONS: &[(&str, ActionConstructor)] = &[
    ("create-instance", create_instance),
    ("complete-task", complete_task),
    ("publish-message", publish_message),
    ("throw-error", throw_error),
    ("cancel-instance", cancel_instance),
    ("await-element-instance-state", await_element_instance_state),
];

/// Known verification kinds
const VERIFICATIONS: &[(&str, VerificationConstructor)] = &[
    ("process-instance-state", process_instance_state),
    ("element-instance-state", element_instance_state),
    ("process-instance-variable", process_instance_variable),
    ("no-process-instance-variable", no_process_instance_variable),
    ("incident-state", incident_state),
];

/// Discriminators of every known action kind
pub fn action_kinds() -> impl Iterator<Item = &'static str> {
    ACTIONS.iter().map(|(name, _)| *name)
}

/// Discriminators of every known verification kind
pub fn verification_kinds() -> impl Iterator<Item = &'static str> {
    VERIFICATIONS.iter().map(|(name, _)| *name)
}

/// Build a typed action from its document form
pub fn parse_action(document: &ActionDocument) -> Result<Action> {
    let kind = document.action.trim().to_ascii_lowercase();
    let (name, constructor) = ACTIONS
        .iter()
        .find(|(name, _)| *name == kind)
        .ok_or_else(|| Error::UnknownAction(document.action.clone()))?;

    constructor(&ArgReader::new(format!("action '{}'", name), &document.args))
}

/// Build a typed verification from its document form
pub fn parse_verification(document: &VerificationDocument) -> Result<Verification> {
    let kind = document.verification.trim().to_ascii_lowercase();
    let (name, constructor) = VERIFICATIONS
        .iter()
        .find(|(name, _)| *name == kind)
        .ok_or_else(|| Error::UnknownVerification(document.verification.clone()))?;

    constructor(&ArgReader::new(format!("verification '{}'", name), &document.args))
}

/// Typed access to a step's parameter map
struct ArgReader<'a> {
    kind: String,
    args: &'a Args,
}

impl<'a> ArgReader<'a> {
    fn new(kind: String, args: &'a Args) -> Self {
        Self { kind, args }
    }

    fn optional(&self, key: &str) -> Option<String> {
        self.args.get(key).cloned()
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| Error::MissingArgument {
            kind: self.kind.clone(),
            argument: key.to_string(),
        })
    }

    fn state<S>(&self, key: &str) -> Result<S>
    where
        S: FromStr<Err = UnknownState>,
    {
        self.required(key)?
            .parse()
            .map_err(|e: UnknownState| self.invalid(key, e.to_string()))
    }

    /// JSON document parameter, defaulting to an empty object
    fn variables(&self) -> Result<String> {
        let variables = self
            .optional(VARIABLES)
            .unwrap_or_else(|| EMPTY_VARIABLES.to_string());
        serde_json::from_str::<serde_json::Value>(&variables)
            .map_err(|e| self.invalid(VARIABLES, format!("not a valid JSON document ({})", e)))?;
        Ok(variables)
    }

    fn element(&self) -> ElementSelector {
        ElementSelector::new(self.optional(ELEMENT_ID), self.optional(ELEMENT_NAME))
    }

    /// Element selector that must name the element one way or the other
    fn required_element(&self) -> Result<ElementSelector> {
        let element = self.element();
        if element.is_empty() {
            return Err(Error::MissingArgument {
                kind: self.kind.clone(),
                argument: format!("{}' or '{}", ELEMENT_ID, ELEMENT_NAME),
            });
        }
        Ok(element)
    }

    fn invalid(&self, key: &str, reason: String) -> Error {
        Error::InvalidArgument {
            kind: self.kind.clone(),
            argument: key.to_string(),
            reason,
        }
    }
}

fn create_instance(args: &ArgReader<'_>) -> Result<Action> {
    Ok(Action::CreateInstance {
        process_id: args.required(BPMN_PROCESS_ID)?,
        variables: args.variables()?,
        alias: args.optional(PROCESS_INSTANCE_ALIAS),
    })
}

fn complete_task(args: &ArgReader<'_>) -> Result<Action> {
    Ok(Action::CompleteTask {
        job_type: args.required(JOB_TYPE)?,
        variables: args.variables()?,
    })
}

fn publish_message(args: &ArgReader<'_>) -> Result<Action> {
    Ok(Action::PublishMessage {
        message_name: args.required(MESSAGE_NAME)?,
        correlation_key: args.required(CORRELATION_KEY)?,
        variables: args.variables()?,
    })
}

fn throw_error(args: &ArgReader<'_>) -> Result<Action> {
    Ok(Action::ThrowError {
        job_type: args.required(JOB_TYPE)?,
        error_code: args.required(ERROR_CODE)?,
        error_message: args.optional(ERROR_MESSAGE).unwrap_or_default(),
    })
}

fn cancel_instance(args: &ArgReader<'_>) -> Result<Action> {
    Ok(Action::CancelInstance {
        process_instance: args.optional(PROCESS_INSTANCE),
    })
}

fn await_element_instance_state(args: &ArgReader<'_>) -> Result<Action> {
    Ok(Action::AwaitElementInstanceState {
        state: args.state(STATE)?,
        element: args.required_element()?,
        process_instance: args.optional(PROCESS_INSTANCE),
    })
}

fn process_instance_state(args: &ArgReader<'_>) -> Result<Verification> {
    Ok(Verification::ProcessInstanceState {
        state: args.state(STATE)?,
        process_instance: args.optional(PROCESS_INSTANCE),
    })
}

fn element_instance_state(args: &ArgReader<'_>) -> Result<Verification> {
    Ok(Verification::ElementInstanceState {
        state: args.state(STATE)?,
        element: args.required_element()?,
        process_instance: args.optional(PROCESS_INSTANCE),
    })
}

fn process_instance_variable(args: &ArgReader<'_>) -> Result<Verification> {
    Ok(Verification::ProcessInstanceVariable {
        name: args.required(NAME)?,
        value: args.required(VALUE)?,
        scope: args.element(),
        process_instance: args.optional(PROCESS_INSTANCE),
    })
}

fn no_process_instance_variable(args: &ArgReader<'_>) -> Result<Verification> {
    Ok(Verification::NoProcessInstanceVariable {
        name: args.required(NAME)?,
        scope: args.element(),
        process_instance: args.optional(PROCESS_INSTANCE),
    })
}

fn incident_state(args: &ArgReader<'_>) -> Result<Verification> {
    Ok(Verification::IncidentState {
        state: args.state(STATE)?,
        error_type: args.required(ERROR_TYPE)?,
        error_message: args.optional(ERROR_MESSAGE),
        element: args.element(),
        process_instance: args.optional(PROCESS_INSTANCE),
    })
}

/// Collects parameters when writing a step back to document form
#[derive(Default)]
struct ArgWriter(Args);

impl ArgWriter {
    fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    fn set_opt(self, key: &str, value: &Option<String>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    fn element(self, element: &ElementSelector) -> Self {
        self.set_opt(ELEMENT_ID, &element.element_id)
            .set_opt(ELEMENT_NAME, &element.element_name)
    }
}

impl From<&Action> for ActionDocument {
    fn from(action: &Action) -> Self {
        let args = match action {
            Action::CreateInstance {
                process_id,
                variables,
                alias,
            } => ArgWriter::default()
                .set(BPMN_PROCESS_ID, process_id)
                .set(VARIABLES, variables)
                .set_opt(PROCESS_INSTANCE_ALIAS, alias),
            Action::CompleteTask {
                job_type,
                variables,
            } => ArgWriter::default()
                .set(JOB_TYPE, job_type)
                .set(VARIABLES, variables),
            Action::PublishMessage {
                message_name,
                correlation_key,
                variables,
            } => ArgWriter::default()
                .set(MESSAGE_NAME, message_name)
                .set(CORRELATION_KEY, correlation_key)
                .set(VARIABLES, variables),
            Action::ThrowError {
                job_type,
                error_code,
                error_message,
            } => ArgWriter::default()
                .set(JOB_TYPE, job_type)
                .set(ERROR_CODE, error_code)
                .set(ERROR_MESSAGE, error_message),
            Action::CancelInstance { process_instance } => {
                ArgWriter::default().set_opt(PROCESS_INSTANCE, process_instance)
            }
            Action::AwaitElementInstanceState {
                state,
                element,
                process_instance,
            } => ArgWriter::default()
                .set(STATE, state)
                .element(element)
                .set_opt(PROCESS_INSTANCE, process_instance),
        };

        ActionDocument {
            action: action.kind().to_string(),
            args: args.0,
        }
    }
}

impl From<&Verification> for VerificationDocument {
    fn from(verification: &Verification) -> Self {
        let args = match verification {
            Verification::ProcessInstanceState {
                state,
                process_instance,
            } => ArgWriter::default()
                .set(STATE, state)
                .set_opt(PROCESS_INSTANCE, process_instance),
            Verification::ElementInstanceState {
                state,
                element,
                process_instance,
            } => ArgWriter::default()
                .set(STATE, state)
                .element(element)
                .set_opt(PROCESS_INSTANCE, process_instance),
            Verification::ProcessInstanceVariable {
                name,
                value,
                scope,
                process_instance,
            } => ArgWriter::default()
                .set(NAME, name)
                .set(VALUE, value)
                .element(scope)
                .set_opt(PROCESS_INSTANCE, process_instance),
            Verification::NoProcessInstanceVariable {
                name,
                scope,
                process_instance,
            } => ArgWriter::default()
                .set(NAME, name)
                .element(scope)
                .set_opt(PROCESS_INSTANCE, process_instance),
            Verification::IncidentState {
                state,
                error_type,
                error_message,
                element,
                process_instance,
            } => ArgWriter::default()
                .set(STATE, state)
                .set(ERROR_TYPE, error_type)
                .set_opt(ERROR_MESSAGE, error_message)
                .element(element)
                .set_opt(PROCESS_INSTANCE, process_instance),
        };

        VerificationDocument {
            verification: verification.kind().to_string(),
            args: args.0,
        }
    }
}

impl From<Action> for ActionDocument {
    fn from(action: Action) -> Self {
        ActionDocument::from(&action)
    }
}

impl From<Verification> for VerificationDocument {
    fn from(verification: Verification) -> Self {
        VerificationDocument::from(&verification)
    }
}

impl TryFrom<ActionDocument> for Action {
    type Error = Error;

    fn try_from(document: ActionDocument) -> Result<Self> {
        parse_action(&document)
    }
}

impl TryFrom<VerificationDocument> for Verification {
    type Error = Error;

    fn try_from(document: VerificationDocument) -> Result<Self> {
        parse_verification(&document)
    }
}

/// Render parameters as `key: value, ...` for logs and reports
pub(crate) fn describe_args(args: &Args) -> String {
    args.iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowspec_common::{ElementInstanceState, IncidentState};
    use test_case::test_case;

    fn args(pairs: &[(&str, &str)]) -> Args {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn action(kind: &str, pairs: &[(&str, &str)]) -> Result<Action> {
        parse_action(&ActionDocument {
            action: kind.to_string(),
            args: args(pairs),
        })
    }

    fn verification(kind: &str, pairs: &[(&str, &str)]) -> Result<Verification> {
        parse_verification(&VerificationDocument {
            verification: kind.to_string(),
            args: args(pairs),
        })
    }

    #[test]
    fn test_create_instance_defaults() {
        let parsed = action("create-instance", &[("bpmn_process_id", "demo")]).unwrap();
        assert_eq!(
            parsed,
            Action::CreateInstance {
                process_id: "demo".into(),
                variables: "{}".into(),
                alias: None,
            }
        );
    }

    #[test]
    fn test_discriminator_is_case_insensitive() {
        let parsed = action("Complete-Task", &[("job_type", "a")]).unwrap();
        assert_eq!(parsed.kind(), "complete-task");
    }

    #[test]
    fn test_unknown_action() {
        let err = action("launch-rocket", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown action 'launch-rocket'");
    }

    #[test]
    fn test_unknown_verification() {
        let err = verification("element-exists", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown verification 'element-exists'");
    }

    #[test_case("create-instance", &[], "bpmn_process_id" ; "create instance")]
    #[test_case("complete-task", &[], "job_type" ; "complete task")]
    #[test_case("publish-message", &[("message_name", "m")], "correlation_key" ; "publish message")]
    #[test_case("throw-error", &[("job_type", "a")], "error_code" ; "throw error")]
    #[test_case("await-element-instance-state", &[("element_id", "a")], "state" ; "await state")]
    fn test_missing_action_argument(kind: &str, pairs: &[(&str, &str)], missing: &str) {
        match action(kind, pairs).unwrap_err() {
            Error::MissingArgument { kind: k, argument } => {
                assert_eq!(k, format!("action '{}'", kind));
                assert_eq!(argument, missing);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test_case("process-instance-state", &[], "state" ; "process instance state")]
    #[test_case("process-instance-variable", &[("name", "x")], "value" ; "variable value")]
    #[test_case("no-process-instance-variable", &[], "name" ; "no variable")]
    #[test_case("incident-state", &[("state", "created")], "error_type" ; "incident")]
    fn test_missing_verification_argument(kind: &str, pairs: &[(&str, &str)], missing: &str) {
        match verification(kind, pairs).unwrap_err() {
            Error::MissingArgument { argument, .. } => assert_eq!(argument, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_element_scoped_kinds_need_an_element() {
        let err = verification("element-instance-state", &[("state", "completed")]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("element_id' or 'element_name"));
    }

    #[test]
    fn test_invalid_state_value() {
        let err = verification(
            "element-instance-state",
            &[("state", "finished"), ("element_id", "a")],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { ref argument, .. } if argument == "state"));
    }

    #[test]
    fn test_invalid_variables_json() {
        let err = action(
            "create-instance",
            &[("bpmn_process_id", "demo"), ("variables", "{not json")],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { ref argument, .. } if argument == "variables"));
    }

    #[test]
    fn test_incident_state_parses_all_fields() {
        let parsed = verification(
            "incident-state",
            &[
                ("state", "resolved"),
                ("error_type", "EXTRACT_VALUE_ERROR"),
                ("element_name", "Check"),
                ("process_instance", "a"),
            ],
        )
        .unwrap();
        assert_eq!(
            parsed,
            Verification::IncidentState {
                state: IncidentState::Resolved,
                error_type: "EXTRACT_VALUE_ERROR".into(),
                error_message: None,
                element: ElementSelector::by_name("Check"),
                process_instance: Some("a".into()),
            }
        );
    }

    #[test]
    fn test_document_form_reproduces_the_step() {
        let original = VerificationDocument {
            verification: "element-instance-state".into(),
            args: args(&[("state", "COMPLETED"), ("element_name", "B")]),
        };
        let parsed = parse_verification(&original).unwrap();
        assert_eq!(
            parsed,
            Verification::ElementInstanceState {
                state: ElementInstanceState::Completed,
                element: ElementSelector::by_name("B"),
                process_instance: None,
            }
        );
        assert_eq!(VerificationDocument::from(&parsed), original);
    }
}
