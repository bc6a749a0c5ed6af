//! Verifications: side-effect-free checks of read-model state

use serde::{Deserialize, Serialize};
use std::fmt;

use flowspec_common::{
    ElementInstanceState, ElementSelector, IncidentState, ProcessInstanceState, ReadModel, Result,
};

use crate::context::ContextRegistry;
use crate::registry::{describe_args, VerificationDocument};

/// Outcome of a single check attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_fulfilled: bool,
    pub failure_message: String,
}

impl VerificationResult {
    pub fn fulfilled() -> Self {
        Self {
            is_fulfilled: true,
            failure_message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_fulfilled: false,
            failure_message: message.into(),
        }
    }

    fn check(condition: bool, message: impl FnOnce() -> String) -> Self {
        if condition {
            Self::fulfilled()
        } else {
            Self::failed(message())
        }
    }
}

/// A check of eventually-observable engine state.
///
/// `process_instance` names the alias of the targeted instance; without it
/// the registry's default instance is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "VerificationDocument", try_from = "VerificationDocument")]
pub enum Verification {
    ProcessInstanceState {
        state: ProcessInstanceState,
        process_instance: Option<String>,
    },
    ElementInstanceState {
        state: ElementInstanceState,
        element: ElementSelector,
        process_instance: Option<String>,
    },
    ProcessInstanceVariable {
        name: String,
        value: String,
        scope: ElementSelector,
        process_instance: Option<String>,
    },
    NoProcessInstanceVariable {
        name: String,
        scope: ElementSelector,
        process_instance: Option<String>,
    },
    IncidentState {
        state: IncidentState,
        error_type: String,
        error_message: Option<String>,
        element: ElementSelector,
        process_instance: Option<String>,
    },
}

impl Verification {
    /// Discriminator used in spec documents
    pub fn kind(&self) -> &'static str {
        match self {
            Verification::ProcessInstanceState { .. } => "process-instance-state",
            Verification::ElementInstanceState { .. } => "element-instance-state",
            Verification::ProcessInstanceVariable { .. } => "process-instance-variable",
            Verification::NoProcessInstanceVariable { .. } => "no-process-instance-variable",
            Verification::IncidentState { .. } => "incident-state",
        }
    }

    /// Alias of the targeted instance, if one is named
    pub fn process_instance(&self) -> Option<&str> {
        match self {
            Verification::ProcessInstanceState {
                process_instance, ..
            }
            | Verification::ElementInstanceState {
                process_instance, ..
            }
            | Verification::ProcessInstanceVariable {
                process_instance, ..
            }
            | Verification::NoProcessInstanceVariable {
                process_instance, ..
            }
            | Verification::IncidentState {
                process_instance, ..
            } => process_instance.as_deref(),
        }
    }

    /// Evaluate the check once against the current read-model state.
    ///
    /// Returns an error only when the target cannot be resolved or the read
    /// model call itself fails; an unmet expectation is an unfulfilled result.
    pub fn verify(
        &self,
        read_model: &dyn ReadModel,
        contexts: &ContextRegistry,
    ) -> Result<VerificationResult> {
        let key = contexts.resolve(self.process_instance())?;

        let result = match self {
            Verification::ProcessInstanceState { state, .. } => {
                match read_model.instance_state(key)? {
                    Some(actual) => VerificationResult::check(actual == *state, || {
                        format!(
                            "Expected the process instance to be in state '{}' but was '{}'.",
                            state, actual
                        )
                    }),
                    None => VerificationResult::failed(format!(
                        "Expected the process instance to be in state '{}' but it was not found.",
                        state
                    )),
                }
            }

            Verification::ElementInstanceState { state, element, .. } => {
                check_element_state(read_model, key, *state, element)?
            }

            Verification::ProcessInstanceVariable {
                name, value, scope, ..
            } => {
                let actual: Vec<String> = read_model
                    .instance_variables(key)?
                    .into_iter()
                    .filter(|variable| variable.name == *name && variable.in_scope(scope))
                    .map(|variable| variable.value)
                    .collect();

                if actual.is_empty() {
                    VerificationResult::failed(format!(
                        "Expected the process instance to have a variable '{}'{} with value '{}' but no such variable was found.",
                        name,
                        describe_scope(scope),
                        value
                    ))
                } else {
                    VerificationResult::check(actual.iter().any(|v| v == value), || {
                        format!(
                            "Expected the process instance to have a variable '{}'{} with value '{}' but was '{}'.",
                            name,
                            describe_scope(scope),
                            value,
                            actual.join("', '")
                        )
                    })
                }
            }

            Verification::NoProcessInstanceVariable { name, scope, .. } => {
                let found = read_model
                    .instance_variables(key)?
                    .into_iter()
                    .find(|variable| variable.name == *name && variable.in_scope(scope));

                match found {
                    None => VerificationResult::fulfilled(),
                    Some(variable) => VerificationResult::failed(format!(
                        "Expected the process instance to have no variable '{}'{} but found it with value '{}'.",
                        name,
                        describe_scope(scope),
                        variable.value
                    )),
                }
            }

            Verification::IncidentState {
                state,
                error_type,
                error_message,
                element,
                ..
            } => {
                let candidates: Vec<_> = read_model
                    .incidents(key)?
                    .into_iter()
                    .filter(|incident| incident.error_type == *error_type && incident.on_element(element))
                    .collect();

                let subject = format!(
                    "an incident of type '{}'{}",
                    error_type,
                    describe_element(element)
                );
                let message_matches = |actual: &Option<String>| {
                    error_message.is_none() || error_message == actual
                };

                if candidates
                    .iter()
                    .any(|i| i.state == *state && message_matches(&i.error_message))
                {
                    VerificationResult::fulfilled()
                } else {
                    match candidates.last() {
                        None => VerificationResult::failed(format!(
                            "Expected {} to be in state '{}' but no such incident was found.",
                            subject, state
                        )),
                        Some(incident) if incident.state != *state => {
                            VerificationResult::failed(format!(
                                "Expected {} to be in state '{}' but was '{}'.",
                                subject, state, incident.state
                            ))
                        }
                        Some(incident) => VerificationResult::failed(format!(
                            "Expected {} to have the message '{}' but was '{}'.",
                            subject,
                            error_message.as_deref().unwrap_or_default(),
                            incident.error_message.as_deref().unwrap_or_default()
                        )),
                    }
                }
            }
        };

        Ok(result)
    }
}

/// Compare the latest instance of the selected element against `state`
pub(crate) fn check_element_state(
    read_model: &dyn ReadModel,
    key: flowspec_common::ProcessInstanceKey,
    state: ElementInstanceState,
    element: &ElementSelector,
) -> Result<VerificationResult> {
    let latest = read_model
        .element_instances(key)?
        .into_iter()
        .filter(|instance| element.matches(&instance.element_id, instance.element_name.as_deref()))
        .last();

    Ok(match latest {
        Some(instance) => VerificationResult::check(instance.state == state, || {
            format!(
                "Expected {} to be in state '{}' but was '{}'.",
                element, state, instance.state
            )
        }),
        None => VerificationResult::failed(format!(
            "Expected {} to be in state '{}' but no element instance was found.",
            element, state
        )),
    })
}

fn describe_scope(scope: &ElementSelector) -> String {
    if scope.is_empty() {
        String::new()
    } else {
        format!(" in the scope of {}", scope)
    }
}

fn describe_element(element: &ElementSelector) -> String {
    if element.is_empty() {
        String::new()
    } else {
        format!(" on {}", element)
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let document = VerificationDocument::from(self);
        write!(f, "{} [{}]", document.verification, describe_args(&document.args))
    }
}
