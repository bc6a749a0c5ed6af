//! Actions: stimuli applied to the engine

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use flowspec_common::{ElementInstanceState, ElementSelector, ReadModel, Result, TestEngine};

use crate::context::ContextRegistry;
use crate::poll::{poll_until, Clock, PollOutcome, PollPolicy};
use crate::registry::{describe_args, ActionDocument};
use crate::verification::check_element_state;

/// A state-changing or blocking-wait step of a test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ActionDocument", try_from = "ActionDocument")]
pub enum Action {
    /// Start a new instance; registered under `alias` or a default alias
    CreateInstance {
        process_id: String,
        variables: String,
        alias: Option<String>,
    },
    /// Complete the next job of the given type (engine-wide)
    CompleteTask { job_type: String, variables: String },
    /// Publish a message (engine-wide)
    PublishMessage {
        message_name: String,
        correlation_key: String,
        variables: String,
    },
    /// Throw a business error on the next job of the given type
    ThrowError {
        job_type: String,
        error_code: String,
        error_message: String,
    },
    CancelInstance { process_instance: Option<String> },
    /// Block until an element reaches a state, with the verification budget
    AwaitElementInstanceState {
        state: ElementInstanceState,
        element: ElementSelector,
        process_instance: Option<String>,
    },
}

/// Result of executing one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// A waiting action ran out of time; the message describes the last state seen
    TimedOut { message: String },
}

/// Collaborators an action runs against
pub struct ActionEnv<'a> {
    pub engine: &'a mut dyn TestEngine,
    pub read_model: &'a dyn ReadModel,
    pub clock: &'a dyn Clock,
    pub policy: PollPolicy,
}

impl Action {
    /// Discriminator used in spec documents
    pub fn kind(&self) -> &'static str {
        match self {
            Action::CreateInstance { .. } => "create-instance",
            Action::CompleteTask { .. } => "complete-task",
            Action::PublishMessage { .. } => "publish-message",
            Action::ThrowError { .. } => "throw-error",
            Action::CancelInstance { .. } => "cancel-instance",
            Action::AwaitElementInstanceState { .. } => "await-element-instance-state",
        }
    }

    /// Apply the action. Engine failures propagate unchanged.
    pub fn execute(
        &self,
        env: &mut ActionEnv<'_>,
        contexts: &mut ContextRegistry,
    ) -> Result<ActionOutcome> {
        debug!("Executing action {}", self);

        match self {
            Action::CreateInstance {
                process_id,
                variables,
                alias,
            } => {
                let key = env.engine.create_instance(process_id, variables)?;
                let alias = match alias {
                    Some(alias) => {
                        contexts.register(alias.clone(), key);
                        alias.clone()
                    }
                    None => contexts.register_default(key),
                };
                debug!("Created process instance [key: {}, alias: '{}']", key, alias);
            }

            Action::CompleteTask {
                job_type,
                variables,
            } => env.engine.complete_task(job_type, variables)?,

            Action::PublishMessage {
                message_name,
                correlation_key,
                variables,
            } => env
                .engine
                .publish_message(message_name, correlation_key, variables)?,

            Action::ThrowError {
                job_type,
                error_code,
                error_message,
            } => env.engine.throw_error(job_type, error_code, error_message)?,

            Action::CancelInstance { process_instance } => {
                let key = contexts.resolve(process_instance.as_deref())?;
                env.engine.cancel_instance(key)?;
            }

            Action::AwaitElementInstanceState {
                state,
                element,
                process_instance,
            } => {
                let key = contexts.resolve(process_instance.as_deref())?;
                let read_model = env.read_model;
                let outcome = poll_until(env.clock, &env.policy, || {
                    check_element_state(read_model, key, *state, element)
                })?;

                if let PollOutcome::TimedOut { last, .. } = outcome {
                    return Ok(ActionOutcome::TimedOut {
                        message: last.failure_message,
                    });
                }
            }
        }

        Ok(ActionOutcome::Completed)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let document = ActionDocument::from(self);
        write!(f, "{} [{}]", document.action, describe_args(&document.args))
    }
}
