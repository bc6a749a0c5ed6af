//! Core types for Flowspec

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque handle of a process instance as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessInstanceKey(pub i64);

impl fmt::Display for ProcessInstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProcessInstanceKey {
    fn from(key: i64) -> Self {
        Self(key)
    }
}

/// Defines a closed lifecycle-state enum that displays and parses as
/// SCREAMING_SNAKE_CASE. Parsing ignores case.
macro_rules! lifecycle_state {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All states, in lifecycle order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownState;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownState {
                        value: s.to_string(),
                        expected: &[$($text),+],
                    }),
                }
            }
        }
    };
}

lifecycle_state!(
    /// Lifecycle state of a process instance
    ProcessInstanceState {
        Activated => "ACTIVATED",
        Completed => "COMPLETED",
        Terminated => "TERMINATED",
    }
);

lifecycle_state!(
    /// Lifecycle state of an element instance
    ElementInstanceState {
        Activating => "ACTIVATING",
        Activated => "ACTIVATED",
        Completing => "COMPLETING",
        Completed => "COMPLETED",
        Terminating => "TERMINATING",
        Terminated => "TERMINATED",
        Taken => "TAKEN",
    }
);

lifecycle_state!(
    /// Lifecycle state of an incident
    IncidentState {
        Created => "CREATED",
        Resolved => "RESOLVED",
    }
);

/// A state string that does not name any known state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState {
    pub value: String,
    pub expected: &'static [&'static str],
}

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown state '{}' (expected one of: {})",
            self.value,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for UnknownState {}

/// Identifies a modeled element by id and/or name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_name: Option<String>,
}

impl ElementSelector {
    pub fn new(element_id: Option<String>, element_name: Option<String>) -> Self {
        Self {
            element_id,
            element_name,
        }
    }

    pub fn by_id(element_id: impl Into<String>) -> Self {
        Self::new(Some(element_id.into()), None)
    }

    pub fn by_name(element_name: impl Into<String>) -> Self {
        Self::new(None, Some(element_name.into()))
    }

    /// No id and no name: matches any element
    pub fn is_empty(&self) -> bool {
        self.element_id.is_none() && self.element_name.is_none()
    }

    /// Every given criterion must agree with the element
    pub fn matches(&self, element_id: &str, element_name: Option<&str>) -> bool {
        let id_matches = self
            .element_id
            .as_deref()
            .map_or(true, |id| id == element_id);
        let name_matches = self
            .element_name
            .as_deref()
            .map_or(true, |name| Some(name) == element_name);
        id_matches && name_matches
    }
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.element_name, &self.element_id) {
            (Some(name), _) => write!(f, "the element with name '{}'", name),
            (None, Some(id)) => write!(f, "the element with id '{}'", id),
            (None, None) => write!(f, "any element"),
        }
    }
}

/// Runtime occurrence of a modeled element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInstance {
    pub element_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_name: Option<String>,
    pub state: ElementInstanceState,
}

/// Element a variable or incident belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementScope {
    pub element_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_name: Option<String>,
}

impl ElementScope {
    pub fn new(element_id: impl Into<String>, element_name: Option<String>) -> Self {
        Self {
            element_id: element_id.into(),
            element_name,
        }
    }
}

/// Process instance variable with its JSON-encoded value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ElementScope>,
}

impl Variable {
    /// Whether the variable lives in the selected scope. An empty selector
    /// accepts every scope.
    pub fn in_scope(&self, selector: &ElementSelector) -> bool {
        if selector.is_empty() {
            return true;
        }
        self.scope.as_ref().map_or(false, |scope| {
            selector.matches(&scope.element_id, scope.element_name.as_deref())
        })
    }
}

/// Error condition raised against a process or element instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub state: IncidentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<ElementScope>,
}

impl Incident {
    pub fn on_element(&self, selector: &ElementSelector) -> bool {
        if selector.is_empty() {
            return true;
        }
        self.element.as_ref().map_or(false, |element| {
            selector.matches(&element.element_id, element.element_name.as_deref())
        })
    }
}
