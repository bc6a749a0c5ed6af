//! Per-test-case alias registry

use flowspec_common::{Error, ProcessInstanceKey, Result};
use tracing::debug;

/// Prefix of aliases assigned when none is given
pub const DEFAULT_ALIAS_PREFIX: &str = "instance-";

/// Maps test-case-local aliases to process-instance handles.
///
/// A registry lives for exactly one test case and is owned by the executor
/// running it. Insertion order is preserved and significant: it decides the
/// fallback target of unaliased lookups and the order of collected output.
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    entries: Vec<(String, ProcessInstanceKey)>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `alias` to `key`. Re-registering an alias replaces its handle
    /// but keeps its original position.
    pub fn register(&mut self, alias: impl Into<String>, key: ProcessInstanceKey) {
        let alias = alias.into();
        match self.entries.iter_mut().find(|(a, _)| *a == alias) {
            Some(entry) => entry.1 = key,
            None => self.entries.push((alias, key)),
        }
    }

    /// Bind `key` under the next free default alias and return that alias
    pub fn register_default(&mut self, key: ProcessInstanceKey) -> String {
        let mut index = self.entries.len();
        let alias = loop {
            let candidate = format!("{}{}", DEFAULT_ALIAS_PREFIX, index);
            if !self.contains(&candidate) {
                break candidate;
            }
            index += 1;
        };
        self.entries.push((alias.clone(), key));
        alias
    }

    /// Resolve the instance an action or verification targets.
    ///
    /// A named alias must have been registered. Without an alias the single
    /// registered instance is used; with several, the first registered one.
    pub fn resolve(&self, alias: Option<&str>) -> Result<ProcessInstanceKey> {
        match alias {
            Some(alias) => self
                .get(alias)
                .ok_or_else(|| Error::UnknownAlias(alias.to_string())),
            None => {
                let (first_alias, key) = self.entries.first().ok_or(Error::NoProcessInstance)?;
                if self.entries.len() > 1 {
                    debug!(
                        "No alias given, using the first registered instance [alias: '{}', key: {}]",
                        first_alias, key
                    );
                }
                Ok(*key)
            }
        }
    }

    pub fn get(&self, alias: &str) -> Option<ProcessInstanceKey> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, key)| *key)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    pub fn alias_of(&self, key: ProcessInstanceKey) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, k)| *k == key)
            .map(|(alias, _)| alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, ProcessInstanceKey)> + '_ {
        self.entries.iter().map(|(alias, key)| (alias.as_str(), *key))
    }
}
