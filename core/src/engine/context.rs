//! Contexts and query options
//!
//! A node only applies when its own context set is satisfied by the query
//! options a lookup is evaluated under.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::MetaStackDefinition;

/// A set of `key=value` conditions (`world=nether`, `server=lobby`).
///
/// Keys and values are stored lower-case. A key may hold several values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct ContextSet(BTreeMap<String, BTreeSet<String>>);

impl From<BTreeMap<String, Vec<String>>> for ContextSet {
    fn from(raw: BTreeMap<String, Vec<String>>) -> Self {
        let mut set = Self::new();
        for (key, values) in &raw {
            for value in values {
                set.add(key, value);
            }
        }
        set
    }
}

impl From<ContextSet> for BTreeMap<String, Vec<String>> {
    fn from(set: ContextSet) -> Self {
        set.0
            .into_iter()
            .map(|(k, values)| (k, values.into_iter().collect()))
            .collect()
    }
}

impl ContextSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-pair set
    pub fn of(key: &str, value: &str) -> Self {
        Self::new().with(key, value)
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.add(key, value);
        self
    }

    pub fn add(&mut self, key: &str, value: &str) {
        self.0
            .entry(key.to_lowercase())
            .or_default()
            .insert(value.to_lowercase());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All values held for `key`, sorted.
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.0
            .get(&key.to_lowercase())
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Every `(key, value)` pair, sorted by key then value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    /// True if, for every key in this set, `other` holds at least one of
    /// this set's values for that key. The empty set is satisfied by anything.
    pub fn is_satisfied_by(&self, other: &ContextSet) -> bool {
        self.0.iter().all(|(key, values)| {
            other
                .0
                .get(key)
                .is_some_and(|held| values.iter().any(|v| held.contains(v)))
        })
    }
}

/// Whether lookups honour contexts at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    Contextual,
    /// Every node applies regardless of its contexts
    NonContextual,
}

/// Conditions a permission or meta lookup is evaluated under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    mode: QueryMode,
    context: ContextSet,
    prefix_stack: Option<MetaStackDefinition>,
    suffix_stack: Option<MetaStackDefinition>,
}

impl QueryOptions {
    pub fn contextual(context: ContextSet) -> Self {
        Self {
            mode: QueryMode::Contextual,
            context,
            ..Self::default()
        }
    }

    pub fn non_contextual() -> Self {
        Self {
            mode: QueryMode::NonContextual,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    pub fn context(&self) -> &ContextSet {
        &self.context
    }

    /// Check whether a node scoped to `contexts` applies under these options.
    pub fn satisfies(&self, contexts: &ContextSet) -> bool {
        match self.mode {
            QueryMode::Contextual => contexts.is_satisfied_by(&self.context),
            QueryMode::NonContextual => true,
        }
    }

    pub fn prefix_stack(&self) -> Option<&MetaStackDefinition> {
        self.prefix_stack.as_ref()
    }

    pub fn suffix_stack(&self) -> Option<&MetaStackDefinition> {
        self.suffix_stack.as_ref()
    }

    /// Copy of these options with prefix and suffix stacks overridden.
    pub fn with_meta_stacks(
        &self,
        prefix: MetaStackDefinition,
        suffix: MetaStackDefinition,
    ) -> Self {
        Self {
            prefix_stack: Some(prefix),
            suffix_stack: Some(suffix),
            ..self.clone()
        }
    }
}
