//! Read-only views of engine state
//!
//! Users, groups, tracks and the nodes they hold, as handed out by a
//! [`PermissionEngine`](super::PermissionEngine).

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::context::ContextSet;

/// Key prefix marking a group-membership node (`group.admin`).
pub const GROUP_NODE_PREFIX: &str = "group.";

/// A single granted permission, group membership or meta entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Lower-cased on construction, except the value part of chat meta
    #[serde(deserialize_with = "deserialize_key")]
    pub key: String,

    /// `false` for a negated node
    #[serde(default = "default_true")]
    pub value: bool,

    /// When the node stops applying (None = permanent). Snapshot files may
    /// give a TOML datetime or an RFC 3339 string.
    #[serde(default, deserialize_with = "deserialize_expiry")]
    pub expiry: Option<DateTime<Utc>>,

    #[serde(default)]
    pub contexts: ContextSet,
}

fn default_true() -> bool {
    true
}

/// Lower-case a node key. Prefix, suffix and meta values keep their case
/// (`prefix.10.&aVIP`, `meta.Rank.Gold` -> `meta.rank.Gold`).
pub fn normalize_key(key: &str) -> String {
    let mut parts = key.splitn(3, '.');
    let kind = parts.next().unwrap_or_default().to_lowercase();
    match (kind.as_str(), parts.next(), parts.next()) {
        ("prefix" | "suffix" | "meta", Some(middle), Some(value)) => {
            format!("{kind}.{}.{value}", middle.to_lowercase())
        }
        _ => key.to_lowercase(),
    }
}

fn deserialize_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|key| normalize_key(&key))
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match toml::Value::deserialize(deserializer)? {
        toml::Value::Datetime(datetime) => datetime.to_string(),
        toml::Value::String(text) => text,
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a datetime for expiry, found {}",
                other.type_str()
            )));
        }
    };

    DateTime::parse_from_rfc3339(&text)
        .map(|expiry| Some(expiry.with_timezone(&Utc)))
        .map_err(|e| serde::de::Error::custom(format!("invalid expiry '{text}': {e}")))
}

impl Node {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: normalize_key(&key.into()),
            value: true,
            expiry: None,
            contexts: ContextSet::new(),
        }
    }

    /// Membership node for `group`
    pub fn inheritance(group: &str) -> Self {
        Self::new(format!("{GROUP_NODE_PREFIX}{}", group.to_lowercase()))
    }

    pub fn negated(mut self) -> Self {
        self.value = false;
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_context(mut self, key: &str, value: &str) -> Self {
        self.contexts.add(key, value);
        self
    }

    /// Group name if this is a membership node.
    pub fn group_name(&self) -> Option<&str> {
        let prefix = self.key.get(..GROUP_NODE_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(GROUP_NODE_PREFIX) {
            return None;
        }
        self.key.get(GROUP_NODE_PREFIX.len()..)
    }

    pub fn is_inheritance(&self) -> bool {
        self.group_name().is_some()
    }

    pub fn has_expiry(&self) -> bool {
        self.expiry.is_some()
    }

    /// Time left until expiry, negative once expired. None for permanent nodes.
    pub fn expiry_duration(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.expiry.map(|expiry| expiry - now)
    }
}

/// A named bundle of nodes users can inherit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,

    /// Name shown to players instead of `name`
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub weight: Option<i32>,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            weight: None,
            nodes: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Display name if set, otherwise the group id
    pub fn friendly_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Weight used for ordering; missing weight counts as zero
    pub fn weight_or_default(&self) -> i32 {
        self.weight.unwrap_or(0)
    }
}

/// An ordered ladder of group names used for promotion/demotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,

    #[serde(default)]
    pub groups: Vec<String>,
}

impl Track {
    pub fn new<I, S>(name: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    fn position(&self, group: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.eq_ignore_ascii_case(group))
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.position(group).is_some()
    }

    /// Group after `group` on the ladder
    pub fn next(&self, group: &str) -> Option<&str> {
        let index = self.position(group)?;
        self.groups.get(index + 1).map(String::as_str)
    }

    /// Group before `group` on the ladder
    pub fn previous(&self, group: &str) -> Option<&str> {
        let index = self.position(group)?;
        index
            .checked_sub(1)
            .and_then(|i| self.groups.get(i))
            .map(String::as_str)
    }
}

/// A user record as loaded by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: Uuid,
    pub username: String,

    #[serde(default = "default_primary_group")]
    pub primary_group: String,

    /// Directly held nodes, in the order the engine stores them
    #[serde(default)]
    pub nodes: Vec<Node>,
}

fn default_primary_group() -> String {
    "default".to_string()
}

impl User {
    pub fn new(uuid: Uuid, username: impl Into<String>) -> Self {
        Self {
            uuid,
            username: username.into(),
            primary_group: default_primary_group(),
            nodes: Vec::new(),
        }
    }

    pub fn with_primary_group(mut self, group: impl Into<String>) -> Self {
        self.primary_group = group.into();
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Directly held membership nodes with their group names
    pub fn inheritance_nodes(&self) -> impl Iterator<Item = (&Node, &str)> {
        self.nodes
            .iter()
            .filter_map(|node| node.group_name().map(|group| (node, group)))
    }
}

/// Cached meta lookup result for one set of query options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    /// Every value per meta key, highest precedence first
    pub meta: BTreeMap<String, Vec<String>>,
}

impl MetaData {
    /// The value that wins for `key`
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta_values(key).first().map(String::as_str)
    }

    pub fn meta_values(&self, key: &str) -> &[String] {
        self.meta.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Outcome of an effective permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate {
    True,
    False,
    Undefined,
}

impl Tristate {
    pub fn as_bool(self) -> bool {
        matches!(self, Self::True)
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

/// One rule of a meta stack, as parsed by the engine (`highest_own`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaStackElement(String);

impl MetaStackElement {
    /// Engines construct elements once they have validated the definition.
    pub fn new(definition: impl Into<String>) -> Self {
        Self(definition.into())
    }

    pub fn definition(&self) -> &str {
        &self.0
    }
}

/// Ordered elements combined into one prefix or suffix. Duplicates are
/// retained and no spacers are inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaStackDefinition {
    elements: Vec<MetaStackElement>,
}

impl MetaStackDefinition {
    pub fn new(elements: Vec<MetaStackElement>) -> Self {
        Self { elements }
    }

    pub fn single(element: MetaStackElement) -> Self {
        Self::new(vec![element])
    }

    pub fn elements(&self) -> &[MetaStackElement] {
        &self.elements
    }
}
