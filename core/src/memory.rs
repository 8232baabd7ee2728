//! In-memory engine backed by a static snapshot
//!
//! Lets the placeholder catalog run without a live server: tests build one
//! programmatically, the CLI loads one from TOML. It implements only the
//! lookups placeholders read and makes no attempt at the full resolution
//! rules of a real permissions system.
//!
//! Snapshot format:
//!
//! ```toml
//! [[group]]
//! name = "admin"
//! display_name = "Administrator"
//! weight = 100
//! nodes = [{ key = "group.mod" }, { key = "prefix.100.[Admin] " }]
//!
//! [[track]]
//! name = "staff"
//! groups = ["helper", "mod", "admin"]
//!
//! [[user]]
//! uuid = "5d3bcd8e-0f7e-4e5a-9c36-6b0f1c2d3e4f"
//! username = "Steve"
//! primary_group = "admin"
//! nodes = [
//!     { key = "group.admin", contexts = { server = ["lobby"] } },
//!     { key = "essentials.fly", expiry = 2026-01-01T13:00:00Z },
//! ]
//! contexts = { server = ["lobby"] }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::engine::{
    ContextSet, Group, MetaData, MetaStackDefinition, MetaStackElement, Node, PermissionEngine,
    QueryOptions, Subject, Track, Tristate, User,
};
use crate::error::SnapshotError;

/// Stack elements understood by [`MemoryEngine::parse_stack_element`].
pub const STACK_ELEMENTS: [&str; 6] = [
    "highest",
    "lowest",
    "highest_own",
    "lowest_own",
    "highest_inherited",
    "lowest_inherited",
];

/// A user entry in a snapshot file, with the contexts the user is
/// currently in.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    #[serde(flatten)]
    pub user: User,

    #[serde(default)]
    pub contexts: ContextSet,
}

/// Deserialized snapshot file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default, rename = "group")]
    pub groups: Vec<Group>,

    #[serde(default, rename = "track")]
    pub tracks: Vec<Track>,

    #[serde(default, rename = "user")]
    pub users: Vec<UserEntry>,
}

/// Engine over a fixed set of users, groups and tracks.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    users: HashMap<Uuid, Arc<User>>,
    contexts: HashMap<Uuid, ContextSet>,
    groups: HashMap<String, Arc<Group>>,
    tracks: HashMap<String, Arc<Track>>,
}

/// Where a meta candidate came from, for `_own` / `_inherited` stack elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Own,
    Inherited,
}

struct Candidate<'a> {
    priority: i32,
    value: &'a str,
    origin: Origin,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a parsed snapshot, rejecting duplicate names.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, SnapshotError> {
        let mut engine = Self::new();

        for group in snapshot.groups {
            if engine.group(&group.name).is_some() {
                return Err(SnapshotError::Duplicate {
                    kind: "group",
                    name: group.name,
                });
            }
            engine.insert_group(group);
        }

        for track in snapshot.tracks {
            if engine.track(&track.name).is_some() {
                return Err(SnapshotError::Duplicate {
                    kind: "track",
                    name: track.name,
                });
            }
            engine.insert_track(track);
        }

        for entry in snapshot.users {
            if engine.users.contains_key(&entry.user.uuid) {
                return Err(SnapshotError::Duplicate {
                    kind: "user",
                    name: entry.user.uuid.to_string(),
                });
            }
            engine.insert_user(entry.user, entry.contexts);
        }

        Ok(engine)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = toml::from_str(contents)?;
        Self::from_snapshot(snapshot)
    }

    /// Load a snapshot TOML file
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let contents = fs::read_to_string(path).map_err(|e| SnapshotError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let engine = Self::from_toml_str(&contents)?;

        tracing::info!(
            path = ?path,
            users = engine.users.len(),
            groups = engine.groups.len(),
            tracks = engine.tracks.len(),
            "Loaded snapshot"
        );
        Ok(engine)
    }

    pub fn insert_user(&mut self, user: User, contexts: ContextSet) {
        self.contexts.insert(user.uuid, contexts);
        self.users.insert(user.uuid, Arc::new(user));
    }

    pub fn insert_group(&mut self, group: Group) {
        self.groups.insert(group.name.to_lowercase(), Arc::new(group));
    }

    pub fn insert_track(&mut self, track: Track) {
        self.tracks.insert(track.name.to_lowercase(), Arc::new(track));
    }

    pub fn with_user(mut self, user: User, contexts: ContextSet) -> Self {
        self.insert_user(user, contexts);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.insert_group(group);
        self
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.insert_track(track);
        self
    }

    /// Find a loaded user by username, case-insensitive.
    pub fn user_by_name(&self, username: &str) -> Option<Arc<User>> {
        self.users
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned()
    }

    /// Subject for a loaded user
    pub fn subject(&self, user: &User) -> Subject {
        Subject::new(user.uuid, user.username.clone())
    }

    /// Depth-first walk of applicable `group.*` nodes starting at `nodes`.
    fn walk_groups(
        &self,
        nodes: &[Node],
        options: &QueryOptions,
        visited: &mut HashSet<String>,
        out: &mut Vec<Arc<Group>>,
    ) {
        for node in nodes {
            if !node.value || !options.satisfies(&node.contexts) {
                continue;
            }
            let Some(name) = node.group_name() else {
                continue;
            };
            let Some(group) = self.group(name) else {
                continue;
            };
            if !visited.insert(group.name.to_lowercase()) {
                continue;
            }
            out.push(Arc::clone(&group));
            self.walk_groups(&group.nodes, options, visited, out);
        }
    }

    /// Applicable nodes tagged by origin: the user's own first, then each
    /// inherited group's in resolution order.
    fn tagged_nodes<'a>(
        &self,
        user: &'a User,
        groups: &'a [Arc<Group>],
        options: &QueryOptions,
    ) -> Vec<(&'a Node, Origin)> {
        let own = user.nodes.iter().map(|node| (node, Origin::Own));
        let inherited = groups
            .iter()
            .flat_map(|group| group.nodes.iter().map(|node| (node, Origin::Inherited)));

        own.chain(inherited)
            .filter(|(node, _)| node.value && options.satisfies(&node.contexts))
            .collect()
    }
}

/// Split a `<kind>.<priority>.<value>` chat meta key.
fn parse_chat_meta<'a>(key: &'a str, kind: &str) -> Option<(i32, &'a str)> {
    let rest = key.strip_prefix(kind)?.strip_prefix('.')?;
    let (priority, value) = rest.split_once('.')?;
    Some((priority.parse().ok()?, value))
}

fn chat_candidates<'a>(nodes: &[(&'a Node, Origin)], kind: &str) -> Vec<Candidate<'a>> {
    nodes
        .iter()
        .filter_map(|&(node, origin)| {
            parse_chat_meta(&node.key, kind).map(|(priority, value)| Candidate {
                priority,
                value,
                origin,
            })
        })
        .collect()
}

/// Apply one stack element to the candidates.
fn select<'a>(element: &MetaStackElement, candidates: &[Candidate<'a>]) -> Option<&'a str> {
    let (highest, origin) = match element.definition() {
        "highest" => (true, None),
        "lowest" => (false, None),
        "highest_own" => (true, Some(Origin::Own)),
        "lowest_own" => (false, Some(Origin::Own)),
        "highest_inherited" => (true, Some(Origin::Inherited)),
        "lowest_inherited" => (false, Some(Origin::Inherited)),
        _ => return None,
    };

    // Earlier candidates win ties
    candidates
        .iter()
        .filter(|c| origin.is_none_or(|o| c.origin == o))
        .fold(None::<&Candidate<'a>>, |best, c| match best {
            Some(b) if highest && b.priority >= c.priority => Some(b),
            Some(b) if !highest && b.priority <= c.priority => Some(b),
            _ => Some(c),
        })
        .map(|c| c.value)
}

fn stack(definition: Option<&MetaStackDefinition>, candidates: &[Candidate<'_>]) -> Option<String> {
    let highest = [MetaStackElement::new("highest")];
    let elements = definition.map_or(&highest[..], MetaStackDefinition::elements);

    let parts: Vec<&str> = elements
        .iter()
        .filter_map(|element| select(element, candidates))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.concat())
    }
}

impl PermissionEngine for MemoryEngine {
    fn user(&self, uuid: Uuid) -> Option<Arc<User>> {
        self.users.get(&uuid).cloned()
    }

    fn query_options(&self, subject: &Subject) -> QueryOptions {
        QueryOptions::contextual(self.contexts(subject))
    }

    fn contexts(&self, subject: &Subject) -> ContextSet {
        self.contexts.get(&subject.uuid).cloned().unwrap_or_default()
    }

    fn group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.get(&name.to_lowercase()).cloned()
    }

    fn track(&self, name: &str) -> Option<Arc<Track>> {
        self.tracks.get(&name.to_lowercase()).cloned()
    }

    fn meta_data(&self, user: &User, options: &QueryOptions) -> MetaData {
        let groups = self.inherited_groups(user, options);
        let nodes = self.tagged_nodes(user, &groups, options);

        let mut meta: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (node, _) in &nodes {
            let Some((key, value)) = node
                .key
                .strip_prefix("meta.")
                .and_then(|rest| rest.split_once('.'))
            else {
                continue;
            };
            meta.entry(key.to_string()).or_default().push(value.to_string());
        }

        MetaData {
            prefix: stack(options.prefix_stack(), &chat_candidates(&nodes, "prefix")),
            suffix: stack(options.suffix_stack(), &chat_candidates(&nodes, "suffix")),
            meta,
        }
    }

    fn check_permission(&self, user: &User, options: &QueryOptions, permission: &str) -> Tristate {
        let permission = permission.to_lowercase();
        let groups = self.inherited_groups(user, options);
        let own = user.nodes.iter();
        let inherited = groups.iter().flat_map(|group| group.nodes.iter());

        own.chain(inherited)
            .filter(|node| options.satisfies(&node.contexts))
            .find(|node| node.key == permission)
            .map_or(Tristate::Undefined, |node| Tristate::from(node.value))
    }

    fn inherited_groups(&self, user: &User, options: &QueryOptions) -> Vec<Arc<Group>> {
        let mut visited = HashSet::new();
        let mut out = Vec::new();
        self.walk_groups(&user.nodes, options, &mut visited, &mut out);
        out
    }

    fn resolve_inherited_nodes(&self, user: &User, options: &QueryOptions) -> Vec<Node> {
        let groups = self.inherited_groups(user, options);
        let own = user.nodes.iter();
        let inherited = groups.iter().flat_map(|group| group.nodes.iter());

        own.chain(inherited)
            .filter(|node| options.satisfies(&node.contexts))
            .cloned()
            .collect()
    }

    fn parse_stack_element(&self, definition: &str) -> Option<MetaStackElement> {
        let definition = definition.trim().to_lowercase();
        STACK_ELEMENTS
            .contains(&definition.as_str())
            .then(|| MetaStackElement::new(definition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"
[[group]]
name = "default"

[[group]]
name = "vip"
display_name = "V.I.P"
weight = 10
nodes = [
    { key = "group.default" },
    { key = "prefix.10.[VIP] " },
    { key = "meta.rank.gold" },
]

[[group]]
name = "admin"
weight = 100
nodes = [
    { key = "group.vip" },
    { key = "prefix.100.[Admin] " },
    { key = "essentials.fly" },
]

[[track]]
name = "ranks"
groups = ["default", "vip", "admin"]

[[user]]
uuid = "5d3bcd8e-0f7e-4e5a-9c36-6b0f1c2d3e4f"
username = "Steve"
primary_group = "admin"
nodes = [
    { key = "group.admin", contexts = { server = ["lobby"] } },
    { key = "prefix.5.[Steve] " },
    { key = "meta.rank.diamond" },
    { key = "essentials.fly", value = false },
]
contexts = { server = ["lobby"] }
"#;

    fn engine() -> MemoryEngine {
        MemoryEngine::from_toml_str(SNAPSHOT).unwrap()
    }

    fn steve(engine: &MemoryEngine) -> Arc<User> {
        engine.user_by_name("steve").unwrap()
    }

    #[test]
    fn test_parse_snapshot() {
        let engine = engine();
        let user = steve(&engine);
        assert_eq!(user.primary_group, "admin");
        assert_eq!(user.nodes.len(), 4);
        assert!(!user.nodes[3].value);
        assert_eq!(engine.group("VIP").unwrap().friendly_name(), "V.I.P");
        assert_eq!(engine.track("ranks").unwrap().groups.len(), 3);
        assert_eq!(
            engine.contexts(&engine.subject(&user)).values("server"),
            vec!["lobby"]
        );
    }

    #[test]
    fn test_inherited_groups_depth_first() {
        let engine = engine();
        let user = steve(&engine);
        let options = engine.query_options(&engine.subject(&user));
        let names: Vec<String> = engine
            .inherited_groups(&user, &options)
            .iter()
            .map(|g| g.name.clone())
            .collect();
        assert_eq!(names, vec!["admin", "vip", "default"]);
    }

    #[test]
    fn test_inheritance_respects_contexts() {
        let engine = engine();
        let user = steve(&engine);
        let elsewhere = QueryOptions::contextual(ContextSet::of("server", "survival"));
        assert!(engine.inherited_groups(&user, &elsewhere).is_empty());
    }

    #[test]
    fn test_meta_highest_priority_wins() {
        let engine = engine();
        let user = steve(&engine);
        let options = engine.query_options(&engine.subject(&user));
        let meta = engine.meta_data(&user, &options);
        assert_eq!(meta.prefix.as_deref(), Some("[Admin] "));
        assert_eq!(meta.suffix, None);
        assert_eq!(meta.meta_value("rank"), Some("diamond"));
        assert_eq!(meta.meta_values("rank"), ["diamond".to_string(), "gold".to_string()]);
    }

    #[test]
    fn test_meta_stack_elements() {
        let engine = engine();
        let user = steve(&engine);
        let options = engine.query_options(&engine.subject(&user));

        let prefix_for = |element: &str| {
            let element = engine.parse_stack_element(element).unwrap();
            let definition = MetaStackDefinition::single(element);
            let stacked = options.with_meta_stacks(definition.clone(), definition);
            engine.meta_data(&user, &stacked).prefix
        };

        assert_eq!(prefix_for("highest_own").as_deref(), Some("[Steve] "));
        assert_eq!(prefix_for("lowest").as_deref(), Some("[Steve] "));
        assert_eq!(prefix_for("lowest_inherited").as_deref(), Some("[VIP] "));
        assert_eq!(prefix_for("HIGHEST_INHERITED").as_deref(), Some("[Admin] "));
        assert!(engine.parse_stack_element("highest_on_track_staff").is_none());
    }

    #[test]
    fn test_check_permission_own_node_overrides() {
        let engine = engine();
        let user = steve(&engine);
        let options = engine.query_options(&engine.subject(&user));
        assert_eq!(engine.check_permission(&user, &options, "essentials.fly"), Tristate::False);
        assert_eq!(engine.check_permission(&user, &options, "group.vip"), Tristate::True);
        assert_eq!(engine.check_permission(&user, &options, "worldedit.wand"), Tristate::Undefined);
        assert_eq!(engine.check_permission(&user, &options, "Essentials.FLY"), Tristate::False);
    }

    #[test]
    fn test_expiry_loaded_from_snapshot() {
        use chrono::{TimeZone, Utc};
        use placard_types::BooleanFormat;

        use crate::dispatch::Resolution;
        use crate::provider::PlaceholderProvider;

        let engine = MemoryEngine::from_toml_str(
            r#"
[[user]]
uuid = "5d3bcd8e-0f7e-4e5a-9c36-6b0f1c2d3e4f"
username = "Steve"
nodes = [
    { key = "essentials.fly", expiry = 2026-01-01T13:00:00Z },
    { key = "essentials.home", expiry = "2026-01-02T12:00:00Z" },
]
"#,
        )
        .unwrap();
        let subject = engine.subject(&steve(&engine));
        let provider = PlaceholderProvider::new(BooleanFormat::default(), Arc::new(engine)).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(
            provider.on_placeholder_request_at(&subject, "expiry_time_essentials.fly", now),
            Resolution::Text("1h".to_string())
        );
        assert_eq!(
            provider.on_placeholder_request_at(&subject, "expiry_time_essentials.home", now),
            Resolution::Text("1d".to_string())
        );
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let result = MemoryEngine::from_toml_str("[[group]]\nname = \"a\"\n[[group]]\nname = \"A\"\n");
        assert!(matches!(result, Err(SnapshotError::Duplicate { kind: "group", .. })));
    }

    #[test]
    fn test_parse_chat_meta() {
        assert_eq!(parse_chat_meta("prefix.10.&a[VIP]", "prefix"), Some((10, "&a[VIP]")));
        assert_eq!(parse_chat_meta("prefix.10.a.b", "prefix"), Some((10, "a.b")));
        assert_eq!(parse_chat_meta("prefix.x.a", "prefix"), None);
        assert_eq!(parse_chat_meta("suffix.1.a", "prefix"), None);
        assert_eq!(parse_chat_meta("prefixes.1.a", "prefix"), None);
    }
}
