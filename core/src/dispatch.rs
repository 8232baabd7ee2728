//! Placeholder dispatch table
//!
//! A table maps placeholder names to resolvers of two arities:
//! - **Fixed** (`prefix`): matched when the identifier equals the name
//! - **Variable** (`meta_<key>`): matched when the identifier starts with the
//!   name plus [`ARGUMENT_DELIMITER`]; the rest of the identifier, verbatim,
//!   is handed to the resolver as its argument
//!
//! Definitions are tried in registration order and the first match wins, so
//! a longer variable name must be registered before any shorter variable
//! name that prefixes it (`meta_all` before `meta`).
//!
//! The table is generic over the request context `C` so it can be exercised
//! without an engine.

use tracing::{debug, warn};

use crate::error::RegistrationError;

/// Separates a variable placeholder's name from its argument.
pub const ARGUMENT_DELIMITER: char = '_';

/// Renders boolean results as host-configured text.
pub trait PlaceholderPlatform {
    fn format_boolean(&self, value: bool) -> String;
}

impl PlaceholderPlatform for placard_types::BooleanFormat {
    fn format_boolean(&self, value: bool) -> String {
        self.text(value).to_string()
    }
}

/// Raw value produced by a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderValue {
    Text(String),
    Bool(bool),
    /// The placeholder is valid but has nothing to show
    Absent,
}

impl From<String> for PlaceholderValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for PlaceholderValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for PlaceholderValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<PlaceholderValue>> From<Option<T>> for PlaceholderValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

/// Outcome of resolving an identifier against a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No registered placeholder matched
    Unhandled,
    /// A placeholder matched but produced no value
    Absent,
    Text(String),
}

impl Resolution {
    fn from_value(value: PlaceholderValue, platform: &dyn PlaceholderPlatform) -> Self {
        match value {
            PlaceholderValue::Text(text) => Self::Text(text),
            PlaceholderValue::Bool(b) => Self::Text(platform.format_boolean(b)),
            PlaceholderValue::Absent => Self::Absent,
        }
    }

    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::Unhandled)
    }

    /// Text for hosts that signal "not handled" with a missing value.
    /// Both `Unhandled` and `Absent` map to `None`.
    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            Self::Unhandled | Self::Absent => None,
        }
    }

    /// Text for hosts that always need a string.
    pub fn into_text(self) -> String {
        self.into_option().unwrap_or_default()
    }
}

/// Whether a placeholder takes a trailing argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed,
    Variable,
}

pub type FixedResolver<C> = Box<dyn Fn(&C) -> PlaceholderValue + Send + Sync>;
pub type VariableResolver<C> = Box<dyn Fn(&C, &str) -> PlaceholderValue + Send + Sync>;

/// A registered resolver, tagged by arity.
pub enum Placeholder<C> {
    Fixed(FixedResolver<C>),
    Variable(VariableResolver<C>),
}

impl<C: 'static> Placeholder<C> {
    pub fn fixed<F, V>(resolver: F) -> Self
    where
        F: Fn(&C) -> V + Send + Sync + 'static,
        V: Into<PlaceholderValue> + 'static,
    {
        Self::Fixed(Box::new(move |ctx: &C| resolver(ctx).into()))
    }

    pub fn variable<F, V>(resolver: F) -> Self
    where
        F: Fn(&C, &str) -> V + Send + Sync + 'static,
        V: Into<PlaceholderValue> + 'static,
    {
        Self::Variable(Box::new(move |ctx: &C, arg: &str| resolver(ctx, arg).into()))
    }
}

impl<C> Placeholder<C> {
    pub fn arity(&self) -> Arity {
        match self {
            Self::Fixed(_) => Arity::Fixed,
            Self::Variable(_) => Arity::Variable,
        }
    }

    /// Key the placeholder is stored under for `name`.
    fn key(&self, name: &str) -> String {
        match self {
            Self::Fixed(_) => name.to_string(),
            Self::Variable(_) => format!("{name}{ARGUMENT_DELIMITER}"),
        }
    }
}

impl<C> std::fmt::Debug for Placeholder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Placeholder").field(&self.arity()).finish()
    }
}

/// Collects definitions before the table is frozen.
pub struct PlaceholderBuilder<C> {
    entries: Vec<(String, Placeholder<C>)>,
}

impl<C> Default for PlaceholderBuilder<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> PlaceholderBuilder<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `placeholder` under `name` (case-insensitive).
    ///
    /// Fails if the name is empty or the same name and arity is already
    /// registered. A fixed and a variable placeholder may share a name.
    pub fn register(
        &mut self,
        name: &str,
        placeholder: Placeholder<C>,
    ) -> Result<&mut Self, RegistrationError> {
        let name = name.to_lowercase();
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }

        let key = placeholder.key(&name);
        if self.entries.iter().any(|(existing, _)| *existing == key) {
            return Err(RegistrationError::Duplicate(key));
        }

        // Earlier variable names that prefix this one will always match first
        if let Some((shadow, _)) = self.entries.iter().find(|(existing, p)| {
            p.arity() == Arity::Variable && key.len() > existing.len() && key.starts_with(existing.as_str())
        }) {
            warn!(
                placeholder = %key,
                shadowed_by = %shadow,
                "Placeholder is unreachable behind an earlier registration"
            );
        }

        debug!(placeholder = %key, arity = ?placeholder.arity(), "Registered placeholder");
        self.entries.push((key, placeholder));
        Ok(self)
    }

    pub fn add_fixed<F, V>(&mut self, name: &str, resolver: F) -> Result<&mut Self, RegistrationError>
    where
        C: 'static,
        F: Fn(&C) -> V + Send + Sync + 'static,
        V: Into<PlaceholderValue> + 'static,
    {
        self.register(name, Placeholder::fixed(resolver))
    }

    pub fn add_variable<F, V>(
        &mut self,
        name: &str,
        resolver: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        C: 'static,
        F: Fn(&C, &str) -> V + Send + Sync + 'static,
        V: Into<PlaceholderValue> + 'static,
    {
        self.register(name, Placeholder::variable(resolver))
    }

    pub fn build(self) -> PlaceholderTable<C> {
        PlaceholderTable {
            entries: self.entries,
        }
    }
}

/// Immutable set of placeholder definitions.
pub struct PlaceholderTable<C> {
    entries: Vec<(String, Placeholder<C>)>,
}

impl<C> PlaceholderTable<C> {
    pub fn builder() -> PlaceholderBuilder<C> {
        PlaceholderBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys in registration order; variable names keep their
    /// trailing delimiter.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Registered names with their arity, delimiter stripped.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, Arity)> {
        self.entries.iter().map(|(key, p)| match p.arity() {
            Arity::Fixed => (key.as_str(), Arity::Fixed),
            Arity::Variable => (
                key.strip_suffix(ARGUMENT_DELIMITER).unwrap_or(key),
                Arity::Variable,
            ),
        })
    }

    fn find(&self, key: &str) -> Option<&Placeholder<C>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, p)| p)
    }

    /// Resolve a raw identifier such as `meta_rank` or `prefix`.
    pub fn resolve(&self, raw: &str, ctx: &C, platform: &dyn PlaceholderPlatform) -> Resolution {
        let identifier = raw.to_lowercase();

        for (key, placeholder) in &self.entries {
            let value = match placeholder {
                Placeholder::Fixed(resolver) if identifier == *key => resolver(ctx),
                Placeholder::Fixed(_) => continue,
                Placeholder::Variable(resolver) => match identifier.strip_prefix(key.as_str()) {
                    Some(argument) if !argument.is_empty() => resolver(ctx, argument),
                    _ => continue,
                },
            };
            return Resolution::from_value(value, platform);
        }

        debug!(identifier = %identifier, "No placeholder matched");
        Resolution::Unhandled
    }

    /// Resolve a placeholder addressed by bare name with a separately
    /// supplied argument, as hosts with namespaced registration do.
    ///
    /// Without an argument a name registered with both arities routes to the
    /// fixed form; a variable-only name resolves to [`Resolution::Absent`]
    /// rather than running with an empty argument. With an argument the
    /// variable form is preferred and a fixed-only name ignores it.
    pub fn resolve_named(
        &self,
        name: &str,
        argument: Option<&str>,
        ctx: &C,
        platform: &dyn PlaceholderPlatform,
    ) -> Resolution {
        let name = name.to_lowercase();
        let variable = self.find(&format!("{name}{ARGUMENT_DELIMITER}"));
        let fixed = self.find(&name);

        let value = match (argument.filter(|arg| !arg.is_empty()), variable, fixed) {
            (Some(argument), Some(Placeholder::Variable(resolver)), _) => resolver(ctx, argument),
            (_, _, Some(Placeholder::Fixed(resolver))) => resolver(ctx),
            (None, Some(_), None) => {
                debug!(placeholder = %name, "Placeholder requires an argument");
                PlaceholderValue::Absent
            }
            _ => return Resolution::Unhandled,
        };
        Resolution::from_value(value, platform)
    }
}

impl<C> std::fmt::Debug for PlaceholderTable<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placard_types::BooleanFormat;
    use std::sync::Mutex;

    /// Records which resolver ran and with what argument
    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    impl Calls {
        fn record(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    fn platform() -> BooleanFormat {
        BooleanFormat::new("Y", "N")
    }

    fn table() -> PlaceholderTable<Calls> {
        let mut builder = PlaceholderTable::builder();
        builder
            .add_fixed("context", |c: &Calls| {
                c.record("context".into());
                "all"
            })
            .unwrap()
            .add_variable("context", |c: &Calls, arg: &str| {
                c.record(format!("context_:{arg}"));
                arg.to_uppercase()
            })
            .unwrap()
            .add_variable("meta_all", |c: &Calls, arg: &str| {
                c.record(format!("meta_all_:{arg}"));
                "many"
            })
            .unwrap()
            .add_variable("meta", |c: &Calls, arg: &str| {
                c.record(format!("meta_:{arg}"));
                "one"
            })
            .unwrap()
            .add_fixed("meta_count", |c: &Calls| {
                c.record("meta_count".into());
                "3"
            })
            .unwrap()
            .add_variable("has_permission", |c: &Calls, arg: &str| {
                c.record(format!("has_permission_:{arg}"));
                arg == "yes.node"
            })
            .unwrap()
            .add_fixed("nothing", |_: &Calls| PlaceholderValue::Absent)
            .unwrap();
        builder.build()
    }

    #[test]
    fn test_fixed_requires_exact_match() {
        let table = table();
        let calls = Calls::default();
        assert_eq!(table.resolve("context", &calls, &platform()), Resolution::Text("all".into()));
        assert_eq!(calls.take(), vec!["context"]);
        assert_eq!(table.resolve("contexts", &calls, &platform()), Resolution::Unhandled);
        assert!(calls.take().is_empty());
    }

    #[test]
    fn test_variable_receives_exact_remainder() {
        let table = table();
        let calls = Calls::default();
        let resolution = table.resolve("context_World Name ", &calls, &platform());
        assert_eq!(resolution, Resolution::Text("WORLD NAME ".into()));
        assert_eq!(calls.take(), vec!["context_:world name "]);
    }

    #[test]
    fn test_variable_needs_non_empty_argument() {
        let table = table();
        let calls = Calls::default();
        assert_eq!(table.resolve("meta_all_", &calls, &platform()), Resolution::Text("one".into()));
        assert_eq!(calls.take(), vec!["meta_:all_"]);
        assert_eq!(table.resolve("context_", &calls, &platform()), Resolution::Unhandled);
    }

    #[test]
    fn test_first_registered_prefix_wins() {
        let table = table();
        let calls = Calls::default();
        table.resolve("meta_all_rank", &calls, &platform());
        assert_eq!(calls.take(), vec!["meta_all_:rank"]);
        table.resolve("meta_rank", &calls, &platform());
        assert_eq!(calls.take(), vec!["meta_:rank"]);
    }

    #[test]
    fn test_fixed_shadowed_by_earlier_variable_prefix() {
        // "meta_" was registered before "meta_count", so the fixed name is unreachable
        let table = table();
        let calls = Calls::default();
        table.resolve("meta_count", &calls, &platform());
        assert_eq!(calls.take(), vec!["meta_:count"]);
    }

    #[test]
    fn test_identifier_lowercased() {
        let table = table();
        let calls = Calls::default();
        table.resolve("CONTEXT_Server", &calls, &platform());
        assert_eq!(calls.take(), vec!["context_:server"]);
    }

    #[test]
    fn test_booleans_use_platform_text() {
        let table = table();
        let calls = Calls::default();
        assert_eq!(
            table.resolve("has_permission_yes.node", &calls, &platform()),
            Resolution::Text("Y".into())
        );
        assert_eq!(
            table.resolve("has_permission_other", &calls, &platform()),
            Resolution::Text("N".into())
        );
    }

    #[test]
    fn test_absent_distinct_from_unhandled() {
        let table = table();
        let calls = Calls::default();
        let absent = table.resolve("nothing", &calls, &platform());
        let unhandled = table.resolve("missing", &calls, &platform());
        assert_eq!(absent, Resolution::Absent);
        assert_eq!(unhandled, Resolution::Unhandled);
        assert!(absent.is_handled());
        assert!(!unhandled.is_handled());
        assert_eq!(absent.into_text(), unhandled.into_text());
    }

    #[test]
    fn test_rejects_empty_and_duplicate_names() {
        let mut builder: PlaceholderBuilder<()> = PlaceholderTable::builder();
        assert_eq!(
            builder.add_fixed("", |_| "x").err(),
            Some(RegistrationError::EmptyName)
        );
        builder.add_fixed("prefix", |_| "x").unwrap();
        assert_eq!(
            builder.add_fixed("PREFIX", |_| "y").err(),
            Some(RegistrationError::Duplicate("prefix".into()))
        );
        // same name, other arity, is a different key
        assert!(builder.add_variable("prefix", |_, _| "z").is_ok());
        assert_eq!(
            builder.add_variable("prefix", |_, _| "z").err(),
            Some(RegistrationError::Duplicate("prefix_".into()))
        );
    }

    #[test]
    fn test_named_without_argument_routes_to_fixed() {
        let table = table();
        let calls = Calls::default();
        assert_eq!(
            table.resolve_named("context", None, &calls, &platform()),
            Resolution::Text("all".into())
        );
        assert_eq!(
            table.resolve_named("context", Some(""), &calls, &platform()),
            Resolution::Text("all".into())
        );
        assert_eq!(calls.take(), vec!["context", "context"]);
    }

    #[test]
    fn test_named_with_argument_routes_to_variable() {
        let table = table();
        let calls = Calls::default();
        table.resolve_named("context", Some("world"), &calls, &platform());
        assert_eq!(calls.take(), vec!["context_:world"]);
    }

    #[test]
    fn test_named_variable_only_without_argument() {
        let table = table();
        let calls = Calls::default();
        assert_eq!(
            table.resolve_named("meta", None, &calls, &platform()),
            Resolution::Absent
        );
        assert!(calls.take().is_empty());
        assert_eq!(
            table.resolve_named("unknown", Some("x"), &calls, &platform()),
            Resolution::Unhandled
        );
    }

    #[test]
    fn test_named_fixed_ignores_argument() {
        let table = table();
        let calls = Calls::default();
        table.resolve_named("meta_count", Some("ignored"), &calls, &platform());
        assert_eq!(calls.take(), vec!["meta_count"]);
    }

    #[test]
    fn test_definitions_strip_delimiter() {
        let table = table();
        let defs: Vec<_> = table.definitions().take(3).collect();
        assert_eq!(
            defs,
            vec![
                ("context", Arity::Fixed),
                ("context", Arity::Variable),
                ("meta_all", Arity::Variable),
            ]
        );
        assert_eq!(table.keys().nth(1), Some("context_"));
    }
}
