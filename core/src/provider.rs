//! Placeholder provider
//!
//! Owns the catalog table plus the injected engine and platform, and turns a
//! `(subject, identifier)` request into text. One provider is built when a
//! host integration enables and shared for its lifetime.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use placard_types::{DurationFormatter, PlaceholderConfig};

use crate::catalog;
use crate::dispatch::{PlaceholderPlatform, PlaceholderTable, Resolution};
use crate::engine::{MetaData, PermissionEngine, QueryOptions, Subject, Tristate, User};
use crate::error::RegistrationError;

/// Everything a resolver may read for one placeholder evaluation.
///
/// Built fresh for every request and dropped once the text is produced.
pub struct RequestContext {
    pub subject: Subject,
    pub user: Arc<User>,
    pub query_options: QueryOptions,
    /// Instant expiry arithmetic is measured from
    pub now: DateTime<Utc>,
    engine: Arc<dyn PermissionEngine>,
    durations: DurationFormatter,
}

impl RequestContext {
    pub fn engine(&self) -> &dyn PermissionEngine {
        self.engine.as_ref()
    }

    /// The user's meta data under the request's query options
    pub fn meta_data(&self) -> MetaData {
        self.engine.meta_data(&self.user, &self.query_options)
    }

    pub fn check_permission(&self, permission: &str) -> Tristate {
        self.engine
            .check_permission(&self.user, &self.query_options, permission)
    }

    /// Display name for a group id; unknown groups keep their id.
    pub fn group_display_name(&self, group: &str) -> String {
        match self.engine.group(group) {
            Some(found) => found.friendly_name().to_string(),
            None => group.to_string(),
        }
    }

    /// Render a non-negative span with the configured formatter.
    pub fn format_duration(&self, remaining: TimeDelta) -> String {
        let secs = remaining.num_seconds().max(0) as u64;
        self.durations.format_secs(secs)
    }
}

/// Resolves placeholder identifiers for any host.
pub struct PlaceholderProvider<P> {
    platform: P,
    engine: Arc<dyn PermissionEngine>,
    durations: DurationFormatter,
    table: PlaceholderTable<RequestContext>,
}

impl<P: PlaceholderPlatform> PlaceholderProvider<P> {
    /// Build the full placeholder catalog against `engine`.
    pub fn new(platform: P, engine: Arc<dyn PermissionEngine>) -> Result<Self, RegistrationError> {
        let mut builder = PlaceholderTable::builder();
        catalog::register(&mut builder)?;
        let table = builder.build();
        tracing::debug!(count = table.len(), "Placeholder catalog ready");

        Ok(Self {
            platform,
            engine,
            durations: DurationFormatter::default(),
            table,
        })
    }

    /// Apply the duration style from `config`. Boolean text belongs to the
    /// platform and is not read from here.
    pub fn with_config(mut self, config: &PlaceholderConfig) -> Self {
        self.durations = config.duration.formatter();
        self
    }

    pub fn with_duration_formatter(mut self, durations: DurationFormatter) -> Self {
        self.durations = durations;
        self
    }

    pub fn placeholders(&self) -> &PlaceholderTable<RequestContext> {
        &self.table
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Assemble the per-request context, or None when the engine has no
    /// user loaded for the subject.
    pub fn request_context(&self, subject: &Subject, now: DateTime<Utc>) -> Option<RequestContext> {
        let user = self.engine.user(subject.uuid)?;
        Some(RequestContext {
            subject: subject.clone(),
            user,
            query_options: self.engine.query_options(subject),
            now,
            engine: Arc::clone(&self.engine),
            durations: self.durations,
        })
    }

    /// Resolve `placeholder` for `subject` as of now.
    pub fn on_placeholder_request(&self, subject: &Subject, placeholder: &str) -> Resolution {
        self.on_placeholder_request_at(subject, placeholder, Utc::now())
    }

    /// Resolve `placeholder` for `subject` with expiries measured from `now`.
    ///
    /// A subject without a loaded user renders as empty text.
    pub fn on_placeholder_request_at(
        &self,
        subject: &Subject,
        placeholder: &str,
        now: DateTime<Utc>,
    ) -> Resolution {
        match self.request_context(subject, now) {
            Some(ctx) => self.table.resolve(placeholder, &ctx, &self.platform),
            None => {
                tracing::debug!(subject = %subject.uuid, "No user loaded for subject");
                Resolution::Text(String::new())
            }
        }
    }

    /// Resolve by bare name with a separately supplied argument.
    pub fn resolve_named(
        &self,
        ctx: &RequestContext,
        name: &str,
        argument: Option<&str>,
    ) -> Resolution {
        self.table
            .resolve_named(name, argument, ctx, &self.platform)
    }
}
