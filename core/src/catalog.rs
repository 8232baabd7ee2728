//! The placeholder catalog
//!
//! Every placeholder the provider offers, registered in match order. Names
//! taking an argument are listed with a trailing `_<argument>` below.
//!
//! | Family | Placeholders |
//! |---|---|
//! | Meta | `prefix`, `suffix`, `meta_all_<key>`, `meta_<key>`, `prefix_element_<element>`, `suffix_element_<element>` |
//! | Context | `context`, `context_<key>` |
//! | Groups | `groups`, `inherited_groups`, `primary_group_name`, `in_group_<group>`, `inherits_group_<group>` |
//! | Permissions | `has_permission_<node>`, `inherits_permission_<node>`, `check_permission_<node>` |
//! | Weight | `highest_group_by_weight`, `lowest_group_by_weight`, `highest_inherited_group_by_weight`, `lowest_inherited_group_by_weight` |
//! | Tracks | `on_track_<track>`, `has_groups_on_track_<track>`, `current_group_on_track_<track>`, `next_group_on_track_<track>`, `previous_group_on_track_<track>`, `first_group_on_tracks_<tracks>`, `last_group_on_tracks_<tracks>` |
//! | Expiry | `expiry_time_<node>`, `inherited_expiry_time_<node>`, `group_expiry_time_<group>`, `inherited_group_expiry_time_<group>` |

use std::collections::HashSet;
use std::sync::Arc;

use chrono::TimeDelta;
use tracing::debug;

use crate::dispatch::PlaceholderBuilder;
use crate::engine::{Group, MetaData, MetaStackDefinition, Node, Track};
use crate::error::RegistrationError;
use crate::provider::RequestContext;

/// Shown in place of a prefix/suffix when the stack element can't be parsed.
pub const INVALID_ELEMENT: &str = "ERROR: Invalid element!";

pub fn register(builder: &mut PlaceholderBuilder<RequestContext>) -> Result<(), RegistrationError> {
    register_meta(builder)?;
    register_groups(builder)?;
    register_permissions(builder)?;
    register_tracks(builder)?;
    register_expiry(builder)?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Meta & context
// ═══════════════════════════════════════════════════════════════════════════

fn register_meta(builder: &mut PlaceholderBuilder<RequestContext>) -> Result<(), RegistrationError> {
    builder.add_fixed("prefix", |ctx| ctx.meta_data().prefix.unwrap_or_default())?;

    builder.add_fixed("suffix", |ctx| ctx.meta_data().suffix.unwrap_or_default())?;

    // Before `meta` so the longer name gets a chance to match
    builder.add_variable("meta_all", |ctx, key| ctx.meta_data().meta_values(key).join(", "))?;

    builder.add_variable("meta", |ctx, key| {
        ctx.meta_data()
            .meta_value(key)
            .map(str::to_string)
            .unwrap_or_default()
    })?;

    builder.add_variable("prefix_element", |ctx, element| {
        match stacked_meta_data(ctx, element) {
            Some(meta) => meta.prefix.unwrap_or_default(),
            None => INVALID_ELEMENT.to_string(),
        }
    })?;

    builder.add_variable("suffix_element", |ctx, element| {
        match stacked_meta_data(ctx, element) {
            Some(meta) => meta.suffix.unwrap_or_default(),
            None => INVALID_ELEMENT.to_string(),
        }
    })?;

    builder.add_fixed("context", |ctx| {
        ctx.engine()
            .contexts(&ctx.subject)
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ")
    })?;

    builder.add_variable("context", |ctx, key| {
        ctx.engine().contexts(&ctx.subject).values(key).join(", ")
    })?;

    Ok(())
}

/// Meta data computed with `element` as the sole prefix and suffix stack.
fn stacked_meta_data(ctx: &RequestContext, element: &str) -> Option<MetaData> {
    let Some(element) = ctx.engine().parse_stack_element(element) else {
        debug!(element, "Invalid meta stack element");
        return None;
    };

    let definition = MetaStackDefinition::single(element);
    let options = ctx
        .query_options
        .with_meta_stacks(definition.clone(), definition);
    Some(ctx.engine().meta_data(&ctx.user, &options))
}

// ═══════════════════════════════════════════════════════════════════════════
// Groups & weight
// ═══════════════════════════════════════════════════════════════════════════

fn register_groups(builder: &mut PlaceholderBuilder<RequestContext>) -> Result<(), RegistrationError> {
    builder.add_fixed("groups", |ctx| {
        direct_groups(ctx)
            .map(|group| ctx.group_display_name(group))
            .collect::<Vec<_>>()
            .join(", ")
    })?;

    builder.add_fixed("inherited_groups", |ctx| {
        inherited_groups(ctx)
            .iter()
            .map(|group| group.friendly_name())
            .collect::<Vec<_>>()
            .join(", ")
    })?;

    builder.add_fixed("primary_group_name", |ctx| {
        ctx.group_display_name(&ctx.user.primary_group)
    })?;

    builder.add_variable("in_group", |ctx, group| {
        direct_groups(ctx).any(|held| held.to_lowercase() == group)
    })?;

    builder.add_variable("inherits_group", |ctx, group| {
        inherited_groups(ctx)
            .iter()
            .any(|held| held.name.to_lowercase() == group)
    })?;

    builder.add_fixed("highest_group_by_weight", |ctx| {
        display(ctx, highest_by_weight(loaded_direct_groups(ctx)))
    })?;

    builder.add_fixed("lowest_group_by_weight", |ctx| {
        display(ctx, lowest_by_weight(loaded_direct_groups(ctx)))
    })?;

    builder.add_fixed("highest_inherited_group_by_weight", |ctx| {
        display(ctx, highest_by_weight(inherited_groups(ctx)))
    })?;

    builder.add_fixed("lowest_inherited_group_by_weight", |ctx| {
        display(ctx, lowest_by_weight(inherited_groups(ctx)))
    })?;

    Ok(())
}

/// Names of directly held groups whose membership applies under the
/// request's query options.
fn direct_groups(ctx: &RequestContext) -> impl Iterator<Item = &str> {
    ctx.user
        .inheritance_nodes()
        .filter(move |(node, _)| ctx.query_options.satisfies(&node.contexts))
        .map(|(_, group)| group)
}

/// Directly held groups the engine knows about.
fn loaded_direct_groups(ctx: &RequestContext) -> Vec<Arc<Group>> {
    direct_groups(ctx)
        .filter_map(|name| ctx.engine().group(name))
        .collect()
}

fn inherited_groups(ctx: &RequestContext) -> Vec<Arc<Group>> {
    ctx.engine().inherited_groups(&ctx.user, &ctx.query_options)
}

fn display(ctx: &RequestContext, group: Option<Arc<Group>>) -> String {
    group
        .map(|g| ctx.group_display_name(&g.name))
        .unwrap_or_default()
}

/// Lowest weight wins; equal weights fall back to the smaller name.
fn lowest_by_weight(groups: Vec<Arc<Group>>) -> Option<Arc<Group>> {
    groups.into_iter().min_by(|a, b| {
        a.weight_or_default()
            .cmp(&b.weight_or_default())
            .then_with(|| a.name.cmp(&b.name))
    })
}

/// Highest weight wins; equal weights fall back to the smaller name.
fn highest_by_weight(groups: Vec<Arc<Group>>) -> Option<Arc<Group>> {
    groups.into_iter().max_by(|a, b| {
        a.weight_or_default()
            .cmp(&b.weight_or_default())
            .then_with(|| b.name.cmp(&a.name))
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Permissions
// ═══════════════════════════════════════════════════════════════════════════

fn register_permissions(
    builder: &mut PlaceholderBuilder<RequestContext>,
) -> Result<(), RegistrationError> {
    builder.add_variable("has_permission", |ctx, permission| {
        ctx.user
            .nodes
            .iter()
            .filter(|node| ctx.query_options.satisfies(&node.contexts))
            .any(|node| node.key == permission)
    })?;

    builder.add_variable("inherits_permission", |ctx, permission| {
        resolved_nodes(ctx)
            .iter()
            .filter(|node| node.contexts.is_satisfied_by(ctx.query_options.context()))
            .any(|node| node.key == permission)
    })?;

    builder.add_variable("check_permission", |ctx, permission| {
        ctx.check_permission(permission).as_bool()
    })?;

    Ok(())
}

fn resolved_nodes(ctx: &RequestContext) -> Vec<Node> {
    ctx.engine()
        .resolve_inherited_nodes(&ctx.user, &ctx.query_options)
}

// ═══════════════════════════════════════════════════════════════════════════
// Tracks
// ═══════════════════════════════════════════════════════════════════════════

fn register_tracks(builder: &mut PlaceholderBuilder<RequestContext>) -> Result<(), RegistrationError> {
    builder.add_variable("on_track", |ctx, track| {
        ctx.engine()
            .track(track)
            .is_some_and(|t| t.contains_group(&ctx.user.primary_group))
    })?;

    builder.add_variable("has_groups_on_track", |ctx, track| {
        ctx.engine().track(track).is_some_and(|t| {
            ctx.user
                .inheritance_nodes()
                .any(|(_, group)| t.contains_group(group))
        })
    })?;

    builder.add_variable("current_group_on_track", |ctx, track| {
        let Some(track) = ctx.engine().track(track) else {
            return String::new();
        };
        held_group_on_track(ctx, &track)
            .map(|group| group.friendly_name().to_string())
            .unwrap_or_default()
    })?;

    builder.add_variable("next_group_on_track", |ctx, track| {
        neighbour_on_track(ctx, track, |t, group| t.next(group).map(str::to_string))
    })?;

    builder.add_variable("previous_group_on_track", |ctx, track| {
        neighbour_on_track(ctx, track, |t, group| t.previous(group).map(str::to_string))
    })?;

    builder.add_variable("first_group_on_tracks", |ctx, tracks| {
        first_inherited_on_tracks(ctx, tracks, false)
    })?;

    builder.add_variable("last_group_on_tracks", |ctx, tracks| {
        first_inherited_on_tracks(ctx, tracks, true)
    })?;

    Ok(())
}

/// The one group the user directly holds on `track`.
///
/// None when the user holds none, or more than one (ambiguous).
fn held_group_on_track(ctx: &RequestContext, track: &Track) -> Option<Arc<Group>> {
    let mut seen = HashSet::new();
    let held: Vec<Arc<Group>> = direct_groups(ctx)
        .filter(|group| track.contains_group(group))
        .filter(|group| seen.insert(group.to_lowercase()))
        .filter_map(|group| ctx.engine().group(group))
        .collect();

    match held.as_slice() {
        [only] => Some(Arc::clone(only)),
        _ => None,
    }
}

fn neighbour_on_track<F>(ctx: &RequestContext, track: &str, step: F) -> String
where
    F: Fn(&Track, &str) -> Option<String>,
{
    let Some(track) = ctx.engine().track(track) else {
        return String::new();
    };
    if track.groups.len() <= 1 {
        return String::new();
    }

    held_group_on_track(ctx, &track)
        .and_then(|group| step(track.as_ref(), group.name.as_str()))
        .map(|name| ctx.group_display_name(&name))
        .unwrap_or_default()
}

/// Scan comma-separated `tracks` in order and return the first inherited
/// group found, walking each track from the bottom (or from the top when
/// `from_top`).
fn first_inherited_on_tracks(ctx: &RequestContext, tracks: &str, from_top: bool) -> String {
    let held: HashSet<String> = inherited_groups(ctx)
        .iter()
        .map(|group| group.name.to_lowercase())
        .collect();

    tracks
        .split(',')
        .map(str::trim)
        .filter_map(|name| ctx.engine().track(name))
        .find_map(|track| {
            let is_held = |group: &&String| held.contains(&group.to_lowercase());
            if from_top {
                track.groups.iter().rev().find(is_held).cloned()
            } else {
                track.groups.iter().find(is_held).cloned()
            }
        })
        .map(|group| ctx.group_display_name(&group))
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════
// Expiry
// ═══════════════════════════════════════════════════════════════════════════

fn register_expiry(builder: &mut PlaceholderBuilder<RequestContext>) -> Result<(), RegistrationError> {
    builder.add_variable("expiry_time", |ctx, permission| {
        let nodes = ctx
            .user
            .nodes
            .iter()
            .filter(|node| node.key == permission)
            .filter(|node| ctx.query_options.satisfies(&node.contexts));
        first_expiry(ctx, nodes)
    })?;

    builder.add_variable("inherited_expiry_time", |ctx, permission| {
        let nodes = resolved_nodes(ctx);
        first_expiry(ctx, nodes.iter().filter(|node| node.key == permission))
    })?;

    builder.add_variable("group_expiry_time", |ctx, group| {
        let nodes = ctx
            .user
            .inheritance_nodes()
            .filter(|(_, held)| held.to_lowercase() == group)
            .map(|(node, _)| node)
            .filter(|node| ctx.query_options.satisfies(&node.contexts));
        first_expiry(ctx, nodes)
    })?;

    builder.add_variable("inherited_group_expiry_time", |ctx, group| {
        let nodes = resolved_nodes(ctx);
        first_expiry(
            ctx,
            nodes
                .iter()
                .filter(|node| node.group_name().is_some_and(|held| held.to_lowercase() == group)),
        )
    })?;

    Ok(())
}

/// Remaining time of the first node that expires in the future (or right
/// now). Permanent and already-expired nodes are skipped.
fn first_expiry<'a>(ctx: &RequestContext, nodes: impl Iterator<Item = &'a Node>) -> String {
    nodes
        .filter_map(|node| node.expiry_duration(ctx.now))
        .find(|remaining| *remaining >= TimeDelta::zero())
        .map(|remaining| ctx.format_duration(remaining))
        .unwrap_or_default()
}
