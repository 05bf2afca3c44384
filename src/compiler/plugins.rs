//! Plugin applicability and ordering.
//!
//! # Responsibilities
//! - Partition enabled plugins into scope buckets (route+service, route,
//!   service, global) and select one plugin per *type* by precedence
//! - Produce a dependency-respecting order over the selected plugins from
//!   their `order_after` declarations
//!
//! # Design Decisions
//! - Precedence follows the Kong admin-API convention: route+service,
//!   then route, then service, then global
//! - All iteration is in lexicographic order (BTreeMap), so the selected
//!   set, the output order, and the plugin blamed in an error are stable

use std::collections::BTreeMap;

use crate::compiler::error::CompileError;
use crate::model::schema::{Plugin, Route};

/// Returns the plugins that apply to the given route, in application order.
pub fn applicable_plugins<'a>(
    plugins: &'a BTreeMap<String, Plugin>,
    route: &Route,
) -> Result<Vec<&'a Plugin>, CompileError> {
    let mut route_service: Vec<&Plugin> = Vec::new();
    let mut route_only: Vec<&Plugin> = Vec::new();
    let mut service_only: Vec<&Plugin> = Vec::new();
    let mut global: Vec<&Plugin> = Vec::new();

    for p in plugins.values() {
        if p.disabled {
            continue;
        }

        match (!p.route_name.is_empty(), !p.service_name.is_empty()) {
            (true, true) if p.route_name == route.name => route_service.push(p),
            (true, false) if p.route_name == route.name => route_only.push(p),
            (false, true) if p.service_name == route.service_name => service_only.push(p),
            (false, false) => global.push(p),
            _ => {}
        }
    }

    // For each plugin type, the most specific scope wins; plugins of the
    // same type in less specific scopes are discarded.
    let mut selected: BTreeMap<&str, &Plugin> = BTreeMap::new();
    for bucket in [route_service, route_only, service_only, global] {
        for p in bucket {
            selected.entry(&p.plugin_type).or_insert(p);
        }
    }

    sort_plugins_by_order_after(&selected)
}

/// Orders the selected plugins so that every plugin follows the plugin of
/// its `order_after` type.
///
/// Each chain is walked from the dependent plugin up to its root and
/// appended root-first. A plugin revisited within one walk is a circular
/// dependency; a rootless plugin never reached by any chain is unordered.
fn sort_plugins_by_order_after<'a>(
    selected: &BTreeMap<&str, &'a Plugin>,
) -> Result<Vec<&'a Plugin>, CompileError> {
    if selected.len() <= 1 {
        return Ok(selected.values().copied().collect());
    }

    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        InProgress,
        Done,
    }

    let mut states: BTreeMap<&str, State> = selected
        .keys()
        .map(|ty| (*ty, State::Unvisited))
        .collect();
    let mut ordered: Vec<&Plugin> = Vec::new();

    for p in selected.values() {
        if p.order_after.is_empty() {
            continue;
        }

        let mut chain: Vec<&Plugin> = Vec::new();
        let mut cur = *p;
        loop {
            match states[cur.plugin_type.as_str()] {
                State::Done => break,
                State::InProgress => {
                    return Err(CompileError::CircularPluginOrder {
                        plugin: cur.name.clone(),
                        plugin_type: cur.plugin_type.clone(),
                    });
                }
                State::Unvisited => {}
            }
            states.insert(&cur.plugin_type, State::InProgress);
            chain.push(cur);

            if cur.order_after.is_empty() {
                break;
            }
            cur = selected.get(cur.order_after.as_str()).copied().ok_or_else(|| {
                CompileError::PluginPredecessorNotFound {
                    predecessor: cur.order_after.clone(),
                    plugin: cur.name.clone(),
                }
            })?;
        }

        for c in chain.into_iter().rev() {
            states.insert(&c.plugin_type, State::Done);
            ordered.push(c);
        }
    }

    // A rootless plugin must have been reached as the terminus of some
    // chain; otherwise its position is undefined.
    for p in selected.values() {
        if states[p.plugin_type.as_str()] != State::Done {
            return Err(CompileError::PluginUnordered {
                plugin: p.name.clone(),
                plugin_type: p.plugin_type.clone(),
            });
        }
    }

    Ok(ordered)
}
