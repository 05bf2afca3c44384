//! Per-route sub-route compilation.
//!
//! # Responsibilities
//! - Short-circuit to a `static_response` handler when the route carries one
//! - Emit URI-rewrite handlers, plugin-contributed handlers, and the
//!   terminal reverse-proxy handler, in that order
//!
//! # Design Decisions
//! - Canary branches are emitted before the terminal proxy so diverted
//!   requests never reach the primary service
//! - Third-party plugin types pass their config through verbatim; the
//!   engine owns their semantics

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::compiler::canary::{expand_canary, CanaryConfig};
use crate::compiler::error::CompileError;
use crate::compiler::plugins::applicable_plugins;
use crate::compiler::proxy::reverse_proxy_route;
use crate::model::schema::{Plugin, Route, Service, StaticResponse, Uri};
use crate::model::PLUGIN_TYPE_CANARY;

/// Builds the ordered sub-route list for one route.
pub fn build_sub_routes(
    route: &Route,
    services: &BTreeMap<String, Service>,
    plugins: &BTreeMap<String, Plugin>,
) -> Result<Vec<Value>, CompileError> {
    // A static response short-circuits proxying; no other route attributes
    // are consulted.
    if let Some(response) = &route.response {
        return Ok(vec![static_response_route(response)]);
    }

    let service = services.get(&route.service_name).ok_or_else(|| {
        CompileError::ServiceNotFound {
            service: route.service_name.clone(),
            route: route.name.clone(),
        }
    })?;

    let mut routes: Vec<Value> = rewrite_handlers(&route.uri)
        .into_iter()
        .map(|h| json!({ "handle": [h] }))
        .collect();

    for plugin in applicable_plugins(plugins, route)? {
        if plugin.plugin_type == PLUGIN_TYPE_CANARY {
            let config = CanaryConfig::decode(plugin)?;
            if config.key_in_body() {
                routes.push(json!({ "handle": [{ "handler": "request_body_var" }] }));
            }
            routes.extend(expand_canary(plugin, &config, services)?);
        } else {
            routes.push(passthrough_route(plugin));
        }
    }

    // Terminal proxy to the route's own service; unconditioned, so it
    // always matches once control reaches it.
    routes.push(reverse_proxy_route(service, None)?);
    Ok(routes)
}

/// Builds the URI-manipulation handler objects for a route or a canary
/// branch: strip prefix/suffix first, then the target-path rewrite.
pub fn rewrite_handlers(uri: &Uri) -> Vec<Value> {
    let mut handlers = Vec::new();

    if !uri.strip_prefix.is_empty() || !uri.strip_suffix.is_empty() {
        let mut h = Map::new();
        h.insert("handler".to_string(), json!("rewrite"));
        if !uri.strip_prefix.is_empty() {
            h.insert("strip_path_prefix".to_string(), json!(uri.strip_prefix));
        }
        if !uri.strip_suffix.is_empty() {
            h.insert("strip_path_suffix".to_string(), json!(uri.strip_suffix));
        }
        handlers.push(Value::Object(h));
    }

    let target = if !uri.target_path.is_empty() {
        uri.target_path.clone()
    } else if !uri.add_prefix.is_empty() {
        // Deprecated spelling of "prepend to the original path".
        format!("{}$", uri.add_prefix)
    } else {
        String::new()
    };
    if !target.is_empty() {
        let rewritten = target.replacen('$', "{http.request.uri.path}", 1);
        handlers.push(json!({ "handler": "rewrite", "uri": rewritten }));
    }

    handlers
}

fn static_response_route(response: &StaticResponse) -> Value {
    let mut h = Map::new();
    h.insert("handler".to_string(), json!("static_response"));
    if response.status_code > 0 {
        h.insert("status_code".to_string(), json!(response.status_code));
    }
    if !response.headers.is_empty() {
        h.insert("headers".to_string(), json!(response.headers));
    }
    if !response.body.is_empty() {
        h.insert("body".to_string(), json!(response.body));
    }
    if response.close {
        h.insert("close".to_string(), json!(true));
    }
    json!({ "handle": [Value::Object(h)] })
}

/// Forwards a third-party plugin as a handler object named after its type,
/// carrying the config map verbatim as additional fields.
fn passthrough_route(plugin: &Plugin) -> Value {
    let mut h = plugin.config.clone();
    h.insert("handler".to_string(), json!(plugin.plugin_type));
    json!({ "handle": [Value::Object(h)] })
}
