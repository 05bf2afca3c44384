//! Built-in canary plugin expansion.
//!
//! A canary plugin diverts a matched subset of traffic, identified by a key
//! extracted from the request, to an alternate upstream service. The key is
//! located by a `location.field` shorthand (path, query, header, cookie or
//! body), coerced if a type is given, and substituted for every `$` in the
//! whitelist template to form the branch's match expression. An advanced
//! raw `matcher` object can be supplied instead of the shorthand.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::compiler::error::CompileError;
use crate::compiler::proxy::{reverse_proxy_handler, reverse_proxy_route};
use crate::compiler::route::rewrite_handlers;
use crate::model::schema::{Plugin, Service, Uri};

/// Typed view of a canary plugin's opaque config bag.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CanaryConfig {
    /// Name of the service canary traffic is diverted to.
    pub upstream: String,

    /// Shorthand key locator, "location.field".
    pub key: String,

    /// Optional coercion applied to the key (e.g. "int").
    #[serde(rename = "type")]
    pub key_type: String,

    /// Whitelist expression template; `$` stands for the (coerced) key.
    pub whitelist: String,

    /// Advanced raw match object, mutually exclusive with key/type/whitelist.
    pub matcher: Option<Value>,

    /// URI transform scoped to the canary branch.
    pub uri: Uri,
}

impl CanaryConfig {
    /// Decodes the plugin's config bag into a typed config.
    pub fn decode(plugin: &Plugin) -> Result<Self, CompileError> {
        serde_json::from_value(Value::Object(plugin.config.clone())).map_err(|e| {
            CompileError::InvalidPluginConfig {
                plugin: plugin.name.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Whether the key lives in the request body. Such keys need a
    /// `request_body_var` handler emitted ahead of the canary branch, since
    /// the engine cannot evaluate body-derived expressions otherwise.
    pub fn key_in_body(&self) -> bool {
        self.matcher.is_none() && normalize_key(&self.key).starts_with("body.")
    }
}

/// Expands a canary plugin into its handler route.
pub fn expand_canary(
    plugin: &Plugin,
    config: &CanaryConfig,
    services: &BTreeMap<String, Service>,
) -> Result<Vec<Value>, CompileError> {
    let service = services.get(&config.upstream).ok_or_else(|| {
        CompileError::UpstreamServiceNotFound {
            service: config.upstream.clone(),
            plugin: plugin.name.clone(),
        }
    })?;

    let match_obj = match &config.matcher {
        Some(matcher) => {
            if !config.key.is_empty() || !config.key_type.is_empty() || !config.whitelist.is_empty()
            {
                return Err(CompileError::InvalidPluginConfig {
                    plugin: plugin.name.clone(),
                    reason: "matcher is mutually exclusive with key/type/whitelist".to_string(),
                });
            }
            matcher.clone()
        }
        None => {
            let key_expr = key_expression(plugin, &config.key, &config.key_type)?;
            if config.whitelist.is_empty() {
                return Err(CompileError::InvalidPluginConfig {
                    plugin: plugin.name.clone(),
                    reason: "empty whitelist".to_string(),
                });
            }
            json!({ "expression": config.whitelist.replace('$', &key_expr) })
        }
    };

    // Branch-scoped rewrites run before the conditioned proxy handler, so
    // they only affect requests the canary match diverted.
    let mut handlers = rewrite_handlers(&config.uri);
    if handlers.is_empty() {
        return Ok(vec![reverse_proxy_route(service, Some(match_obj))?]);
    }
    handlers.push(reverse_proxy_handler(service)?);

    Ok(vec![json!({ "match": [match_obj], "handle": handlers })])
}

/// Synthesizes the engine placeholder expression for a shorthand key.
fn key_expression(plugin: &Plugin, key: &str, key_type: &str) -> Result<String, CompileError> {
    let invalid = |reason: String| CompileError::InvalidPluginConfig {
        plugin: plugin.name.clone(),
        reason,
    };

    let key = normalize_key(key);
    let (location, field) = key
        .split_once('.')
        .ok_or_else(|| invalid(format!("key {key:?} is not of the form location.field")))?;

    let var = match location {
        "path" => format!("{{http.request.uri.path.{field}}}"),
        "query" => format!("{{http.request.uri.query.{field}}}"),
        "header" => format!("{{http.request.header.{field}}}"),
        "cookie" => format!("{{http.request.cookie.{field}}}"),
        "body" => format!("{{http.request.body.{field}}}"),
        _ => return Err(invalid(format!("unrecognized key location {location:?}"))),
    };

    if key_type.is_empty() {
        Ok(var)
    } else {
        Ok(format!("{key_type}({var})"))
    }
}

/// Strips the optional surrounding braces: "{query.tid}" == "query.tid".
fn normalize_key(key: &str) -> &str {
    key.strip_prefix('{')
        .and_then(|k| k.strip_suffix('}'))
        .unwrap_or(key)
}
