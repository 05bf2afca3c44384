//! Reverse-proxy handler construction.
//!
//! # Responsibilities
//! - Build one upstream entry per backend (or the single legacy `url`)
//! - Validate every dial address (TCP-or-unix, no port ranges)
//! - Parse duration strings and emit them as integer nanoseconds
//! - Attach header operations, load balancing and active health checks
//!
//! # Design Decisions
//! - `max_requests` is omitted when <= 0; the engine treats absence as
//!   unlimited
//! - A malformed duration names the offending service, since the model
//!   file is edited per-service

use serde_json::{json, Map, Value};

use crate::compiler::addr::NetAddr;
use crate::compiler::error::CompileError;
use crate::model::schema::{ActiveHealth, HeaderOps, Headers, LoadBalancing, Service};

/// Wraps the service's proxy handler into a handler route, optionally
/// conditioned on a match object.
pub fn reverse_proxy_route(
    service: &Service,
    match_obj: Option<Value>,
) -> Result<Value, CompileError> {
    let handler = reverse_proxy_handler(service)?;
    Ok(match match_obj {
        Some(m) => json!({ "match": [m], "handle": [handler] }),
        None => json!({ "handle": [handler] }),
    })
}

/// Builds the `reverse_proxy` handler object for a service.
pub fn reverse_proxy_handler(service: &Service) -> Result<Value, CompileError> {
    let mut upstreams = Vec::new();
    let dial_timeout;

    match &service.upstream {
        Some(pool) => {
            for backend in &pool.backends {
                upstreams.push(upstream_entry(&backend.dial, backend.max_requests)?);
            }
            dial_timeout = duration_nanos(&service.name, "dial_timeout", &pool.dial_timeout)?;
        }
        None => {
            upstreams.push(upstream_entry(&service.url, service.max_requests)?);
            dial_timeout = duration_nanos(&service.name, "dial_timeout", &service.dial_timeout)?;
        }
    }

    let mut handler = Map::new();
    handler.insert("handler".to_string(), json!("reverse_proxy"));
    handler.insert("upstreams".to_string(), json!(upstreams));
    handler.insert(
        "transport".to_string(),
        json!({ "protocol": "http", "dial_timeout": dial_timeout }),
    );

    if let Some(pool) = &service.upstream {
        if let Some(lb) = &pool.load_balancing {
            handler.insert(
                "load_balancing".to_string(),
                load_balancing_config(&service.name, lb)?,
            );
        }
        if let Some(health) = &pool.active_health {
            handler.insert(
                "health_checks".to_string(),
                json!({ "active": active_health_config(&service.name, health)? }),
            );
        }
    }

    if let Some(headers) = &service.headers {
        if let Some(ops) = headers_config(headers) {
            handler.insert("headers".to_string(), ops);
        }
    }

    Ok(Value::Object(handler))
}

fn upstream_entry(dial: &str, max_requests: i64) -> Result<Value, CompileError> {
    let addr = NetAddr::parse_dial(dial)?;

    let mut entry = Map::new();
    entry.insert("dial".to_string(), json!(addr.address));
    if max_requests > 0 {
        entry.insert("max_requests".to_string(), json!(max_requests));
    }
    Ok(Value::Object(entry))
}

fn load_balancing_config(service: &str, lb: &LoadBalancing) -> Result<Value, CompileError> {
    let mut config = Map::new();
    if !lb.policy.is_empty() {
        config.insert(
            "selection_policy".to_string(),
            json!({ "policy": lb.policy }),
        );
    }
    if !lb.try_duration.is_empty() {
        config.insert(
            "try_duration".to_string(),
            json!(duration_nanos(service, "try_duration", &lb.try_duration)?),
        );
    }
    if !lb.try_interval.is_empty() {
        config.insert(
            "try_interval".to_string(),
            json!(duration_nanos(service, "try_interval", &lb.try_interval)?),
        );
    }
    Ok(Value::Object(config))
}

fn active_health_config(service: &str, health: &ActiveHealth) -> Result<Value, CompileError> {
    let mut config = Map::new();
    if !health.uri.is_empty() {
        config.insert("uri".to_string(), json!(health.uri));
    }
    if health.port > 0 {
        config.insert("port".to_string(), json!(health.port));
    }
    if !health.interval.is_empty() {
        config.insert(
            "interval".to_string(),
            json!(duration_nanos(service, "interval", &health.interval)?),
        );
    }
    if !health.timeout.is_empty() {
        config.insert(
            "timeout".to_string(),
            json!(duration_nanos(service, "timeout", &health.timeout)?),
        );
    }
    if health.expect_status > 0 {
        config.insert("expect_status".to_string(), json!(health.expect_status));
    }
    Ok(Value::Object(config))
}

fn headers_config(headers: &Headers) -> Option<Value> {
    let mut config = Map::new();
    if let Some(ops) = headers.request.as_ref().filter(|ops| !ops.is_empty()) {
        config.insert("request".to_string(), header_ops_config(ops));
    }
    if let Some(ops) = headers.response.as_ref().filter(|ops| !ops.is_empty()) {
        config.insert("response".to_string(), header_ops_config(ops));
    }
    if config.is_empty() {
        None
    } else {
        Some(Value::Object(config))
    }
}

fn header_ops_config(ops: &HeaderOps) -> Value {
    let mut config = Map::new();
    if !ops.set.is_empty() {
        config.insert("set".to_string(), json!(ops.set));
    }
    if !ops.add.is_empty() {
        config.insert("add".to_string(), json!(ops.add));
    }
    if !ops.delete.is_empty() {
        config.insert("delete".to_string(), json!(ops.delete));
    }
    Value::Object(config)
}

/// Parses a duration string into nanoseconds; an empty string is zero.
fn duration_nanos(service: &str, field: &'static str, value: &str) -> Result<u64, CompileError> {
    if value.is_empty() {
        return Ok(0);
    }
    let duration = humantime::parse_duration(value).map_err(|source| {
        CompileError::InvalidDuration {
            service: service.to_string(),
            field,
            source,
        }
    })?;
    Ok(duration.as_nanos() as u64)
}
