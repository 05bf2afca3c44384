//! Listen-address grouping into engine server blocks.
//!
//! # Responsibilities
//! - Group listen addresses by their physical listen spec (TCP port or
//!   unix socket path), collecting the virtual hosts per group
//! - Decide host-based terminal matching vs. match-any-host fallthrough
//! - Wire automatic-HTTPS and access-log settings per server block
//!
//! # Design Decisions
//! - An empty host anywhere in a group means the whole group matches any
//!   host; otherwise the wrapping route is host-filtered and terminal so
//!   virtual hosts on one port cannot fall through into each other
//! - Groups are visited in sorted key order; `srv0`, `srv1`, … naming is
//!   therefore stable across compiles

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::compiler::addr::{NetAddr, Network};
use crate::compiler::error::CompileError;
use crate::model::schema::Server;

/// Logger name shared by the access-log wiring in `compiler::logging_config`.
pub const ACCESS_LOGGER: &str = "log0";

/// Builds the engine server blocks from the configured listen addresses,
/// attaching the shared compiled route list to each.
pub fn build_servers(server: &Server, routes: &[Value]) -> Result<Value, CompileError> {
    // listen spec -> virtual hosts bound to it
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for address in &server.listen {
        let na = NetAddr::parse(address)?;
        match na.network {
            Network::Tcp => {
                let (host, port) = na.host_port();
                groups
                    .entry(format!(":{port}"))
                    .or_default()
                    .push(host.to_string());
            }
            // Unix sockets have no host concept.
            Network::Unix => {
                groups.entry(na.address).or_default();
            }
        }
    }

    let mut servers = Map::new();
    for (i, (listen, hosts)) in groups.into_iter().enumerate() {
        let mut conf = Map::new();
        conf.insert(
            "automatic_https".to_string(),
            json!({ "disable": !server.enable_auto_https }),
        );
        conf.insert("listen".to_string(), json!([listen]));
        conf.insert("routes".to_string(), json!([wrapping_route(&hosts, routes)]));
        if !server.disable_access_log {
            conf.insert(
                "logs".to_string(),
                json!({ "default_logger_name": ACCESS_LOGGER }),
            );
        }

        servers.insert(format!("srv{i}"), Value::Object(conf));
    }

    Ok(Value::Object(servers))
}

/// Wraps the shared route list for one listen group, host-filtered unless
/// some member matches any host.
fn wrapping_route(hosts: &[String], routes: &[Value]) -> Value {
    let mut route = Map::new();
    route.insert(
        "handle".to_string(),
        json!([{ "handler": "subroute", "routes": routes }]),
    );

    let match_any_host = hosts.iter().any(|h| h.is_empty());
    if !match_any_host && !hosts.is_empty() {
        route.insert("match".to_string(), json!([{ "host": hosts }]));
        route.insert("terminal".to_string(), json!(true));
    }

    Value::Object(route)
}
