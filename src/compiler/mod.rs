//! Configuration compiler.
//!
//! # Data Flow
//! ```text
//! Data (declarative model)
//!     → route compilation (priority order, sub-routes, plugins)
//!     → listener grouping (server blocks)
//!     → document assembly (apps/logging/admin)
//!     → serde_json::Value (engine JSON document)
//! ```
//!
//! # Design Decisions
//! - Pure function: the compiler never mutates or retains its input, so it
//!   is safe to call repeatedly and from multiple threads
//! - First error aborts the whole compile; a partial document is never
//!   produced or pushed
//! - serde_json's sorted object keys plus BTreeMap model maps make the
//!   output byte-identical across compiles of the same model

pub mod addr;
pub mod canary;
pub mod error;
pub mod matcher;
pub mod plugins;
pub mod proxy;
pub mod route;
pub mod servers;

use serde_json::{json, Map, Value};

pub use error::CompileError;

use crate::model::schema::{Route, Server};
use crate::model::Data;

use self::matcher::build_route_matches;
use self::route::build_sub_routes;
use self::servers::{build_servers, ACCESS_LOGGER};

/// Compiles the declarative model into the engine's JSON routing document.
pub fn compile(data: &Data) -> Result<Value, CompileError> {
    let routes = build_routes(data)?;
    let servers = build_servers(&data.server, &routes)?;

    let mut doc = Map::new();
    doc.insert("admin".to_string(), admin_config(&data.server));
    doc.insert(
        "apps".to_string(),
        json!({
            "http": {
                "http_port": data.server.http_port,
                "https_port": data.server.https_port,
                "servers": servers,
            }
        }),
    );
    if let Some(logging) = logging_config(&data.server) {
        doc.insert("logging".to_string(), logging);
    }

    Ok(Value::Object(doc))
}

/// Builds the shared route list, from highest priority to lowest, with a
/// trailing 404 for anything unmatched.
fn build_routes(data: &Data) -> Result<Vec<Value>, CompileError> {
    let mut sorted: Vec<&Route> = data.routes.values().collect();
    // Stable: equal priorities keep map order, which is name order.
    sorted.sort_by_key(|r| std::cmp::Reverse(r.priority));

    let mut routes = Vec::new();
    for r in sorted {
        let mut route = Map::new();
        let matches = build_route_matches(&r.matcher);
        if !matches.is_empty() {
            route.insert("match".to_string(), json!(matches));
        }
        route.insert(
            "handle".to_string(),
            json!([{
                "handler": "subroute",
                "routes": build_sub_routes(r, &data.services, &data.plugins)?,
            }]),
        );
        routes.push(Value::Object(route));
    }

    // Respond 404 for all unmatched requests.
    routes.push(json!({
        "handle": [{ "handler": "static_response", "status_code": 404 }]
    }));

    Ok(routes)
}

fn admin_config(server: &Server) -> Value {
    if server.admin.disabled {
        json!({ "disabled": true })
    } else {
        json!({ "listen": server.admin.listen })
    }
}

/// Logging settings: access-log routing to stdout unless disabled, and a
/// DEBUG default level when the debug flag is set.
fn logging_config(server: &Server) -> Option<Value> {
    let access_log = format!("http.log.access.{ACCESS_LOGGER}");

    let mut default = Map::new();
    if server.debug {
        default.insert("level".to_string(), json!("DEBUG"));
    }

    if server.disable_access_log {
        if default.is_empty() {
            return None;
        }
        return Some(json!({ "logs": { "default": default } }));
    }

    default.insert("exclude".to_string(), json!([access_log]));
    Some(json!({
        "logs": {
            "default": default,
            ACCESS_LOGGER: {
                "include": [access_log],
                "writer": { "output": "stdout" },
            },
        }
    }))
}
