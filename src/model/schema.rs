//! Model schema definitions.
//!
//! All types derive Serde traits for deserialization from model files. The
//! admin API and the on-disk store hand the compiler a fully-populated
//! `Data` value; string fields left empty mean "unset".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Aggregate root handed to the compiler on every reload tick.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Data {
    /// Engine-wide server settings.
    pub server: Server,

    /// Upstream services, keyed by unique name.
    pub services: BTreeMap<String, Service>,

    /// Routes, keyed by unique name.
    pub routes: BTreeMap<String, Route>,

    /// Plugins, keyed by unique name.
    pub plugins: BTreeMap<String, Plugin>,
}

impl Data {
    /// Applies load-time defaults and copies the map keys into the `name`
    /// fields, which are usually omitted in model files.
    pub fn apply_defaults(&mut self) {
        self.server.apply_defaults();

        for (name, s) in &mut self.services {
            s.name.clone_from(name);
        }
        for (name, r) in &mut self.routes {
            r.name.clone_from(name);
        }
        for (name, p) in &mut self.plugins {
            p.name.clone_from(name);
        }
    }
}

/// Engine-wide server settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Server {
    /// Listen addresses (e.g. ":6060", "tcp/example.com:8080",
    /// "unix//var/run/gateway.sock").
    pub listen: Vec<String>,

    /// Port the engine serves plain HTTP on.
    pub http_port: u16,

    /// Port the engine serves HTTPS on.
    pub https_port: u16,

    /// Let the engine manage certificates and redirects itself.
    pub enable_auto_https: bool,

    /// Raise the engine's default log level to DEBUG.
    pub debug: bool,

    /// Skip access-log wiring entirely.
    pub disable_access_log: bool,

    /// Engine admin endpoint settings.
    pub admin: AdminSpec,
}

impl Server {
    pub(crate) fn apply_defaults(&mut self) {
        if self.listen.is_empty() {
            self.listen = vec![":6060".to_string()];
        }
        if self.http_port == 0 {
            self.http_port = 80;
        }
        if self.https_port == 0 {
            self.https_port = 443;
        }
        if self.admin.listen.is_empty() {
            self.admin.listen = "localhost:2019".to_string();
        }
    }
}

/// Engine admin endpoint settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminSpec {
    /// Address the engine admin API listens on.
    pub listen: String,

    /// Disable the admin API entirely. The reload loop cannot push to a
    /// disabled endpoint, so this is only useful for one-shot exports.
    pub disabled: bool,
}

/// A named upstream HTTP target, either a single legacy `url` or a richer
/// multi-backend `upstream` pool.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Service {
    pub name: String,

    /// Single-backend dial address. Ignored when `upstream` is set.
    pub url: String,

    /// Dial timeout as a duration string (e.g. "2s").
    pub dial_timeout: String,

    /// Concurrent request cap for the single backend; unlimited when <= 0.
    pub max_requests: i64,

    /// Multi-backend pool with load balancing and health checks.
    pub upstream: Option<Upstream>,

    /// Request/response header rewrites applied by the proxy handler.
    pub headers: Option<Headers>,
}

/// Multi-backend upstream pool.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Upstream {
    pub backends: Vec<Backend>,

    /// Transport dial timeout as a duration string.
    pub dial_timeout: String,

    pub load_balancing: Option<LoadBalancing>,

    pub active_health: Option<ActiveHealth>,
}

/// One backend of an upstream pool.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Backend {
    /// Dial address (TCP host:port or unix socket path).
    pub dial: String,

    /// Concurrent request cap for this backend; unlimited when <= 0.
    pub max_requests: i64,
}

/// Load-balancing settings for an upstream pool.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadBalancing {
    /// Selection policy name understood by the engine (e.g. "round_robin").
    pub policy: String,

    /// How long to keep retrying other backends, as a duration string.
    pub try_duration: String,

    /// Delay between retries, as a duration string.
    pub try_interval: String,
}

/// Active health-check settings for an upstream pool.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ActiveHealth {
    /// URI probed on each backend.
    pub uri: String,

    /// Probe port; defaults to the backend's dial port when 0.
    pub port: u16,

    /// Probe interval as a duration string.
    pub interval: String,

    /// Probe timeout as a duration string.
    pub timeout: String,

    /// Status code expected from a healthy backend; any 2xx when 0.
    pub expect_status: u16,
}

/// Header set/add/delete operations, split by direction.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Headers {
    pub request: Option<HeaderOps>,
    pub response: Option<HeaderOps>,
}

/// Header operations for one direction.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderOps {
    pub set: BTreeMap<String, Vec<String>>,
    pub add: BTreeMap<String, Vec<String>>,
    pub delete: Vec<String>,
}

impl HeaderOps {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.add.is_empty() && self.delete.is_empty()
    }
}

/// A named matching rule plus either a proxy action or a static response.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Route {
    pub name: String,

    /// Owning service. Required unless `response` short-circuits proxying.
    pub service_name: String,

    #[serde(flatten)]
    pub matcher: Matcher,

    #[serde(flatten)]
    pub uri: Uri,

    /// Static response that short-circuits proxying entirely.
    pub response: Option<StaticResponse>,

    /// Routes are matched from highest priority to lowest.
    pub priority: i32,
}

/// Request criteria deciding whether a route applies.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Matcher {
    /// "http" or "https"; empty means either.
    pub protocol: String,

    pub methods: Vec<String>,

    pub hosts: Vec<String>,

    /// Literal paths, or regexp paths written as "~name: pattern"
    /// (the name is optional).
    pub paths: Vec<String>,

    pub headers: BTreeMap<String, Vec<String>>,
}

/// URI manipulations applied before proxying.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Uri {
    pub strip_prefix: String,

    pub strip_suffix: String,

    /// Rewrite template; a literal `$` stands for the inbound request path.
    pub target_path: String,

    /// Deprecated: use `target_path` with a trailing `$` instead.
    pub add_prefix: String,
}

impl Uri {
    pub fn is_empty(&self) -> bool {
        self.strip_prefix.is_empty()
            && self.strip_suffix.is_empty()
            && self.target_path.is_empty()
            && self.add_prefix.is_empty()
    }
}

/// Fixed response served instead of proxying.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
    pub close: bool,
}

/// A named, typed, optionally-scoped unit of extra routing behavior.
///
/// The built-in `canary` type is expanded by the compiler; every other type
/// is forwarded opaquely as a handler object carrying `config` verbatim.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Plugin {
    pub name: String,

    #[serde(rename = "type")]
    pub plugin_type: String,

    pub disabled: bool,

    /// Plugin *type* this plugin must be ordered after.
    pub order_after: String,

    /// Attachment scope: both set, one set, or neither (global).
    pub route_name: String,
    pub service_name: String,

    /// Opaque configuration bag, decoded per-type.
    pub config: serde_json::Map<String, serde_json::Value>,
}
