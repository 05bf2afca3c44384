//! Compile-time failures.
//!
//! Any inconsistency in the model aborts the whole compile; a partial
//! routing document is never produced, since serving a partially-routed
//! engine is worse than not reloading at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("service {service:?} of route {route:?} not found")]
    ServiceNotFound { service: String, route: String },

    #[error("upstream service {service:?} of plugin {plugin:?} not found")]
    UpstreamServiceNotFound { service: String, plugin: String },

    #[error("unsupported network address {address:?}")]
    UnsupportedNetwork { address: String },

    #[error("invalid network address {address:?}")]
    InvalidAddress { address: String },

    #[error("port range in {address:?} cannot be used as a dial address")]
    DialPortRange { address: String },

    #[error("failed to parse {field} of service {service:?}: {source}")]
    InvalidDuration {
        service: String,
        field: &'static str,
        #[source]
        source: humantime::DurationError,
    },

    #[error("circular order dependency is detected for plugin {plugin:?} (of type {plugin_type:?})")]
    CircularPluginOrder { plugin: String, plugin_type: String },

    #[error("plugin type {predecessor:?} (depended by plugin {plugin:?}) not found")]
    PluginPredecessorNotFound { predecessor: String, plugin: String },

    #[error("plugin {plugin:?} (of type {plugin_type:?}) is unordered")]
    PluginUnordered { plugin: String, plugin_type: String },

    #[error("invalid config of plugin {plugin:?}: {reason}")]
    InvalidPluginConfig { plugin: String, reason: String },
}
