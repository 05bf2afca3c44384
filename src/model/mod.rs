//! Declarative gateway data model.
//!
//! # Data Flow
//! ```text
//! model file (YAML/JSON)
//!     → store::file (parse & deserialize)
//!     → Data::apply_defaults (load-time defaulting, name back-fill)
//!     → Data (validated, immutable)
//!     → compiler::compile (pure function → engine JSON document)
//! ```
//!
//! # Design Decisions
//! - The model is immutable once loaded; the compiler never mutates it
//! - Defaults are applied exactly once at load time, never during compile
//! - Name maps are BTreeMaps so every downstream traversal is deterministic

pub mod schema;

pub use schema::Data;
pub use schema::Plugin;
pub use schema::Route;
pub use schema::Server;
pub use schema::Service;

/// Reserved plugin type handled by the built-in canary expansion. All other
/// plugin types are forwarded opaquely to the engine.
pub const PLUGIN_TYPE_CANARY: &str = "canary";
