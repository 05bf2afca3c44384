//! Control plane for a declarative reverse-proxy gateway.
//!
//! Operators describe services, routes and plugins in a small data model;
//! this crate compiles that model into the proxy engine's JSON routing
//! document and pushes it to the engine's admin endpoint on a poll loop.

pub mod compiler;
pub mod model;
pub mod reload;
pub mod store;

pub use compiler::{compile, CompileError};
pub use model::Data;
pub use reload::{EngineClient, Loader, Reloader};
