//! NodeWeave Core
//!
//! An in-memory node index for personal knowledge bases: one set of
//! documents, organised both as a tree (`children`) and as a web of typed
//! references (attrs, links, embeds).
//!
//! # Architecture
//!
//! - **Arena**: `NodeStore` owns every node; relations are stored as ids and
//!   resolved through the store on each access
//! - **Unique keys**: configured data fields are kept unique and indexed for
//!   O(1) lookup
//! - **Zombies**: placeholders for referenced documents that do not exist
//!   yet, promoted with `fill` and garbage-collected by the flush passes
//! - **Capabilities**: `TreeEngine` and `WebEngine` are traits composed into
//!   `TreeIndex`, `WebIndex` and `NodeIndex`
//! - **Safe mode**: with `thread.safe` set, every operation requires the
//!   lock handed out by `ConcurrencyGuard`
//!
//! # Modules
//!
//! - [`models`] - Node, relation and projection types
//! - [`db`] - NodeStore, ConcurrencyGuard and errors
//! - [`services`] - Tree and web engines and the composite indexes
//! - [`config`] - Index configuration
//! - [`diagnostics`] - Warning sinks
//! - [`ids`] - Node id generators

pub mod config;
pub mod db;
pub mod diagnostics;
pub mod ids;
pub mod models;
pub mod services;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{IdConfig, IndexConfig, ThreadConfig};
pub use db::{ConcurrencyGuard, IndexLock, NodeStore, NodeStoreBuilder, Result, StoreError};
pub use diagnostics::{CapturingSink, DiagnosticSink, TracingSink};
pub use ids::{AlphabetGenerator, IdGenerator, UuidGenerator};
pub use models::*;
pub use services::*;
