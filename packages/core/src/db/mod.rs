//! Storage Layer
//!
//! This module holds the node arena and everything that guards it:
//!
//! - `NodeStore` - id → node mapping, unique-key index and zombie lifecycle
//! - `ConcurrencyGuard` - async lock that gates access in safe mode
//! - `StoreError` - fatal errors shared by the whole crate
//!
//! # Architecture
//!
//! Nodes never reference each other directly. Children, attributes, links and
//! embeds are all id lists resolved through the store on each call, which
//! keeps cycles, zombies and dangling references representable without any
//! shared ownership.

mod error;
mod guard;
mod node_store;

pub use error::{Result, StoreError};
pub use guard::{ConcurrencyGuard, IndexLock};
pub use node_store::{NodeStore, NodeStoreBuilder};
