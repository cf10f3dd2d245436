//! # EavDB Core
//!
//! Entity-attribute-value query engine for EavDB.
//!
//! This crate provides:
//! - Typed attribute values and schema-less entities
//! - A predicate tree for filters, compiled into a backend narrowing
//!   condition plus an exact in-process matcher
//! - An entity store with CRUD and two-phase queries
//! - Units of work under a per-store exclusive lock
//!
//! ## Example
//!
//! ```rust
//! use eavdb_core::{Entity, EntityStore, Filter, FilterItem, IntegerOp};
//!
//! let store = EntityStore::open_in_memory().unwrap();
//! for n in [5, 15] {
//!     store.put(&mut Entity::new("sample").unwrap().with("n", n)).unwrap();
//! }
//!
//! // stored as text, compared as integers
//! let filter = Filter::new("sample", FilterItem::integer("n", IntegerOp::Gt, 10)).unwrap();
//! let hits = store.query(&filter).unwrap();
//! assert_eq!(hits.len(), 1);
//! assert_eq!(hits[0].get_integer("n").unwrap(), Some(15));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod entity;
mod error;
mod filter;
mod lock;
mod store;
mod transaction;
mod value;

pub use config::Config;
pub use entity::{Entity, EntityId};
pub use error::{CoreError, CoreResult};
pub use filter::{Filter, FilterItem, GroupOp, IntegerOp, TextOp};
pub use store::EntityStore;
pub use transaction::TransactionRunner;
pub use value::AttributeValue;

pub use eavdb_storage::{Condition, StorageBackend, StorageError, TypeTag};
