// ============================================================================
// PureRecord Library
// ============================================================================

//! Immutable snapshots of lazily-loaded persistence records.
//!
//! A mutable record belongs to a [`RecordStore`]: its relations load on
//! demand and it knows whether its row exists yet. [`purify`] turns records
//! (and whatever relations are already loaded on them) into a
//! [`SnapshotGraph`] of immutable [`Snapshot`]s that can be shared across
//! threads and compared by value without ever touching storage.
//! [`unpurify`] goes the other way, producing fresh records whose relations
//! are marked loaded, ready to be validated or saved.
//!
//! # Examples
//!
//! ```
//! use pure_record::{
//!     Column, DataType, EntitySchema, MemoryStore, RecordStore, Registry, Value, purify_one,
//!     unpurify_one,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = MemoryStore::new();
//! store.create_entity(
//!     EntitySchema::new("Widget", "widgets")
//!         .column(Column::new("name", DataType::Text))
//!         .column(Column::new("count", DataType::Integer)),
//! )?;
//!
//! let mut registry = Registry::new();
//! registry.register_discovered(&store, "Widget")?;
//!
//! let widget = store.new_record("Widget", [("name", Value::from("Gear")), ("count", Value::from(3i64))])?;
//! let pure = purify_one(&registry, &store, widget)?;
//! let snapshot = pure.single()?;
//! assert_eq!(snapshot.text("name")?, Some("Gear"));
//! assert!(!snapshot.persisted());
//!
//! let root = *pure.roots.as_one().unwrap();
//! let copy = unpurify_one(&mut store, &pure.graph, root)?;
//! assert!(store.is_new_record(copy)?);
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod core;
pub mod record;
pub mod registry;
pub mod snapshot;
pub mod storage;

pub use convert::{
    Purified, PurifyOptions, RelationScope, purify, purify_all, purify_one, unpurify,
    unpurify_one, validate,
};
pub use crate::core::{Column, DataType, OneOrMany, PureError, Related, Result, Value};
pub use record::{RecordStore, RelationState};
pub use registry::{EntityMetadata, Registry};
pub use snapshot::{Member, Snapshot, SnapshotGraph, SnapshotId, SnapshotOptions};
pub use storage::{
    Action, ColumnValue, CreateAction, CreateOptions, DeleteAction, EntitySchema, MemoryStore,
    RecordId, RelationKind, StoreConfig, StoreStats, UpdateAction,
};
