pub mod action;
pub mod config;
pub mod memory;
pub mod schema;
pub mod table;

pub use action::{Action, ColumnValue, CreateAction, CreateOptions, DeleteAction, UpdateAction};
pub use config::StoreConfig;
pub use memory::{MemoryStore, PERSISTENCE_OPERATIONS, RecordId, StoreStats};
pub use schema::{EntitySchema, RelationDef, RelationKind};
pub use table::{Row, Table};
