use std::fmt::Debug;
use std::hash::Hash;
use crate::core::{Related, Result, Value};

/// Loaded state of a relation on a mutable record. `None` means the relation
/// has never been loaded; reading it would require a trip to storage.
pub type RelationState<H> = Option<Related<H>>;

/// Contract of the persistence layer that owns mutable, lazily-loaded records.
///
/// Records are addressed through `Handle`, which must stay stable for as long
/// as the record lives in the store: two handles compare equal iff they name
/// the same underlying record. Conversions key their identity caches on it.
pub trait RecordStore {
    type Handle: Copy + Eq + Hash + Debug;

    /// Whether `entity_type` names a persistence-bound record type.
    fn is_entity_type(&self, entity_type: &str) -> bool;

    /// Schema discovery: scalar attribute names, in declaration order.
    fn scalar_field_names(&self, entity_type: &str) -> Result<Vec<String>>;

    /// Schema discovery: relation names.
    fn relation_names(&self, entity_type: &str) -> Result<Vec<String>>;

    /// Operations that only make sense on the mutable record (save, destroy...).
    fn persistence_operations(&self, _entity_type: &str) -> Vec<String> {
        Vec::new()
    }

    /// Entity type of a live record, or `None` when the handle is not a record
    /// of this store.
    fn entity_type(&self, record: Self::Handle) -> Option<&str>;

    fn get_field(&self, record: Self::Handle, name: &str) -> Result<Value>;

    fn set_field(&mut self, record: Self::Handle, name: &str, value: Value) -> Result<()>;

    /// Read what is already in memory for a relation. Must never load.
    fn relation(&self, record: Self::Handle, name: &str) -> Result<RelationState<Self::Handle>>;

    fn mark_relation_loaded(
        &mut self,
        record: Self::Handle,
        name: &str,
        targets: Related<Self::Handle>,
    ) -> Result<()>;

    /// Fetch a relation from backing storage. Conversions never call this;
    /// only explicit eager loading does.
    fn load_relation(&mut self, record: Self::Handle, name: &str) -> Result<()>;

    fn is_new_record(&self, record: Self::Handle) -> Result<bool>;

    fn set_new_record(&mut self, record: Self::Handle, new_record: bool) -> Result<()>;

    fn validate(&self, record: Self::Handle) -> Result<bool>;

    fn construct_empty(&mut self, entity_type: &str) -> Result<Self::Handle>;

    /// Drop a record the caller no longer needs. Stores that do not track
    /// record lifetimes may ignore this.
    fn release(&mut self, _record: Self::Handle) {}
}
