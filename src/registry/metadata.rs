use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

/// Static description of one mutable entity type: which scalar attributes and
/// which relations a snapshot of it may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    entity_type: String,
    scalar_fields: Vec<String>,
    relation_names: BTreeSet<String>,
    persistence_operations: BTreeSet<String>,
}

impl EntityMetadata {
    /// Built only by `Registry`, after the field and relation sets have been
    /// checked for uniqueness and disjointness.
    pub(crate) fn new(
        entity_type: String,
        scalar_fields: Vec<String>,
        relation_names: BTreeSet<String>,
        persistence_operations: BTreeSet<String>,
    ) -> Self {
        Self {
            entity_type,
            scalar_fields,
            relation_names,
            persistence_operations,
        }
    }

    /// Name of the mutable type; used to construct fresh records on unpurify.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn scalar_fields(&self) -> &[String] {
        &self.scalar_fields
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relation_names.iter().map(String::as_str)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.scalar_fields.iter().any(|field| field == name)
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relation_names.contains(name)
    }

    pub fn is_persistence_operation(&self, name: &str) -> bool {
        self.persistence_operations.contains(name)
    }
}
