use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{Level, event};
use crate::core::{PureError, Result};
use crate::record::RecordStore;
use super::EntityMetadata;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
        .unwrap_or_else(|err| panic!("identifier pattern does not compile: {}", err));
}

/// Caller-held map from mutable entity type to its pure metadata.
///
/// Cloning is cheap: registration copies the map and swaps the `Arc`, so a
/// registry handed to another thread keeps seeing the entries it was cloned with.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entities: Arc<HashMap<String, Arc<EntityMetadata>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type with an explicit set of scalar fields and relations.
    pub fn register<S: RecordStore>(
        &mut self,
        store: &S,
        entity_type: &str,
        scalar_fields: &[&str],
        relation_names: &[&str],
    ) -> Result<Arc<EntityMetadata>> {
        if !store.is_entity_type(entity_type) {
            return Err(PureError::InvalidEntityType(format!(
                "'{}' is not a persistence-bound entity type of this store",
                entity_type
            )));
        }

        if self.entities.contains_key(entity_type) {
            return Err(PureError::InvalidMetadata(format!(
                "Entity type '{}' is already registered",
                entity_type
            )));
        }

        let known_fields = store.scalar_field_names(entity_type)?;
        let known_relations = store.relation_names(entity_type)?;

        let mut fields: Vec<String> = Vec::with_capacity(scalar_fields.len());
        for name in scalar_fields {
            check_identifier(entity_type, name)?;
            check_known(entity_type, name, "field", &known_fields)?;
            if fields.iter().any(|f| f == name) {
                return Err(PureError::InvalidMetadata(format!(
                    "Field '{}' is declared twice on '{}'",
                    name, entity_type
                )));
            }
            fields.push(name.to_string());
        }

        let mut relations = BTreeSet::new();
        for name in relation_names {
            check_identifier(entity_type, name)?;
            check_known(entity_type, name, "relation", &known_relations)?;
            if fields.iter().any(|f| f == name) {
                return Err(PureError::InvalidMetadata(format!(
                    "'{}' on '{}' cannot be both a field and a relation",
                    name, entity_type
                )));
            }
            relations.insert(name.to_string());
        }

        let operations = store
            .persistence_operations(entity_type)
            .into_iter()
            .collect::<BTreeSet<_>>();

        let metadata = Arc::new(EntityMetadata::new(
            entity_type.to_string(),
            fields,
            relations,
            operations,
        ));

        let mut entities = (*self.entities).clone();
        entities.insert(entity_type.to_string(), Arc::clone(&metadata));
        self.entities = Arc::new(entities);

        event!(
            Level::DEBUG,
            entity_type,
            fields = metadata.scalar_fields().len(),
            "registered pure metadata"
        );
        Ok(metadata)
    }

    /// Register an entity type using the fields and relations the store reports.
    pub fn register_discovered<S: RecordStore>(
        &mut self,
        store: &S,
        entity_type: &str,
    ) -> Result<Arc<EntityMetadata>> {
        if !store.is_entity_type(entity_type) {
            return Err(PureError::InvalidEntityType(format!(
                "'{}' is not a persistence-bound entity type of this store",
                entity_type
            )));
        }
        let fields = store.scalar_field_names(entity_type)?;
        let relations = store.relation_names(entity_type)?;
        let fields = fields.iter().map(String::as_str).collect::<Vec<_>>();
        let relations = relations.iter().map(String::as_str).collect::<Vec<_>>();
        self.register(store, entity_type, &fields, &relations)
    }

    pub fn lookup(&self, entity_type: &str) -> Result<Arc<EntityMetadata>> {
        self.entities
            .get(entity_type)
            .cloned()
            .ok_or_else(|| PureError::NoMetadataRegistered(entity_type.to_string()))
    }

    pub fn is_registered(&self, entity_type: &str) -> bool {
        self.entities.contains_key(entity_type)
    }

    pub fn list_entity_types(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }
}

fn check_identifier(entity_type: &str, name: &str) -> Result<()> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(PureError::InvalidMetadata(format!(
            "'{}' is not a valid attribute or relation name on '{}'",
            name, entity_type
        )))
    }
}

fn check_known(entity_type: &str, name: &str, kind: &str, known: &[String]) -> Result<()> {
    if known.iter().any(|k| k == name) {
        Ok(())
    } else {
        Err(PureError::InvalidMetadata(format!(
            "'{}' is not a {} of '{}' in this store",
            name, kind, entity_type
        )))
    }
}
