use std::sync::Arc;
use chrono::{DateTime, Utc};
use im::OrdMap;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};
use crate::core::{PureError, Related, Result, Value};
use crate::registry::EntityMetadata;
use super::SnapshotId;

/// Construction options for a snapshot built directly from field values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotOptions {
    /// Whether the row this snapshot describes already exists in storage.
    pub persisted: bool,
    /// Drop unknown attribute names instead of failing.
    pub ignore_extra_attrs: bool,
}

impl SnapshotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persisted(mut self, persisted: bool) -> Self {
        self.persisted = persisted;
        self
    }

    pub fn ignore_extra_attrs(mut self) -> Self {
        self.ignore_extra_attrs = true;
        self
    }
}

/// A field or a loaded relation, as returned by [`Snapshot::member`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Member<'a> {
    Field(&'a Value),
    Relation(&'a Related<SnapshotId>),
}

/// Immutable value capturing one record's scalar fields, its persisted flag,
/// and the relations that were loaded when it was taken.
///
/// Relations point at other snapshots of the same [`SnapshotGraph`](super::SnapshotGraph)
/// through [`SnapshotId`]s. A relation missing from the loaded set was never
/// loaded; it is not the same thing as an empty relation.
///
/// Equality is by value: relation targets compare by their position in the
/// graph, not by which graph issued them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    metadata: Arc<EntityMetadata>,
    fields: OrdMap<String, Value>,
    persisted: bool,
    relations: OrdMap<String, Related<SnapshotId>>,
}

impl Snapshot {
    /// Build a snapshot from literal field values.
    ///
    /// Every scalar field of `metadata` is present afterwards; the ones not
    /// given are `Value::Null`. Names outside the metadata fail with
    /// `UnknownAttribute` unless `options.ignore_extra_attrs` is set.
    pub fn new<I, K, V>(
        metadata: Arc<EntityMetadata>,
        field_values: I,
        relation_values: impl IntoIterator<Item = (String, Related<SnapshotId>)>,
        options: SnapshotOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut given: OrdMap<String, Value> = OrdMap::new();
        let mut extra = Vec::new();
        for (name, value) in field_values {
            let name = name.into();
            if metadata.has_field(&name) {
                given.insert(name, value.into());
            } else {
                extra.push(name);
            }
        }

        if !extra.is_empty() {
            if !options.ignore_extra_attrs {
                return Err(PureError::UnknownAttribute {
                    entity: metadata.entity_type().to_string(),
                    extra,
                    legal: metadata.scalar_fields().to_vec(),
                });
            }
            event!(
                Level::WARN,
                entity_type = metadata.entity_type(),
                dropped = ?extra,
                "ignoring extra attributes"
            );
        }

        let fields = metadata
            .scalar_fields()
            .iter()
            .map(|name| {
                let value = given.get(name).cloned().unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect();

        let mut relations = OrdMap::new();
        for (name, value) in relation_values {
            if !metadata.has_relation(&name) {
                return Err(PureError::UnknownRelation {
                    entity: metadata.entity_type().to_string(),
                    relation: name,
                });
            }
            relations.insert(name, value);
        }

        Ok(Self {
            metadata,
            fields,
            persisted: options.persisted,
            relations,
        })
    }

    /// Snapshot assembled by purify from already-checked field values.
    pub(crate) fn from_record(
        metadata: Arc<EntityMetadata>,
        fields: OrdMap<String, Value>,
        persisted: bool,
    ) -> Self {
        Self {
            metadata,
            fields,
            persisted,
            relations: OrdMap::new(),
        }
    }

    /// Add relations discovered while a purify call is still assembling this
    /// snapshot. Never used once the snapshot has been handed to a caller.
    pub(crate) fn merge_relations(
        &mut self,
        relations: impl IntoIterator<Item = (String, Related<SnapshotId>)>,
    ) {
        self.relations.extend(relations);
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    pub fn entity_type(&self) -> &str {
        self.metadata.entity_type()
    }

    /// True iff the source record already existed in backing storage.
    pub fn persisted(&self) -> bool {
        self.persisted
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.metadata
            .scalar_fields()
            .iter()
            .filter_map(|name| self.fields.get(name).map(|value| (name.as_str(), value)))
    }

    pub fn field(&self, name: &str) -> Result<&Value> {
        match self.fields.get(name) {
            Some(value) => Ok(value),
            None => Err(self.not_a_field(name)),
        }
    }

    pub fn text(&self, name: &str) -> Result<Option<&str>> {
        let value = self.field(name)?;
        typed(name, value, "TEXT", Value::as_str)
    }

    pub fn integer(&self, name: &str) -> Result<Option<i64>> {
        let value = self.field(name)?;
        typed(name, value, "INTEGER", Value::as_i64)
    }

    pub fn float(&self, name: &str) -> Result<Option<f64>> {
        let value = self.field(name)?;
        typed(name, value, "FLOAT", Value::as_f64)
    }

    pub fn boolean(&self, name: &str) -> Result<Option<bool>> {
        let value = self.field(name)?;
        typed(name, value, "BOOLEAN", Value::as_bool)
    }

    pub fn timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        let value = self.field(name)?;
        typed(name, value, "TIMESTAMP", Value::as_timestamp)
    }

    /// A copy of this snapshot with one field replaced.
    pub fn with_field(&self, name: &str, value: impl Into<Value>) -> Result<Self> {
        if !self.metadata.has_field(name) {
            return Err(self.not_a_field(name));
        }
        let mut next = self.clone();
        next.fields.insert(name.to_string(), value.into());
        Ok(next)
    }

    /// Loaded value of a relation.
    pub fn relation(&self, name: &str) -> Result<&Related<SnapshotId>> {
        if !self.metadata.has_relation(name) {
            if self.metadata.is_persistence_operation(name) {
                return Err(self.not_pure(name));
            }
            return Err(PureError::UnknownRelation {
                entity: self.entity_type().to_string(),
                relation: name.to_string(),
            });
        }
        self.relations
            .get(name)
            .ok_or_else(|| PureError::UnloadedAssociation {
                entity: self.entity_type().to_string(),
                relation: name.to_string(),
            })
    }

    pub fn is_loaded(&self, relation: &str) -> bool {
        self.relations.contains_key(relation)
    }

    pub fn loaded_relations(&self) -> impl Iterator<Item = (&str, &Related<SnapshotId>)> {
        self.relations.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Look up a field or relation by name.
    pub fn member(&self, name: &str) -> Result<Member<'_>> {
        if let Some(value) = self.fields.get(name) {
            return Ok(Member::Field(value));
        }
        if self.metadata.has_relation(name) {
            return self.relation(name).map(Member::Relation);
        }
        Err(self.not_a_field(name))
    }

    fn not_a_field(&self, name: &str) -> PureError {
        if self.metadata.is_persistence_operation(name) {
            return self.not_pure(name);
        }
        PureError::UnknownAttribute {
            entity: self.entity_type().to_string(),
            extra: vec![name.to_string()],
            legal: self.metadata.scalar_fields().to_vec(),
        }
    }

    fn not_pure(&self, name: &str) -> PureError {
        PureError::NotAPureMethod {
            entity: self.entity_type().to_string(),
            method: name.to_string(),
        }
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata
            && self.fields == other.fields
            && self.persisted == other.persisted
            && self.relations.len() == other.relations.len()
            && self
                .relations
                .iter()
                .zip(other.relations.iter())
                .all(|((name, left), (other_name, right))| {
                    name == other_name && same_positions(left, right)
                })
    }
}

fn same_positions(left: &Related<SnapshotId>, right: &Related<SnapshotId>) -> bool {
    match (left, right) {
        (Related::One(a), Related::One(b)) => a.map(|id| id.index()) == b.map(|id| id.index()),
        (Related::Many(a), Related::Many(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.index() == y.index())
        }
        _ => false,
    }
}

fn typed<'a, T>(
    name: &str,
    value: &'a Value,
    expected: &str,
    convert: impl FnOnce(&'a Value) -> Option<T>,
) -> Result<Option<T>> {
    if value.is_null() {
        return Ok(None);
    }
    match convert(value) {
        Some(converted) => Ok(Some(converted)),
        None => Err(PureError::TypeMismatch(format!(
            "Field '{}' holds {}, not {}",
            name,
            value.type_name(),
            expected
        ))),
    }
}
