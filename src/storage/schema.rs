use crate::core::{Column, PureError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Target rows carry a foreign key pointing at this row.
    HasMany,
    /// Like `HasMany`, limited to the first matching row.
    HasOne,
    /// This row carries a foreign key pointing at the target row.
    BelongsTo,
}

impl RelationKind {
    pub fn is_to_many(&self) -> bool {
        matches!(self, Self::HasMany)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    pub name: String,
    pub target: String,
    pub kind: RelationKind,
    pub foreign_key: String,
}

/// Stored shape of one entity type: its table, columns and relations.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    entity_type: String,
    table_name: String,
    columns: Vec<Column>,
    relations: Vec<RelationDef>,
}

impl EntitySchema {
    pub fn new(entity_type: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            table_name: table_name.into(),
            columns: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn has_many(self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relation(name, target, RelationKind::HasMany, foreign_key)
    }

    pub fn has_one(self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relation(name, target, RelationKind::HasOne, foreign_key)
    }

    pub fn belongs_to(self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relation(name, target, RelationKind::BelongsTo, foreign_key)
    }

    fn relation(mut self, name: &str, target: &str, kind: RelationKind, foreign_key: &str) -> Self {
        self.relations.push(RelationDef {
            name: name.to_string(),
            target: target.to_string(),
            kind,
            foreign_key: foreign_key.to_string(),
        });
        self
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    pub fn get_column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|col| col.name == name)
            .ok_or_else(|| PureError::ColumnNotFound(name.to_string(), self.entity_type.clone()))
    }

    pub fn get_relation(&self, name: &str) -> Result<&RelationDef> {
        self.relations
            .iter()
            .find(|rel| rel.name == name)
            .ok_or_else(|| PureError::UnknownRelation {
                entity: self.entity_type.clone(),
                relation: name.to_string(),
            })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|col| col.name == name)
    }

    pub(crate) fn prepend_column(&mut self, column: Column) {
        self.columns.insert(0, column);
    }

    pub(crate) fn push_column(&mut self, column: Column) {
        self.columns.push(column);
    }
}
