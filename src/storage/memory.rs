use std::collections::{BTreeMap, HashMap};
use chrono::Utc;
use tracing::{Level, event};
use crate::core::{Column, DataType, PureError, Related, Result, Value};
use crate::record::{RecordStore, RelationState};
use super::{EntitySchema, RelationKind, Row, StoreConfig, Table};

/// Operations a mutable record supports that a snapshot never does.
pub const PERSISTENCE_OPERATIONS: &[&str] = &[
    "save", "destroy", "reload", "update", "delete", "includes", "load_relation",
];

/// Handle of a live record in a [`MemoryStore`].
///
/// Handles are never reused: a released record leaves an empty slot behind,
/// so a stale handle can only ever fail to resolve, never alias a newer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(usize);

#[derive(Debug, Clone)]
struct Record {
    entity_type: String,
    fields: BTreeMap<String, Value>,
    new_record: bool,
    relations: HashMap<String, Related<RecordId>>,
}

/// Counters of the work a store has done against its tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Relations fetched from tables, explicitly or through `includes`.
    pub relation_loads: u64,
    /// Rows materialized into records.
    pub row_reads: u64,
    /// Rows inserted, updated or deleted.
    pub rows_written: u64,
}

/// In-memory persistence layer with lazily-loaded relations.
///
/// Rows live in per-type tables. Records are the mutable, in-memory view of
/// rows (or of rows yet to be inserted) and are addressed by [`RecordId`].
/// Loading a row that is already materialized returns the existing record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: StoreConfig,
    tables: HashMap<String, Table>,
    /// Append-only; `release` empties a slot but never frees it.
    records: Vec<Option<Record>>,
    identity: HashMap<(String, i64), RecordId>,
    stats: StoreStats,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            tables: HashMap::new(),
            records: Vec::new(),
            identity: HashMap::new(),
            stats: StoreStats::default(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Number of records currently held in memory.
    pub fn live_records(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }

    /// Define an entity type. The primary key column and, when enabled, the
    /// timestamp columns are added if the schema does not declare them.
    pub fn create_entity(&mut self, mut schema: EntitySchema) -> Result<()> {
        if self.tables.contains_key(schema.entity_type()) {
            return Err(PureError::InvalidMetadata(format!(
                "Entity type '{}' already exists",
                schema.entity_type()
            )));
        }

        let pk = self.config.primary_key.clone();
        if !schema.has_column(&pk) {
            schema.prepend_column(Column::new(pk.clone(), DataType::Integer));
        }
        if self.config.record_timestamps {
            for name in [&self.config.created_at_column, &self.config.updated_at_column] {
                if !schema.has_column(name) {
                    schema.push_column(Column::new(name.clone(), DataType::Timestamp));
                }
            }
        }

        event!(Level::DEBUG, entity_type = schema.entity_type(), "entity type created");
        self.tables
            .insert(schema.entity_type().to_string(), Table::new(schema, &pk));
        Ok(())
    }

    pub fn schema(&self, entity_type: &str) -> Result<&EntitySchema> {
        self.table(entity_type).map(Table::schema)
    }

    /// Build a new, unsaved record.
    pub fn new_record<I, K, V>(&mut self, entity_type: &str, fields: I) -> Result<RecordId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let record = self.construct_empty(entity_type)?;
        for (name, value) in fields {
            let name = name.into();
            if let Err(err) = self.set_field(record, &name, value.into()) {
                self.release(record);
                return Err(err);
            }
        }
        Ok(record)
    }

    /// Load the row with primary key `id`.
    pub fn find(&mut self, entity_type: &str, id: i64) -> Result<RecordId> {
        let row = self
            .table(entity_type)?
            .get(id)
            .cloned()
            .ok_or_else(|| PureError::RecordNotFound(format!("{} with id {}", entity_type, id)))?;
        Ok(self.materialize(entity_type, id, row))
    }

    /// Load every row of an entity type, in primary key order.
    pub fn all(&mut self, entity_type: &str) -> Result<Vec<RecordId>> {
        let rows: Vec<(i64, Row)> = self
            .table(entity_type)?
            .scan()
            .map(|(id, row)| (id, row.clone()))
            .collect();
        Ok(rows
            .into_iter()
            .map(|(id, row)| self.materialize(entity_type, id, row))
            .collect())
    }

    pub fn count(&self, entity_type: &str) -> Result<usize> {
        Ok(self.table(entity_type)?.row_count())
    }

    /// Eager-load one relation on a batch of records.
    pub fn includes(&mut self, records: &[RecordId], relation: &str) -> Result<()> {
        for record in records {
            if self.relation(*record, relation)?.is_none() {
                self.load_relation(*record, relation)?;
            }
        }
        Ok(())
    }

    /// Insert a new record or update the row of a persisted one.
    pub fn save(&mut self, record: RecordId) -> Result<()> {
        if self.config.validate_on_save {
            self.check_valid(record)?;
        }

        let now = Value::Timestamp(Utc::now());
        let pk = self.config.primary_key.clone();
        let timestamps = self.config.record_timestamps;
        let created_at = self.config.created_at_column.clone();
        let updated_at = self.config.updated_at_column.clone();

        let (entity_type, mut row, new_record) = {
            let rec = self.record(record)?;
            (rec.entity_type.clone(), rec.fields.clone(), rec.new_record)
        };
        let schema = self.schema(&entity_type)?.clone();
        if timestamps && schema.has_column(&updated_at) {
            row.insert(updated_at.clone(), now.clone());
        }

        if new_record {
            if timestamps && schema.has_column(&created_at) {
                row.insert(created_at, now);
            }
            let id = self.table_mut(&entity_type)?.insert(row.clone())?;
            row.insert(pk, Value::Integer(id));
            self.identity
                .entry((entity_type.clone(), id))
                .or_insert(record);
            event!(Level::DEBUG, entity_type = %entity_type, id, "record inserted");
        } else {
            let id = row.get(&pk).and_then(Value::as_i64).ok_or_else(|| {
                PureError::ConstraintViolation(format!(
                    "persisted {} record has no '{}' value",
                    entity_type, pk
                ))
            })?;
            if !self.table_mut(&entity_type)?.update(id, row.clone())? {
                return Err(PureError::RecordNotFound(format!(
                    "{} with id {}",
                    entity_type, id
                )));
            }
            event!(Level::DEBUG, entity_type = %entity_type, id, "record updated");
        }

        self.stats.rows_written += 1;
        let rec = self.record_mut(record)?;
        rec.fields = row;
        rec.new_record = false;
        Ok(())
    }

    /// Delete the row behind a persisted record; the record becomes new again.
    pub fn destroy(&mut self, record: RecordId) -> Result<bool> {
        let pk = self.config.primary_key.clone();
        let (entity_type, id) = {
            let rec = self.record(record)?;
            if rec.new_record {
                return Ok(false);
            }
            let id = rec.fields.get(&pk).and_then(Value::as_i64);
            (rec.entity_type.clone(), id)
        };
        let Some(id) = id else {
            return Ok(false);
        };

        let deleted = self.table_mut(&entity_type)?.delete(id);
        if deleted {
            self.stats.rows_written += 1;
            self.identity.remove(&(entity_type, id));
            self.record_mut(record)?.new_record = true;
        }
        Ok(deleted)
    }

    pub(crate) fn table(&self, entity_type: &str) -> Result<&Table> {
        self.tables.get(entity_type).ok_or_else(|| {
            PureError::InvalidEntityType(format!("'{}' is not defined in this store", entity_type))
        })
    }

    pub(crate) fn table_mut(&mut self, entity_type: &str) -> Result<&mut Table> {
        self.tables.get_mut(entity_type).ok_or_else(|| {
            PureError::InvalidEntityType(format!("'{}' is not defined in this store", entity_type))
        })
    }

    pub(crate) fn count_write(&mut self) {
        self.stats.rows_written += 1;
    }

    fn record(&self, record: RecordId) -> Result<&Record> {
        self.records
            .get(record.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| PureError::RecordNotFound(format!("{:?}", record)))
    }

    fn record_mut(&mut self, record: RecordId) -> Result<&mut Record> {
        self.records
            .get_mut(record.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| PureError::RecordNotFound(format!("{:?}", record)))
    }

    fn push_record(&mut self, record: Record) -> RecordId {
        self.records.push(Some(record));
        RecordId(self.records.len() - 1)
    }

    fn materialize(&mut self, entity_type: &str, id: i64, row: Row) -> RecordId {
        let key = (entity_type.to_string(), id);
        if let Some(existing) = self.identity.get(&key) {
            if self.record(*existing).is_ok() {
                return *existing;
            }
        }

        self.stats.row_reads += 1;
        let record = self.push_record(Record {
            entity_type: entity_type.to_string(),
            fields: row,
            new_record: false,
            relations: HashMap::new(),
        });
        self.identity.insert(key, record);
        record
    }

    fn check_valid(&self, record: RecordId) -> Result<()> {
        let rec = self.record(record)?;
        let schema = self.schema(&rec.entity_type)?;
        for column in schema.columns() {
            let value = rec.fields.get(&column.name).unwrap_or(&Value::Null);
            column.validate(value)?;
        }
        Ok(())
    }

    fn primary_key_of(&self, record: &Record) -> Option<i64> {
        if record.new_record {
            return None;
        }
        record
            .fields
            .get(&self.config.primary_key)
            .and_then(Value::as_i64)
    }
}

impl RecordStore for MemoryStore {
    type Handle = RecordId;

    fn is_entity_type(&self, entity_type: &str) -> bool {
        self.tables.contains_key(entity_type)
    }

    fn scalar_field_names(&self, entity_type: &str) -> Result<Vec<String>> {
        Ok(self
            .schema(entity_type)?
            .columns()
            .iter()
            .map(|col| col.name.clone())
            .collect())
    }

    fn relation_names(&self, entity_type: &str) -> Result<Vec<String>> {
        Ok(self
            .schema(entity_type)?
            .relations()
            .iter()
            .map(|rel| rel.name.clone())
            .collect())
    }

    fn persistence_operations(&self, _entity_type: &str) -> Vec<String> {
        PERSISTENCE_OPERATIONS.iter().map(|op| op.to_string()).collect()
    }

    fn entity_type(&self, record: RecordId) -> Option<&str> {
        self.records
            .get(record.0)
            .and_then(Option::as_ref)
            .map(|rec| rec.entity_type.as_str())
    }

    fn get_field(&self, record: RecordId, name: &str) -> Result<Value> {
        let rec = self.record(record)?;
        self.schema(&rec.entity_type)?.get_column(name)?;
        Ok(rec.fields.get(name).cloned().unwrap_or(Value::Null))
    }

    fn set_field(&mut self, record: RecordId, name: &str, value: Value) -> Result<()> {
        let entity_type = self.record(record)?.entity_type.clone();
        let column = self.schema(&entity_type)?.get_column(name)?;
        if !column.data_type.is_compatible(&value) {
            return Err(PureError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                name,
                column.data_type,
                value.type_name()
            )));
        }
        self.record_mut(record)?.fields.insert(name.to_string(), value);
        Ok(())
    }

    fn relation(&self, record: RecordId, name: &str) -> Result<RelationState<RecordId>> {
        let rec = self.record(record)?;
        self.schema(&rec.entity_type)?.get_relation(name)?;
        Ok(rec.relations.get(name).cloned())
    }

    fn mark_relation_loaded(
        &mut self,
        record: RecordId,
        name: &str,
        targets: Related<RecordId>,
    ) -> Result<()> {
        let entity_type = self.record(record)?.entity_type.clone();
        let def = self.schema(&entity_type)?.get_relation(name)?.clone();

        if def.kind.is_to_many() != matches!(targets, Related::Many(_)) {
            return Err(PureError::TypeMismatch(format!(
                "relation '{}' on '{}' is {}",
                name,
                entity_type,
                if def.kind.is_to_many() { "to-many" } else { "to-one" }
            )));
        }
        for target in targets.targets() {
            let target_type = self.record(*target)?.entity_type.as_str();
            if target_type != def.target {
                return Err(PureError::TypeMismatch(format!(
                    "relation '{}' on '{}' holds {} records, not {}",
                    name, entity_type, def.target, target_type
                )));
            }
        }

        self.record_mut(record)?
            .relations
            .insert(name.to_string(), targets);
        Ok(())
    }

    fn load_relation(&mut self, record: RecordId, name: &str) -> Result<()> {
        let rec = self.record(record)?;
        let entity_type = rec.entity_type.clone();
        let def = self.schema(&entity_type)?.get_relation(name)?.clone();
        let own_key = self.primary_key_of(rec);
        let foreign_value = rec.fields.get(&def.foreign_key).cloned().unwrap_or(Value::Null);

        self.stats.relation_loads += 1;
        event!(Level::DEBUG, entity_type = %entity_type, relation = name, "loading relation from table");

        let rows: Vec<(i64, Row)> = match def.kind {
            RelationKind::HasMany | RelationKind::HasOne => match own_key {
                Some(id) => {
                    let key = Value::Integer(id);
                    let table = self.table(&def.target)?;
                    let matches = table
                        .scan_where(&def.foreign_key, &key)
                        .map(|(id, row)| (id, row.clone()));
                    if def.kind == RelationKind::HasOne {
                        matches.take(1).collect()
                    } else {
                        matches.collect()
                    }
                }
                None => Vec::new(),
            },
            RelationKind::BelongsTo => match foreign_value.as_i64() {
                Some(id) => self
                    .table(&def.target)?
                    .get(id)
                    .map(|row| vec![(id, row.clone())])
                    .unwrap_or_default(),
                None => Vec::new(),
            },
        };

        let targets: Vec<RecordId> = rows
            .into_iter()
            .map(|(id, row)| self.materialize(&def.target, id, row))
            .collect();
        let loaded = if def.kind.is_to_many() {
            Related::Many(targets)
        } else {
            Related::One(targets.into_iter().next())
        };

        self.record_mut(record)?
            .relations
            .insert(name.to_string(), loaded);
        Ok(())
    }

    fn is_new_record(&self, record: RecordId) -> Result<bool> {
        Ok(self.record(record)?.new_record)
    }

    fn set_new_record(&mut self, record: RecordId, new_record: bool) -> Result<()> {
        self.record_mut(record)?.new_record = new_record;
        Ok(())
    }

    fn validate(&self, record: RecordId) -> Result<bool> {
        match self.check_valid(record) {
            Ok(()) => Ok(true),
            Err(PureError::ConstraintViolation(_)) | Err(PureError::TypeMismatch(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn construct_empty(&mut self, entity_type: &str) -> Result<RecordId> {
        let fields = self
            .schema(entity_type)?
            .columns()
            .iter()
            .map(|col| (col.name.clone(), Value::Null))
            .collect();
        Ok(self.push_record(Record {
            entity_type: entity_type.to_string(),
            fields,
            new_record: true,
            relations: HashMap::new(),
        }))
    }

    fn release(&mut self, record: RecordId) {
        let Some(slot) = self.records.get_mut(record.0) else {
            return;
        };
        if let Some(rec) = slot.take() {
            if let Some(id) = rec.fields.get(&self.config.primary_key).and_then(Value::as_i64) {
                let key = (rec.entity_type, id);
                if self.identity.get(&key) == Some(&record) {
                    self.identity.remove(&key);
                }
            }
        }
    }
}
