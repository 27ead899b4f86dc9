use chrono::{DateTime, Utc};
use tracing::{Level, event};
use crate::core::{DataType, PureError, Result, Value};
use crate::snapshot::Snapshot;
use super::{EntitySchema, MemoryStore, Row, StoreConfig};

/// One column of an insert or update, with the value it will be written with.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub column_name: String,
    pub value: Value,
    pub sql_type: DataType,
}

impl ColumnValue {
    pub fn sql_literal(&self) -> String {
        self.value.to_sql_literal()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Columns to insert even though they are left out by default (the primary key).
    pub include_columns: Vec<String>,
    pub exclude_columns: Vec<String>,
    pub skip_timestamps: bool,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_column(mut self, column: &str) -> Self {
        self.include_columns.push(column.to_string());
        self
    }

    pub fn exclude_column(mut self, column: &str) -> Self {
        self.exclude_columns.push(column.to_string());
        self
    }

    pub fn skip_timestamps(mut self) -> Self {
        self.skip_timestamps = true;
        self
    }
}

/// Insert of a snapshot's row.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAction {
    pub table_name: String,
    pub columns_to_insert: Vec<String>,
    snapshot: Snapshot,
    schema: EntitySchema,
    timestamp_columns: Vec<String>,
}

impl CreateAction {
    pub fn new(store: &MemoryStore, snapshot: &Snapshot, options: &CreateOptions) -> Result<Self> {
        let schema = store.schema(snapshot.entity_type())?.clone();
        let config = store.config();

        // The snapshot's own fields, then whichever timestamp columns the
        // table carries.
        let mut columns: Vec<String> = snapshot
            .metadata()
            .scalar_fields()
            .iter()
            .filter(|name| **name != config.primary_key)
            .cloned()
            .collect();
        for name in timestamp_columns(config) {
            if schema.has_column(&name) && !columns.contains(&name) {
                columns.push(name);
            }
        }

        for name in &options.include_columns {
            schema.get_column(name)?;
            if !config.is_timestamp_column(name) {
                snapshot.field(name)?;
            }
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
        columns.retain(|name| !options.exclude_columns.contains(name));
        if options.skip_timestamps {
            columns.retain(|name| !config.is_timestamp_column(name));
        }

        Ok(Self {
            table_name: schema.table_name().to_string(),
            columns_to_insert: columns,
            snapshot: snapshot.clone(),
            timestamp_columns: timestamp_columns(config),
            schema,
        })
    }

    /// Column values to insert; timestamp columns take `current_time`.
    pub fn attributes_to_insert(
        &self,
        current_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<ColumnValue>> {
        column_values(
            &self.schema,
            &self.snapshot,
            &self.columns_to_insert,
            &self.timestamp_columns,
            current_time,
        )
    }
}

/// Update of selected columns of a persisted snapshot's row.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAction {
    pub table_name: String,
    pub columns_to_update: Vec<String>,
    pub primary_key: String,
    pub primary_key_value: i64,
    snapshot: Snapshot,
    schema: EntitySchema,
    timestamp_columns: Vec<String>,
}

impl UpdateAction {
    pub fn new(
        store: &MemoryStore,
        snapshot: &Snapshot,
        columns: &[&str],
        skip_timestamps: bool,
    ) -> Result<Self> {
        let schema = store.schema(snapshot.entity_type())?.clone();
        let config = store.config();
        let primary_key_value = primary_key_value(snapshot, config)?;

        let mut columns_to_update = Vec::with_capacity(columns.len() + 1);
        for name in columns {
            schema.get_column(name)?;
            columns_to_update.push(name.to_string());
        }
        let updated_at = &config.updated_at_column;
        if !skip_timestamps && schema.has_column(updated_at) && !columns_to_update.contains(updated_at) {
            columns_to_update.push(updated_at.clone());
        }

        Ok(Self {
            table_name: schema.table_name().to_string(),
            columns_to_update,
            primary_key: config.primary_key.clone(),
            primary_key_value,
            snapshot: snapshot.clone(),
            timestamp_columns: vec![updated_at.clone()],
            schema,
        })
    }

    /// Column values to write; the updated-at column takes `current_time`.
    pub fn attributes_to_update(
        &self,
        current_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<ColumnValue>> {
        column_values(
            &self.schema,
            &self.snapshot,
            &self.columns_to_update,
            &self.timestamp_columns,
            current_time,
        )
    }
}

/// Deletion of a persisted snapshot's row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAction {
    pub entity_type: String,
    pub table_name: String,
    pub primary_key: String,
    pub primary_key_value: i64,
}

impl DeleteAction {
    pub fn new(store: &MemoryStore, snapshot: &Snapshot) -> Result<Self> {
        let schema = store.schema(snapshot.entity_type())?;
        let config = store.config();
        Ok(Self {
            entity_type: snapshot.entity_type().to_string(),
            table_name: schema.table_name().to_string(),
            primary_key: config.primary_key.clone(),
            primary_key_value: primary_key_value(snapshot, config)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create(CreateAction),
    Update(UpdateAction),
    Delete(DeleteAction),
}

impl MemoryStore {
    /// Apply a write action to the tables. Returns the primary key of the
    /// affected row.
    pub fn execute(&mut self, action: &Action, current_time: DateTime<Utc>) -> Result<i64> {
        let now = Some(current_time);
        let id = match action {
            Action::Create(create) => {
                let row = into_row(create.attributes_to_insert(now)?);
                self.table_mut(create.schema.entity_type())?.insert(row)?
            }
            Action::Update(update) => {
                let row = into_row(update.attributes_to_update(now)?);
                let entity_type = update.schema.entity_type();
                if !self.table_mut(entity_type)?.update(update.primary_key_value, row)? {
                    return Err(PureError::RecordNotFound(format!(
                        "{} with id {}",
                        entity_type, update.primary_key_value
                    )));
                }
                update.primary_key_value
            }
            Action::Delete(delete) => {
                if !self.table_mut(&delete.entity_type)?.delete(delete.primary_key_value) {
                    return Err(PureError::RecordNotFound(format!(
                        "{} with id {}",
                        delete.entity_type, delete.primary_key_value
                    )));
                }
                delete.primary_key_value
            }
        };
        self.count_write();
        event!(Level::DEBUG, id, "action executed");
        Ok(id)
    }
}

fn timestamp_columns(config: &StoreConfig) -> Vec<String> {
    vec![
        config.created_at_column.clone(),
        config.updated_at_column.clone(),
    ]
}

fn primary_key_value(snapshot: &Snapshot, config: &StoreConfig) -> Result<i64> {
    snapshot.integer(&config.primary_key)?.ok_or_else(|| {
        PureError::ConstraintViolation(format!(
            "Pure{} has no '{}' value to address its row",
            snapshot.entity_type(),
            config.primary_key
        ))
    })
}

fn column_values(
    schema: &EntitySchema,
    snapshot: &Snapshot,
    columns: &[String],
    timestamp_columns: &[String],
    current_time: Option<DateTime<Utc>>,
) -> Result<Vec<ColumnValue>> {
    columns
        .iter()
        .map(|name| {
            let column = schema.get_column(name)?;
            let value = if timestamp_columns.contains(name) {
                Value::from(current_time)
            } else {
                snapshot.field(name)?.clone()
            };
            Ok(ColumnValue {
                column_name: name.clone(),
                value,
                sql_type: column.data_type,
            })
        })
        .collect()
}

fn into_row(values: Vec<ColumnValue>) -> Row {
    values
        .into_iter()
        .map(|cv| (cv.column_name, cv.value))
        .collect()
}
