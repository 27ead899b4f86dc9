use std::collections::BTreeMap;
use crate::core::{PureError, Result, Value};
use super::EntitySchema;

pub type Row = BTreeMap<String, Value>;

/// Rows of one entity type, keyed by integer primary key.
#[derive(Debug, Clone)]
pub struct Table {
    schema: EntitySchema,
    primary_key: String,
    rows: BTreeMap<i64, Row>,
    next_id: i64,
}

impl Table {
    pub fn new(schema: EntitySchema, primary_key: &str) -> Self {
        Self {
            schema,
            primary_key: primary_key.to_string(),
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Insert a row, assigning the next primary key when the row has none.
    pub fn insert(&mut self, mut row: Row) -> Result<i64> {
        self.validate_row(&row)?;

        let id = match row.get(&self.primary_key) {
            Some(Value::Integer(id)) => {
                if self.rows.contains_key(id) {
                    return Err(PureError::ConstraintViolation(format!(
                        "Unique constraint violation: '{}' already contains {}",
                        self.primary_key, id
                    )));
                }
                *id
            }
            _ => self.next_id,
        };
        self.next_id = self.next_id.max(id + 1);

        row.insert(self.primary_key.clone(), Value::Integer(id));
        for column in self.schema.columns() {
            row.entry(column.name.clone()).or_insert(Value::Null);
        }
        self.rows.insert(id, row);
        Ok(id)
    }

    /// Overwrite the given columns of an existing row.
    pub fn update(&mut self, id: i64, changes: Row) -> Result<bool> {
        self.validate_row(&changes)?;
        match self.rows.get_mut(&id) {
            Some(row) => {
                for (column, value) in changes {
                    if column != self.primary_key {
                        row.insert(column, value);
                    }
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn delete(&mut self, id: i64) -> bool {
        self.rows.remove(&id).is_some()
    }

    pub fn get(&self, id: i64) -> Option<&Row> {
        self.rows.get(&id)
    }

    pub fn scan(&self) -> impl Iterator<Item = (i64, &Row)> {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    /// Rows whose `column` equals `value`, in primary key order.
    pub fn scan_where<'a>(
        &'a self,
        column: &'a str,
        value: &'a Value,
    ) -> impl Iterator<Item = (i64, &'a Row)> + 'a {
        self.scan()
            .filter(move |(_, row)| row.get(column).is_some_and(|v| v == value))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn validate_row(&self, row: &Row) -> Result<()> {
        for (name, value) in row {
            let column = self.schema.get_column(name)?;
            if !column.data_type.is_compatible(value) {
                return Err(PureError::TypeMismatch(format!(
                    "Column '{}' expects type {}, got {}",
                    name,
                    column.data_type,
                    value.type_name()
                )));
            }
        }
        Ok(())
    }
}
