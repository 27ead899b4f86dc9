/// Configuration of a [`MemoryStore`](super::MemoryStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name of the auto-increment primary key column added to every entity
    pub primary_key: String,

    /// Column stamped when a row is first inserted
    pub created_at_column: String,

    /// Column stamped on every insert and update
    pub updated_at_column: String,

    /// Add timestamp columns to new entities and fill them on save
    pub record_timestamps: bool,

    /// Refuse to save records that fail validation
    pub validate_on_save: bool,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            primary_key: "id".to_string(),
            created_at_column: "created_at".to_string(),
            updated_at_column: "updated_at".to_string(),
            record_timestamps: true,
            validate_on_save: true,
        }
    }

    /// Set the primary key column name
    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    /// Set both timestamp column names
    pub fn timestamp_columns(mut self, created_at: &str, updated_at: &str) -> Self {
        self.created_at_column = created_at.to_string();
        self.updated_at_column = updated_at.to_string();
        self
    }

    /// Turn automatic timestamps on or off
    pub fn record_timestamps(mut self, enabled: bool) -> Self {
        self.record_timestamps = enabled;
        self
    }

    /// Turn validation on save on or off
    pub fn validate_on_save(mut self, enabled: bool) -> Self {
        self.validate_on_save = enabled;
        self
    }

    pub fn is_timestamp_column(&self, column: &str) -> bool {
        column == self.created_at_column || column == self.updated_at_column
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
