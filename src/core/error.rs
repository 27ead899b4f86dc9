use thiserror::Error;

fn join_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PureError {
    #[error("Invalid entity type: {0}")]
    InvalidEntityType(String),

    #[error("Invalid input type: {0}")]
    InvalidInputType(String),

    #[error("No pure metadata registered for entity type '{0}'")]
    NoMetadataRegistered(String),

    #[error(
        "Pure{entity} was initialized with invalid attributes {}. The only valid attributes for Pure{entity} are {}",
        join_names(.extra),
        join_names(.legal)
    )]
    UnknownAttribute {
        entity: String,
        extra: Vec<String>,
        legal: Vec<String>,
    },

    #[error("Relation '{relation}' is not defined for entity type '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    #[error(
        "You tried to access association '{relation}' on Pure{entity}, but that association wasn't loaded when the pure record was constructed. You might want to use `includes(\"{relation}\")` when loading {entity} records"
    )]
    UnloadedAssociation { entity: String, relation: String },

    #[error(
        "You tried to call '{method}' on an instance of Pure{entity}. '{method}' is not a pure method and can only be called on {entity} records"
    )]
    NotAPureMethod { entity: String, method: String },

    #[error("Column '{0}' not found in entity type '{1}'")]
    ColumnNotFound(String, String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, PureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_attribute_lists_names() {
        let err = PureError::UnknownAttribute {
            entity: "Widget".to_string(),
            extra: vec!["hello".to_string()],
            legal: vec!["name".to_string(), "count".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid attributes 'hello'"));
        assert!(msg.contains("'name', 'count'"));
    }

    #[test]
    fn test_unloaded_association_suggests_includes() {
        let err = PureError::UnloadedAssociation {
            entity: "Widget".to_string(),
            relation: "parts".to_string(),
        };
        assert!(err.to_string().contains("includes(\"parts\")"));
    }
}
