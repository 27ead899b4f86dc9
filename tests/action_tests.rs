use std::sync::Arc;
use chrono::{DateTime, Utc};
use pure_record::{
    Action, Column, CreateAction, CreateOptions, DataType, DeleteAction, EntityMetadata,
    EntitySchema, MemoryStore, PureError, Registry, Result, Snapshot, SnapshotOptions,
    UpdateAction, Value,
};

fn setup() -> Result<(MemoryStore, Arc<EntityMetadata>)> {
    let mut store = MemoryStore::new();
    store.create_entity(
        EntitySchema::new("TestRecord", "test_records")
            .column(Column::new("name", DataType::Text))
            .column(Column::new("age", DataType::Integer)),
    )?;
    let mut registry = Registry::new();
    let metadata = registry.register_discovered(&store, "TestRecord")?;
    Ok((store, metadata))
}

fn record(metadata: &Arc<EntityMetadata>, id: Option<i64>) -> Result<Snapshot> {
    Snapshot::new(
        metadata.clone(),
        [
            ("id", Value::from(id)),
            ("name", Value::from("Michael")),
            ("age", Value::from(123i64)),
        ],
        [],
        SnapshotOptions::new().persisted(id.is_some()),
    )
}

fn time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2016-03-06T13:53:20-06:00")
        .unwrap()
        .with_timezone(&Utc)
}

fn rendered(attrs: &[pure_record::ColumnValue]) -> Vec<(String, String, String)> {
    let mut out: Vec<_> = attrs
        .iter()
        .map(|cv| (cv.column_name.clone(), cv.sql_literal(), cv.sql_type.to_string()))
        .collect();
    out.sort();
    out
}

fn row(column: &str, value: &str, sql_type: &str) -> (String, String, String) {
    (column.to_string(), value.to_string(), sql_type.to_string())
}

const STAMP: &str = "'2016-03-06 19:53:20.000000'";

#[test]
fn test_create_columns() -> Result<()> {
    let (store, metadata) = setup()?;
    let action = CreateAction::new(&store, &record(&metadata, None)?, &CreateOptions::new())?;

    assert_eq!(action.table_name, "test_records");
    assert_eq!(
        action.columns_to_insert,
        vec!["name", "age", "created_at", "updated_at"]
    );
    Ok(())
}

#[test]
fn test_create_attributes_to_insert() -> Result<()> {
    let (store, metadata) = setup()?;
    let action = CreateAction::new(&store, &record(&metadata, None)?, &CreateOptions::new())?;
    let attrs = action.attributes_to_insert(Some(time()))?;

    let mut expected = vec![
        row("name", "'Michael'", "varchar"),
        row("age", "123", "integer"),
        row("updated_at", STAMP, "datetime"),
        row("created_at", STAMP, "datetime"),
    ];
    expected.sort();
    assert_eq!(rendered(&attrs), expected);
    Ok(())
}

#[test]
fn test_create_skip_timestamps() -> Result<()> {
    let (store, metadata) = setup()?;
    let options = CreateOptions::new().skip_timestamps();
    let action = CreateAction::new(&store, &record(&metadata, Some(3))?, &options)?;
    let attrs = action.attributes_to_insert(None)?;

    let mut expected = vec![row("name", "'Michael'", "varchar"), row("age", "123", "integer")];
    expected.sort();
    assert_eq!(rendered(&attrs), expected);
    Ok(())
}

#[test]
fn test_create_include_and_exclude_columns() -> Result<()> {
    let (store, metadata) = setup()?;
    let snapshot = record(&metadata, Some(3))?;

    let included = CreateAction::new(&store, &snapshot, &CreateOptions::new().include_column("id"))?;
    let mut expected = vec![
        row("id", "3", "integer"),
        row("name", "'Michael'", "varchar"),
        row("age", "123", "integer"),
        row("updated_at", STAMP, "datetime"),
        row("created_at", STAMP, "datetime"),
    ];
    expected.sort();
    assert_eq!(rendered(&included.attributes_to_insert(Some(time()))?), expected);

    let excluded = CreateAction::new(&store, &snapshot, &CreateOptions::new().exclude_column("name"))?;
    let mut expected = vec![
        row("age", "123", "integer"),
        row("updated_at", STAMP, "datetime"),
        row("created_at", STAMP, "datetime"),
    ];
    expected.sort();
    assert_eq!(rendered(&excluded.attributes_to_insert(Some(time()))?), expected);

    assert!(matches!(
        CreateAction::new(&store, &snapshot, &CreateOptions::new().include_column("colour")),
        Err(PureError::ColumnNotFound(_, _))
    ));
    Ok(())
}

#[test]
fn test_update_columns() -> Result<()> {
    let (store, metadata) = setup()?;
    let action = UpdateAction::new(&store, &record(&metadata, Some(2))?, &["name"], false)?;

    assert_eq!(action.table_name, "test_records");
    assert_eq!(action.primary_key, "id");
    assert_eq!(action.primary_key_value, 2);
    assert_eq!(action.columns_to_update, vec!["name", "updated_at"]);

    let mut expected = vec![
        row("name", "'Michael'", "varchar"),
        row("updated_at", STAMP, "datetime"),
    ];
    expected.sort();
    assert_eq!(rendered(&action.attributes_to_update(Some(time()))?), expected);
    Ok(())
}

#[test]
fn test_update_skip_timestamps() -> Result<()> {
    let (store, metadata) = setup()?;
    let action = UpdateAction::new(&store, &record(&metadata, Some(3))?, &["name"], true)?;
    assert_eq!(
        rendered(&action.attributes_to_update(None)?),
        vec![row("name", "'Michael'", "varchar")]
    );
    Ok(())
}

#[test]
fn test_update_and_delete_need_a_primary_key() -> Result<()> {
    let (store, metadata) = setup()?;
    let unsaved = record(&metadata, None)?;
    assert!(matches!(
        UpdateAction::new(&store, &unsaved, &["name"], false),
        Err(PureError::ConstraintViolation(_))
    ));
    assert!(matches!(
        DeleteAction::new(&store, &unsaved),
        Err(PureError::ConstraintViolation(_))
    ));
    Ok(())
}

#[test]
fn test_delete_action() -> Result<()> {
    let (store, metadata) = setup()?;
    let action = DeleteAction::new(&store, &record(&metadata, Some(2))?)?;
    assert_eq!(action.table_name, "test_records");
    assert_eq!(action.primary_key, "id");
    assert_eq!(action.primary_key_value, 2);
    Ok(())
}

#[test]
fn test_execute_actions() -> Result<()> {
    let (mut store, metadata) = setup()?;
    let snapshot = record(&metadata, None)?;

    let create = CreateAction::new(&store, &snapshot, &CreateOptions::new())?;
    let id = store.execute(&Action::Create(create), time())?;
    assert_eq!(store.count("TestRecord")?, 1);

    let saved = snapshot.with_field("id", id)?.with_field("name", "Mike")?;
    let update = UpdateAction::new(&store, &saved, &["name"], false)?;
    assert_eq!(store.execute(&Action::Update(update), time())?, id);

    let found = store.find("TestRecord", id)?;
    assert_eq!(
        pure_record::RecordStore::get_field(&store, found, "name")?,
        Value::from("Mike")
    );
    assert_eq!(
        pure_record::RecordStore::get_field(&store, found, "created_at")?,
        Value::from(time())
    );

    let delete = DeleteAction::new(&store, &saved)?;
    store.execute(&Action::Delete(delete.clone()), time())?;
    assert_eq!(store.count("TestRecord")?, 0);
    assert!(matches!(
        store.execute(&Action::Delete(delete), time()),
        Err(PureError::RecordNotFound(_))
    ));
    assert_eq!(store.stats().rows_written, 3);
    Ok(())
}

#[test]
fn test_create_uses_registered_fields_only() -> Result<()> {
    let mut store = MemoryStore::new();
    store.create_entity(
        EntitySchema::new("Widget", "widgets")
            .column(Column::new("name", DataType::Text))
            .column(Column::new("count", DataType::Integer))
            .column(Column::new("owner_id", DataType::Integer)),
    )?;
    let mut registry = Registry::new();
    let metadata = registry.register(&store, "Widget", &["name", "count"], &[])?;
    let snapshot = Snapshot::new(
        metadata,
        [("name", Value::from("Gear")), ("count", Value::from(3i64))],
        [],
        SnapshotOptions::new(),
    )?;

    let action = CreateAction::new(&store, &snapshot, &CreateOptions::new())?;
    assert_eq!(
        action.columns_to_insert,
        vec!["name", "count", "created_at", "updated_at"]
    );
    let attrs = action.attributes_to_insert(None)?;
    assert_eq!(attrs.len(), 4);
    assert!(attrs.iter().all(|cv| cv.column_name != "owner_id"));

    // Known to the table but not to the snapshot.
    assert!(matches!(
        CreateAction::new(&store, &snapshot, &CreateOptions::new().include_column("owner_id")),
        Err(PureError::UnknownAttribute { .. })
    ));

    let id = store.execute(&Action::Create(action), time())?;
    let found = store.find("Widget", id)?;
    assert_eq!(
        pure_record::RecordStore::get_field(&store, found, "owner_id")?,
        Value::Null
    );
    Ok(())
}
