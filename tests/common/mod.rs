#![allow(dead_code)]

use pure_record::{
    Column, DataType, EntitySchema, MemoryStore, RecordId, Registry, Result, StoreConfig, Value,
};

/// Widgets own parts and belong to an owner; parts point back at their widget.
pub fn store() -> Result<MemoryStore> {
    store_with_config(StoreConfig::default())
}

pub fn store_with_config(config: StoreConfig) -> Result<MemoryStore> {
    let mut store = MemoryStore::with_config(config);
    store.create_entity(
        EntitySchema::new("Widget", "widgets")
            .column(Column::new("name", DataType::Text))
            .column(Column::new("count", DataType::Integer).required())
            .column(Column::new("owner_id", DataType::Integer))
            .has_many("parts", "Part", "widget_id")
            .belongs_to("owner", "Owner", "owner_id"),
    )?;
    store.create_entity(
        EntitySchema::new("Part", "parts")
            .column(Column::new("label", DataType::Text))
            .column(Column::new("widget_id", DataType::Integer))
            .belongs_to("widget", "Widget", "widget_id"),
    )?;
    store.create_entity(
        EntitySchema::new("Owner", "owners")
            .column(Column::new("name", DataType::Text))
            .has_many("widgets", "Widget", "owner_id")
            .has_one("favorite", "Widget", "owner_id"),
    )?;
    Ok(store)
}

pub fn registry(store: &MemoryStore) -> Result<Registry> {
    let mut registry = Registry::new();
    for entity_type in ["Widget", "Part", "Owner"] {
        registry.register_discovered(store, entity_type)?;
    }
    Ok(registry)
}

pub fn widget(store: &mut MemoryStore, name: &str, count: i64) -> Result<RecordId> {
    store.new_record("Widget", [("name", Value::from(name)), ("count", Value::from(count))])
}

/// Saved widget with `parts` saved parts, reloaded from its table so that no
/// relation is loaded yet.
pub fn saved_widget_with_parts(
    store: &mut MemoryStore,
    name: &str,
    parts: usize,
) -> Result<RecordId> {
    let record = widget(store, name, 1)?;
    store.save(record)?;
    let id = pure_record::RecordStore::get_field(store, record, "id")?
        .as_i64()
        .unwrap_or_default();
    for n in 0..parts {
        let part = store.new_record(
            "Part",
            [
                ("label", Value::from(format!("{}-{}", name, n))),
                ("widget_id", Value::from(id)),
            ],
        )?;
        store.save(part)?;
    }
    Ok(record)
}
