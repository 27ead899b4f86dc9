mod common;

use std::sync::Arc;
use std::thread;
use pure_record::{
    Member, OneOrMany, PureError, Related, Result, Snapshot, SnapshotGraph, SnapshotOptions,
    Value, purify_one, validate,
};

fn widget_metadata() -> Result<(pure_record::MemoryStore, Arc<pure_record::EntityMetadata>)> {
    let store = common::store()?;
    let mut registry = pure_record::Registry::new();
    let metadata = registry.register(&store, "Widget", &["name", "count"], &["parts"])?;
    Ok((store, metadata))
}

#[test]
fn test_new_fills_missing_fields_with_null() -> Result<()> {
    let (_, metadata) = widget_metadata()?;
    let snapshot = Snapshot::new(
        metadata,
        [("name", Value::from("Gear"))],
        [],
        SnapshotOptions::new(),
    )?;

    assert_eq!(snapshot.entity_type(), "Widget");
    assert_eq!(snapshot.text("name")?, Some("Gear"));
    assert_eq!(snapshot.field("count")?, &Value::Null);
    assert_eq!(snapshot.integer("count")?, None);
    assert!(!snapshot.persisted());
    assert!(!snapshot.is_loaded("parts"));
    Ok(())
}

#[test]
fn test_new_rejects_unknown_attributes() -> Result<()> {
    let (_, metadata) = widget_metadata()?;

    let result = Snapshot::new(
        metadata.clone(),
        [("name", Value::from("Gear")), ("colour", Value::from("red"))],
        [],
        SnapshotOptions::new(),
    );
    match result {
        Err(PureError::UnknownAttribute { entity, extra, legal }) => {
            assert_eq!(entity, "Widget");
            assert_eq!(extra, vec!["colour".to_string()]);
            assert_eq!(legal, vec!["name".to_string(), "count".to_string()]);
        }
        other => panic!("Expected UnknownAttribute, got {:?}", other),
    }

    let lenient = Snapshot::new(
        metadata,
        [("name", Value::from("Gear")), ("colour", Value::from("red"))],
        [],
        SnapshotOptions::new().ignore_extra_attrs().persisted(true),
    )?;
    assert_eq!(lenient.fields().count(), 2);
    assert!(lenient.persisted());
    Ok(())
}

#[test]
fn test_unknown_relation_is_rejected() -> Result<()> {
    let (_, metadata) = widget_metadata()?;
    let result = Snapshot::new(
        metadata.clone(),
        Vec::<(String, Value)>::new(),
        [("owner".to_string(), Related::One(None))],
        SnapshotOptions::new(),
    );
    assert!(matches!(result, Err(PureError::UnknownRelation { .. })));

    let snapshot = Snapshot::new(metadata, Vec::<(String, Value)>::new(), [], SnapshotOptions::new())?;
    assert!(matches!(
        snapshot.relation("owner"),
        Err(PureError::UnknownRelation { .. })
    ));
    Ok(())
}

#[test]
fn test_persistence_operations_are_not_pure() -> Result<()> {
    let (_, metadata) = widget_metadata()?;
    let snapshot = Snapshot::new(metadata, [("count", Value::from(1i64))], [], SnapshotOptions::new())?;

    match snapshot.member("save") {
        Err(PureError::NotAPureMethod { entity, method }) => {
            assert_eq!(entity, "Widget");
            assert_eq!(method, "save");
        }
        other => panic!("Expected NotAPureMethod, got {:?}", other),
    }
    assert!(matches!(
        snapshot.field("destroy"),
        Err(PureError::NotAPureMethod { .. })
    ));
    assert!(matches!(
        snapshot.relation("reload"),
        Err(PureError::NotAPureMethod { .. })
    ));
    assert!(matches!(
        snapshot.member("colour"),
        Err(PureError::UnknownAttribute { .. })
    ));

    assert_eq!(snapshot.member("count")?, Member::Field(&Value::Integer(1)));
    assert!(matches!(
        snapshot.member("parts"),
        Err(PureError::UnloadedAssociation { .. })
    ));
    Ok(())
}

#[test]
fn test_with_field_leaves_original_untouched() -> Result<()> {
    let (_, metadata) = widget_metadata()?;
    let original = Snapshot::new(metadata, [("name", Value::from("Gear"))], [], SnapshotOptions::new())?;

    let renamed = original.with_field("name", "Cog")?;
    assert_eq!(original.text("name")?, Some("Gear"));
    assert_eq!(renamed.text("name")?, Some("Cog"));
    assert_ne!(original, renamed);

    assert!(matches!(
        original.with_field("colour", "red"),
        Err(PureError::UnknownAttribute { .. })
    ));
    Ok(())
}

#[test]
fn test_typed_getter_mismatch() -> Result<()> {
    let (_, metadata) = widget_metadata()?;
    let snapshot = Snapshot::new(metadata, [("name", Value::from("Gear"))], [], SnapshotOptions::new())?;
    assert!(matches!(
        snapshot.integer("name"),
        Err(PureError::TypeMismatch(_))
    ));
    Ok(())
}

#[test]
fn test_graph_insert_and_relations() -> Result<()> {
    let store = common::store()?;
    let registry = common::registry(&store)?;
    let widget = registry.lookup("Widget")?;
    let part = registry.lookup("Part")?;

    let mut graph = SnapshotGraph::new();
    let first = graph.insert(Snapshot::new(
        part.clone(),
        [("label", Value::from("a"))],
        [],
        SnapshotOptions::new(),
    )?)?;
    let second = graph.insert(Snapshot::new(
        part.clone(),
        [("label", Value::from("b"))],
        [],
        SnapshotOptions::new(),
    )?)?;
    let root = graph.insert(Snapshot::new(
        widget.clone(),
        [("name", Value::from("Gear")), ("count", Value::from(2i64))],
        [
            ("parts".to_string(), Related::Many(vec![first, second])),
            ("owner".to_string(), Related::One(None)),
        ],
        SnapshotOptions::new(),
    )?)?;

    let labels: Vec<Option<&str>> = graph
        .many(root, "parts")?
        .into_iter()
        .map(|p| p.text("label"))
        .collect::<Result<_>>()?;
    assert_eq!(labels, vec![Some("a"), Some("b")]);
    assert!(graph.one(root, "owner")?.is_none());
    assert!(matches!(
        graph.one(root, "parts"),
        Err(PureError::TypeMismatch(_))
    ));

    // Ids from another graph do not resolve here.
    let mut other = SnapshotGraph::new();
    let stranger = other.insert(Snapshot::new(part.clone(), [("label", Value::from("x"))], [], SnapshotOptions::new())?)?;
    assert!(matches!(graph.get(stranger), Err(PureError::InvalidInputType(_))));
    let dangling = Snapshot::new(
        widget,
        Vec::<(String, Value)>::new(),
        [("parts".to_string(), Related::Many(vec![stranger]))],
        SnapshotOptions::new(),
    )?;
    assert!(matches!(graph.insert(dangling), Err(PureError::InvalidInputType(_))));
    Ok(())
}

#[test]
fn test_with_snapshot_shares_unchanged_nodes() -> Result<()> {
    let mut store = common::store()?;
    let registry = common::registry(&store)?;
    let record = common::widget(&mut store, "Gear", 1)?;
    let pure = purify_one(&registry, &store, record)?;
    let root = *pure.roots.as_one().unwrap();

    let bumped = pure.graph.get(root)?.with_field("count", 2i64)?;
    let next = pure.graph.with_snapshot(root, bumped)?;
    assert_eq!(pure.graph.get(root)?.integer("count")?, Some(1));
    assert_eq!(next.get(root)?.integer("count")?, Some(2));
    assert_eq!(next.len(), pure.graph.len());
    Ok(())
}

#[test]
fn test_graph_is_shareable_across_threads() -> Result<()> {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Snapshot>();
    assert_send_sync::<SnapshotGraph>();

    let mut store = common::store()?;
    let registry = common::registry(&store)?;
    let record = common::widget(&mut store, "Gear", 4)?;
    let pure = purify_one(&registry, &store, record)?;
    let root = *pure.roots.as_one().unwrap();

    let graph = Arc::new(pure.graph);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let graph = Arc::clone(&graph);
            thread::spawn(move || graph.get(root).and_then(|s| s.integer("count")))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap()?, Some(4));
    }
    Ok(())
}

#[test]
fn test_graph_serializes_to_json() -> Result<()> {
    let mut store = common::store()?;
    let registry = common::registry(&store)?;
    let record = common::widget(&mut store, "Gear", 1)?;
    let pure = purify_one(&registry, &store, record)?;

    let json = pure.graph.to_json()?;
    assert!(json.contains("\"Widget\""));
    assert!(json.contains("Gear"));

    let back: SnapshotGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(back, pure.graph);
    Ok(())
}

#[test]
fn test_validate_bridge() -> Result<()> {
    let mut store = common::store()?;
    let registry = common::registry(&store)?;
    let complete = common::widget(&mut store, "Gear", 1)?;
    let missing_count = store.new_record("Widget", [("name", Value::from("Loose"))])?;

    let good = purify_one(&registry, &store, complete)?;
    let bad = purify_one(&registry, &store, missing_count)?;
    let live = store.live_records();

    assert!(validate(&mut store, &good.graph, &good.roots)?);
    assert!(!validate(&mut store, &bad.graph, &bad.roots)?);
    assert_eq!(store.live_records(), live);

    let empty = SnapshotGraph::new();
    assert!(validate(&mut store, &empty, &OneOrMany::Many(vec![]))?);
    Ok(())
}
