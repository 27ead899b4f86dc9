use std::collections::{BTreeSet, HashMap};
use im::OrdMap;
use tracing::{Level, event, info_span};
use crate::core::{OneOrMany, PureError, Result, Value};
use crate::record::RecordStore;
use crate::registry::Registry;
use crate::snapshot::{Snapshot, SnapshotGraph, SnapshotId};
use super::check_homogeneous;

/// Which loaded relations a purify call follows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RelationScope {
    /// Every relation that is loaded on the record.
    #[default]
    Loaded,
    /// Only relations with these names, at every level of the walk.
    Only(BTreeSet<String>),
    /// No relations; snapshots carry scalar fields only.
    None,
}

impl RelationScope {
    fn includes(&self, relation: &str) -> bool {
        match self {
            Self::Loaded => true,
            Self::Only(names) => names.contains(relation),
            Self::None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurifyOptions {
    pub relations: RelationScope,
}

impl PurifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn only_relations<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations = RelationScope::Only(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn scalars_only(mut self) -> Self {
        self.relations = RelationScope::None;
        self
    }
}

/// Result of a purify call: the graph of snapshots it produced and the ids of
/// the snapshots that correspond to the input records, in input shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Purified {
    pub graph: SnapshotGraph,
    pub roots: OneOrMany<SnapshotId>,
}

impl Purified {
    /// Snapshot of the single input record.
    pub fn single(&self) -> Result<&Snapshot> {
        match &self.roots {
            OneOrMany::One(id) => self.graph.get(*id),
            OneOrMany::Many(_) => Err(PureError::InvalidInputType(
                "purify was given a collection, not a single record".to_string(),
            )),
        }
    }

    /// Root snapshots in input order.
    pub fn snapshots(&self) -> Result<Vec<&Snapshot>> {
        self.roots.iter().map(|id| self.graph.get(*id)).collect()
    }
}

/// Convert mutable records into snapshots.
///
/// Follows only relations the store reports as loaded; never asks the store
/// to load anything. A record reached twice, through any path, becomes one
/// snapshot.
pub fn purify<S: RecordStore>(
    registry: &Registry,
    store: &S,
    input: OneOrMany<S::Handle>,
    options: &PurifyOptions,
) -> Result<Purified> {
    let span = info_span!("purify", roots = input.len(), collection = input.is_collection());
    let _guard = span.enter();

    check_homogeneous(input.iter().map(|record| store.entity_type(*record)), "mutable record")?;

    let mut purifier = Purifier::new(registry, store, options);
    let roots = input.try_map(|record| purifier.visit(record))?;

    event!(Level::DEBUG, snapshots = purifier.graph.len(), "purify finished");
    Ok(Purified {
        graph: purifier.graph,
        roots,
    })
}

struct Purifier<'a, S: RecordStore> {
    registry: &'a Registry,
    store: &'a S,
    options: &'a PurifyOptions,
    graph: SnapshotGraph,
    cache: HashMap<S::Handle, SnapshotId>,
}

impl<'a, S: RecordStore> Purifier<'a, S> {
    fn new(registry: &'a Registry, store: &'a S, options: &'a PurifyOptions) -> Self {
        Self {
            registry,
            store,
            options,
            graph: SnapshotGraph::new(),
            cache: HashMap::new(),
        }
    }

    fn visit(&mut self, record: S::Handle) -> Result<SnapshotId> {
        if let Some(id) = self.cache.get(&record) {
            event!(Level::TRACE, ?record, "purify cache hit");
            return Ok(*id);
        }

        let entity_type = self.store.entity_type(record).ok_or_else(|| {
            PureError::InvalidInputType(format!("{:?} is not a record of this store", record))
        })?;
        let metadata = self.registry.lookup(entity_type)?;

        let mut fields: OrdMap<String, Value> = OrdMap::new();
        for name in metadata.scalar_fields() {
            fields.insert(name.clone(), self.store.get_field(record, name)?);
        }
        let persisted = !self.store.is_new_record(record)?;

        // Cached before the walk into relations: a back-edge to this record
        // resolves to the snapshot under construction.
        let id = self
            .graph
            .push(Snapshot::from_record(metadata.clone(), fields, persisted));
        self.cache.insert(record, id);

        let mut loaded = Vec::new();
        for relation in metadata.relation_names() {
            if !self.options.relations.includes(relation) {
                continue;
            }
            let Some(targets) = self.store.relation(record, relation)? else {
                continue;
            };
            let converted = targets.try_map(|target| self.visit(target))?;
            loaded.push((relation.to_string(), converted));
        }

        if !loaded.is_empty() {
            self.graph.merge_relations(id, loaded)?;
        }
        Ok(id)
    }
}

/// Convert a single record; shorthand for `purify` with a one-element shape.
pub fn purify_one<S: RecordStore>(
    registry: &Registry,
    store: &S,
    record: S::Handle,
) -> Result<Purified> {
    purify(registry, store, OneOrMany::One(record), &PurifyOptions::default())
}
