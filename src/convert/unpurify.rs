use std::collections::HashMap;
use tracing::{Level, event, info_span};
use crate::core::{OneOrMany, Result};
use crate::record::RecordStore;
use crate::snapshot::{SnapshotGraph, SnapshotId};
use super::check_homogeneous;

/// Rebuild mutable records from snapshots.
///
/// Every relation the snapshot carries is marked loaded on the new record,
/// including empty and null ones, so reading it later never reaches storage.
/// Snapshots shared within the graph become shared records. Nothing is saved.
pub fn unpurify<S: RecordStore>(
    store: &mut S,
    graph: &SnapshotGraph,
    roots: &OneOrMany<SnapshotId>,
) -> Result<OneOrMany<S::Handle>> {
    let span = info_span!("unpurify", roots = roots.len(), collection = roots.is_collection());
    let _guard = span.enter();

    check_roots(graph, roots)?;

    let mut unpurifier = Unpurifier::new(store, graph);
    match roots.clone().try_map(|id| unpurifier.visit(id)) {
        Ok(records) => {
            event!(Level::DEBUG, records = unpurifier.cache.len(), "unpurify finished");
            Ok(records)
        }
        Err(err) => {
            unpurifier.abandon();
            Err(err)
        }
    }
}

/// Rebuild one snapshot of `graph`.
pub fn unpurify_one<S: RecordStore>(
    store: &mut S,
    graph: &SnapshotGraph,
    root: SnapshotId,
) -> Result<S::Handle> {
    let records = unpurify(store, graph, &OneOrMany::One(root))?;
    let mut records = records.into_vec();
    Ok(records.remove(0))
}

pub(crate) fn check_roots(graph: &SnapshotGraph, roots: &OneOrMany<SnapshotId>) -> Result<()> {
    let entity_types = roots
        .iter()
        .map(|id| graph.get(*id).map(|snapshot| snapshot.entity_type()))
        .collect::<Result<Vec<_>>>()?;
    check_homogeneous(entity_types.into_iter().map(Some), "snapshot")
}

pub(crate) struct Unpurifier<'a, S: RecordStore> {
    store: &'a mut S,
    graph: &'a SnapshotGraph,
    cache: HashMap<SnapshotId, S::Handle>,
}

impl<'a, S: RecordStore> Unpurifier<'a, S> {
    pub(crate) fn new(store: &'a mut S, graph: &'a SnapshotGraph) -> Self {
        Self {
            store,
            graph,
            cache: HashMap::new(),
        }
    }

    pub(crate) fn store(&self) -> &S {
        &*self.store
    }

    pub(crate) fn visit(&mut self, id: SnapshotId) -> Result<S::Handle> {
        if let Some(record) = self.cache.get(&id) {
            event!(Level::TRACE, %id, "unpurify cache hit");
            return Ok(*record);
        }

        let graph = self.graph;
        let snapshot = graph.get(id)?;
        let record = self.store.construct_empty(snapshot.entity_type())?;
        self.cache.insert(id, record);

        for (name, value) in snapshot.fields() {
            self.store.set_field(record, name, value.clone())?;
        }
        self.store.set_new_record(record, !snapshot.persisted())?;

        for (name, related) in snapshot.loaded_relations() {
            let targets = related.clone().try_map(|target| self.visit(target))?;
            self.store.mark_relation_loaded(record, name, targets)?;
        }
        Ok(record)
    }

    /// Release every record this conversion created.
    pub(crate) fn abandon(self) {
        for record in self.cache.into_values() {
            self.store.release(record);
        }
    }
}
