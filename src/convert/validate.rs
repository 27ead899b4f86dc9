use tracing::{Level, event, info_span};
use crate::core::{OneOrMany, Result};
use crate::record::RecordStore;
use crate::snapshot::{SnapshotGraph, SnapshotId};
use super::unpurify::{Unpurifier, check_roots};

/// Ask the store whether every root snapshot would make a valid record.
///
/// Each root is rebuilt on its own, without sharing records with the other
/// roots, and every record built for the check is released afterwards.
pub fn validate<S: RecordStore>(
    store: &mut S,
    graph: &SnapshotGraph,
    roots: &OneOrMany<SnapshotId>,
) -> Result<bool> {
    let span = info_span!("validate", roots = roots.len());
    let _guard = span.enter();

    check_roots(graph, roots)?;

    for id in roots.iter() {
        let mut unpurifier = Unpurifier::new(&mut *store, graph);
        let outcome = unpurifier
            .visit(*id)
            .and_then(|record| unpurifier.store().validate(record));
        unpurifier.abandon();

        if !outcome? {
            event!(Level::DEBUG, %id, "snapshot failed validation");
            return Ok(false);
        }
    }
    Ok(true)
}
