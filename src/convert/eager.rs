use std::collections::HashSet;
use tracing::{Level, event, info_span};
use crate::core::{OneOrMany, PureError, Result};
use crate::record::RecordStore;
use crate::registry::Registry;
use super::purify::{Purified, PurifyOptions, purify};

/// Load every relation of every record reachable from `input`, then purify.
///
/// The loading happens on the store, before conversion starts; the purify
/// step itself is the ordinary one and still reads only what is in memory.
pub fn purify_all<S: RecordStore>(
    registry: &Registry,
    store: &mut S,
    input: OneOrMany<S::Handle>,
) -> Result<Purified> {
    let span = info_span!("purify_all", roots = input.len());
    let _guard = span.enter();

    let mut visited = HashSet::new();
    let mut pending: Vec<S::Handle> = input.iter().copied().collect();

    while let Some(record) = pending.pop() {
        if !visited.insert(record) {
            continue;
        }
        let entity_type = store
            .entity_type(record)
            .ok_or_else(|| {
                PureError::InvalidInputType(format!("{:?} is not a record of this store", record))
            })?
            .to_string();
        let metadata = registry.lookup(&entity_type)?;

        for relation in metadata.relation_names() {
            let state = match store.relation(record, relation)? {
                Some(loaded) => loaded,
                None => {
                    event!(Level::DEBUG, entity_type = %entity_type, relation, "eager loading relation");
                    store.load_relation(record, relation)?;
                    store.relation(record, relation)?.ok_or_else(|| {
                        PureError::StoreError(format!(
                            "relation '{}' on '{}' is still unloaded after loading it",
                            relation, entity_type
                        ))
                    })?
                }
            };
            pending.extend(state.targets().into_iter().copied());
        }
    }

    purify(registry, store, input, &PurifyOptions::default())
}
