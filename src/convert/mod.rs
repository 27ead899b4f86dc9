//! Conversions between mutable records and snapshots.
//!
//! Each top-level call owns a private identity cache that lives exactly as
//! long as the call. Nothing here performs I/O except `purify_all`, which
//! loads on purpose before it converts.

mod eager;
mod purify;
mod unpurify;
mod validate;

pub use eager::purify_all;
pub use purify::{Purified, PurifyOptions, RelationScope, purify, purify_one};
pub use unpurify::{unpurify, unpurify_one};
pub use validate::validate;

use crate::core::{PureError, Result};

/// All inputs must name live items of a single entity type.
fn check_homogeneous<'a>(
    entity_types: impl Iterator<Item = Option<&'a str>>,
    kind: &str,
) -> Result<()> {
    let mut first: Option<&str> = None;
    for (position, entity_type) in entity_types.enumerate() {
        let Some(entity_type) = entity_type else {
            return Err(PureError::InvalidInputType(format!(
                "item {} is not a {}; expected a {} or a collection of them",
                position, kind, kind
            )));
        };
        match first {
            None => first = Some(entity_type),
            Some(expected) if expected != entity_type => {
                return Err(PureError::InvalidInputType(format!(
                    "collection mixes {} and {}; every {} must have the same entity type",
                    expected, entity_type, kind
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
