mod graph;
mod snapshot;

pub use graph::{SnapshotGraph, SnapshotId};
pub use snapshot::{Member, Snapshot, SnapshotOptions};
