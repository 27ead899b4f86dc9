use std::fmt;
use im::Vector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::core::{PureError, Related, Result};
use super::Snapshot;

/// Handle of one snapshot inside a [`SnapshotGraph`].
///
/// Two ids are equal iff they name the same snapshot instance. Each id also
/// records the graph it was issued by, so it cannot be resolved against a
/// different graph by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotId {
    graph: Uuid,
    index: usize,
}

impl SnapshotId {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.graph, self.index)
    }
}

/// Arena owning a set of snapshots and the relation edges between them.
///
/// Cycles are plain id references, so a graph is freely clonable and can be
/// sent across threads. Clones share structure and keep the same lineage id,
/// so ids issued before the clone stay valid in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotGraph {
    lineage: Uuid,
    nodes: Vector<Snapshot>,
}

impl SnapshotGraph {
    pub fn new() -> Self {
        Self {
            lineage: Uuid::new_v4(),
            nodes: Vector::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: SnapshotId) -> bool {
        id.graph == self.lineage && id.index < self.nodes.len()
    }

    /// Add a caller-built snapshot. Every relation target must already be in
    /// this graph.
    pub fn insert(&mut self, snapshot: Snapshot) -> Result<SnapshotId> {
        for (name, related) in snapshot.loaded_relations() {
            for target in related.targets() {
                if !self.contains(*target) {
                    return Err(PureError::InvalidInputType(format!(
                        "relation '{}' of Pure{} points at {}, which is not a snapshot of this graph",
                        name,
                        snapshot.entity_type(),
                        target
                    )));
                }
            }
        }
        Ok(self.push(snapshot))
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) -> SnapshotId {
        let id = SnapshotId {
            graph: self.lineage,
            index: self.nodes.len(),
        };
        self.nodes.push_back(snapshot);
        id
    }

    pub(crate) fn merge_relations(
        &mut self,
        id: SnapshotId,
        relations: Vec<(String, Related<SnapshotId>)>,
    ) -> Result<()> {
        self.check(id)?;
        if let Some(node) = self.nodes.get_mut(id.index) {
            node.merge_relations(relations);
        }
        Ok(())
    }

    pub fn get(&self, id: SnapshotId) -> Result<&Snapshot> {
        self.check(id)?;
        self.nodes.get(id.index).ok_or_else(|| self.foreign(id))
    }

    /// A graph identical to this one except that `id` now holds `snapshot`.
    pub fn with_snapshot(&self, id: SnapshotId, snapshot: Snapshot) -> Result<Self> {
        self.check(id)?;
        for (_, related) in snapshot.loaded_relations() {
            for target in related.targets() {
                self.check(*target)?;
            }
        }
        Ok(Self {
            lineage: self.lineage,
            nodes: self.nodes.update(id.index, snapshot),
        })
    }

    pub fn relation(&self, id: SnapshotId, name: &str) -> Result<&Related<SnapshotId>> {
        self.get(id)?.relation(name)
    }

    /// Target of a loaded to-one relation.
    pub fn one(&self, id: SnapshotId, name: &str) -> Result<Option<&Snapshot>> {
        match self.relation(id, name)? {
            Related::One(Some(target)) => self.get(*target).map(Some),
            Related::One(None) => Ok(None),
            Related::Many(_) => Err(PureError::TypeMismatch(format!(
                "relation '{}' is to-many",
                name
            ))),
        }
    }

    /// Targets of a loaded to-many relation, in order.
    pub fn many(&self, id: SnapshotId, name: &str) -> Result<Vec<&Snapshot>> {
        match self.relation(id, name)? {
            Related::Many(targets) => targets.iter().map(|target| self.get(*target)).collect(),
            Related::One(_) => Err(PureError::TypeMismatch(format!(
                "relation '{}' is to-one",
                name
            ))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SnapshotId, &Snapshot)> {
        let lineage = self.lineage;
        self.nodes
            .iter()
            .enumerate()
            .map(move |(index, snapshot)| (SnapshotId { graph: lineage, index }, snapshot))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PureError::SerializationError(e.to_string()))
    }

    fn check(&self, id: SnapshotId) -> Result<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(self.foreign(id))
        }
    }

    fn foreign(&self, id: SnapshotId) -> PureError {
        PureError::InvalidInputType(format!("{} is not a snapshot of this graph", id))
    }
}

impl Default for SnapshotGraph {
    fn default() -> Self {
        Self::new()
    }
}
