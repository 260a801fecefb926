//! Rebuilds each leaf revision's ancestry from rows read in ascending sequence order.

use std::collections::HashMap;
use upgrade_core::{LegacyRevision, Location, Result, Sequence, UpgradeError};

#[derive(Debug, Clone)]
struct AncestryNode {
    rev_id: String,
    parent_sequence: Sequence,
}

/// A current revision row with its revision ids from itself back to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLeaf {
    pub revision: LegacyRevision,
    pub history: Vec<String>,
}

/// Ancestor index for a single document. Build one per document and drop it afterwards.
#[derive(Debug, Default)]
pub struct RevisionTree {
    nodes: HashMap<Sequence, AncestryNode>,
    last_sequence: Sequence,
}

impl RevisionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of interior revisions remembered so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Feed the next row. Interior rows are remembered; a leaf row comes back with its history.
    pub fn push(&mut self, row: LegacyRevision) -> Result<Option<ResolvedLeaf>> {
        if row.sequence <= self.last_sequence {
            return Err(UpgradeError::corruption(
                Location::sequence(row.sequence),
                format!("revision rows out of order (previous sequence {})", self.last_sequence),
            ));
        }
        if row.has_parent() && row.parent_sequence >= row.sequence {
            return Err(UpgradeError::corruption(
                Location::sequence(row.sequence),
                format!("parent sequence {} is not older than its child", row.parent_sequence),
            ));
        }
        self.last_sequence = row.sequence;

        if !row.is_leaf {
            self.nodes.insert(
                row.sequence,
                AncestryNode { rev_id: row.rev_id, parent_sequence: row.parent_sequence },
            );
            return Ok(None);
        }
        let history = self.history_of(&row)?;
        Ok(Some(ResolvedLeaf { revision: row, history }))
    }

    fn history_of(&self, leaf: &LegacyRevision) -> Result<Vec<String>> {
        let mut history = vec![leaf.rev_id.clone()];
        let mut cursor = leaf.parent_sequence;
        // Parents always precede children, so every hop strictly lowers `cursor`.
        while cursor > 0 {
            let node = self.nodes.get(&cursor).ok_or_else(|| {
                UpgradeError::corruption(
                    Location::sequence(leaf.sequence),
                    format!("ancestor sequence {cursor} of {:?} is missing", leaf.rev_id),
                )
            })?;
            history.push(node.rev_id.clone());
            cursor = node.parent_sequence;
        }
        Ok(history)
    }
}

/// Resolve every leaf of one document. Nothing is returned if any leaf's ancestry is broken.
pub fn resolve_leaves<I>(rows: I) -> Result<Vec<ResolvedLeaf>>
where
    I: IntoIterator<Item = LegacyRevision>,
{
    let mut tree = RevisionTree::new();
    let mut leaves = Vec::new();
    for row in rows {
        if let Some(leaf) = tree.push(row)? {
            leaves.push(leaf);
        }
    }
    Ok(leaves)
}
