//! Search - Host insertion points for blocks becoming visible.
//!
//! A block that attaches only needs its nearest visible neighbour in document
//! order, so structural ops can commit in any order and still produce the
//! right final sequence. Every walk is bounded by tree depth (plus the row
//! count of the lists it crosses).

use crate::engine::{BlockKind, BlockKinds, BlockTree};
use crate::types::{BlockId, NodeId};

impl BlockTree {
    /// Host node of the nearest visible block in front of `id`, within the
    /// same host parent.
    pub fn find_previous_visible_sibling(&self, id: BlockId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let block = self.get(current)?;
            let parent_id = block.parent?;
            let parent = self.get(parent_id)?;
            match &parent.kind {
                BlockKind::List { records, .. } => {
                    let position = records.iter().position(|&row| row == current)?;
                    for &row in records[..position].iter().rev() {
                        if let Some(node) = self.last_visible_node(row) {
                            return Some(node);
                        }
                    }
                }
                _ => {
                    // Unindexed children (rec bodies) sit in slot 0
                    let index = block.index.unwrap_or(0).min(parent.child.len());
                    for sibling in parent.child[..index].iter().rev().flatten() {
                        if let Some(node) = self.last_visible_node(*sibling) {
                            return Some(node);
                        }
                    }
                }
            }
            if BlockKinds::HOST_PARENTS.contains(parent.tag().as_set()) {
                return None;
            }
            current = parent_id;
        }
    }

    /// Host node `id` is inserted under.
    pub fn find_parent_dom_element(&self, id: BlockId) -> Option<NodeId> {
        let mut current = self.get(id)?.parent?;
        loop {
            let block = self.get(current)?;
            match block.kind {
                BlockKind::Element { node } | BlockKind::Root { node } | BlockKind::Using { node } => {
                    return Some(node);
                }
                _ => current = block.parent?,
            }
        }
    }

    /// Host node of the last attached host block at or below `id`.
    pub fn last_visible_node(&self, id: BlockId) -> Option<NodeId> {
        let block = self.get(id)?;
        if !block.visible {
            return None;
        }
        match &block.kind {
            BlockKind::Element { node } | BlockKind::Text { node } => Some(*node),
            BlockKind::List { records, last_child } => {
                let end = match last_child {
                    Some(last) => records.iter().position(|row| row == last)? + 1,
                    None => return None,
                };
                records[..end]
                    .iter()
                    .rev()
                    .find_map(|&row| self.last_visible_node(row))
            }
            _ => block
                .child
                .iter()
                .rev()
                .flatten()
                .find_map(|&child| self.last_visible_node(child)),
        }
    }

    /// Every container between `id` and its host parent is visible.
    pub fn is_attachable(&self, id: BlockId) -> bool {
        let Some(mut current) = self.get(id).and_then(|block| block.parent) else {
            return false;
        };
        loop {
            let Some(block) = self.get(current) else { return false };
            if BlockKinds::HOST_PARENTS.contains(block.tag().as_set()) {
                return true;
            }
            if !block.visible {
                return false;
            }
            match block.parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }
}
