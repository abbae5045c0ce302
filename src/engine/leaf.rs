//! Leaves - Live instances of templates.
//!
//! Leaves form a tree isomorphic to the mounted part of the template tree.
//! Each leaf records where its host nodes are inserted, the op groups it
//! owns and the variant data matching its draft.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::types::{BlockId, GroupId, LeafId, NodeId, OpId, TemplateId};

/// Named values visible to a leaf and its descendants (row data).
pub type Values = BTreeMap<String, String>;

/// Variant data of a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafData {
    /// Top leaf of a mounted tree.
    Root { block: BlockId },
    Element {
        block: BlockId,
        visible: OpId,
        attrs: Vec<(String, OpId)>,
        /// Mount callbacks are still owed.
        need_to_call_node: bool,
        /// Host node was claimed from existing markup and is already attached.
        adopted: bool,
    },
    Text {
        block: BlockId,
        visible: OpId,
        content: OpId,
        adopted: bool,
    },
    List { block: BlockId },
    /// One row of a list.
    ListItem { block: BlockId, key: Option<String> },
    Route { block: BlockId, visible: OpId },
    Rec { block: BlockId },
    RecItem { block: BlockId },
    Block { block: BlockId },
    BlockItem { block: BlockId },
    /// Nested `using` or `listItem`; children mount into its fragment block.
    Using { block: BlockId },
}

impl LeafData {
    pub fn block(&self) -> BlockId {
        match self {
            LeafData::Root { block }
            | LeafData::Element { block, .. }
            | LeafData::Text { block, .. }
            | LeafData::List { block }
            | LeafData::ListItem { block, .. }
            | LeafData::Route { block, .. }
            | LeafData::Rec { block }
            | LeafData::RecItem { block }
            | LeafData::Block { block }
            | LeafData::BlockItem { block }
            | LeafData::Using { block } => *block,
        }
    }

    /// Every op this leaf owns.
    pub fn ops(&self) -> Vec<OpId> {
        match self {
            LeafData::Element { visible, attrs, .. } => {
                std::iter::once(*visible).chain(attrs.iter().map(|(_, op)| *op)).collect()
            }
            LeafData::Text { visible, content, .. } => vec![*visible, *content],
            LeafData::Route { visible, .. } => vec![*visible],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Leaf {
    pub template: TemplateId,
    pub parent: Option<LeafId>,
    pub children: Vec<LeafId>,
    /// Host node this leaf's subtree is inserted under.
    pub mount_node: NodeId,
    pub data: LeafData,
    pub op_group: GroupId,
    pub dom_subtree: GroupId,
    /// Mounted against existing host markup.
    pub hydration: bool,
    pub values: Rc<Values>,
}

impl Leaf {
    pub fn block(&self) -> BlockId {
        self.data.block()
    }
}
