//! Block Tree - The live render tree.
//!
//! Every mounted leaf that renders something owns one block. Blocks form a
//! tree through owned, index-addressed child slots and non-owning parent
//! handles:
//!
//! ```text
//! Root ─┬─ [0] Element(div) ─── [0] Text
//!       ├─ [1] List ─┬─ Row ─── [0] Element(li)
//!       │            └─ Row ─── [0] Element(li)
//!       └─ [2] Route (hidden)
//! ```
//!
//! A block's `index` is its position among the parent's logical children. It
//! is assigned once, at template registration, so a slot can be filled before
//! the slots in front of it are populated. List rows are not slotted: they
//! live in the list's ordered `records`.

use std::fmt;

use slotmap::SlotMap;

use crate::error::{ForestError, Result};
use crate::types::{BlockId, LeafId, NodeId};

// =============================================================================
// Block kinds
// =============================================================================

/// Variant data of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// Top fragment of a tree mounted into a host node.
    Root { node: NodeId },
    /// Top fragment of a `using` template mounted into a host node.
    Using { node: NodeId },
    /// Nested `using` or `listItem`: holds the passthrough's children in one
    /// slot of the enclosing fragment. Owns no host node.
    Fragment,
    /// Per-row fragment of a list.
    Row,
    Element { node: NodeId },
    Text { node: NodeId },
    List {
        records: Vec<BlockId>,
        /// Last currently visible row; the anchor for appends.
        last_child: Option<BlockId>,
    },
    Route {
        initialized: bool,
        pending_init: bool,
    },
    Rec,
    RecItem,
    Block,
    BlockItem,
}

impl BlockKind {
    pub fn tag(&self) -> BlockKindTag {
        match self {
            BlockKind::Root { .. } => BlockKindTag::Root,
            BlockKind::Using { .. } => BlockKindTag::Using,
            BlockKind::Fragment => BlockKindTag::Fragment,
            BlockKind::Row => BlockKindTag::Row,
            BlockKind::Element { .. } => BlockKindTag::Element,
            BlockKind::Text { .. } => BlockKindTag::Text,
            BlockKind::List { .. } => BlockKindTag::List,
            BlockKind::Route { .. } => BlockKindTag::Route,
            BlockKind::Rec => BlockKindTag::Rec,
            BlockKind::RecItem => BlockKindTag::RecItem,
            BlockKind::Block => BlockKindTag::Block,
            BlockKind::BlockItem => BlockKindTag::BlockItem,
        }
    }

    /// Host node for element and text blocks.
    pub fn host_node(&self) -> Option<NodeId> {
        match self {
            BlockKind::Element { node } | BlockKind::Text { node } => Some(*node),
            _ => None,
        }
    }
}

/// Data-less block kind, for sets and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKindTag {
    Root,
    Using,
    Fragment,
    Row,
    Element,
    Text,
    List,
    Route,
    Rec,
    RecItem,
    Block,
    BlockItem,
}

impl BlockKindTag {
    pub const fn as_set(self) -> BlockKinds {
        match self {
            BlockKindTag::Root => BlockKinds::ROOT,
            BlockKindTag::Using => BlockKinds::USING,
            BlockKindTag::Fragment => BlockKinds::FRAGMENT,
            BlockKindTag::Row => BlockKinds::ROW,
            BlockKindTag::Element => BlockKinds::ELEMENT,
            BlockKindTag::Text => BlockKinds::TEXT,
            BlockKindTag::List => BlockKinds::LIST,
            BlockKindTag::Route => BlockKinds::ROUTE,
            BlockKindTag::Rec => BlockKinds::REC,
            BlockKindTag::RecItem => BlockKinds::REC_ITEM,
            BlockKindTag::Block => BlockKinds::BLOCK,
            BlockKindTag::BlockItem => BlockKinds::BLOCK_ITEM,
        }
    }

    pub fn is_fragment_parent(self) -> bool {
        BlockKinds::FRAGMENT_PARENTS.contains(self.as_set())
    }
}

impl fmt::Display for BlockKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKindTag::Root => "root",
            BlockKindTag::Using => "using",
            BlockKindTag::Fragment => "fragment",
            BlockKindTag::Row => "row",
            BlockKindTag::Element => "element",
            BlockKindTag::Text => "text",
            BlockKindTag::List => "list",
            BlockKindTag::Route => "route",
            BlockKindTag::Rec => "rec",
            BlockKindTag::RecItem => "recItem",
            BlockKindTag::Block => "block",
            BlockKindTag::BlockItem => "blockItem",
        };
        f.write_str(name)
    }
}

bitflags::bitflags! {
    /// Set of block kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BlockKinds: u16 {
        const ROOT = 1 << 0;
        const USING = 1 << 1;
        const ROW = 1 << 2;
        const ELEMENT = 1 << 3;
        const TEXT = 1 << 4;
        const LIST = 1 << 5;
        const ROUTE = 1 << 6;
        const REC = 1 << 7;
        const REC_ITEM = 1 << 8;
        const BLOCK = 1 << 9;
        const BLOCK_ITEM = 1 << 10;
        const FRAGMENT = 1 << 11;

        /// Blocks allowed to hold indexed children.
        const FRAGMENT_PARENTS = Self::ROOT.bits()
            | Self::USING.bits()
            | Self::FRAGMENT.bits()
            | Self::ROW.bits()
            | Self::ELEMENT.bits()
            | Self::REC_ITEM.bits()
            | Self::REC.bits()
            | Self::BLOCK.bits()
            | Self::BLOCK_ITEM.bits()
            | Self::ROUTE.bits();

        /// Blocks that own a host node.
        const HOST = Self::ELEMENT.bits() | Self::TEXT.bits();

        /// Blocks whose host node is the insertion parent of their subtree.
        const HOST_PARENTS = Self::ROOT.bits() | Self::USING.bits() | Self::ELEMENT.bits();
    }
}

// =============================================================================
// Block
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub parent: Option<BlockId>,
    /// Sparse, index-addressed child slots.
    pub child: Vec<Option<BlockId>>,
    /// For host blocks: the node is attached. For containers: children may attach.
    pub visible: bool,
    pub index: Option<usize>,
    /// Last value committed by this block's own visibility op.
    pub requested: bool,
    /// Leaf that owns this block.
    pub owner: Option<LeafId>,
}

impl Block {
    pub fn new(kind: BlockKind, parent: Option<BlockId>, index: Option<usize>, visible: bool) -> Self {
        Self {
            kind,
            parent,
            child: Vec::new(),
            visible,
            index,
            requested: visible,
            owner: None,
        }
    }

    pub fn tag(&self) -> BlockKindTag {
        self.kind.tag()
    }
}

// =============================================================================
// Block tree
// =============================================================================

/// All blocks of one root.
#[derive(Default)]
pub struct BlockTree {
    blocks: SlotMap<BlockId, Block>,
}

impl BlockTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, block: Block) -> BlockId {
        self.blocks.insert(block)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn try_get(&self, id: BlockId) -> Result<&Block> {
        self.blocks.get(id).ok_or(ForestError::StaleBlock(id))
    }

    pub fn try_get_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        self.blocks.get_mut(id).ok_or(ForestError::StaleBlock(id))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Place `child` at `parent.child[index]`.
    ///
    /// Fails with [`ForestError::Structure`] when the parent cannot host children.
    pub fn register_child_slot(&mut self, parent: BlockId, index: usize, child: BlockId) -> Result<()> {
        let parent_block = self.try_get_mut(parent)?;
        let tag = parent_block.tag();
        if !tag.is_fragment_parent() {
            return Err(ForestError::Structure(tag));
        }
        if parent_block.child.len() <= index {
            parent_block.child.resize(index + 1, None);
        }
        parent_block.child[index] = Some(child);
        Ok(())
    }

    /// Toggle the visibility flag. Host attachment follows this flag only
    /// through the mount protocol's visibility ops.
    pub fn set_visible(&mut self, id: BlockId, visible: bool) -> Result<()> {
        self.try_get_mut(id)?.visible = visible;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // List records
    // -------------------------------------------------------------------------

    /// Insert a row into a list's records, clamped to the end.
    pub fn insert_record(&mut self, list: BlockId, position: usize, row: BlockId) -> Result<usize> {
        let block = self.try_get_mut(list)?;
        let tag = block.tag();
        let BlockKind::List { records, .. } = &mut block.kind else {
            return Err(ForestError::Structure(tag));
        };
        let position = position.min(records.len());
        records.insert(position, row);
        self.refresh_last_child(list);
        Ok(position)
    }

    pub fn records(&self, list: BlockId) -> &[BlockId] {
        match self.get(list).map(|block| &block.kind) {
            Some(BlockKind::List { records, .. }) => records,
            _ => &[],
        }
    }

    /// Recompute `last_child` as the last visible row, or `None`.
    pub fn refresh_last_child(&mut self, list: BlockId) {
        let last = self
            .records(list)
            .iter()
            .rev()
            .copied()
            .find(|&row| self.get(row).is_some_and(|block| block.visible));
        if let Some(BlockKind::List { last_child, .. }) = self.get_mut(list).map(|block| &mut block.kind) {
            *last_child = last;
        }
    }

    /// Clear the slot (or list record) that holds `id`.
    pub fn detach_from_parent(&mut self, id: BlockId) {
        let Some(block) = self.get(id) else { return };
        let Some(parent) = block.parent else { return };
        let index = block.index;
        let Some(parent_block) = self.get_mut(parent) else { return };
        match &mut parent_block.kind {
            BlockKind::List { records, .. } => {
                records.retain(|&row| row != id);
                self.refresh_last_child(parent);
            }
            _ => {
                if let Some(slot) = index.and_then(|i| parent_block.child.get_mut(i)) {
                    if *slot == Some(id) {
                        *slot = None;
                    }
                }
            }
        }
    }

    /// Direct children in document order: slots for fragments, records for lists.
    pub fn children(&self, id: BlockId) -> Vec<BlockId> {
        match self.get(id) {
            Some(Block { kind: BlockKind::List { records, .. }, .. }) => records.clone(),
            Some(block) => block.child.iter().flatten().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Outermost host blocks at or below `id`, in document order.
    pub fn host_roots(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        self.collect_host_roots(id, &mut out);
        out
    }

    fn collect_host_roots(&self, id: BlockId, out: &mut Vec<BlockId>) {
        let Some(block) = self.get(id) else { return };
        if BlockKinds::HOST.contains(block.tag().as_set()) {
            out.push(id);
            return;
        }
        for child in self.children(id) {
            self.collect_host_roots(child, out);
        }
    }

    /// Free `id` and every block below it.
    pub fn remove_subtree(&mut self, id: BlockId) {
        for child in self.children(id) {
            self.remove_subtree(child);
        }
        self.blocks.remove(id);
    }
}
