//! Root - The aggregate owning one independent tree.
//!
//! A root owns everything a mounted template tree needs: the host surface,
//! the block tree, the leaf table, the op plan and the mount-event channel.
//! No two roots share any of these.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use forest_reconcile::{Draft, ElementDraft, MemoryHost, Root, TemplateSet};
//!
//! let mut templates = TemplateSet::new();
//! let app = templates.add(None, Draft::Using);
//! templates.add(Some(app), ElementDraft::new("h1").text("Hello").into());
//!
//! let mut host = MemoryHost::new();
//! let container = host.create_container();
//!
//! let mut root = Root::new(host, Rc::new(templates));
//! root.mount(app, container)?;
//! root.flush();
//!
//! assert_eq!(root.host().inner_markup(container), "<h1>Hello</h1>");
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use slotmap::{SecondaryMap, SlotMap};

use crate::config::RootConfig;
use crate::engine::{Block, BlockKind, BlockTree, EventChannel, Leaf, LeafData, MountFn, TemplateSet, Values};
use crate::error::{ForestError, Result};
use crate::host::HostSurface;
use crate::types::{BlockId, Cleanup, Diagnostic, DraftKind, LeafId, Namespace, NodeId, OpId, OpValue, TemplateId};

use super::plan::Plan;
use super::spawn::SpawnArgs;

/// Staged values produced outside a flush (signal effects), drained by the next flush.
pub type Inbox = Rc<RefCell<VecDeque<(OpId, OpValue)>>>;

/// Mount-callback teardowns per leaf, filled by the `onMount` watcher.
type Teardowns = Rc<RefCell<SecondaryMap<LeafId, Vec<Cleanup>>>>;

/// Payload of the `onMount` channel.
#[derive(Clone)]
pub struct MountEvent {
    pub leaf: LeafId,
    pub element: NodeId,
    pub fns: Vec<MountFn>,
}

impl fmt::Debug for MountEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountEvent")
            .field("leaf", &self.leaf)
            .field("element", &self.element)
            .field("fns", &self.fns.len())
            .finish()
    }
}

/// Which op of a leaf to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKey<'a> {
    Visible,
    Content,
    Attr(&'a str),
}

pub struct Root<H: HostSurface> {
    pub(crate) host: H,
    pub(crate) templates: Rc<TemplateSet>,
    pub(crate) config: RootConfig,
    pub(crate) blocks: BlockTree,
    pub(crate) leaves: SlotMap<LeafId, Leaf>,
    pub(crate) plan: Plan,
    pub(crate) on_mount: EventChannel<MountEvent>,
    /// Pristine element per draft, cloned for every instance.
    pub(crate) stencils: HashMap<(TemplateId, Namespace), NodeId>,
    pub(crate) teardowns: Teardowns,
    pub(crate) bindings: SecondaryMap<LeafId, Vec<Cleanup>>,
    pub(crate) inbox: Inbox,
    /// Next unclaimed child per host parent while hydrating.
    pub(crate) hydration: Option<HashMap<NodeId, usize>>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl<H: HostSurface> Root<H> {
    pub fn new(host: H, templates: Rc<TemplateSet>) -> Self {
        Self::with_config(host, templates, RootConfig::default())
    }

    pub fn with_config(host: H, templates: Rc<TemplateSet>, config: RootConfig) -> Self {
        let teardowns = Teardowns::default();
        let mut on_mount = EventChannel::new("onMount");
        let sink = Rc::clone(&teardowns);
        on_mount.watch(move |event: &MountEvent| {
            for f in &event.fns {
                let Some(teardown) = f(event.element) else { continue };
                if let Some(entry) = sink.borrow_mut().entry(event.leaf) {
                    entry.or_default().push(teardown);
                }
            }
        });

        Self {
            host,
            templates,
            config,
            blocks: BlockTree::new(),
            leaves: SlotMap::with_key(),
            plan: Plan::new(),
            on_mount,
            stencils: HashMap::new(),
            teardowns,
            bindings: SecondaryMap::new(),
            inbox: Rc::default(),
            hydration: None,
            diagnostics: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &RootConfig {
        &self.config
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn blocks(&self) -> &BlockTree {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn leaf(&self, id: LeafId) -> Option<&Leaf> {
        self.leaves.get(id)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Block owned by `leaf`.
    pub fn leaf_block(&self, leaf: LeafId) -> Result<BlockId> {
        Ok(self.leaves.get(leaf).ok_or(ForestError::StaleLeaf(leaf))?.block())
    }

    /// Host node of an element or text leaf.
    pub fn leaf_node(&self, leaf: LeafId) -> Result<NodeId> {
        let block = self.leaf_block(leaf)?;
        self.blocks
            .try_get(block)?
            .kind
            .host_node()
            .ok_or(ForestError::StaleBlock(block))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// The `onMount` channel. Element callbacks run from the first watcher;
    /// watchers added here see each event after them.
    pub fn on_mount(&mut self) -> &mut EventChannel<MountEvent> {
        &mut self.on_mount
    }

    /// Shared staging inbox, for reactive sources other than signals.
    pub fn inbox(&self) -> Inbox {
        Rc::clone(&self.inbox)
    }

    pub(crate) fn warn(&mut self, target: &'static str, diagnostic: Diagnostic) {
        log::warn!(target: target, "{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    // =========================================================================
    // Mounting
    // =========================================================================

    /// Mount `template` into the host node `node`. Nothing is attached until
    /// the next [`flush`](Self::flush).
    pub fn mount(&mut self, template: TemplateId, node: NodeId) -> Result<LeafId> {
        self.mount_root(template, node, false)
    }

    /// Mount `template` over markup already present under `node`, adopting
    /// matching host nodes instead of creating them.
    pub fn hydrate(&mut self, template: TemplateId, node: NodeId) -> Result<LeafId> {
        self.hydration = Some(HashMap::new());
        self.mount_root(template, node, true)
    }

    fn mount_root(&mut self, template: TemplateId, node: NodeId, hydration: bool) -> Result<LeafId> {
        let draft_kind = self
            .templates
            .get(template)
            .ok_or(ForestError::UnknownTemplate(template))?
            .kind();
        let kind = match draft_kind {
            DraftKind::Using => BlockKind::Using { node },
            _ => BlockKind::Root { node },
        };
        let block = self.blocks.insert(Block::new(kind, None, None, true));
        let op_group = self.plan.create_group();
        let dom_subtree = self.plan.create_group();
        let leaf = self.spawn(
            template,
            SpawnArgs {
                values: Rc::new(Values::new()),
                parent_leaf: None,
                mount_node: node,
                leaf_data: LeafData::Root { block },
                op_group,
                dom_subtree,
                hydration,
            },
        )?;
        if let Some(root_block) = self.blocks.get_mut(block) {
            root_block.owner = Some(leaf);
        }
        log::debug!(target: "forest::mount", "mounted template {template:?} as {leaf:?}");
        Ok(leaf)
    }

    // =========================================================================
    // Flush
    // =========================================================================

    /// Apply every staged op, structural tier first, then dispatch mount
    /// callbacks. Returns the number of ops applied.
    pub fn flush(&mut self) -> usize {
        let staged: Vec<_> = self.inbox.borrow_mut().drain(..).collect();
        for (op, value) in staged {
            self.plan.stage(op, value);
        }

        let mut applied = 0;
        while let Some((op, target, value)) = self.plan.next_ready() {
            log::trace!(target: "forest::plan", "apply {op:?} {target:?} = {value:?}");
            if let Err(err) = self.apply_op(target, value) {
                log::warn!(target: "forest::plan", "op {op:?} failed: {err}");
            }
            applied += 1;
        }

        self.hydration = None;
        self.dispatch_mount_events();
        applied
    }

    fn dispatch_mount_events(&mut self) {
        for event in self.on_mount.take_pending() {
            if self.leaves.contains_key(event.leaf) {
                self.on_mount.notify(&event);
            }
        }
    }

    // =========================================================================
    // Ops
    // =========================================================================

    /// Op of `leaf` addressed by `key`.
    pub fn op(&self, leaf: LeafId, key: OpKey<'_>) -> Result<OpId> {
        let data = &self.leaves.get(leaf).ok_or(ForestError::StaleLeaf(leaf))?.data;
        let found = match (data, key) {
            (LeafData::Element { visible, .. }, OpKey::Visible)
            | (LeafData::Text { visible, .. }, OpKey::Visible)
            | (LeafData::Route { visible, .. }, OpKey::Visible) => Some(*visible),
            (LeafData::Text { content, .. }, OpKey::Content) => Some(*content),
            (LeafData::Element { attrs, .. }, OpKey::Attr(name)) => {
                attrs.iter().find(|(attr, _)| attr == name).map(|(_, op)| *op)
            }
            _ => None,
        };
        found.ok_or(ForestError::MissingOp {
            leaf,
            op: match key {
                OpKey::Visible => "visible",
                OpKey::Content => "content",
                OpKey::Attr(_) => "attribute",
            },
        })
    }

    /// Stage a value; it is applied by the next flush.
    pub fn set_op(&mut self, op: OpId, value: impl Into<OpValue>) -> Result<()> {
        if self.plan.stage(op, value.into()) {
            Ok(())
        } else {
            Err(ForestError::StaleOp(op))
        }
    }

    /// Last value applied by `op`.
    pub fn op_value(&self, op: OpId) -> Option<&OpValue> {
        self.plan.op(op).and_then(|op| op.current())
    }

    pub fn set_visible(&mut self, leaf: LeafId, visible: bool) -> Result<()> {
        let op = self.op(leaf, OpKey::Visible)?;
        self.set_op(op, visible)
    }

    pub fn set_text(&mut self, leaf: LeafId, text: impl Into<String>) -> Result<()> {
        let op = self.op(leaf, OpKey::Content)?;
        self.set_op(op, text.into())
    }

    pub fn set_attr(&mut self, leaf: LeafId, name: &str, value: Option<String>) -> Result<()> {
        let op = self.op(leaf, OpKey::Attr(name))?;
        self.set_op(op, value)
    }

    pub fn has_pending(&self) -> bool {
        self.plan.has_pending() || !self.inbox.borrow().is_empty()
    }

    // =========================================================================
    // Destruction
    // =========================================================================

    /// Remove a leaf and everything below it: host nodes are detached, blocks
    /// and child leaves freed, unapplied ops dropped and teardowns run.
    pub fn destroy_leaf(&mut self, leaf: LeafId) -> Result<()> {
        let target = self.leaves.get(leaf).ok_or(ForestError::StaleLeaf(leaf))?;
        let (parent, block) = (target.parent, target.block());

        for host_block in self.blocks.host_roots(block) {
            self.detach_host_block(host_block);
        }
        self.blocks.detach_from_parent(block);
        if let Some(parent) = parent.and_then(|p| self.leaves.get_mut(p)) {
            parent.children.retain(|&child| child != leaf);
        }
        self.release_leaf(leaf);
        Ok(())
    }

    /// Destroy a whole mounted tree.
    pub fn unmount(&mut self, root_leaf: LeafId) -> Result<()> {
        self.destroy_leaf(root_leaf)
    }

    pub(crate) fn detach_host_block(&mut self, block: BlockId) {
        let Some(b) = self.blocks.get(block) else { return };
        let Some(node) = b.kind.host_node() else { return };
        if b.visible {
            self.host.remove(node);
            if let Some(b) = self.blocks.get_mut(block) {
                b.visible = false;
            }
        }
    }

    fn release_leaf(&mut self, leaf: LeafId) {
        let Some(l) = self.leaves.remove(leaf) else { return };
        for child in &l.children {
            self.release_leaf(*child);
        }

        for op in l.data.ops() {
            self.plan.remove_op(op);
        }
        self.plan.drop_group(l.op_group);
        if matches!(l.data, LeafData::Element { .. } | LeafData::Root { .. }) {
            self.plan.drop_group(l.dom_subtree);
        }
        self.blocks.remove_subtree(l.block());

        if let Some(stops) = self.bindings.remove(leaf) {
            for stop in stops {
                stop();
            }
        }
        let teardowns = self.teardowns.borrow_mut().remove(leaf);
        if let Some(teardowns) = teardowns {
            for teardown in teardowns {
                teardown();
            }
        }
        log::trace!(target: "forest::mount", "released {leaf:?}");
    }
}
