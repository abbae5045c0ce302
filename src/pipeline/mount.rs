//! Mount - Per-draft mount protocol and op application.
//!
//! Mounting a template creates its block, registers its ops and spawns its
//! leaf. Nothing touches the host tree at mount time except node creation:
//! attachment happens later, when a flush applies the structural ops.
//!
//! | draft                      | block                  | ops                             |
//! |----------------------------|------------------------|---------------------------------|
//! | `route`                    | `Route`, hidden        | structural visibility           |
//! | `element`                  | `Element`, hidden      | structural visibility, attrs    |
//! | `text`                     | `Text`, hidden         | structural visibility, content  |
//! | `list`                     | `List`, visible, empty | none, rows register their own   |
//! | `rec`, `block`, `*Item`    | matching container     | none                            |
//! | `using`, `listItem`        | `Fragment`, visible    | none                            |
//!
//! A draft of unknown kind is logged and skipped; its siblings still mount.

use std::rc::Rc;

use crate::engine::{Block, BlockKind, Draft, ElementDraft, LeafData, ValueSource, Values};
use crate::error::{ForestError, Result};
use crate::host::HostSurface;
use crate::types::{BlockId, Diagnostic, LeafId, Namespace, NodeId, OpValue, Priority, TemplateId};

use super::plan::OpTarget;
use super::root::{MountEvent, Root};
use super::spawn::SpawnArgs;

impl<H: HostSurface> Root<H> {
    // =========================================================================
    // Mount protocol
    // =========================================================================

    /// Mount `template` into `fragment` at the template's own sibling index.
    pub fn mount_child(
        &mut self,
        fragment: BlockId,
        parent_leaf: LeafId,
        node: NodeId,
        template: TemplateId,
    ) -> Result<Option<LeafId>> {
        let index = self
            .templates
            .get(template)
            .ok_or(ForestError::UnknownTemplate(template))?
            .in_parent_index();
        self.mount_at(fragment, parent_leaf, node, template, index)
    }

    /// Mount `template` into `fragment` at slot `index`.
    ///
    /// Returns `Ok(None)` when the draft was skipped. Fails with
    /// [`ForestError::Structure`] when `fragment` cannot hold children.
    pub(crate) fn mount_at(
        &mut self,
        fragment: BlockId,
        parent_leaf: LeafId,
        node: NodeId,
        template: TemplateId,
        index: Option<usize>,
    ) -> Result<Option<LeafId>> {
        let tag = self.blocks.try_get(fragment)?.tag();
        if !tag.is_fragment_parent() {
            return Err(ForestError::Structure(tag));
        }
        let templates = Rc::clone(&self.templates);
        let draft = &templates.get(template).ok_or(ForestError::UnknownTemplate(template))?.draft;
        let parent = self.leaves.get(parent_leaf).ok_or(ForestError::StaleLeaf(parent_leaf))?;
        let values = Rc::clone(&parent.values);
        let parent_dom = parent.dom_subtree;
        // Claims stay open only until the first flush after `hydrate`
        let hydration = self.hydration.is_some();

        let op_group = self.plan.create_group();
        let mut dom_subtree = parent_dom;

        let leaf_data = match draft {
            Draft::Route => {
                let kind = BlockKind::Route { initialized: false, pending_init: true };
                let block = self.add_block(kind, fragment, index, false)?;
                let visible = self.plan.create_op(
                    parent_dom,
                    OpTarget::RouteVisible(block),
                    Priority::Structural,
                    Some(OpValue::Bool(false)),
                );
                LeafData::Route { block, visible }
            }
            Draft::Element(element) => {
                let namespace = self.resolve_namespace(parent_leaf, template, &element.tag);
                let (host_node, adopted) =
                    self.create_element(template, element, namespace, node, hydration && element.visible);
                let block = self.add_block(BlockKind::Element { node: host_node }, fragment, index, false)?;
                let visible = self.plan.create_op(
                    parent_dom,
                    OpTarget::ElementVisible(block),
                    Priority::Structural,
                    Some(OpValue::Bool(false)),
                );
                let mut attrs = Vec::with_capacity(element.bindings.len());
                for (name, field) in &element.bindings {
                    let op = self.plan.create_op(op_group, OpTarget::Attr(block, name.clone()), Priority::Value, None);
                    self.plan.stage(op, values.get(field).cloned().into());
                    attrs.push((name.clone(), op));
                }
                if element.visible {
                    self.plan.stage(visible, OpValue::Bool(true));
                }

                dom_subtree = self.plan.create_group();
                LeafData::Element {
                    block,
                    visible,
                    attrs,
                    need_to_call_node: !element.on_mount.is_empty(),
                    adopted,
                }
            }
            Draft::Text(source) => {
                let text = resolve_source(&values, source);
                let (host_node, adopted) = self.create_text(&text, node, hydration);
                let block = self.add_block(BlockKind::Text { node: host_node }, fragment, index, false)?;
                let visible = self.plan.create_op(
                    parent_dom,
                    OpTarget::TextVisible(block),
                    Priority::Structural,
                    Some(OpValue::Bool(false)),
                );
                let content = if adopted {
                    // Server text may be stale; rewrite it once attached
                    let op = self.plan.create_op(op_group, OpTarget::TextContent(block), Priority::Value, None);
                    self.plan.stage(op, OpValue::Text(text));
                    op
                } else {
                    self.plan.create_op(
                        op_group,
                        OpTarget::TextContent(block),
                        Priority::Value,
                        Some(OpValue::Text(text)),
                    )
                };
                self.plan.stage(visible, OpValue::Bool(true));
                LeafData::Text { block, visible, content, adopted }
            }
            Draft::List => {
                let kind = BlockKind::List { records: Vec::new(), last_child: None };
                LeafData::List { block: self.add_block(kind, fragment, index, true)? }
            }
            Draft::Rec => LeafData::Rec { block: self.add_block(BlockKind::Rec, fragment, index, true)? },
            Draft::RecItem { .. } => LeafData::RecItem {
                block: self.add_block(BlockKind::RecItem, fragment, index, true)?,
            },
            Draft::Block => LeafData::Block { block: self.add_block(BlockKind::Block, fragment, index, true)? },
            Draft::BlockItem { .. } => LeafData::BlockItem {
                block: self.add_block(BlockKind::BlockItem, fragment, index, true)?,
            },
            Draft::Using | Draft::ListItem => LeafData::Using {
                block: self.add_block(BlockKind::Fragment, fragment, index, true)?,
            },
            Draft::Unknown(name) => {
                self.plan.drop_group(op_group);
                self.warn("forest::mount", Diagnostic::UnknownDraft { name: name.clone() });
                return Ok(None);
            }
        };

        let block = leaf_data.block();
        let leaf = self.spawn(
            template,
            SpawnArgs {
                values,
                parent_leaf: Some(parent_leaf),
                mount_node: node,
                leaf_data,
                op_group,
                dom_subtree,
                hydration,
            },
        )?;
        if let Some(block) = self.blocks.get_mut(block) {
            block.owner = Some(leaf);
        }
        Ok(Some(leaf))
    }

    fn add_block(&mut self, kind: BlockKind, parent: BlockId, index: Option<usize>, visible: bool) -> Result<BlockId> {
        let block = self.blocks.insert(Block::new(kind, Some(parent), index, visible));
        if let Some(index) = index {
            self.blocks.register_child_slot(parent, index, block)?;
        }
        Ok(block)
    }

    // =========================================================================
    // Host node creation
    // =========================================================================

    /// Namespace for a new element: its own tag, then the nearest
    /// namespace-declaring ancestor element or declared environment, then the
    /// configured default.
    pub(crate) fn resolve_namespace(&self, parent_leaf: LeafId, template: TemplateId, tag: &str) -> Namespace {
        if tag == "svg" {
            return Namespace::Svg;
        }
        if let Some(env) = self.templates.get(template).and_then(|t| t.env) {
            return env.namespace;
        }
        let mut current = Some(parent_leaf);
        while let Some(id) = current {
            let Some(leaf) = self.leaves.get(id) else { break };
            if let Some(t) = self.templates.get(leaf.template) {
                if let (LeafData::Element { .. }, Draft::Element(element)) = (&leaf.data, &t.draft) {
                    if let Some(namespace) = Namespace::declared_by(&element.tag) {
                        return namespace;
                    }
                }
                if let Some(env) = t.env {
                    return env.namespace;
                }
            }
            current = leaf.parent;
        }
        self.config.default_namespace
    }

    /// Returns the host node and whether it was adopted from existing markup.
    fn create_element(
        &mut self,
        template: TemplateId,
        element: &ElementDraft,
        namespace: Namespace,
        parent: NodeId,
        hydrate: bool,
    ) -> (NodeId, bool) {
        if hydrate {
            let claimed = self.claim(parent, |host, node| host.tag_name(node) == Some(element.tag.as_str()));
            if let Some(node) = claimed {
                log::trace!(target: "forest::hydrate", "adopted <{}> {node:?}", element.tag);
                return (node, true);
            }
            self.warn(
                "forest::hydrate",
                Diagnostic::HydrationMismatch { expected: format!("<{}>", element.tag) },
            );
        }

        if !self.config.use_stencils {
            let node = self.host.create_element(&element.tag, namespace);
            for op in &element.static_seq {
                self.host.apply_static(node, op);
            }
            return (node, false);
        }

        let stencil = match self.stencils.get(&(template, namespace)) {
            Some(&stencil) => stencil,
            None => {
                let stencil = self.host.create_element(&element.tag, namespace);
                for op in &element.static_seq {
                    self.host.apply_static(stencil, op);
                }
                self.stencils.insert((template, namespace), stencil);
                stencil
            }
        };
        (self.host.clone_node(stencil), false)
    }

    fn create_text(&mut self, text: &str, parent: NodeId, hydrate: bool) -> (NodeId, bool) {
        if hydrate {
            if let Some(node) = self.claim(parent, |host, node| host.is_text(node)) {
                return (node, true);
            }
            self.warn("forest::hydrate", Diagnostic::HydrationMismatch { expected: "text".to_string() });
        }
        (self.host.create_text(text), false)
    }

    /// Take the next unclaimed child of `parent` if it matches.
    fn claim(&mut self, parent: NodeId, matches: impl Fn(&H, NodeId) -> bool) -> Option<NodeId> {
        let cursor = self.hydration.as_mut()?.entry(parent).or_insert(0);
        let candidate = *self.host.child_nodes(parent).get(*cursor)?;
        if !matches(&self.host, candidate) {
            return None;
        }
        *cursor += 1;
        Some(candidate)
    }

    // =========================================================================
    // Op application
    // =========================================================================

    pub(crate) fn apply_op(&mut self, target: OpTarget, value: OpValue) -> Result<()> {
        match target {
            OpTarget::ElementVisible(block) | OpTarget::TextVisible(block) => {
                self.apply_visible(block, value.as_bool())
            }
            OpTarget::RouteVisible(block) => self.apply_route(block, value.as_bool()),
            OpTarget::TextContent(block) => {
                let node = self.host_node(block)?;
                self.host.set_text(node, value.as_text().unwrap_or_default());
                Ok(())
            }
            OpTarget::Attr(block, name) => {
                let node = self.host_node(block)?;
                self.host.set_attribute(node, &name, value.as_text());
                Ok(())
            }
        }
    }

    fn host_node(&self, block: BlockId) -> Result<NodeId> {
        self.blocks
            .try_get(block)?
            .kind
            .host_node()
            .ok_or(ForestError::StaleBlock(block))
    }

    fn apply_visible(&mut self, block_id: BlockId, visible: bool) -> Result<()> {
        let block = self.blocks.try_get_mut(block_id)?;
        block.requested = visible;
        let owner = block.owner;

        if !visible {
            self.detach_host_block(block_id);
            return Ok(());
        }
        if block.visible {
            return Ok(());
        }

        if owner.is_some_and(|leaf| self.take_adopted(leaf)) {
            self.blocks.set_visible(block_id, true)?;
        } else if self.blocks.is_attachable(block_id) {
            self.append_child(block_id)?;
        } else {
            // Enclosing route is hidden; it re-attaches on activation
            return Ok(());
        }
        if let Some(leaf) = owner {
            self.mark_attached(leaf);
        }
        Ok(())
    }

    fn take_adopted(&mut self, leaf: LeafId) -> bool {
        match self.leaves.get_mut(leaf).map(|l| &mut l.data) {
            Some(LeafData::Element { adopted, .. }) | Some(LeafData::Text { adopted, .. }) => {
                std::mem::replace(adopted, false)
            }
            _ => false,
        }
    }

    /// Insert a host block's node after its nearest visible preceding
    /// sibling, or first under its host parent when there is none.
    pub fn append_child(&mut self, block: BlockId) -> Result<()> {
        let node = self
            .blocks
            .try_get(block)?
            .kind
            .host_node()
            .ok_or(ForestError::StaleBlock(block))?;
        match self.blocks.find_previous_visible_sibling(block) {
            Some(anchor) => self.host.after(anchor, node),
            None => {
                let parent = self
                    .blocks
                    .find_parent_dom_element(block)
                    .ok_or(ForestError::StaleBlock(block))?;
                self.host.prepend(parent, node);
            }
        }
        self.blocks.set_visible(block, true)
    }

    /// First attach of an element owes its mount callbacks.
    fn mark_attached(&mut self, leaf: LeafId) {
        let Some(l) = self.leaves.get_mut(leaf) else { return };
        let LeafData::Element { block, need_to_call_node, .. } = &mut l.data else {
            return;
        };
        if !std::mem::replace(need_to_call_node, false) {
            return;
        }
        let block = *block;
        let template = l.template;
        let Some(element) = self.blocks.get(block).and_then(|b| b.kind.host_node()) else {
            return;
        };
        let fns = match self.templates.get(template).map(|t| &t.draft) {
            Some(Draft::Element(draft)) => draft.on_mount.clone(),
            _ => return,
        };
        self.on_mount.launch(MountEvent { leaf, element, fns });
    }

    fn apply_route(&mut self, block_id: BlockId, visible: bool) -> Result<()> {
        let block = self.blocks.try_get_mut(block_id)?;
        block.requested = visible;
        let leaf = block.owner.ok_or(ForestError::StaleBlock(block_id))?;

        if !visible {
            for host_block in self.blocks.host_roots(block_id) {
                self.detach_host_block(host_block);
            }
            return self.blocks.set_visible(block_id, false);
        }

        block.visible = true;
        let first_activation = match &mut block.kind {
            BlockKind::Route { initialized, pending_init } if *pending_init => {
                *pending_init = false;
                *initialized = true;
                true
            }
            _ => false,
        };

        if first_activation {
            let l = self.leaves.get(leaf).ok_or(ForestError::StaleLeaf(leaf))?;
            let node = l.mount_node;
            let templates = Rc::clone(&self.templates);
            let children = templates
                .get(l.template)
                .ok_or(ForestError::UnknownTemplate(l.template))?
                .child_templates();
            log::debug!(target: "forest::mount", "route {leaf:?} initialized");
            return self.mount_all(block_id, leaf, node, children);
        }

        for host_block in self.blocks.host_roots(block_id) {
            let Some(b) = self.blocks.get(host_block) else { continue };
            let owner = b.owner;
            if b.requested && !b.visible && self.blocks.is_attachable(host_block) {
                self.append_child(host_block)?;
                if let Some(owner) = owner {
                    self.mark_attached(owner);
                }
            }
        }
        Ok(())
    }
}

/// Text of a static value or a field of the leaf's values.
pub(crate) fn resolve_source(values: &Values, source: &ValueSource) -> String {
    match source {
        ValueSource::Static(text) => text.clone(),
        ValueSource::Field(field) => values.get(field).cloned().unwrap_or_default(),
    }
}
