//! Spawn - Leaf allocation and child mounting.
//!
//! `spawn` stores a new leaf in the root's leaf table, links it under its
//! parent leaf and mounts the child templates its draft calls for. Which
//! children mount, and into which fragment, depends on the leaf data:
//!
//! ```text
//! Root      → the template itself (slot 0), or a `using` template's children
//! Element   → child templates, into the element block
//! ListItem  → the list's row body, into the row block
//! Rec/Block → child templates, into their own block
//! *Item     → the referenced body, into slot 0 of the item block
//! Using     → child templates, into its own passthrough fragment
//! Route     → nothing until first activation
//! ```

use std::rc::Rc;

use crate::engine::{Draft, Leaf, LeafData, Values};
use crate::error::{ForestError, Result};
use crate::host::HostSurface;
use crate::types::{BlockId, GroupId, LeafId, NodeId, TemplateId};

use super::root::Root;

/// Everything a new leaf inherits from the site that spawns it.
#[derive(Debug, Clone)]
pub struct SpawnArgs {
    pub values: Rc<Values>,
    pub parent_leaf: Option<LeafId>,
    /// Host node the leaf's nodes are inserted under.
    pub mount_node: NodeId,
    pub leaf_data: LeafData,
    pub op_group: GroupId,
    pub dom_subtree: GroupId,
    pub hydration: bool,
}

impl<H: HostSurface> Root<H> {
    /// Allocate a leaf for `template` and mount its children.
    pub fn spawn(&mut self, template: TemplateId, args: SpawnArgs) -> Result<LeafId> {
        let SpawnArgs {
            values,
            parent_leaf,
            mount_node,
            leaf_data,
            op_group,
            dom_subtree,
            hydration,
        } = args;

        let leaf = self.leaves.insert(Leaf {
            template,
            parent: parent_leaf,
            children: Vec::new(),
            mount_node,
            data: leaf_data,
            op_group,
            dom_subtree,
            hydration,
            values,
        });
        if let Some(parent) = parent_leaf.and_then(|p| self.leaves.get_mut(p)) {
            parent.children.push(leaf);
        }

        self.mount_children(leaf)?;
        Ok(leaf)
    }

    fn mount_children(&mut self, leaf: LeafId) -> Result<()> {
        let templates = Rc::clone(&self.templates);
        let l = self.leaves.get(leaf).ok_or(ForestError::StaleLeaf(leaf))?;
        let template_id = l.template;
        let template = templates.get(template_id).ok_or(ForestError::UnknownTemplate(template_id))?;
        let mount_node = l.mount_node;

        match &l.data {
            LeafData::Root { block } => {
                let block = *block;
                if matches!(template.draft, Draft::Using) {
                    self.mount_all(block, leaf, mount_node, template.child_templates())
                } else {
                    self.mount_at(block, leaf, mount_node, template_id, Some(0)).map(drop)
                }
            }
            LeafData::Element { block, .. } => {
                let block = *block;
                let node = self.blocks.try_get(block)?.kind.host_node().ok_or(ForestError::StaleBlock(block))?;
                self.mount_all(block, leaf, node, template.child_templates())
            }
            LeafData::ListItem { block, .. }
            | LeafData::Rec { block }
            | LeafData::Block { block }
            | LeafData::Using { block } => {
                let block = *block;
                self.mount_all(block, leaf, mount_node, template.child_templates())
            }
            LeafData::RecItem { block } | LeafData::BlockItem { block } => {
                let block = *block;
                let body = match template.draft {
                    Draft::RecItem { rec } => rec,
                    Draft::BlockItem { block } => block,
                    _ => return Ok(()),
                };
                self.mount_at(block, leaf, mount_node, body, Some(0)).map(drop)
            }
            LeafData::Text { .. } | LeafData::List { .. } | LeafData::Route { .. } => Ok(()),
        }
    }

    /// Mount each child template at its own sibling index.
    pub(crate) fn mount_all(
        &mut self,
        fragment: BlockId,
        leaf: LeafId,
        node: NodeId,
        children: &[TemplateId],
    ) -> Result<()> {
        for &child in children {
            self.mount_child(fragment, leaf, node, child)?;
        }
        Ok(())
    }
}
