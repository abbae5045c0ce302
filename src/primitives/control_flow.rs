//! Control Flow Primitives - List rows and routes.
//!
//! This module drives the dynamic parts of a mounted tree:
//! - list rows: insert, remove, update and keyed reconciliation
//! - routes: show and hide
//!
//! # Rows
//!
//! A row is a `ListItem` leaf spawned from the list's own template, so the
//! list's child templates form the row body. Each row owns a `Row` block held
//! in the list block's `records`, in display order. Row values are the list's
//! values overlaid with the row's own.
//!
//! # Keyed reconciliation
//!
//! `reconcile_rows` walks the wanted items in order:
//! - Existing keys: values updated in place (no row recreation)
//! - Misplaced rows: detached and re-inserted at their new position
//! - New keys: row spawned at its position
//! - Vanished keys and unkeyed rows: destroyed
//! - Duplicate keys: warned and skipped

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::engine::{Block, BlockKind, Draft, LeafData, Values};
use crate::error::{ForestError, Result};
use crate::host::HostSurface;
use crate::pipeline::{resolve_source, OpKey, Root, SpawnArgs};
use crate::types::{BlockId, Diagnostic, LeafId, OpId, OpValue};

impl<H: HostSurface> Root<H> {
    // =========================================================================
    // Rows
    // =========================================================================

    /// Spawn a row at `position` (clamped to the end).
    pub fn insert_row(&mut self, list: LeafId, position: usize, values: Values) -> Result<LeafId> {
        self.insert_keyed_row(list, position, None, values)
    }

    pub fn push_row(&mut self, list: LeafId, values: Values) -> Result<LeafId> {
        self.insert_keyed_row(list, usize::MAX, None, values)
    }

    fn insert_keyed_row(
        &mut self,
        list: LeafId,
        position: usize,
        key: Option<String>,
        values: Values,
    ) -> Result<LeafId> {
        let l = self.leaves.get(list).ok_or(ForestError::StaleLeaf(list))?;
        let LeafData::List { block: list_block } = l.data else {
            return Err(ForestError::NotAList(list));
        };
        let template = l.template;
        let (mount_node, dom_subtree) = (l.mount_node, l.dom_subtree);
        let mut merged = (*l.values).clone();
        merged.extend(values);

        let row_block = self.blocks.insert(Block::new(BlockKind::Row, Some(list_block), None, true));
        self.blocks.insert_record(list_block, position, row_block)?;

        let op_group = self.plan.create_group();
        let row = self.spawn(
            template,
            SpawnArgs {
                values: Rc::new(merged),
                parent_leaf: Some(list),
                mount_node,
                leaf_data: LeafData::ListItem { block: row_block, key },
                op_group,
                dom_subtree,
                hydration: self.hydration.is_some(),
            },
        )?;
        if let Some(block) = self.blocks.get_mut(row_block) {
            block.owner = Some(row);
        }
        log::trace!(target: "forest::mount", "row {row:?} inserted into {list:?}");
        Ok(row)
    }

    pub fn remove_row(&mut self, row: LeafId) -> Result<()> {
        self.row_key(row)?;
        self.destroy_leaf(row)
    }

    /// Rows of `list` in display order.
    pub fn rows(&self, list: LeafId) -> Result<Vec<LeafId>> {
        let list_block = self.list_block(list)?;
        Ok(self
            .blocks
            .records(list_block)
            .iter()
            .filter_map(|&row| self.blocks.get(row).and_then(|block| block.owner))
            .collect())
    }

    /// Replace a row's own values and re-stage every field-bound op below it.
    pub fn update_row(&mut self, row: LeafId, values: Values) -> Result<()> {
        self.row_key(row)?;
        let parent = self.leaves.get(row).and_then(|l| l.parent);
        let mut merged = parent
            .and_then(|p| self.leaves.get(p))
            .map(|l| (*l.values).clone())
            .unwrap_or_default();
        merged.extend(values);
        self.restage_values(row, &Rc::new(merged));
        Ok(())
    }

    fn restage_values(&mut self, leaf: LeafId, values: &Rc<Values>) {
        let templates = Rc::clone(&self.templates);
        let Some(l) = self.leaves.get_mut(leaf) else { return };
        l.values = Rc::clone(values);
        let children = l.children.clone();

        let draft = templates.get(l.template).map(|t| &t.draft);
        let mut staged = Vec::new();
        match (&l.data, draft) {
            (LeafData::Text { content, .. }, Some(Draft::Text(source))) => {
                staged.push((*content, OpValue::Text(resolve_source(values, source))));
            }
            (LeafData::Element { attrs, .. }, Some(Draft::Element(element))) => {
                for (name, field) in &element.bindings {
                    if let Some((_, op)) = attrs.iter().find(|(attr, _)| attr == name) {
                        staged.push((*op, values.get(field).cloned().into()));
                    }
                }
            }
            _ => {}
        }
        for (op, value) in staged {
            self.plan.stage(op, value);
        }

        for child in children {
            // Nested rows keep the values they were spawned with
            let nested_row = self
                .leaves
                .get(child)
                .is_some_and(|c| matches!(c.data, LeafData::ListItem { .. }));
            if !nested_row {
                self.restage_values(child, values);
            }
        }
    }

    /// Bring the rows of `list` in line with `items`, keyed by the first
    /// element of each pair.
    pub fn reconcile_rows(&mut self, list: LeafId, items: Vec<(String, Values)>) -> Result<()> {
        let list_block = self.list_block(list)?;

        let mut seen = HashSet::new();
        let mut wanted = Vec::with_capacity(items.len());
        for (key, values) in items {
            if !seen.insert(key.clone()) {
                self.warn("forest::mount", Diagnostic::DuplicateKey { key });
                continue;
            }
            wanted.push((key, values));
        }

        let mut existing: HashMap<String, LeafId> = HashMap::new();
        for row in self.rows(list)? {
            match self.row_key(row)? {
                Some(key) if seen.contains(&key) => {
                    existing.insert(key, row);
                }
                _ => self.destroy_leaf(row)?,
            }
        }

        for (position, (key, values)) in wanted.into_iter().enumerate() {
            let Some(&row) = existing.get(&key) else {
                self.insert_keyed_row(list, position, Some(key), values)?;
                continue;
            };
            self.update_row(row, values)?;
            let row_block = self.leaf_block(row)?;
            if self.blocks.records(list_block).get(position) != Some(&row_block) {
                self.move_row(list_block, row_block, position)?;
            }
        }
        Ok(())
    }

    /// Detach a row's host nodes and re-insert the row at `position`. The
    /// nodes re-attach at the next flush.
    fn move_row(&mut self, list_block: BlockId, row_block: BlockId, position: usize) -> Result<()> {
        let host_blocks = self.blocks.host_roots(row_block);
        for &host_block in &host_blocks {
            self.detach_host_block(host_block);
        }
        self.blocks.detach_from_parent(row_block);
        self.blocks.insert_record(list_block, position, row_block)?;

        for host_block in host_blocks {
            let Some(block) = self.blocks.get(host_block) else { continue };
            let (requested, owner) = (block.requested, block.owner);
            let Some(owner) = owner.filter(|_| requested) else { continue };
            let op = self.op(owner, OpKey::Visible)?;
            self.plan.invalidate(op);
            self.plan.stage(op, OpValue::Bool(true));
        }
        Ok(())
    }

    fn list_block(&self, list: LeafId) -> Result<BlockId> {
        match self.leaves.get(list).map(|l| &l.data) {
            Some(LeafData::List { block }) => Ok(*block),
            Some(_) => Err(ForestError::NotAList(list)),
            None => Err(ForestError::StaleLeaf(list)),
        }
    }

    fn row_key(&self, row: LeafId) -> Result<Option<String>> {
        match self.leaves.get(row).map(|l| &l.data) {
            Some(LeafData::ListItem { key, .. }) => Ok(key.clone()),
            Some(_) => Err(ForestError::NotARow(row)),
            None => Err(ForestError::StaleLeaf(row)),
        }
    }

    // =========================================================================
    // Routes
    // =========================================================================

    /// Stage the route's activation. The first activation mounts its children.
    pub fn show_route(&mut self, route: LeafId) -> Result<()> {
        let op = self.route_op(route)?;
        self.set_op(op, true)
    }

    pub fn hide_route(&mut self, route: LeafId) -> Result<()> {
        let op = self.route_op(route)?;
        self.set_op(op, false)
    }

    fn route_op(&self, route: LeafId) -> Result<OpId> {
        match self.leaves.get(route).map(|l| &l.data) {
            Some(LeafData::Route { visible, .. }) => Ok(*visible),
            Some(_) => Err(ForestError::NotARoute(route)),
            None => Err(ForestError::StaleLeaf(route)),
        }
    }
}
