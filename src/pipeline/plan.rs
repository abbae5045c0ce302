//! Plan - Op scheduling.
//!
//! An op is a deferred mutation with a last-applied value. Staging a value
//! queues the op; a flush pops queued ops and hands back the ones whose staged
//! value differs from the last applied one.
//!
//! # Ordering
//!
//! The queue keeps one FIFO per priority tier. `next_ready` always drains the
//! structural FIFO before touching the value FIFO, and re-checks it after
//! every op, so structural ops staged while a flush is running still commit
//! ahead of any pending value op:
//!
//! ```text
//! stage(B: value) → stage(A: structural) → flush: A, B
//! ```
//!
//! # Cancellation
//!
//! Dropping a group frees its ops. Their queue entries become stale handles
//! and are skipped.

use std::collections::VecDeque;

use slotmap::SlotMap;

use crate::types::{BlockId, GroupId, OpId, OpValue, Priority};

/// What an op mutates when applied. Ops address the block they write to;
/// the block's owner leaf is looked up at apply time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpTarget {
    ElementVisible(BlockId),
    TextVisible(BlockId),
    RouteVisible(BlockId),
    TextContent(BlockId),
    Attr(BlockId, String),
}

impl OpTarget {
    pub fn block(&self) -> BlockId {
        match self {
            OpTarget::ElementVisible(block)
            | OpTarget::TextVisible(block)
            | OpTarget::RouteVisible(block)
            | OpTarget::TextContent(block)
            | OpTarget::Attr(block, _) => *block,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Op {
    pub target: OpTarget,
    pub priority: Priority,
    pub group: GroupId,
    current: Option<OpValue>,
    staged: Option<OpValue>,
    queued: bool,
}

impl Op {
    /// Last applied value.
    pub fn current(&self) -> Option<&OpValue> {
        self.current.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct OpGroup {
    ops: Vec<OpId>,
}

#[derive(Debug, Default)]
struct Queue {
    structural: VecDeque<OpId>,
    value: VecDeque<OpId>,
}

/// Ops, op groups and the queue of one root.
#[derive(Default)]
pub struct Plan {
    ops: SlotMap<OpId, Op>,
    groups: SlotMap<GroupId, OpGroup>,
    queue: Queue,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_group(&mut self) -> GroupId {
        self.groups.insert(OpGroup::default())
    }

    /// Register an op. `current` is treated as already applied.
    pub fn create_op(&mut self, group: GroupId, target: OpTarget, priority: Priority, current: Option<OpValue>) -> OpId {
        let id = self.ops.insert(Op {
            target,
            priority,
            group,
            current,
            staged: None,
            queued: false,
        });
        if let Some(group) = self.groups.get_mut(group) {
            group.ops.push(id);
        }
        id
    }

    pub fn op(&self, id: OpId) -> Option<&Op> {
        self.ops.get(id)
    }

    /// Stage a value. Returns `false` when the op no longer exists.
    pub fn stage(&mut self, id: OpId, value: OpValue) -> bool {
        let Some(op) = self.ops.get_mut(id) else { return false };
        op.staged = Some(value);
        if !op.queued {
            op.queued = true;
            match op.priority {
                Priority::Structural => self.queue.structural.push_back(id),
                Priority::Value => self.queue.value.push_back(id),
            }
        }
        true
    }

    /// Forget the last applied value so the next staged value always applies.
    pub fn invalidate(&mut self, id: OpId) {
        if let Some(op) = self.ops.get_mut(id) {
            op.current = None;
        }
    }

    /// Pop the next op whose staged value differs from its applied value,
    /// and record that value as applied.
    pub fn next_ready(&mut self) -> Option<(OpId, OpTarget, OpValue)> {
        loop {
            let id = match self.queue.structural.pop_front() {
                Some(id) => id,
                None => self.queue.value.pop_front()?,
            };
            let Some(op) = self.ops.get_mut(id) else { continue };
            op.queued = false;
            let Some(value) = op.staged.take() else { continue };
            if op.current.as_ref() == Some(&value) {
                log::trace!(target: "forest::plan", "skip {:?}: value unchanged", op.target);
                continue;
            }
            op.current = Some(value.clone());
            return Some((id, op.target.clone(), value));
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.structural.is_empty() || !self.queue.value.is_empty()
    }

    /// Free a group and every op in it.
    pub fn drop_group(&mut self, group: GroupId) {
        if let Some(group) = self.groups.remove(group) {
            for op in group.ops {
                self.ops.remove(op);
            }
        }
    }

    /// Free a single op; queued entries for it are skipped.
    pub fn remove_op(&mut self, id: OpId) {
        self.ops.remove(id);
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}
