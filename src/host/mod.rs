//! Host surface - The external rendering target.
//!
//! The reconciler never touches native render primitives directly. It asks a
//! [`HostSurface`] to create, clone and place nodes, identified by [`NodeId`].
//!
//! - [`MemoryHost`] - In-memory node tree with a mutation log

mod memory;

pub use memory::*;

use crate::types::{Namespace, NodeId, StaticOp};

/// Factory and placement operations of a rendering surface.
pub trait HostSurface {
    fn create_element(&mut self, tag: &str, namespace: Namespace) -> NodeId;

    fn create_text(&mut self, text: &str) -> NodeId;

    /// Shallow copy: attributes and static text, no children.
    fn clone_node(&mut self, stencil: NodeId) -> NodeId;

    fn apply_static(&mut self, node: NodeId, op: &StaticOp);

    /// `None` removes the attribute.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: Option<&str>);

    fn set_text(&mut self, node: NodeId, text: &str);

    /// Detach from the current parent, if any.
    fn remove(&mut self, node: NodeId);

    /// Insert `node` right after `anchor` under the anchor's parent.
    fn after(&mut self, anchor: NodeId, node: NodeId);

    /// Insert `node` as the first child of `parent`.
    fn prepend(&mut self, parent: NodeId, node: NodeId);

    fn child_nodes(&self, node: NodeId) -> Vec<NodeId>;

    /// Tag name for element nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn is_text(&self, node: NodeId) -> bool;
}
