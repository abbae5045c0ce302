//! MemoryHost - In-memory host tree.
//!
//! Keeps nodes in a flat table and records every mutation in order, so the
//! exact sequence of host writes a flush produced can be inspected.

use super::HostSurface;
use crate::types::{Namespace, NodeId, StaticOp};

// =============================================================================
// Mutation log
// =============================================================================

/// One recorded host write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMutation {
    CreateElement { node: NodeId, tag: String, namespace: Namespace },
    CreateText { node: NodeId, text: String },
    Clone { node: NodeId, stencil: NodeId },
    Insert { node: NodeId, parent: NodeId, position: usize },
    Remove { node: NodeId },
    SetAttr { node: NodeId, name: String, value: Option<String> },
    SetText { node: NodeId, text: String },
}

// =============================================================================
// Nodes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryNodeKind {
    /// Mount point without markup of its own.
    Container,
    Element {
        tag: String,
        namespace: Namespace,
        attrs: Vec<(String, String)>,
        static_text: Option<String>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryNode {
    pub kind: MemoryNodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: Vec<MemoryNode>,
    mutations: Vec<HostMutation>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached mount point.
    pub fn create_container(&mut self) -> NodeId {
        self.push(MemoryNodeKind::Container)
    }

    pub fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn namespace(&self, id: NodeId) -> Option<Namespace> {
        match self.node(id).map(|node| &node.kind) {
            Some(MemoryNodeKind::Element { namespace, .. }) => Some(*namespace),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.node(id).map(|node| &node.kind) {
            Some(MemoryNodeKind::Element { attrs, .. }) => attrs
                .iter()
                .find(|(attr, _)| attr == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn mutations(&self) -> &[HostMutation] {
        &self.mutations
    }

    pub fn take_mutations(&mut self) -> Vec<HostMutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Append an existing node to `parent`, as markup delivered ahead of hydration.
    pub fn append(&mut self, parent: NodeId, node: NodeId) {
        let position = self.node(parent).map_or(0, |p| p.children.len());
        self.insert_at(parent, position, node);
    }

    /// Serialize the children of `id`.
    pub fn inner_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(node) = self.node(id) {
            for child in &node.children {
                self.write_markup(*child, &mut out);
            }
        }
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match &node.kind {
            MemoryNodeKind::Container => {}
            MemoryNodeKind::Text(text) => out.push_str(text),
            MemoryNodeKind::Element { tag, attrs, static_text, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push_str(&format!(" {name}=\"{value}\""));
                }
                out.push('>');
                if let Some(text) = static_text {
                    out.push_str(text);
                }
            }
        }
        for child in &node.children {
            self.write_markup(*child, out);
        }
        if let MemoryNodeKind::Element { tag, .. } = &node.kind {
            out.push_str(&format!("</{tag}>"));
        }
    }

    fn push(&mut self, kind: MemoryNodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(MemoryNode {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    fn unlink(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else { return false };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.retain(|&child| child != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
        true
    }

    fn insert_at(&mut self, parent: NodeId, position: usize, node: NodeId) {
        self.unlink(node);
        let Some(parent_node) = self.node_mut(parent) else { return };
        let position = position.min(parent_node.children.len());
        parent_node.children.insert(position, node);
        if let Some(child) = self.node_mut(node) {
            child.parent = Some(parent);
        }
        self.mutations.push(HostMutation::Insert { node, parent, position });
    }
}

impl HostSurface for MemoryHost {
    fn create_element(&mut self, tag: &str, namespace: Namespace) -> NodeId {
        let node = self.push(MemoryNodeKind::Element {
            tag: tag.to_string(),
            namespace,
            attrs: Vec::new(),
            static_text: None,
        });
        self.mutations.push(HostMutation::CreateElement {
            node,
            tag: tag.to_string(),
            namespace,
        });
        node
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let node = self.push(MemoryNodeKind::Text(text.to_string()));
        self.mutations.push(HostMutation::CreateText {
            node,
            text: text.to_string(),
        });
        node
    }

    fn clone_node(&mut self, stencil: NodeId) -> NodeId {
        let kind = self
            .node(stencil)
            .map_or(MemoryNodeKind::Container, |node| node.kind.clone());
        let node = self.push(kind);
        self.mutations.push(HostMutation::Clone { node, stencil });
        node
    }

    fn apply_static(&mut self, node: NodeId, op: &StaticOp) {
        match op {
            StaticOp::Attr { name, value } => self.set_attribute(node, name, Some(value)),
            StaticOp::Text(text) => {
                if let Some(MemoryNodeKind::Element { static_text, .. }) =
                    self.node_mut(node).map(|n| &mut n.kind)
                {
                    *static_text = Some(text.clone());
                }
            }
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        let Some(MemoryNodeKind::Element { attrs, .. }) = self.node_mut(node).map(|n| &mut n.kind) else {
            return;
        };
        match value {
            Some(value) => match attrs.iter_mut().find(|(attr, _)| attr == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            },
            None => attrs.retain(|(attr, _)| attr != name),
        }
        self.mutations.push(HostMutation::SetAttr {
            node,
            name: name.to_string(),
            value: value.map(str::to_string),
        });
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(MemoryNodeKind::Text(existing)) = self.node_mut(node).map(|n| &mut n.kind) {
            *existing = text.to_string();
        }
        self.mutations.push(HostMutation::SetText {
            node,
            text: text.to_string(),
        });
    }

    fn remove(&mut self, node: NodeId) {
        if self.unlink(node) {
            self.mutations.push(HostMutation::Remove { node });
        }
    }

    fn after(&mut self, anchor: NodeId, node: NodeId) {
        let Some(parent) = self.parent(anchor) else { return };
        self.unlink(node);
        let position = self
            .node(parent)
            .and_then(|p| p.children.iter().position(|&child| child == anchor))
            .map_or(0, |i| i + 1);
        self.insert_at(parent, position, node);
    }

    fn prepend(&mut self, parent: NodeId, node: NodeId) {
        self.insert_at(parent, 0, node);
    }

    fn child_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match self.node(node).map(|n| &n.kind) {
            Some(MemoryNodeKind::Element { tag, .. }) => Some(tag),
            _ => None,
        }
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.node(node).map(|n| &n.kind), Some(MemoryNodeKind::Text(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement() {
        let mut host = MemoryHost::new();
        let root = host.create_container();
        let a = host.create_element("a", Namespace::Html);
        let b = host.create_element("b", Namespace::Html);
        let c = host.create_text("c");

        host.prepend(root, b);
        host.prepend(root, a);
        host.after(a, c);
        assert_eq!(host.inner_markup(root), "<a></a>c<b></b>");

        host.remove(a);
        assert_eq!(host.inner_markup(root), "c<b></b>");
        assert_eq!(host.parent(a), None);
    }

    #[test]
    fn test_move_keeps_single_parent() {
        let mut host = MemoryHost::new();
        let root = host.create_container();
        let a = host.create_element("a", Namespace::Html);
        let b = host.create_element("b", Namespace::Html);
        host.prepend(root, a);
        host.after(a, b);

        // Moving b in front of a
        host.prepend(root, b);
        assert_eq!(host.child_nodes(root), vec![b, a]);
    }

    #[test]
    fn test_clone_is_shallow() {
        let mut host = MemoryHost::new();
        let root = host.create_container();
        let stencil = host.create_element("p", Namespace::Html);
        host.apply_static(stencil, &StaticOp::Attr { name: "class".into(), value: "x".into() });
        host.apply_static(stencil, &StaticOp::Text("hi".into()));
        let child = host.create_text("nested");
        host.prepend(stencil, child);

        let copy = host.clone_node(stencil);
        host.prepend(root, copy);
        assert_eq!(host.inner_markup(root), "<p class=\"x\">hi</p>");
    }

    #[test]
    fn test_attribute_removal() {
        let mut host = MemoryHost::new();
        let el = host.create_element("a", Namespace::Html);
        host.set_attribute(el, "href", Some("/x"));
        assert_eq!(host.attribute(el, "href"), Some("/x"));
        host.set_attribute(el, "href", None);
        assert_eq!(host.attribute(el, "href"), None);
    }
}
