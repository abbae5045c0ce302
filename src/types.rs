//! Core types for forest-reconcile.
//!
//! These types define the foundation that everything builds on: the handles
//! that tie leaves, blocks, ops and templates together, the closed set of
//! draft kinds, and the values that flow through the op scheduler.

use std::fmt;

// =============================================================================
// Handles
// =============================================================================

slotmap::new_key_type! {
    /// Handle to a live leaf in a root's leaf table.
    pub struct LeafId;
    /// Handle to a block in a root's block tree.
    pub struct BlockId;
    /// Handle to a scheduled op.
    pub struct OpId;
    /// Handle to an op group.
    pub struct GroupId;
}

/// Handle to a template inside a [`TemplateSet`](crate::engine::TemplateSet).
///
/// Templates are never freed, so a plain index is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub(crate) usize);

/// Host render primitive handle, issued by a [`HostSurface`](crate::host::HostSurface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

// =============================================================================
// Draft kinds
// =============================================================================

/// Type tag of a draft.
///
/// `Unknown` is the open extension point: a draft whose kind the mount
/// protocol does not understand. Mounting one is a warning, never a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftKind {
    Element,
    Text,
    List,
    Route,
    Rec,
    RecItem,
    Block,
    BlockItem,
    Using,
    ListItem,
    Unknown,
}

impl DraftKind {
    /// Single-bit set for this kind.
    pub const fn as_set(self) -> DraftKinds {
        match self {
            DraftKind::Element => DraftKinds::ELEMENT,
            DraftKind::Text => DraftKinds::TEXT,
            DraftKind::List => DraftKinds::LIST,
            DraftKind::Route => DraftKinds::ROUTE,
            DraftKind::Rec => DraftKinds::REC,
            DraftKind::RecItem => DraftKinds::REC_ITEM,
            DraftKind::Block => DraftKinds::BLOCK,
            DraftKind::BlockItem => DraftKinds::BLOCK_ITEM,
            DraftKind::Using => DraftKinds::USING,
            DraftKind::ListItem => DraftKinds::LIST_ITEM,
            DraftKind::Unknown => DraftKinds::empty(),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DraftKind::Element => "element",
            DraftKind::Text => "text",
            DraftKind::List => "list",
            DraftKind::Route => "route",
            DraftKind::Rec => "rec",
            DraftKind::RecItem => "recItem",
            DraftKind::Block => "block",
            DraftKind::BlockItem => "blockItem",
            DraftKind::Using => "using",
            DraftKind::ListItem => "listItem",
            DraftKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DraftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// Set of draft kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DraftKinds: u16 {
        const ELEMENT = 1 << 0;
        const TEXT = 1 << 1;
        const LIST = 1 << 2;
        const ROUTE = 1 << 3;
        const REC = 1 << 4;
        const REC_ITEM = 1 << 5;
        const BLOCK = 1 << 6;
        const BLOCK_ITEM = 1 << 7;
        const USING = 1 << 8;
        const LIST_ITEM = 1 << 9;

        /// Kinds that may act as the enclosing template while children are added.
        const PARENT_CONTEXTS = Self::ELEMENT.bits()
            | Self::USING.bits()
            | Self::ROUTE.bits()
            | Self::LIST.bits()
            | Self::REC.bits()
            | Self::REC_ITEM.bits()
            | Self::BLOCK.bits()
            | Self::BLOCK_ITEM.bits();

        /// Kinds instantiated per row / per recursion; they never get a sibling index.
        const DEFERRED_INDEX = Self::LIST_ITEM.bits() | Self::REC.bits();
    }
}

// =============================================================================
// Namespace
// =============================================================================

/// Markup namespace a host element is created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Namespace {
    #[default]
    Html,
    Svg,
}

impl Namespace {
    pub const SVG_URI: &'static str = "http://www.w3.org/2000/svg";
    pub const HTML_URI: &'static str = "http://www.w3.org/1999/xhtml";

    pub const fn uri(self) -> &'static str {
        match self {
            Namespace::Html => Self::HTML_URI,
            Namespace::Svg => Self::SVG_URI,
        }
    }

    /// Namespace an element with this tag declares for its descendants.
    pub fn declared_by(tag: &str) -> Option<Namespace> {
        match tag {
            "svg" => Some(Namespace::Svg),
            "foreignObject" => Some(Namespace::Html),
            _ => None,
        }
    }
}

/// Declared rendering environment of a template subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Env {
    pub namespace: Namespace,
}

// =============================================================================
// Ops
// =============================================================================

/// Commit tier of an op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Tree attach/detach.
    Structural,
    /// Attribute, text and content writes.
    Value,
}

/// A value staged into or applied by an op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpValue {
    Bool(bool),
    Text(String),
    Absent,
}

impl OpValue {
    pub fn as_bool(&self) -> bool {
        match self {
            OpValue::Bool(b) => *b,
            OpValue::Text(s) => !s.is_empty(),
            OpValue::Absent => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OpValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for OpValue {
    fn from(value: bool) -> Self {
        OpValue::Bool(value)
    }
}

impl From<String> for OpValue {
    fn from(value: String) -> Self {
        OpValue::Text(value)
    }
}

impl From<&str> for OpValue {
    fn from(value: &str) -> Self {
        OpValue::Text(value.to_string())
    }
}

impl From<Option<String>> for OpValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(OpValue::Absent, OpValue::Text)
    }
}

/// Mutation applied once when a host node is created from a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticOp {
    Attr { name: String, value: String },
    Text(String),
}

/// Cleanup function returned by mount callbacks and signal bindings.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Diagnostics
// =============================================================================

/// A recoverable condition that was logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A draft kind the mount protocol does not know was skipped.
    UnknownDraft { name: String },
    /// A template was added under a parent that cannot hold children.
    UnexpectedParent { parent: DraftKind, child: DraftKind },
    /// Hydration found no matching host node and created a fresh one.
    HydrationMismatch { expected: String },
    /// A keyed row reconcile saw the same key twice.
    DuplicateKey { key: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownDraft { name } => write!(f, "unexpected draft type {name}"),
            Diagnostic::UnexpectedParent { parent, child } => {
                write!(f, "unexpected parent template type {parent} for {child}")
            }
            Diagnostic::HydrationMismatch { expected } => {
                write!(f, "hydration mismatch: expected {expected}")
            }
            Diagnostic::DuplicateKey { key } => write!(f, "duplicate row key {key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_context_set() {
        assert!(DraftKinds::PARENT_CONTEXTS.contains(DraftKind::List.as_set()));
        assert!(DraftKinds::PARENT_CONTEXTS.contains(DraftKind::Using.as_set()));
        assert!(!DraftKinds::PARENT_CONTEXTS.contains(DraftKind::Text.as_set()));
        assert!(!DraftKinds::PARENT_CONTEXTS.contains(DraftKind::ListItem.as_set()));
        assert!(!DraftKinds::PARENT_CONTEXTS.intersects(DraftKind::Unknown.as_set()));
    }

    #[test]
    fn test_namespace_declared_by() {
        assert_eq!(Namespace::declared_by("svg"), Some(Namespace::Svg));
        assert_eq!(Namespace::declared_by("foreignObject"), Some(Namespace::Html));
        assert_eq!(Namespace::declared_by("div"), None);
    }

    #[test]
    fn test_op_value_conversions() {
        assert_eq!(OpValue::from(true), OpValue::Bool(true));
        assert_eq!(OpValue::from(None::<String>), OpValue::Absent);
        assert_eq!(OpValue::from("x").as_text(), Some("x"));
        assert!(!OpValue::Absent.as_bool());
    }
}
