//! Templates - Static drafts and their instantiation sites.
//!
//! A [`Draft`] describes the shape of one template node. A [`Template`] pairs a
//! draft with the bookkeeping of the place it is used: its sibling index and
//! the ordered list of child templates registered under it.
//!
//! # Explicit parent context
//!
//! Children are registered by passing the enclosing template to
//! [`TemplateSet::add`]. There is no ambient "current template":
//!
//! ```ignore
//! let mut set = TemplateSet::new();
//! let app = set.add(None, Draft::Using);
//! let list = set.add(Some(app), Draft::List);
//! set.add(Some(list), ElementDraft::new("li").into());
//! ```

use std::fmt;
use std::rc::Rc;

use crate::types::{Cleanup, Diagnostic, DraftKind, DraftKinds, Env, NodeId, StaticOp, TemplateId};

// =============================================================================
// Drafts
// =============================================================================

/// Mount callback: receives the element's host node, may return a teardown.
pub type MountFn = Rc<dyn Fn(NodeId) -> Option<Cleanup>>;

/// Source of a text or attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    Static(String),
    /// Read from the named field of the leaf's values.
    Field(String),
}

/// Element draft data.
#[derive(Clone, Default)]
pub struct ElementDraft {
    pub tag: String,
    pub static_seq: Vec<StaticOp>,
    /// Attributes bound to row fields, applied through value ops.
    pub bindings: Vec<(String, String)>,
    pub on_mount: Vec<MountFn>,
    /// Initial requested visibility.
    pub visible: bool,
}

impl ElementDraft {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            visible: true,
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_seq.push(StaticOp::Attr {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.static_seq.push(StaticOp::Text(text.into()));
        self
    }

    pub fn bind_attr(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.bindings.push((name.into(), field.into()));
        self
    }

    pub fn on_mount(mut self, f: impl Fn(NodeId) -> Option<Cleanup> + 'static) -> Self {
        self.on_mount.push(Rc::new(f));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

impl fmt::Debug for ElementDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementDraft")
            .field("tag", &self.tag)
            .field("static_seq", &self.static_seq)
            .field("bindings", &self.bindings)
            .field("on_mount", &self.on_mount.len())
            .field("visible", &self.visible)
            .finish()
    }
}

impl From<ElementDraft> for Draft {
    fn from(draft: ElementDraft) -> Self {
        Draft::Element(draft)
    }
}

/// Static description of one template node.
#[derive(Debug, Clone)]
pub enum Draft {
    Element(ElementDraft),
    Text(ValueSource),
    /// Child templates form the row body.
    List,
    Route,
    /// Recursive template body. Instantiated through `RecItem`.
    Rec,
    RecItem { rec: TemplateId },
    /// Reusable template body. Instantiated through `BlockItem`.
    Block,
    BlockItem { block: TemplateId },
    Using,
    ListItem,
    Unknown(String),
}

impl Draft {
    pub fn text(text: impl Into<String>) -> Self {
        Draft::Text(ValueSource::Static(text.into()))
    }

    pub fn text_field(field: impl Into<String>) -> Self {
        Draft::Text(ValueSource::Field(field.into()))
    }

    pub fn kind(&self) -> DraftKind {
        match self {
            Draft::Element(_) => DraftKind::Element,
            Draft::Text(_) => DraftKind::Text,
            Draft::List => DraftKind::List,
            Draft::Route => DraftKind::Route,
            Draft::Rec => DraftKind::Rec,
            Draft::RecItem { .. } => DraftKind::RecItem,
            Draft::Block => DraftKind::Block,
            Draft::BlockItem { .. } => DraftKind::BlockItem,
            Draft::Using => DraftKind::Using,
            Draft::ListItem => DraftKind::ListItem,
            Draft::Unknown(_) => DraftKind::Unknown,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Debug, Clone)]
pub struct Template {
    pub draft: Draft,
    pub env: Option<Env>,
    pub parent: Option<TemplateId>,
    in_parent_index: Option<usize>,
    child_count: usize,
    child_templates: Vec<TemplateId>,
}

impl Template {
    fn new(draft: Draft, parent: Option<TemplateId>) -> Self {
        Self {
            draft,
            env: None,
            parent,
            in_parent_index: None,
            child_count: 0,
            child_templates: Vec::new(),
        }
    }

    pub fn kind(&self) -> DraftKind {
        self.draft.kind()
    }

    pub fn in_parent_index(&self) -> Option<usize> {
        self.in_parent_index
    }

    pub fn child_count(&self) -> usize {
        self.child_count
    }

    pub fn child_templates(&self) -> &[TemplateId] {
        &self.child_templates
    }
}

/// Owner of every template of an application.
#[derive(Debug, Default)]
pub struct TemplateSet {
    templates: Vec<Template>,
    diagnostics: Vec<Diagnostic>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a template under `parent` and register it there.
    pub fn add(&mut self, parent: Option<TemplateId>, draft: Draft) -> TemplateId {
        let id = TemplateId(self.templates.len());
        self.templates.push(Template::new(draft, parent));
        self.set_in_parent_index(parent, id);
        id
    }

    /// Declare the rendering environment of a template subtree.
    pub fn set_env(&mut self, id: TemplateId, env: Env) {
        if let Some(template) = self.templates.get_mut(id.0) {
            template.env = Some(env);
        }
    }

    pub fn get(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Assign `child` the next sibling index of `parent`.
    ///
    /// Root-level templates get no index. `listItem` and `rec` templates are
    /// instantiated per row / per recursion, so they are never indexed here.
    fn set_in_parent_index(&mut self, parent: Option<TemplateId>, child: TemplateId) {
        let Some(parent) = parent else { return };
        let child_kind = self.templates[child.0].kind();
        if DraftKinds::DEFERRED_INDEX.intersects(child_kind.as_set()) {
            return;
        }
        let Some(parent_template) = self.templates.get_mut(parent.0) else {
            return;
        };
        let parent_kind = parent_template.kind();
        if !DraftKinds::PARENT_CONTEXTS.intersects(parent_kind.as_set()) {
            log::warn!(
                target: "forest::template",
                "unexpected currentTemplate type {parent_kind}"
            );
            self.diagnostics.push(Diagnostic::UnexpectedParent {
                parent: parent_kind,
                child: child_kind,
            });
            return;
        }
        let index = parent_template.child_count;
        parent_template.child_count += 1;
        parent_template.child_templates.push(child);
        self.templates[child.0].in_parent_index = Some(index);
    }
}

impl std::ops::Index<TemplateId> for TemplateSet {
    type Output = Template;

    fn index(&self, id: TemplateId) -> &Template {
        &self.templates[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_indices_follow_registration() {
        let mut set = TemplateSet::new();
        let app = set.add(None, Draft::Using);
        let children: Vec<_> = (0..5)
            .map(|i| set.add(Some(app), ElementDraft::new(format!("h{i}")).into()))
            .collect();

        for (expected, id) in children.iter().enumerate() {
            assert_eq!(set[*id].in_parent_index(), Some(expected));
        }
        assert_eq!(set[app].child_count(), 5);
        assert_eq!(set[app].child_templates(), children.as_slice());
        assert_eq!(set[app].in_parent_index(), None);
    }

    #[test]
    fn test_deferred_kinds_get_no_index() {
        let mut set = TemplateSet::new();
        let app = set.add(None, Draft::Using);
        let first = set.add(Some(app), Draft::text("a"));
        let rec = set.add(Some(app), Draft::Rec);
        let item = set.add(Some(app), Draft::ListItem);
        let second = set.add(Some(app), Draft::RecItem { rec });

        assert_eq!(set[rec].in_parent_index(), None);
        assert_eq!(set[item].in_parent_index(), None);
        assert_eq!(set[first].in_parent_index(), Some(0));
        assert_eq!(set[second].in_parent_index(), Some(1));
        assert_eq!(set[app].child_templates(), &[first, second]);
    }

    #[test]
    fn test_unexpected_parent_warns() {
        let mut set = TemplateSet::new();
        let text = set.add(None, Draft::text("leaf"));
        let child = set.add(Some(text), ElementDraft::new("b").into());

        assert_eq!(set[child].in_parent_index(), None);
        assert!(set[text].child_templates().is_empty());
        assert_eq!(
            set.diagnostics(),
            &[Diagnostic::UnexpectedParent {
                parent: DraftKind::Text,
                child: DraftKind::Element,
            }]
        );
    }

    #[test]
    fn test_unknown_draft_keeps_its_slot() {
        let mut set = TemplateSet::new();
        let app = set.add(None, Draft::Using);
        set.add(Some(app), ElementDraft::new("a").into());
        let widget = set.add(Some(app), Draft::Unknown("widget".into()));
        let after = set.add(Some(app), ElementDraft::new("b").into());

        assert_eq!(set[widget].in_parent_index(), Some(1));
        assert_eq!(set[after].in_parent_index(), Some(2));

        set.add(Some(widget), Draft::text("lost"));
        assert_eq!(set.diagnostics().len(), 1);
    }

    #[test]
    fn test_rec_body_registers_into_rec() {
        let mut set = TemplateSet::new();
        let rec = set.add(None, Draft::Rec);
        let body = set.add(Some(rec), ElementDraft::new("li").into());
        let list = set.add(Some(body), Draft::List);
        let item = set.add(Some(list), Draft::RecItem { rec });

        assert_eq!(set[rec].child_templates(), &[body]);
        assert_eq!(set[list].child_templates(), &[item]);
        assert_eq!(set[item].in_parent_index(), Some(0));
    }
}
