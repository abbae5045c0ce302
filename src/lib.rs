//! # forest-reconcile
//!
//! Incremental block-tree reconciliation for reactive templates.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for fine-grained reactivity.
//!
//! ## Architecture
//!
//! Static templates are instantiated into live leaves. Every leaf that renders
//! something owns a block in the root's block tree, and every change to the
//! host surface is a staged op applied by a flush:
//! ```text
//! TemplateSet → Leaf tree + Block tree → staged ops → flush → HostSurface
//! ```
//!
//! Within a flush, structural ops (attach/detach) always commit before value
//! ops (attributes, text), and an op whose value did not change is skipped.
//!
//! ## Modules
//!
//! - [`types`] - Handles, draft kinds, namespaces, op values, diagnostics
//! - [`engine`] - Block tree, templates, leaves, event channel
//! - [`pipeline`] - Mount protocol, op plan, insertion search, the root
//! - [`primitives`] - List rows, routes, signal bindings
//! - [`host`] - Host surface trait and in-memory host

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod primitives;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::RootConfig;
pub use error::{ForestError, Result};

pub use engine::{
    Block, BlockKind, BlockKindTag, BlockKinds, BlockTree, Draft, ElementDraft, EventChannel, Leaf,
    LeafData, MountFn, Template, TemplateSet, ValueSource, Values, WatchId,
};

pub use host::{HostMutation, HostSurface, MemoryHost, MemoryNode, MemoryNodeKind};

pub use pipeline::{Inbox, MountEvent, OpKey, OpTarget, Plan, Root, SpawnArgs};
