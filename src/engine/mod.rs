//! Engine - Block tree, templates, leaves and the event channel.
//!
//! The engine holds the data structures the pipeline operates on:
//! - BlockTree: the live render tree
//! - TemplateSet: drafts and sibling-index bookkeeping
//! - Leaf: live template instances
//! - EventChannel: deferred event dispatch
//!
//! # Ownership
//!
//! Blocks own their children through index slots. Parent links are plain
//! handles, so the tree stays acyclic in ownership terms:
//!
//! ```text
//! Block { parent: Some(BlockId), child: [Some(BlockId), None, Some(BlockId)] }
//! ```

mod block;
mod channel;
mod leaf;
mod template;

pub use block::*;
pub use channel::*;
pub use leaf::*;
pub use template::*;
