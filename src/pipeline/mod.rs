//! Reconciliation Pipeline
//!
//! This module turns templates into live leaves and commits their effects to
//! the host surface.
//!
//! # Pipeline Architecture
//!
//! ```text
//! TemplateSet → spawn / mount → staged ops → flush → HostSurface
//!                                                  ↘ onMount dispatch
//! ```
//!
//! ## Data Flow
//!
//! 1. **mount** - Creates blocks and host nodes, registers ops, stages initial values
//! 2. **flush** - Applies structural ops, then value ops, skipping unchanged values
//! 3. **dispatch** - Runs mount callbacks for elements attached by the flush
//!
//! ## Key Design Principles
//!
//! - **Deferred attachment**: Host nodes are created at mount, attached at flush
//! - **Local anchors**: Each attach only looks up its nearest visible sibling
//! - **One root, one queue**: Roots never share blocks, leaves or ops

mod mount;
mod plan;
mod root;
mod search;
mod spawn;

pub use plan::{Op, OpGroup, OpTarget, Plan};
pub use root::{Inbox, MountEvent, OpKey, Root};
pub use spawn::SpawnArgs;

pub(crate) use mount::resolve_source;
