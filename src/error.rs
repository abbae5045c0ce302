//! Error types.
//!
//! Only contract violations and stale handles surface as errors. Template
//! authoring mismatches are warnings, see [`Diagnostic`](crate::types::Diagnostic).

use crate::engine::BlockKindTag;
use crate::types::{BlockId, LeafId, OpId, TemplateId};

#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// A block that cannot host children was used as a fragment parent.
    #[error("incorrect parent {0}")]
    Structure(BlockKindTag),

    #[error("leaf {0:?} is not alive")]
    StaleLeaf(LeafId),

    #[error("block {0:?} is not alive")]
    StaleBlock(BlockId),

    #[error("op {0:?} is not alive")]
    StaleOp(OpId),

    #[error("template {0:?} does not exist")]
    UnknownTemplate(TemplateId),

    #[error("leaf {0:?} is not a list")]
    NotAList(LeafId),

    #[error("leaf {0:?} is not a route")]
    NotARoute(LeafId),

    #[error("leaf {0:?} is not a list row")]
    NotARow(LeafId),

    #[error("leaf {leaf:?} has no {op} op")]
    MissingOp { leaf: LeafId, op: &'static str },
}

pub type Result<T, E = ForestError> = std::result::Result<T, E>;
