use thiserror::Error;

use crate::node_id::NodeId;

/// A fatal compilation failure.
///
/// Every category here is terminal: the resolver, layout engine and
/// emitters propagate these through `Result` and the driver aborts on the
/// first one. Bugs in the compiler itself (a type-query match that should
/// be exhaustive, a missing field-offset annotation) stay `panic!`s rather
/// than becoming a variant of this enum — they are not conditions a
/// well-formed program can trigger.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unresolved identifier `{name}` at node {node:?}")]
    UnresolvedIdentifier { name: String, node: NodeId },

    #[error("unsupported construct: {what} (node {node:?}) -- to be implemented")]
    Unsupported { what: String, node: NodeId },

    #[error("internal invariant failure: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn unsupported(what: impl Into<String>, node: NodeId) -> Self {
        CompileError::Unsupported {
            what: what.into(),
            node,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
