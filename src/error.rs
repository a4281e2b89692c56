use std::io;

use thiserror::Error;

use crate::circuit::{GateKind, NodeId};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A gate refers to a circuit node that has not been compiled yet.
    #[error("circuit node {0} is referenced before it was compiled")]
    UnresolvedReference(NodeId),

    /// The same circuit node appears twice in the netlist.
    #[error("circuit node {0} is compiled twice")]
    DuplicateNode(NodeId),

    #[error("unknown gate kind `{0}`")]
    UnknownGateKind(String),

    /// An output was requested that no compiled node declares.
    #[error("unknown output label `{0}`")]
    UnknownLabel(String),

    #[error("{kind} gate {id} cannot have {arity} input(s)")]
    InvalidArity { id: NodeId, kind: GateKind, arity: usize },

    #[error("input node {0} has no label")]
    UnlabeledInput(NodeId),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}
