//! Netlist records consumed by the gate compiler.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::Error;

/// Unique identifier of a gate instance in a netlist.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(pub u32);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name of a primary input or output.
pub type Label = String;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GateKind {
    Input,
    Not,
    And,
    Or,
    Nand,
    Nor,
    Xor,
}

impl GateKind {
    pub const ALL: [GateKind; 7] = [
        GateKind::Input,
        GateKind::Not,
        GateKind::And,
        GateKind::Or,
        GateKind::Nand,
        GateKind::Nor,
        GateKind::Xor,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            GateKind::Input => "INPUT",
            GateKind::Not => "NOT",
            GateKind::And => "AND",
            GateKind::Or => "OR",
            GateKind::Nand => "NAND",
            GateKind::Nor => "NOR",
            GateKind::Xor => "XOR",
        }
    }
}

impl Display for GateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GateKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownGateKind(s.to_string()))
    }
}

/// One gate of a netlist.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CircuitNode {
    pub id: NodeId,
    pub kind: GateKind,
    /// Predecessors, in the order the netlist lists them.
    pub inputs: Vec<NodeId>,
    pub label: Option<Label>,
}

// Constructors
impl CircuitNode {
    pub fn input(id: u32, label: impl Into<Label>) -> Self {
        Self {
            id: NodeId(id),
            kind: GateKind::Input,
            inputs: Vec::new(),
            label: Some(label.into()),
        }
    }

    pub fn gate(id: u32, kind: GateKind, inputs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            id: NodeId(id),
            kind,
            inputs: inputs.into_iter().map(NodeId).collect(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A topologically sorted netlist together with its declared primary inputs and outputs.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    pub nodes: Vec<CircuitNode>,
    pub inputs: Vec<Label>,
    pub outputs: Vec<Label>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_kind_from_str() {
        assert_eq!("AND".parse::<GateKind>().unwrap(), GateKind::And);
        assert_eq!("nand".parse::<GateKind>().unwrap(), GateKind::Nand);
        assert_eq!("Xor".parse::<GateKind>().unwrap(), GateKind::Xor);
        for kind in GateKind::ALL {
            assert_eq!(kind.to_string().parse::<GateKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_gate_kind_unknown() {
        let err = "DFF".parse::<GateKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownGateKind(ref tag) if tag == "DFF"));
    }

    #[test]
    fn test_constructors() {
        let node = CircuitNode::gate(3, GateKind::And, [1, 2]).with_label("c");
        assert_eq!(node.id, NodeId(3));
        assert_eq!(node.inputs, vec![NodeId(1), NodeId(2)]);
        assert_eq!(node.label.as_deref(), Some("c"));

        let input = CircuitNode::input(1, "a");
        assert_eq!(input.kind, GateKind::Input);
        assert!(input.inputs.is_empty());
    }
}
