//! Gate compiler: drives an [`Engine`] one gate at a time over a topologically sorted netlist.
//!
//! Every compiled gate is remembered under its [`NodeId`] and, if it has one, under its label.
//! Later gates look their predecessors up in these maps, so a shared signal is built once.
//! Gates with more than two inputs are compiled as a left fold of the binary primitive,
//! in the order the netlist lists the inputs.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info, warn};

use crate::circuit::{CircuitNode, GateKind, Label, NodeId};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::export::OutputSet;

pub struct CircuitToBdd<E: Engine> {
    engine: E,
    /// Circuit node id to its function.
    node_to_bdd_id: HashMap<NodeId, E::Handle>,
    /// Label of a primary input/output to its function.
    label_to_bdd_id: HashMap<Label, E::Handle>,
    pub(crate) outputs: OutputSet<E::Handle>,
    /// Base name of the circuit, used to name dump files.
    name: String,
}

impl<E: Engine + Default> Default for CircuitToBdd<E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

impl<E: Engine> CircuitToBdd<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            node_to_bdd_id: HashMap::new(),
            label_to_bdd_id: HashMap::new(),
            outputs: OutputSet::default(),
            name: "circuit".to_string(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn node_to_bdd_id(&self) -> &HashMap<NodeId, E::Handle> {
        &self.node_to_bdd_id
    }

    pub fn label_to_bdd_id(&self) -> &HashMap<Label, E::Handle> {
        &self.label_to_bdd_id
    }

    /// Base name of the compiled circuit.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Function of a labelled node.
    pub fn get(&self, label: &str) -> Option<E::Handle> {
        self.label_to_bdd_id.get(label).copied()
    }

    /// Compile `circuit` read from `benchmark_file`.
    ///
    /// Same as [`compile`][Self::compile], but also takes the base name of the file
    /// as the name of the circuit.
    pub fn generate(&mut self, circuit: &[CircuitNode], benchmark_file: impl AsRef<Path>) -> Result<()> {
        if let Some(stem) = benchmark_file.as_ref().file_stem() {
            self.name = stem.to_string_lossy().into_owned();
        }
        info!("Generating BDDs for '{}'", self.name);
        self.compile(circuit)
    }

    /// Compile every node of a topologically sorted netlist.
    pub fn compile(&mut self, circuit: &[CircuitNode]) -> Result<()> {
        for node in circuit {
            self.compile_node(node)?;
        }
        info!(
            "Compiled {} circuit nodes ({} labelled)",
            circuit.len(),
            circuit.iter().filter(|node| node.label.is_some()).count()
        );
        Ok(())
    }

    /// Compile one node, all of whose predecessors must already be compiled.
    pub fn compile_node(&mut self, node: &CircuitNode) -> Result<E::Handle> {
        if self.node_to_bdd_id.contains_key(&node.id) {
            return Err(Error::DuplicateNode(node.id));
        }

        let res = match node.kind {
            GateKind::Input => self.input_gate(node)?,
            GateKind::Not => self.not_gate(node)?,
            GateKind::And => self.and_gate(node)?,
            GateKind::Or => self.or_gate(node)?,
            GateKind::Nand => self.nand_gate(node)?,
            GateKind::Nor => self.nor_gate(node)?,
            GateKind::Xor => self.xor_gate(node)?,
        };
        debug!("{} {} {:?} -> {:?}", node.kind, node.id, node.label, res);

        self.node_to_bdd_id.insert(node.id, res);
        if let Some(label) = &node.label {
            if let Some(old) = self.label_to_bdd_id.insert(label.clone(), res) {
                warn!("Label '{}' is declared again, replacing {:?} with {:?}", label, old, res);
            }
        }
        Ok(res)
    }

    /// Function of an already compiled circuit node.
    pub fn find_bdd_id(&self, id: NodeId) -> Result<E::Handle> {
        self.node_to_bdd_id
            .get(&id)
            .copied()
            .ok_or(Error::UnresolvedReference(id))
    }

    fn input_gate(&self, node: &CircuitNode) -> Result<E::Handle> {
        if !node.inputs.is_empty() {
            return Err(invalid_arity(node));
        }
        let label = node.label.as_deref().ok_or(Error::UnlabeledInput(node.id))?;
        Ok(self.engine.create_var(label))
    }

    fn not_gate(&self, node: &CircuitNode) -> Result<E::Handle> {
        match node.inputs.as_slice() {
            &[input] => {
                let f = self.find_bdd_id(input)?;
                Ok(self.engine.negate(f))
            }
            _ => Err(invalid_arity(node)),
        }
    }

    fn and_gate(&self, node: &CircuitNode) -> Result<E::Handle> {
        self.fold(node, E::and)
    }

    fn or_gate(&self, node: &CircuitNode) -> Result<E::Handle> {
        self.fold(node, E::or)
    }

    fn nand_gate(&self, node: &CircuitNode) -> Result<E::Handle> {
        let f = self.and_gate(node)?;
        Ok(self.engine.negate(f))
    }

    fn nor_gate(&self, node: &CircuitNode) -> Result<E::Handle> {
        let f = self.or_gate(node)?;
        Ok(self.engine.negate(f))
    }

    fn xor_gate(&self, node: &CircuitNode) -> Result<E::Handle> {
        self.fold(node, E::xor)
    }

    /// Left fold of `op` over the predecessors of `node`.
    fn fold(&self, node: &CircuitNode, op: fn(&E, E::Handle, E::Handle) -> E::Handle) -> Result<E::Handle> {
        let (&first, rest) = node.inputs.split_first().ok_or_else(|| invalid_arity(node))?;
        let mut acc = self.find_bdd_id(first)?;
        for &input in rest {
            let f = self.find_bdd_id(input)?;
            acc = op(&self.engine, acc, f);
        }
        Ok(acc)
    }
}

fn invalid_arity(node: &CircuitNode) -> Error {
    Error::InvalidArity {
        id: node.id,
        kind: node.kind,
        arity: node.inputs.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::engine::truth_table::{Op, TruthTable, TruthTableEngine};

    fn compiler() -> CircuitToBdd<TruthTableEngine> {
        CircuitToBdd::default()
    }

    fn three_inputs() -> Vec<CircuitNode> {
        vec![
            CircuitNode::input(1, "a"),
            CircuitNode::input(2, "b"),
            CircuitNode::input(3, "c"),
        ]
    }

    fn truth(c: &CircuitToBdd<TruthTableEngine>, label: &str) -> TruthTable {
        c.get(label).unwrap()
    }

    #[test]
    fn test_input_creates_variable() {
        let mut c = compiler();
        c.compile(&three_inputs()).unwrap();
        assert_eq!(c.get("a"), c.engine().var("a"));
        assert_eq!(c.get("c"), c.engine().var("c"));
        assert_eq!(c.node_to_bdd_id().len(), 3);
        assert_eq!(c.label_to_bdd_id().len(), 3);
    }

    #[test]
    fn test_every_node_is_mapped_once() {
        let mut c = compiler();
        let mut netlist = three_inputs();
        netlist.push(CircuitNode::gate(4, GateKind::And, [1, 2]));
        netlist.push(CircuitNode::gate(5, GateKind::Or, [4, 3]).with_label("out"));
        c.compile(&netlist).unwrap();

        assert_eq!(c.node_to_bdd_id().len(), netlist.len());
        for node in &netlist {
            assert!(c.find_bdd_id(node.id).is_ok());
        }
        // The anonymous gate has no label entry.
        assert_eq!(c.label_to_bdd_id().len(), 4);
        let (a, b, cc) = (truth(&c, "a"), truth(&c, "b"), truth(&c, "c"));
        assert_eq!(truth(&c, "out"), TruthTable((a.0 & b.0) | cc.0));
    }

    #[test]
    fn test_gate_kinds() {
        let mut c = compiler();
        let mut netlist = three_inputs();
        netlist.extend([
            CircuitNode::gate(10, GateKind::Not, [1]).with_label("not"),
            CircuitNode::gate(11, GateKind::And, [1, 2, 3]).with_label("and"),
            CircuitNode::gate(12, GateKind::Or, [1, 2, 3]).with_label("or"),
            CircuitNode::gate(13, GateKind::Nand, [1, 2, 3]).with_label("nand"),
            CircuitNode::gate(14, GateKind::Nor, [1, 2, 3]).with_label("nor"),
            CircuitNode::gate(15, GateKind::Xor, [1, 2, 3]).with_label("xor"),
        ]);
        c.compile(&netlist).unwrap();

        let (a, b, cc) = (truth(&c, "a").0, truth(&c, "b").0, truth(&c, "c").0);
        assert_eq!(truth(&c, "not").0, !a);
        assert_eq!(truth(&c, "and").0, a & b & cc);
        assert_eq!(truth(&c, "or").0, a | b | cc);
        assert_eq!(truth(&c, "nand").0, !(a & b & cc));
        assert_eq!(truth(&c, "nor").0, !(a | b | cc));
        assert_eq!(truth(&c, "xor").0, a ^ b ^ cc);
    }

    #[test]
    fn test_fold_is_left_to_right() {
        let mut c = compiler();
        let mut netlist = three_inputs();
        netlist.push(CircuitNode::gate(4, GateKind::And, [3, 1, 2]));
        c.compile(&netlist).unwrap();

        let (a, b, cc) = (truth(&c, "a"), truth(&c, "b"), truth(&c, "c"));
        let ops = c.engine().ops();
        let ca = TruthTable(cc.0 & a.0);
        assert_eq!(&ops[3..], &[Op::And(cc, a), Op::And(ca, b)]);
    }

    #[test]
    fn test_nand_is_negated_and() {
        let mut c = compiler();
        let mut netlist = three_inputs();
        netlist.push(CircuitNode::gate(4, GateKind::Nand, [1, 2]).with_label("nand"));
        netlist.push(CircuitNode::gate(5, GateKind::And, [1, 2]));
        netlist.push(CircuitNode::gate(6, GateKind::Not, [5]).with_label("not_and"));
        netlist.push(CircuitNode::gate(7, GateKind::Nor, [1, 2]).with_label("nor"));
        netlist.push(CircuitNode::gate(8, GateKind::Or, [1, 2]));
        netlist.push(CircuitNode::gate(9, GateKind::Not, [8]).with_label("not_or"));
        c.compile(&netlist).unwrap();

        assert_eq!(c.get("nand"), c.get("not_and"));
        assert_eq!(c.get("nor"), c.get("not_or"));

        let a = truth(&c, "a");
        let b = truth(&c, "b");
        let ops = c.engine().ops();
        assert_eq!(&ops[3..5], &[Op::And(a, b), Op::Not(TruthTable(a.0 & b.0))]);
    }

    #[test]
    fn test_input_order_does_not_change_function() {
        let orders: [[u32; 3]; 3] = [[1, 2, 3], [3, 2, 1], [2, 3, 1]];
        for kind in [GateKind::And, GateKind::Or, GateKind::Xor] {
            let mut results = Vec::new();
            for order in orders {
                let mut c = compiler();
                let mut netlist = three_inputs();
                netlist.push(CircuitNode::gate(4, kind, order).with_label("out"));
                c.compile(&netlist).unwrap();
                results.push(truth(&c, "out"));
            }
            assert!(results.windows(2).all(|w| w[0] == w[1]), "{} depends on input order", kind);
        }
    }

    #[test]
    fn test_compile_is_deterministic() {
        let mut netlist = three_inputs();
        netlist.push(CircuitNode::gate(4, GateKind::Xor, [1, 2]));
        netlist.push(CircuitNode::gate(5, GateKind::Nand, [4, 3]).with_label("out"));

        let mut c1 = compiler();
        c1.compile(&netlist).unwrap();
        let mut c2 = compiler();
        c2.compile(&netlist).unwrap();
        assert_eq!(c1.get("out"), c2.get("out"));
        assert_eq!(c1.engine().ops(), c2.engine().ops());
    }

    #[test]
    fn test_shared_signal_is_built_once() {
        let mut c = compiler();
        let mut netlist = three_inputs();
        netlist.push(CircuitNode::gate(4, GateKind::And, [1, 2]));
        netlist.push(CircuitNode::gate(5, GateKind::Or, [4, 3]).with_label("x"));
        netlist.push(CircuitNode::gate(6, GateKind::Xor, [4, 3]).with_label("y"));
        c.compile(&netlist).unwrap();

        let ands = c.engine().ops().iter().filter(|op| matches!(op, Op::And(..))).count();
        assert_eq!(ands, 1);
    }

    #[test]
    fn test_find_bdd_id_unresolved() {
        let c = compiler();
        let err = c.find_bdd_id(NodeId(42)).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference(NodeId(42))));
    }

    #[test]
    fn test_unsorted_netlist_fails() {
        let mut c = compiler();
        let netlist = vec![
            CircuitNode::input(1, "a"),
            CircuitNode::gate(3, GateKind::And, [1, 2]).with_label("c"),
            CircuitNode::input(2, "b"),
        ];
        let err = c.compile(&netlist).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference(NodeId(2))));
        // Nothing is recorded for the failing gate.
        assert!(c.get("c").is_none());
        assert!(c.find_bdd_id(NodeId(3)).is_err());
    }

    #[test]
    fn test_duplicate_node_fails() {
        let mut c = compiler();
        let netlist = vec![CircuitNode::input(1, "a"), CircuitNode::input(1, "b")];
        let err = c.compile(&netlist).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode(NodeId(1))));
    }

    #[test]
    fn test_invalid_arity() {
        let mut c = compiler();
        c.compile(&three_inputs()).unwrap();

        let err = c.compile_node(&CircuitNode::gate(4, GateKind::Not, [1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidArity { arity: 2, kind: GateKind::Not, .. }));

        let err = c.compile_node(&CircuitNode::gate(5, GateKind::And, [])).unwrap_err();
        assert!(matches!(err, Error::InvalidArity { arity: 0, kind: GateKind::And, .. }));

        let mut input = CircuitNode::input(6, "d");
        input.inputs.push(NodeId(1));
        let err = c.compile_node(&input).unwrap_err();
        assert!(matches!(err, Error::InvalidArity { arity: 1, kind: GateKind::Input, .. }));
    }

    #[test]
    fn test_unlabeled_input() {
        let mut c = compiler();
        let mut input = CircuitNode::input(1, "a");
        input.label = None;
        let err = c.compile_node(&input).unwrap_err();
        assert!(matches!(err, Error::UnlabeledInput(NodeId(1))));
    }

    #[test]
    fn test_single_input_fold_is_identity() {
        let mut c = compiler();
        let mut netlist = three_inputs();
        netlist.push(CircuitNode::gate(4, GateKind::Or, [2]).with_label("buf"));
        c.compile(&netlist).unwrap();
        assert_eq!(c.get("buf"), c.get("b"));
    }

    #[test]
    fn test_generate_takes_file_stem() {
        let mut c = compiler();
        c.generate(&three_inputs(), "benchmarks/c17.bench").unwrap();
        assert_eq!(c.name(), "c17");
    }
}
