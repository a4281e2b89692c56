//! Rendering of compiled output diagrams.
//!
//! Two formats are produced for a selected set of outputs:
//!
//! - a plain-text node listing ([`write_text`]), one section per output;
//! - a Graphviz DOT graph ([`write_dot`]) with all outputs in one picture,
//!   shared nodes drawn once.
//!
//! Both renderers only read the manager and iterate in a fixed order,
//! so the same diagrams always render to the same bytes.
//!
//! # Examples
//!
//! ```
//! use circuit_bdd::bdd::Bdd;
//! use circuit_bdd::circuit::{CircuitNode, GateKind};
//! use circuit_bdd::compile::CircuitToBdd;
//!
//! let mut c = CircuitToBdd::new(Bdd::default());
//! c.compile(&[
//!     CircuitNode::input(1, "a"),
//!     CircuitNode::input(2, "b"),
//!     CircuitNode::gate(3, GateKind::And, [1, 2]).with_label("c"),
//! ])
//! .unwrap();
//! c.select_outputs(["c"]).unwrap();
//!
//! let mut text = Vec::new();
//! c.dump_text(&mut text).unwrap();
//! assert!(String::from_utf8(text).unwrap().starts_with("variables: a b\n"));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::bdd::Bdd;
use crate::circuit::Label;
use crate::compile::CircuitToBdd;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::reference::Ref;

/// Outputs selected for rendering.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutputSet<H = Ref> {
    /// Output label to its function.
    pub nodes: BTreeMap<Label, H>,
    /// Labels of the variables the selected outputs depend on.
    pub vars: BTreeSet<Label>,
}

impl<H> Default for OutputSet<H> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            vars: BTreeSet::new(),
        }
    }
}

/// Paths of the files written by [`CircuitToBdd::print`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DumpFiles {
    pub text: PathBuf,
    pub dot: PathBuf,
}

impl<E: Engine> CircuitToBdd<E> {
    pub fn outputs(&self) -> &OutputSet<E::Handle> {
        &self.outputs
    }
}

impl CircuitToBdd<Bdd> {
    /// Select the outputs to render.
    ///
    /// Every label must have been declared by a compiled node.
    /// On error the previous selection is kept untouched.
    pub fn select_outputs<I, S>(&mut self, labels: I) -> Result<&OutputSet>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut nodes = BTreeMap::new();
        for label in labels {
            let label = label.as_ref();
            let node = self.get(label).ok_or_else(|| Error::UnknownLabel(label.to_string()))?;
            nodes.insert(label.to_string(), node);
        }

        let bdd = self.engine();
        let vars = bdd
            .support(nodes.values().copied())
            .into_iter()
            .map(|v| bdd.var_name(v))
            .collect();

        self.outputs = OutputSet { nodes, vars };
        Ok(&self.outputs)
    }

    pub fn dump_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write_text(self.engine(), self.outputs(), out)
    }

    pub fn dump_dot<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write_dot(self.engine(), self.outputs(), out)
    }

    /// Select `labels` and write `<name>.txt` and `<name>.dot` into `result_dir`.
    ///
    /// Both dumps are rendered before any file is created,
    /// so an unknown label leaves the directory untouched.
    /// If the graph cannot be written, the text dump is removed again.
    pub fn print<I, S>(&mut self, labels: I, result_dir: impl AsRef<Path>) -> Result<DumpFiles>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select_outputs(labels)?;

        let mut text = Vec::new();
        self.dump_text(&mut text)?;
        let mut dot = Vec::new();
        self.dump_dot(&mut dot)?;

        let result_dir = result_dir.as_ref();
        fs::create_dir_all(result_dir)?;
        let files = DumpFiles {
            text: result_dir.join(format!("{}.txt", self.name())),
            dot: result_dir.join(format!("{}.dot", self.name())),
        };
        fs::write(&files.text, text)?;
        if let Err(err) = fs::write(&files.dot, dot) {
            // A text dump without its graph is not a valid result.
            if let Err(e) = fs::remove_file(&files.text) {
                warn!("Could not remove {}: {}", files.text.display(), e);
            }
            return Err(err.into());
        }
        info!(
            "Wrote {} output(s) to {} and {}",
            self.outputs().nodes.len(),
            files.text.display(),
            files.dot.display()
        );

        Ok(files)
    }
}

fn edge(node: Ref) -> String {
    if node == Ref::ONE {
        "1".to_string()
    } else if node == Ref::ZERO {
        "0".to_string()
    } else {
        node.to_string()
    }
}

/// Write a node listing of every selected output.
///
/// ```text
/// variables: a b
///
/// output c: @4
///   @4 a high=@3 low=0
///   @3 b high=1 low=0
/// ```
///
/// Nodes are listed parents first; `~@n` is a complemented edge.
pub fn write_text<W: Write>(bdd: &Bdd, outputs: &OutputSet, out: &mut W) -> io::Result<()> {
    write!(out, "variables:")?;
    for var in outputs.vars.iter() {
        write!(out, " {}", var)?;
    }
    writeln!(out)?;

    for (label, &root) in outputs.nodes.iter() {
        writeln!(out)?;
        writeln!(out, "output {}: {}", label, edge(root))?;
        for id in bdd.descendants([root]).into_iter().rev() {
            if id == Ref::ONE.index() {
                continue;
            }
            writeln!(
                out,
                "  @{} {} high={} low={}",
                id,
                bdd.var_name(bdd.variable(id)),
                edge(bdd.high(id)),
                edge(bdd.low(id))
            )?;
        }
    }

    Ok(())
}

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for variable nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for terminal nodes (default: "square")
    pub terminal_shape: &'static str,
    /// Shape for output nodes (default: "rect")
    pub root_shape: &'static str,
    /// Style for high (then) edges (default: "solid")
    pub high_edge_style: &'static str,
    /// Style for low (else) edges (default: "dashed")
    pub low_edge_style: &'static str,
    /// Style for complemented edges (default: "dotted")
    pub negated_edge_style: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            terminal_shape: "square",
            root_shape: "rect",
            high_edge_style: "solid",
            low_edge_style: "dashed",
            negated_edge_style: "dotted",
        }
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Write all selected outputs as one DOT graph.
///
/// - Terminals `0` and `1` are squares at the bottom (sink rank).
/// - Variable nodes are circles labelled with the variable name, one rank per variable.
/// - Solid edges are high branches, dashed edges are low branches,
///   dotted edges with a hollow circle are complemented.
/// - Every output is a box at the top (source rank) labelled with its name.
///
/// All outputs share one graph instead of getting a subgraph each,
/// so a node reachable from several outputs is drawn once.
pub fn write_dot<W: Write>(bdd: &Bdd, outputs: &OutputSet, out: &mut W) -> io::Result<()> {
    write_dot_with_config(bdd, outputs, &DotConfig::default(), out)
}

pub fn write_dot_with_config<W: Write>(
    bdd: &Bdd,
    outputs: &OutputSet,
    config: &DotConfig,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "graph {{")?;
    writeln!(out, "node [shape={}, fixedsize=true];", config.node_shape)?;

    // Terminal nodes (0 and 1)
    writeln!(out, "{{ rank=sink")?;
    writeln!(out, "0 [shape={}, label=\"0\"];", config.terminal_shape)?;
    writeln!(out, "1 [shape={}, label=\"1\"];", config.terminal_shape)?;
    writeln!(out, "}}")?;

    let all_nodes = bdd.descendants(outputs.nodes.values().copied());

    let mut levels = BTreeMap::<u32, Vec<u32>>::new();
    for &id in all_nodes.iter() {
        if id == Ref::ONE.index() {
            continue;
        }
        levels.entry(bdd.variable(id)).or_default().push(id);
    }

    for (&v, level) in levels.iter() {
        writeln!(out, "{{ rank=same")?;
        for &id in level.iter() {
            writeln!(out, "{} [label={}];", id, quote(&bdd.var_name(v)))?;
        }
        writeln!(out, "}}")?;
    }

    for &id in all_nodes.iter() {
        if id == Ref::ONE.index() {
            continue;
        }

        let high = bdd.high(id);
        assert!(!high.is_negated());
        writeln!(out, "{} -- {} [style={}];", id, high.index(), config.high_edge_style)?;

        let low = bdd.low(id);
        if low == Ref::ZERO {
            writeln!(out, "{} -- 0 [style={}];", id, config.low_edge_style)?;
        } else if low.is_negated() {
            writeln!(
                out,
                "{} -- {} [style={}, dir=forward, arrowhead=odot];",
                id,
                low.index(),
                config.negated_edge_style
            )?;
        } else {
            writeln!(out, "{} -- {} [style={}];", id, low.index(), config.low_edge_style)?;
        }
    }

    writeln!(out, "{{ rank=source")?;
    for (i, label) in outputs.nodes.keys().enumerate() {
        writeln!(out, "r{} [shape={}, label={}];", i, config.root_shape, quote(label))?;
    }
    writeln!(out, "}}")?;

    for (i, &root) in outputs.nodes.values().enumerate() {
        if root == Ref::ZERO {
            writeln!(out, "r{} -- 0;", i)?;
        } else if root.is_negated() {
            writeln!(out, "r{} -- {} [dir=forward, arrowhead=odot];", i, root.index())?;
        } else {
            writeln!(out, "r{} -- {};", i, root.index())?;
        }
    }

    writeln!(out, "}}")?;
    Ok(())
}
