//! Reader for ISCAS `.bench` netlists.
//!
//! ```text
//! # c17
//! INPUT(G1)
//! INPUT(G2)
//! OUTPUT(G3)
//! G3 = NAND(G1, G2)
//! ```
//!
//! Signals may be used before they are defined. The reader assigns node ids
//! in order of definition and returns the gates in topological order,
//! ties broken by definition order. Primary inputs and outputs are labelled
//! with their signal names, all other gates are anonymous.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::circuit::{CircuitNode, GateKind, Netlist, NodeId};
use crate::error::{Error, Result};

struct Definition {
    name: String,
    kind: GateKind,
    args: Vec<String>,
    line: usize,
}

/// Read and parse a `.bench` file.
pub fn read_bench(path: impl AsRef<Path>) -> Result<Netlist> {
    let source = fs::read_to_string(path)?;
    parse_bench(&source)
}

/// Split `NAME(arg, ...)` into its name and arguments.
fn parse_call(s: &str) -> Option<(&str, Vec<&str>)> {
    let open = s.find('(')?;
    let inner = s[open + 1..].strip_suffix(')')?;
    let name = s[..open].trim();
    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner.split(',').map(str::trim).collect()
    };
    Some((name, args))
}

fn is_signal_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | ',' | '=' | '#'))
}

pub fn parse_bench(source: &str) -> Result<Netlist> {
    let mut defs: Vec<Definition> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut inputs = Vec::new();
    let mut outputs: Vec<(String, usize)> = Vec::new();

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let def = if let Some((lhs, rhs)) = line.split_once('=') {
            let name = lhs.trim();
            let (kind, args) =
                parse_call(rhs.trim()).ok_or_else(|| Error::parse(line_no, format!("expected a gate, got `{}`", rhs.trim())))?;
            let kind: GateKind = kind.parse()?;
            if kind == GateKind::Input {
                return Err(Error::parse(line_no, "INPUT is not a gate"));
            }
            Definition {
                name: name.to_string(),
                kind,
                args: args.into_iter().map(String::from).collect(),
                line: line_no,
            }
        } else {
            let (keyword, args) =
                parse_call(line).ok_or_else(|| Error::parse(line_no, format!("unexpected `{}`", line)))?;
            let name = match args.as_slice() {
                &[name] => name,
                _ => return Err(Error::parse(line_no, format!("{} takes exactly one signal", keyword))),
            };
            if !is_signal_name(name) {
                return Err(Error::parse(line_no, format!("invalid signal name `{}`", name)));
            }
            if keyword.eq_ignore_ascii_case("OUTPUT") {
                outputs.push((name.to_string(), line_no));
                continue;
            } else if keyword.eq_ignore_ascii_case("INPUT") {
                inputs.push(name.to_string());
                Definition {
                    name: name.to_string(),
                    kind: GateKind::Input,
                    args: Vec::new(),
                    line: line_no,
                }
            } else {
                return Err(Error::parse(line_no, format!("unexpected `{}`", keyword)));
            }
        };

        if !is_signal_name(&def.name) {
            return Err(Error::parse(line_no, format!("invalid signal name `{}`", def.name)));
        }
        if let Some(arg) = def.args.iter().find(|arg| !is_signal_name(arg)) {
            return Err(Error::parse(line_no, format!("invalid signal name `{}`", arg)));
        }
        if index.contains_key(&def.name) {
            return Err(Error::parse(line_no, format!("signal `{}` is defined twice", def.name)));
        }
        index.insert(def.name.clone(), defs.len());
        defs.push(def);
    }

    // Resolve fan-ins.
    let mut fanins: Vec<Vec<usize>> = Vec::with_capacity(defs.len());
    for def in defs.iter() {
        let ids = def
            .args
            .iter()
            .map(|arg| {
                index
                    .get(arg)
                    .copied()
                    .ok_or_else(|| Error::parse(def.line, format!("signal `{}` is never defined", arg)))
            })
            .collect::<Result<Vec<_>>>()?;
        fanins.push(ids);
    }
    for (name, line) in outputs.iter() {
        if !index.contains_key(name) {
            return Err(Error::parse(*line, format!("output `{}` is never defined", name)));
        }
    }

    let order = topological_order(&defs, &fanins)?;

    let output_names: HashSet<&str> = outputs.iter().map(|(name, _)| name.as_str()).collect();
    let mut used = vec![false; defs.len()];
    for fanin in fanins.iter() {
        for &j in fanin {
            used[j] = true;
        }
    }

    let mut nodes = Vec::with_capacity(defs.len());
    for i in order {
        let def = &defs[i];
        if !used[i] && !output_names.contains(def.name.as_str()) {
            warn!("Signal '{}' (line {}) drives nothing", def.name, def.line);
        }
        let label = (def.kind == GateKind::Input || output_names.contains(def.name.as_str())).then(|| def.name.clone());
        nodes.push(CircuitNode {
            id: NodeId(i as u32),
            kind: def.kind,
            inputs: fanins[i].iter().map(|&j| NodeId(j as u32)).collect(),
            label,
        });
    }
    debug!(
        "Parsed {} nodes, {} inputs, {} outputs",
        nodes.len(),
        inputs.len(),
        outputs.len()
    );

    Ok(Netlist {
        nodes,
        inputs,
        outputs: outputs.into_iter().map(|(name, _)| name).collect(),
    })
}

/// Kahn's algorithm; the smallest ready definition goes first.
fn topological_order(defs: &[Definition], fanins: &[Vec<usize>]) -> Result<Vec<usize>> {
    let mut pending: Vec<usize> = fanins.iter().map(Vec::len).collect();
    let mut fanouts: Vec<Vec<usize>> = vec![Vec::new(); defs.len()];
    for (i, fanin) in fanins.iter().enumerate() {
        for &j in fanin {
            fanouts[j].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..defs.len()).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(defs.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &k in fanouts[i].iter() {
            pending[k] -= 1;
            if pending[k] == 0 {
                ready.insert(k);
            }
        }
    }

    if order.len() < defs.len() {
        let stuck = (0..defs.len()).find(|&i| pending[i] > 0).unwrap_or_default();
        let def = &defs[stuck];
        return Err(Error::parse(
            def.line,
            format!("signal `{}` is part of a combinational cycle", def.name),
        ));
    }

    Ok(order)
}
