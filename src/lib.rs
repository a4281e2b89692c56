//! # circuit-bdd: combinational circuits to Binary Decision Diagrams
//!
//! **`circuit-bdd`** compiles a combinational netlist into BDDs, one gate at a time,
//! and dumps the diagrams of selected outputs as a node listing and as a Graphviz graph.
//!
//! ## Pipeline
//!
//! 1. [`bench`] reads an ISCAS `.bench` file into a topologically sorted [`Netlist`][circuit::Netlist].
//! 2. [`CircuitToBdd`][compile::CircuitToBdd] drives an [`Engine`][engine::Engine] over the netlist
//!    and remembers the function of every circuit node (by id) and of every primary input/output (by label).
//! 3. [`export`] selects outputs by label and renders them.
//!
//! The engine is a narrow trait, so the compiler can run on any Boolean function builder.
//! The crate ships [`Bdd`][bdd::Bdd], a manager with complemented edges and hash-consed nodes.
//!
//! ## Basic Usage
//!
//! ```rust
//! use circuit_bdd::bdd::Bdd;
//! use circuit_bdd::bench::parse_bench;
//! use circuit_bdd::compile::CircuitToBdd;
//!
//! let netlist = parse_bench("INPUT(a)\nINPUT(b)\nOUTPUT(c)\nc = AND(a, b)\n").unwrap();
//!
//! let mut c = CircuitToBdd::new(Bdd::default());
//! c.compile(&netlist.nodes).unwrap();
//!
//! let bdd = c.engine();
//! let a = c.get("a").unwrap();
//! let b = c.get("b").unwrap();
//! assert_eq!(c.get("c"), Some(bdd.apply_and(a, b)));
//! ```

pub mod bdd;
pub mod bench;
pub mod cache;
pub mod circuit;
pub mod compile;
pub mod engine;
pub mod error;
pub mod export;
pub mod reference;
pub mod table;
pub mod utils;

pub use error::{Error, Result};
