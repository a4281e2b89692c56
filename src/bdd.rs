//! The BDD manager.
//!
//! All nodes live in one hash-consed unique table owned by [`Bdd`], so two equal functions
//! built through the same manager always end up as the same [`Ref`].
//! Edges may be complemented: a negative [`Ref`] denotes the negation of the node it points to.
//! The high edge of a stored node is never complemented, which keeps the representation canonical.
//!
//! Variables are created by name and numbered from 1 in creation order,
//! which is also the variable order of the diagrams.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;

use log::debug;
use num_bigint::BigUint;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::ZERO,
            high: Ref::ZERO,
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(
            self.variable as u64,
            self.low.unsigned() as u64,
            self.high.unsigned() as u64,
        )
    }
}

pub type IteKey = (Ref, Ref, Ref);

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<IteKey, Ref>>,
    names: RefCell<Vec<String>>,
    name_to_var: RefCell<HashMap<String, u32>>,
}

impl Bdd {
    pub fn new(storage_bits: usize) -> Self {
        assert!(
            storage_bits <= 31,
            "Storage bits should be in the range 0..=31"
        );

        let cache_bits = storage_bits.min(16);

        let mut storage = Table::new(storage_bits);

        // The terminal node must be (1).
        let one = storage.put(Node {
            variable: 0,
            low: Ref::ONE,
            high: Ref::ONE,
        });
        assert_eq!(one, Ref::ONE.index() as usize);

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(cache_bits)),
            names: RefCell::new(Vec::new()),
            name_to_var: RefCell::new(HashMap::new()),
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(16)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd")
            .field("num_vars", &self.num_vars())
            .field("size", &storage.size())
            .field("buckets", &storage.num_buckets())
            .finish()
    }
}

impl Bdd {
    pub fn cache(&self) -> std::cell::Ref<'_, Cache<IteKey, Ref>> {
        self.cache.borrow()
    }

    pub const fn zero(&self) -> Ref {
        Ref::ZERO
    }
    pub const fn one(&self) -> Ref {
        Ref::ONE
    }

    /// Number of nodes in the unique table, including the terminal.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow().value(index as usize).variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).high
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == Ref::ONE.index()
    }
}

// Variables
impl Bdd {
    pub fn num_vars(&self) -> usize {
        self.names.borrow().len()
    }

    /// Name of the variable `v` (1-based).
    pub fn var_name(&self, v: u32) -> String {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.names.borrow()[v as usize - 1].clone()
    }

    /// Variable index of the given name, if it was created.
    pub fn var_index(&self, name: &str) -> Option<u32> {
        self.name_to_var.borrow().get(name).copied()
    }

    /// Return the projection function of the variable called `name`,
    /// creating the variable (as the new last one in the order) if it does not exist yet.
    pub fn mk_named_var(&self, name: &str) -> Ref {
        if let Some(v) = self.var_index(name) {
            debug!("mk_named_var: {} is already x{}", name, v);
            return self.mk_var(v);
        }

        let v = {
            let mut names = self.names.borrow_mut();
            names.push(name.to_string());
            names.len() as u32
        };
        self.name_to_var.borrow_mut().insert(name.to_string(), v);
        debug!("mk_named_var: {} -> x{}", name, v);
        self.mk_var(v)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, Ref::ZERO, Ref::ONE)
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        debug!("mk(v = {}, low = {}, high = {})", v, low, high);

        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle canonicity
        if high.is_negated() {
            debug!("mk: restoring canonicity");
            return -self.mk_node(v, -low, -high);
        }

        // Handle duplicates
        if low == high {
            debug!("mk: duplicates {} == {}", low, high);
            return low;
        }

        let i = self.storage.borrow_mut().put(Node {
            variable: v,
            low,
            high,
        });
        Ref::positive(i as u32)
    }
}

// Operations
impl Bdd {
    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        let i = node.index();
        if self.is_terminal(node) || v < self.variable(i) {
            return (node, node);
        }
        assert_eq!(v, self.variable(i));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use circuit_bdd::bdd::Bdd;
    ///
    /// let bdd = Bdd::default();
    /// let x = bdd.mk_named_var("x");
    /// let y = bdd.mk_named_var("y");
    /// let z = bdd.mk_named_var("z");
    /// let f = bdd.apply_ite(x, y, z);
    /// let x_and_y = bdd.apply_and(x, y);
    /// let not_x_and_z = bdd.apply_and(-x, z);
    /// assert_eq!(f, bdd.apply_or(x_and_y, not_x_and_z));
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        //   ite(F,1,~F) => 1
        //   ite(F,F,1) => 1
        //   ite(F,~F,0) => 0
        //   ite(F,0,F) => F
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }
        if self.is_one(g) && h == -f {
            return Ref::ONE;
        }
        if g == f && self.is_one(h) {
            return Ref::ONE;
        }
        if g == -f && self.is_zero(h) {
            return Ref::ZERO;
        }
        if self.is_zero(g) && h == f {
            return f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        if g == f {
            return self.apply_ite(f, Ref::ONE, h);
        }
        if h == f {
            return self.apply_ite(f, g, Ref::ZERO);
        }
        if g == -f {
            return self.apply_ite(f, Ref::ZERO, h);
        }
        if h == -f {
            return self.apply_ite(f, g, Ref::ONE);
        }

        let i = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        assert_ne!(i, 0);

        // Equivalent pairs (choose the one with the lowest top variable):
        //   ite(F,1,H) == ite(H,1,F) == F ∨ H
        //   ite(F,G,0) == ite(G,F,0) == F ∧ G
        //   ite(F,G,1) == ite(~G,~F,1) == F -> G
        //   ite(F,0,H) == ite(~H,0,~F) == ~F ∧ H
        //   ite(F,G,~G) == ite(G,F,~F)
        if self.is_one(g) && k < i {
            return self.apply_ite(h, Ref::ONE, f);
        }
        if self.is_zero(h) && j < i {
            return self.apply_ite(g, f, Ref::ZERO);
        }
        if self.is_one(h) && j < i {
            return self.apply_ite(-g, -f, Ref::ONE);
        }
        if self.is_zero(g) && k < i {
            return self.apply_ite(-h, Ref::ZERO, -f);
        }
        if g == -h && j < i {
            return self.apply_ite(g, f, -f);
        }

        // Make sure the first two pointers (f and g) are regular (not negated)
        let (mut f, mut g, mut h) = (f, g, h);

        // ite(~F,G,H) => ite(F,H,G)
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }

        // ite(F,~G,H) => ~ite(F,G,~H)
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let key = (f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            debug!("cache: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
            return if n { -res } else { res };
        }

        // Determine the top variable:
        let mut m = self.variable(f.index());
        let j = self.variable(g.index());
        let k = self.variable(h.index());
        if j != 0 {
            m = m.min(j);
        }
        if k != 0 {
            m = m.min(k);
        }
        assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(m, e, t);
        debug!("computed: apply_ite(f = {}, g = {}, h = {}) -> {}", f, g, h, res);
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        debug!("apply_not(f = {})", f);
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        debug!("apply_and(u = {}, v = {})", u, v);
        self.apply_ite(u, v, Ref::ZERO)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        debug!("apply_or(u = {}, v = {})", u, v);
        self.apply_ite(u, Ref::ONE, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        debug!("apply_xor(u = {}, v = {})", u, v);
        self.apply_ite(u, -v, v)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        nodes.into_iter().fold(Ref::ONE, |acc, f| self.apply_and(acc, f))
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        nodes.into_iter().fold(Ref::ZERO, |acc, f| self.apply_or(acc, f))
    }
}

// Traversal
impl Bdd {
    /// Indices of all nodes reachable from `nodes`, terminal included when reached.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> BTreeSet<u32> {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<Ref> = nodes.into_iter().collect();

        while let Some(node) = stack.pop() {
            let i = node.index();
            if visited.insert(i) && !self.is_terminal(node) {
                stack.push(self.low(i));
                stack.push(self.high(i));
            }
        }

        visited
    }

    /// Variables the functions `nodes` depend on.
    pub fn support(&self, nodes: impl IntoIterator<Item = Ref>) -> BTreeSet<u32> {
        self.descendants(nodes)
            .into_iter()
            .map(|i| self.variable(i))
            .filter(|&v| v != 0)
            .collect()
    }

    /// Number of nodes in the diagram of `f`, terminal included.
    pub fn size(&self, f: Ref) -> u64 {
        self.descendants([f]).len() as u64
    }

    /// Number of satisfying assignments of `node` over `num_vars` variables.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let mut cache = HashMap::new();
        let max = BigUint::from(1u32) << num_vars;
        self.sat_count_(node, &max, &mut cache)
    }

    fn sat_count_(&self, node: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let low = self.low(node.index());
        let high = self.high(node.index());

        let count_low = self.sat_count_(low, max, cache);
        let count_high = self.sat_count_(high, max, cache);

        let count: BigUint = (count_low + count_high) >> 1;
        let count = if node.is_negated() { max - count } else { count };

        cache.insert(node, count.clone());
        count
    }

    /// Evaluate `f` under an assignment indexed by variable (`values[v - 1]` is the value of `v`).
    ///
    /// # Panics
    ///
    /// Panics if `values` is shorter than [`num_vars`][Self::num_vars].
    pub fn eval(&self, f: Ref, values: &[bool]) -> bool {
        assert!(
            values.len() >= self.num_vars(),
            "Assignment has {} values, but there are {} variables",
            values.len(),
            self.num_vars()
        );
        let mut current = f;
        while !self.is_terminal(current) {
            let v = self.variable(current.index());
            current = if values[v as usize - 1] {
                self.high_node(current)
            } else {
                self.low_node(current)
            };
        }
        self.is_one(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_var() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        assert_eq!(bdd.variable(x.index()), 1);
        assert_eq!(bdd.high_node(x), bdd.one());
        assert_eq!(bdd.low_node(x), bdd.zero());
        assert_eq!(bdd.var_name(1), "x");
    }

    #[test]
    fn test_named_var_is_reused() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        let y = bdd.mk_named_var("y");
        assert_ne!(x, y);
        assert_eq!(bdd.mk_named_var("x"), x);
        assert_eq!(bdd.num_vars(), 2);
        assert_eq!(bdd.var_index("y"), Some(2));
        assert_eq!(bdd.var_index("z"), None);
    }

    #[test]
    fn test_not_var() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        let not_x = bdd.apply_not(x);
        assert_eq!(not_x, -x);
        assert_eq!(not_x.index(), x.index());
        assert_eq!(bdd.high_node(not_x), bdd.zero());
        assert_eq!(bdd.low_node(not_x), bdd.one());
    }

    #[test]
    fn test_terminal() {
        let bdd = Bdd::default();
        assert!(bdd.is_one(bdd.one()));
        assert!(bdd.is_zero(bdd.zero()));
        assert!(bdd.is_terminal(bdd.zero()));
        assert_eq!(bdd.apply_not(bdd.one()), bdd.zero());
        let x = bdd.mk_named_var("x");
        assert_eq!(bdd.apply_and(x, bdd.zero()), bdd.zero());
        assert_eq!(bdd.apply_or(x, bdd.one()), bdd.one());
        assert_eq!(bdd.apply_xor(x, bdd.one()), -x);
    }

    #[test]
    fn test_de_morgan_and() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        let y = bdd.mk_named_var("y");
        let f = -bdd.apply_and(x, y);
        let g = bdd.apply_or(-x, -y);
        assert_eq!(f, g);
    }

    #[test]
    fn test_de_morgan_or() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        let y = bdd.mk_named_var("y");
        let f = -bdd.apply_or(x, y);
        let g = bdd.apply_and(-x, -y);
        assert_eq!(f, g);
    }

    #[test]
    fn test_xor_itself() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        let y = bdd.mk_named_var("y");
        let f = bdd.apply_and(x, y);
        assert_eq!(bdd.apply_xor(f, f), bdd.zero());
        assert_eq!(bdd.apply_xor(f, -f), bdd.one());
    }

    #[test]
    fn test_and_structure() {
        let bdd = Bdd::default();
        let a = bdd.mk_named_var("a");
        let b = bdd.mk_named_var("b");
        let f = bdd.apply_and(a, b);
        assert_eq!(bdd.variable(f.index()), 1);
        assert_eq!(bdd.high_node(f), b);
        assert_eq!(bdd.low_node(f), bdd.zero());
        assert_eq!(bdd.size(f), 3);
        assert_eq!(bdd.support([f]), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_apply_ite() {
        let bdd = Bdd::default();
        let f = bdd.mk_named_var("f");
        let g = bdd.mk_named_var("g");
        let h = bdd.mk_named_var("h");
        assert_eq!(bdd.apply_ite(bdd.one(), g, h), g);
        assert_eq!(bdd.apply_ite(bdd.zero(), g, h), h);
        assert_eq!(bdd.apply_ite(f, f, h), bdd.apply_or(f, h));
        assert_eq!(bdd.apply_ite(f, g, f), bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, -g, bdd.one()), -bdd.apply_and(f, g));

        let r = bdd.apply_ite(f, g, h);
        for bits in 0..8u32 {
            let values = [bits & 1 != 0, bits & 2 != 0, bits & 4 != 0];
            let expected = if values[0] { values[1] } else { values[2] };
            assert_eq!(bdd.eval(r, &values), expected);
        }
    }

    #[test]
    fn test_many() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        let y = bdd.mk_named_var("y");
        let z = bdd.mk_named_var("z");
        let f = bdd.apply_and_many([x, y, z]);
        assert_eq!(f, bdd.apply_and(bdd.apply_and(x, y), z));
        let g = bdd.apply_or_many([x, y, z]);
        assert_eq!(g, bdd.apply_or(x, bdd.apply_or(y, z)));
        assert_eq!(bdd.apply_and_many([]), bdd.one());
        assert_eq!(bdd.apply_or_many([]), bdd.zero());
    }

    #[test]
    fn test_sat_count() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        let y = bdd.mk_named_var("y");
        assert_eq!(bdd.sat_count(bdd.zero(), 2), BigUint::from(0u32));
        assert_eq!(bdd.sat_count(bdd.one(), 2), BigUint::from(4u32));
        assert_eq!(bdd.sat_count(x, 2), BigUint::from(2u32));
        assert_eq!(bdd.sat_count(bdd.apply_and(x, y), 2), BigUint::from(1u32));
        assert_eq!(bdd.sat_count(-bdd.apply_and(x, y), 2), BigUint::from(3u32));
        assert_eq!(bdd.sat_count(bdd.apply_xor(x, y), 3), BigUint::from(4u32));
    }

    #[test]
    #[should_panic(expected = "Assignment has 1 values, but there are 2 variables")]
    fn test_eval_short_assignment() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        let y = bdd.mk_named_var("y");
        bdd.eval(bdd.apply_and(x, y), &[true]);
    }

    #[test]
    fn test_descendants_are_sorted() {
        let bdd = Bdd::default();
        let x = bdd.mk_named_var("x");
        let y = bdd.mk_named_var("y");
        let f = bdd.apply_xor(x, y);
        let nodes: Vec<u32> = bdd.descendants([f]).into_iter().collect();
        let mut sorted = nodes.clone();
        sorted.sort();
        assert_eq!(nodes, sorted);
        assert_eq!(nodes[0], 1);
    }
}
