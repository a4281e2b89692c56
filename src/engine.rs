//! The narrow capability interface the gate compiler drives.

use std::fmt::Debug;
use std::hash::Hash;

use crate::bdd::Bdd;
use crate::reference::Ref;

/// Boolean function builder.
///
/// Handles are opaque, cheap to copy and only produced by the engine itself.
pub trait Engine {
    type Handle: Copy + Eq + Hash + Debug;

    /// Return the function of a fresh Boolean variable named `label`.
    fn create_var(&self, label: &str) -> Self::Handle;
    fn negate(&self, f: Self::Handle) -> Self::Handle;
    fn and(&self, f: Self::Handle, g: Self::Handle) -> Self::Handle;
    fn or(&self, f: Self::Handle, g: Self::Handle) -> Self::Handle;
    fn xor(&self, f: Self::Handle, g: Self::Handle) -> Self::Handle;
}

impl Engine for Bdd {
    type Handle = Ref;

    fn create_var(&self, label: &str) -> Ref {
        self.mk_named_var(label)
    }

    fn negate(&self, f: Ref) -> Ref {
        self.apply_not(f)
    }

    fn and(&self, f: Ref, g: Ref) -> Ref {
        self.apply_and(f, g)
    }

    fn or(&self, f: Ref, g: Ref) -> Ref {
        self.apply_or(f, g)
    }

    fn xor(&self, f: Ref, g: Ref) -> Ref {
        self.apply_xor(f, g)
    }
}
