use std::fmt::{Display, Formatter};
use std::ops::Neg;

/// Handle to a node of the [`Bdd`][crate::bdd::Bdd] manager.
///
/// The absolute value is the index of the node in the unique table,
/// the sign marks a complemented (negated) edge.
/// Index 1 is the terminal `1`, so the terminal `0` is `-1`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(i32);

impl Ref {
    pub const ONE: Ref = Ref(1);
    pub const ZERO: Ref = Ref(-1);

    pub const fn positive(index: u32) -> Self {
        Self(index as i32)
    }

    pub const fn is_negated(&self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// Return the index of the referenced node.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    pub(crate) const fn unsigned(self) -> u32 {
        // Interleave signs so that the value stays small and unique.
        (self.0.unsigned_abs() << 1) + (self.0 < 0) as u32
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminals() {
        assert_eq!(-Ref::ONE, Ref::ZERO);
        assert_eq!(Ref::ZERO.index(), 1);
        assert!(Ref::ZERO.is_negated());
        assert!(!Ref::ONE.is_negated());
    }

    #[test]
    fn test_display() {
        let r = Ref::positive(5);
        assert_eq!(r.to_string(), "@5");
        assert_eq!((-r).to_string(), "~@5");
    }

    #[test]
    fn test_unsigned_is_injective() {
        let a = Ref::positive(3);
        assert_ne!(a.unsigned(), (-a).unsigned());
        assert_eq!(a.unsigned(), 6);
        assert_eq!((-a).unsigned(), 7);
    }
}
