//! Identifiers used across the network description layer.

use std::fmt;

pub use sonata_storage::TypePopId;

/// Global cell identifier — unique and dense across every population in
/// the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gid(pub u64);

impl Gid {
    /// Build a new gid from a raw value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Gid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gid{}", self.0)
    }
}

impl From<u64> for Gid {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Local index of a source or target site on a cell — its position in
/// that cell's sorted source/target vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lid(pub usize);

impl Lid {
    /// Build a new local index.
    pub const fn new(idx: usize) -> Self {
        Self(idx)
    }

    /// The raw value.
    pub const fn raw(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Lid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lid{}", self.0)
    }
}

/// A globally unique edge identifier, formed by globalizing a
/// population-local edge offset through that edge population's partition
/// entry. Stored alongside target sites so the target side of a
/// connection can be found by binary search without a pointer back to
/// the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalEdgeId(pub u64);

impl GlobalEdgeId {
    /// Build a new global edge id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw value.
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gid_ordering() {
        assert!(Gid::new(1) < Gid::new(2));
    }

    #[test]
    fn lid_display() {
        assert_eq!(format!("{}", Lid::new(3)), "lid3");
    }
}
