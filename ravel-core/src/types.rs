//! Strongly-typed request identity.
//!
//! A request is nothing more than a [`Selector`] plus raw input text;
//! there is no correlation id. A [`PuzzleIndex`] names one logical
//! puzzle whose two sub-parts are derived selectors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which computation the solver module should run.
///
/// Opaque to the host: the module interprets it as an index into its
/// own table of solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector(u32);

impl Selector {
    /// Create a selector.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw selector value passed across the ABI.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "selector_{}", self.0)
    }
}

impl From<u32> for Selector {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// One logical puzzle, made of two sub-parts.
///
/// Puzzle `i` fans out to selectors `2*i` (first part) and `2*i + 1`
/// (second part), dispatched concurrently on independent channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PuzzleIndex(u32);

impl PuzzleIndex {
    /// Create a puzzle index.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Derive the selectors for the two sub-parts of this puzzle.
    #[must_use]
    pub const fn parts(self) -> (Selector, Selector) {
        (Selector::new(self.0 * 2), Selector::new(self.0 * 2 + 1))
    }
}

impl fmt::Display for PuzzleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "puzzle_{}", self.0)
    }
}

impl From<u32> for PuzzleIndex {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Which of the two concurrent invocations of a dual dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arm {
    /// The even-selector arm (part one).
    First,
    /// The odd-selector arm (part two).
    Second,
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn puzzle_parts_derivation() {
        let (a, b) = PuzzleIndex::new(5).parts();
        assert_eq!(a, Selector::new(10));
        assert_eq!(b, Selector::new(11));

        let (a, b) = PuzzleIndex::new(0).parts();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Selector::new(3).to_string(), "selector_3");
        assert_eq!(PuzzleIndex::new(12).to_string(), "puzzle_12");
        assert_eq!(Arm::First.to_string(), "first");
        assert_eq!(Arm::Second.to_string(), "second");
    }
}
