//! Clause representation shared between workers
//!
//! Literals follow the DIMACS convention: variable `v` (1-based) appears as `v`
//! when positive and `-v` when negated. Engines convert their internal literal
//! encoding to this form before exporting.

use std::fmt;

/// A DIMACS-style literal (never zero)
pub type Literal = i32;

/// A disjunction of literals exchanged between workers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Clause(Vec<Literal>);

impl Clause {
    /// Create a clause from its literals
    pub fn new(literals: Vec<Literal>) -> Self {
        debug_assert!(
            literals.iter().all(|&l| l != 0),
            "literal 0 is reserved as the DIMACS terminator"
        );
        Self(literals)
    }

    /// Number of literals
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true for a clause with exactly one literal
    pub fn is_unit(&self) -> bool {
        self.0.len() == 1
    }

    pub fn literals(&self) -> &[Literal] {
        &self.0
    }
}

impl From<Vec<Literal>> for Clause {
    fn from(literals: Vec<Literal>) -> Self {
        Self::new(literals)
    }
}

impl<const N: usize> From<[Literal; N]> for Clause {
    fn from(literals: [Literal; N]) -> Self {
        Self::new(literals.to_vec())
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for lit in &self.0 {
            write!(f, "{} ", lit)?;
        }
        write!(f, "0")
    }
}
