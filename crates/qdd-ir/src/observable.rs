//! Pauli observables.
//!
//! An observable is a weighted sum of Pauli strings:
//!
//!   O = Σ_k  c_k · P_k
//!
//! where each P_k is a tensor product of single-qubit Pauli operators
//! (I, X, Y, Z) and c_k ∈ ℝ. Backends report ⟨ψ|O|ψ⟩ for each requested
//! observable in exact mode.
//!
//! # Example
//!
//! ```rust
//! use qdd_ir::observable::{Observable, ObservableTerm, PauliOp, PauliString};
//!
//! // O = -1.0·Z₀Z₁  +  0.5·X₀
//! let o = Observable::from_terms(vec![
//!     ObservableTerm::new(-1.0, PauliString::from_ops(vec![(0, PauliOp::Z), (1, PauliOp::Z)])),
//!     ObservableTerm::new( 0.5, PauliString::from_ops(vec![(0, PauliOp::X)])),
//! ]);
//! assert_eq!(o.n_terms(), 2);
//! assert_eq!(o.min_qubits(), 2);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauliOp {
    /// Identity.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
}

impl PauliOp {
    fn symbol(self) -> char {
        match self {
            PauliOp::I => 'I',
            PauliOp::X => 'X',
            PauliOp::Y => 'Y',
            PauliOp::Z => 'Z',
        }
    }
}

/// A tensor product of Pauli operators on indexed qubits.
///
/// Stored as a sorted `Vec<(qubit_index, PauliOp)>` with identity terms
/// omitted. Qubits not listed are implicitly I.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauliString {
    ops: Vec<(u32, PauliOp)>,
}

impl PauliString {
    /// Construct a PauliString from (qubit, op) pairs.
    ///
    /// Identity operators are dropped; the remaining ops are sorted by qubit.
    pub fn from_ops(ops: impl IntoIterator<Item = (u32, PauliOp)>) -> Self {
        let mut v: Vec<(u32, PauliOp)> = ops
            .into_iter()
            .filter(|(_, op)| *op != PauliOp::I)
            .collect();
        v.sort_by_key(|(q, _)| *q);
        Self { ops: v }
    }

    /// The identity string.
    pub fn identity() -> Self {
        Self { ops: vec![] }
    }

    /// Construct a Z⊗Z⊗...⊗Z string spanning the given qubits.
    pub fn zz(qubits: impl IntoIterator<Item = u32>) -> Self {
        Self::from_ops(qubits.into_iter().map(|q| (q, PauliOp::Z)))
    }

    /// Non-identity (qubit, op) pairs, sorted by qubit index.
    pub fn ops(&self) -> &[(u32, PauliOp)] {
        &self.ops
    }

    /// True if there are no non-identity operators.
    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    /// True if the string only contains Z (and implicit I) operators.
    pub fn is_diagonal(&self) -> bool {
        self.ops.iter().all(|(_, op)| *op == PauliOp::Z)
    }

    /// The highest qubit index referenced, or `None` for an identity string.
    pub fn max_qubit(&self) -> Option<u32> {
        self.ops.last().map(|(q, _)| *q)
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return write!(f, "I");
        }
        for (i, (q, op)) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}{q}", op.symbol())?;
        }
        Ok(())
    }
}

/// A single weighted Pauli term: `coeff · pauli`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservableTerm {
    /// Real coefficient.
    pub coeff: f64,
    /// The Pauli string.
    pub pauli: PauliString,
}

impl ObservableTerm {
    /// Create a new term.
    pub fn new(coeff: f64, pauli: PauliString) -> Self {
        Self { coeff, pauli }
    }
}

/// A sum of weighted Pauli strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observable {
    terms: Vec<ObservableTerm>,
}

impl Observable {
    /// Create from a list of terms.
    pub fn from_terms(terms: Vec<ObservableTerm>) -> Self {
        Self { terms }
    }

    /// Shorthand: Z on a single qubit.
    pub fn z(qubit: u32) -> Self {
        Self::from_terms(vec![ObservableTerm::new(
            1.0,
            PauliString::from_ops([(qubit, PauliOp::Z)]),
        )])
    }

    /// Shorthand: a single unit-weight Pauli string.
    pub fn pauli(pauli: PauliString) -> Self {
        Self::from_terms(vec![ObservableTerm::new(1.0, pauli)])
    }

    /// All terms.
    pub fn terms(&self) -> &[ObservableTerm] {
        &self.terms
    }

    /// Number of terms.
    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    /// The minimum number of qubits needed to evaluate this observable.
    ///
    /// Returns 0 if the observable is empty or purely identity.
    pub fn min_qubits(&self) -> u32 {
        self.terms
            .iter()
            .filter_map(|t| t.pauli.max_qubit())
            .max()
            .map_or(0, |q| q + 1)
    }
}

impl FromIterator<ObservableTerm> for Observable {
    fn from_iter<T: IntoIterator<Item = ObservableTerm>>(iter: T) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // PauliString
    // -------------------------------------------------------------------------

    #[test]
    fn test_identity_dropped_and_sorted() {
        let p = PauliString::from_ops([(2, PauliOp::X), (0, PauliOp::I), (1, PauliOp::Z)]);
        assert_eq!(p.ops(), &[(1, PauliOp::Z), (2, PauliOp::X)]);
        assert_eq!(p.max_qubit(), Some(2));
        assert!(!p.is_diagonal());
        assert_eq!(p.to_string(), "Z1 X2");
    }

    #[test]
    fn test_zz_is_diagonal() {
        let p = PauliString::zz([3, 1]);
        assert!(p.is_diagonal());
        assert_eq!(p.ops(), &[(1, PauliOp::Z), (3, PauliOp::Z)]);
        assert!(PauliString::identity().is_identity());
        assert_eq!(PauliString::identity().to_string(), "I");
    }

    // -------------------------------------------------------------------------
    // Observable
    // -------------------------------------------------------------------------

    #[test]
    fn test_min_qubits() {
        let o: Observable = [
            ObservableTerm::new(1.0, PauliString::identity()),
            ObservableTerm::new(0.5, PauliString::from_ops([(4, PauliOp::Y)])),
        ]
        .into_iter()
        .collect();
        assert_eq!(o.min_qubits(), 5);
        assert_eq!(Observable::from_terms(vec![]).min_qubits(), 0);
        assert_eq!(Observable::z(0).n_terms(), 1);
    }
}
