//! QDD Circuit Model
//!
//! This crate provides the data structures for describing quantum circuits
//! handed to a QDD backend. It is deliberately simulator-agnostic: gates are
//! described by name, operands, controls and angles, and the executing
//! backend decides how to apply them.
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`]; qubit 0 is the
//!   least-significant bit of a basis-state index
//! - **Gates**: [`StandardGate`] for the fixed basis, [`UnitaryGate`] for
//!   user matrices, [`Control`] for positive and negative controls
//! - **Parameters**: [`Parameter`] for concrete or symbolic angles
//! - **Instructions**: [`Instruction`] combining gates with their operands
//! - **Circuit**: [`Circuit`], an ordered, validated instruction list
//! - **Observables**: [`Observable`] for expectation values
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qdd_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 0);
//!
//! // |00⟩ → (|00⟩ + |11⟩)/√2
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_clbits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! ```
//!
//! # Example: Negatively Controlled Gate
//!
//! ```rust
//! use qdd_ir::{Circuit, Control, QubitId};
//!
//! // Flip q1 only when q0 is |0⟩.
//! let mut circuit = Circuit::with_size("negctrl", 2, 0);
//! circuit.mcx([Control::negative(QubitId(0))], QubitId(1)).unwrap();
//!
//! // Out-of-range operands are rejected immediately.
//! assert!(circuit.x(QubitId(7)).is_err());
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod observable;
pub mod parameter;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{Control, ControlPolarity, Gate, GateKind, StandardGate, UnitaryGate};
pub use instruction::{Instruction, InstructionKind};
pub use observable::{Observable, ObservableTerm, PauliOp, PauliString};
pub use parameter::Parameter;
pub use qubit::{ClbitId, QubitId};
