//! Quantum gate types.
//!
//! The simulator accepts a small fixed basis: the [`StandardGate`] set plus
//! user matrices on one or two qubits ([`UnitaryGate`]). Any gate may carry
//! additional [`Control`]s, positive or negative.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::parameter::Parameter;
use crate::qubit::QubitId;

/// Standard gates with known semantics.
///
/// For the controlled variants (`CX`, `CRz`, `CCX`, ...) the leading qubits
/// of the instruction are the controls and the trailing ones the targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(Parameter),
    /// Rotation around Y axis.
    Ry(Parameter),
    /// Rotation around Z axis.
    Rz(Parameter),
    /// Phase gate diag(1, e^{iλ}).
    P(Parameter),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(Parameter, Parameter, Parameter),
    /// U1(λ) = U(0, 0, λ).
    U1(Parameter),
    /// U2(φ, λ) = U(π/2, φ, λ).
    U2(Parameter, Parameter),
    /// U3(θ, φ, λ), identical to `U`.
    U3(Parameter, Parameter, Parameter),
    /// Rotation by θ around the axis cos(φ)X + sin(φ)Y.
    R(Parameter, Parameter),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around X.
    CRx(Parameter),
    /// Controlled rotation around Y.
    CRy(Parameter),
    /// Controlled rotation around Z.
    CRz(Parameter),
    /// Controlled phase gate.
    CP(Parameter),
    /// XX rotation gate.
    RXX(Parameter),
    /// YY rotation gate.
    RYY(Parameter),
    /// ZZ rotation gate.
    RZZ(Parameter),

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl StandardGate {
    /// Get the OpenQASM name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(..) => "u",
            StandardGate::U1(_) => "u1",
            StandardGate::U2(..) => "u2",
            StandardGate::U3(..) => "u3",
            StandardGate::R(..) => "r",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RYY(_) => "ryy",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Every gate name in the supported basis.
    pub const NAMES: [&'static str; 35] = [
        "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg", "rx", "ry", "rz", "p", "u",
        "u1", "u2", "u3", "r", "cx", "cy", "cz", "ch", "swap", "iswap", "crx", "cry", "crz", "cp",
        "rxx", "ryy", "rzz", "ccx", "cswap",
    ];

    /// Resolve a gate from its name and angle list.
    ///
    /// This is the entry point for circuits described by the external
    /// calling convention (gate name + parameters).
    pub fn from_name(name: &str, params: Vec<Parameter>) -> IrResult<Self> {
        let expected = match name {
            "rx" | "ry" | "rz" | "p" | "u1" | "crx" | "cry" | "crz" | "cp" | "rxx" | "ryy"
            | "rzz" => 1,
            "u2" | "r" => 2,
            "u" | "u3" => 3,
            n if Self::NAMES.contains(&n) => 0,
            _ => return Err(IrError::UnknownGate(name.to_string())),
        };
        if params.len() != expected {
            return Err(IrError::ParameterCountMismatch {
                gate_name: name.to_string(),
                expected,
                got: params.len(),
            });
        }

        let mut p = params.into_iter();
        let mut next = || p.next().unwrap_or(Parameter::Value(0.0));
        let gate = match name {
            "id" => StandardGate::I,
            "x" => StandardGate::X,
            "y" => StandardGate::Y,
            "z" => StandardGate::Z,
            "h" => StandardGate::H,
            "s" => StandardGate::S,
            "sdg" => StandardGate::Sdg,
            "t" => StandardGate::T,
            "tdg" => StandardGate::Tdg,
            "sx" => StandardGate::SX,
            "sxdg" => StandardGate::SXdg,
            "rx" => StandardGate::Rx(next()),
            "ry" => StandardGate::Ry(next()),
            "rz" => StandardGate::Rz(next()),
            "p" => StandardGate::P(next()),
            "u" => StandardGate::U(next(), next(), next()),
            "u1" => StandardGate::U1(next()),
            "u2" => StandardGate::U2(next(), next()),
            "u3" => StandardGate::U3(next(), next(), next()),
            "r" => StandardGate::R(next(), next()),
            "cx" => StandardGate::CX,
            "cy" => StandardGate::CY,
            "cz" => StandardGate::CZ,
            "ch" => StandardGate::CH,
            "swap" => StandardGate::Swap,
            "iswap" => StandardGate::ISwap,
            "crx" => StandardGate::CRx(next()),
            "cry" => StandardGate::CRy(next()),
            "crz" => StandardGate::CRz(next()),
            "cp" => StandardGate::CP(next()),
            "rxx" => StandardGate::RXX(next()),
            "ryy" => StandardGate::RYY(next()),
            "rzz" => StandardGate::RZZ(next()),
            "ccx" => StandardGate::CCX,
            _ => StandardGate::CSwap,
        };
        Ok(gate)
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::SX
            | StandardGate::SXdg
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_)
            | StandardGate::U(..)
            | StandardGate::U1(_)
            | StandardGate::U2(..)
            | StandardGate::U3(..)
            | StandardGate::R(..) => 1,

            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::CRx(_)
            | StandardGate::CRy(_)
            | StandardGate::CRz(_)
            | StandardGate::CP(_)
            | StandardGate::RXX(_)
            | StandardGate::RYY(_)
            | StandardGate::RZZ(_) => 2,

            StandardGate::CCX | StandardGate::CSwap => 3,
        }
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&Parameter> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::U1(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RYY(p)
            | StandardGate::RZZ(p) => vec![p],

            StandardGate::U2(a, b) | StandardGate::R(a, b) => vec![a, b],

            StandardGate::U(a, b, c) | StandardGate::U3(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }

    /// Apply `f` to every parameter, producing a new gate.
    #[must_use]
    pub fn map_parameters(&self, mut f: impl FnMut(&Parameter) -> Parameter) -> Self {
        match self {
            StandardGate::Rx(p) => StandardGate::Rx(f(p)),
            StandardGate::Ry(p) => StandardGate::Ry(f(p)),
            StandardGate::Rz(p) => StandardGate::Rz(f(p)),
            StandardGate::P(p) => StandardGate::P(f(p)),
            StandardGate::U1(p) => StandardGate::U1(f(p)),
            StandardGate::CRx(p) => StandardGate::CRx(f(p)),
            StandardGate::CRy(p) => StandardGate::CRy(f(p)),
            StandardGate::CRz(p) => StandardGate::CRz(f(p)),
            StandardGate::CP(p) => StandardGate::CP(f(p)),
            StandardGate::RXX(p) => StandardGate::RXX(f(p)),
            StandardGate::RYY(p) => StandardGate::RYY(f(p)),
            StandardGate::RZZ(p) => StandardGate::RZZ(f(p)),
            StandardGate::U2(a, b) => StandardGate::U2(f(a), f(b)),
            StandardGate::R(a, b) => StandardGate::R(f(a), f(b)),
            StandardGate::U(a, b, c) => StandardGate::U(f(a), f(b), f(c)),
            StandardGate::U3(a, b, c) => StandardGate::U3(f(a), f(b), f(c)),
            other => other.clone(),
        }
    }

    /// Check if any parameter is still symbolic.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Check if the gate is diagonal in the computational basis.
    ///
    /// Diagonal gates only change phases and never alter measurement
    /// probabilities.
    pub fn is_diagonal(&self) -> bool {
        matches!(
            self,
            StandardGate::I
                | StandardGate::Z
                | StandardGate::S
                | StandardGate::Sdg
                | StandardGate::T
                | StandardGate::Tdg
                | StandardGate::Rz(_)
                | StandardGate::P(_)
                | StandardGate::U1(_)
                | StandardGate::CZ
                | StandardGate::CRz(_)
                | StandardGate::CP(_)
                | StandardGate::RZZ(_)
        )
    }
}

/// Which basis value of a control qubit enables the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlPolarity {
    /// Gate fires when the control is |1⟩.
    Positive,
    /// Gate fires when the control is |0⟩.
    Negative,
}

/// An extra control qubit attached to a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Control {
    /// The control qubit.
    pub qubit: QubitId,
    /// Firing polarity.
    pub polarity: ControlPolarity,
}

impl Control {
    /// A control firing on |1⟩.
    pub fn positive(qubit: QubitId) -> Self {
        Self {
            qubit,
            polarity: ControlPolarity::Positive,
        }
    }

    /// A control firing on |0⟩.
    pub fn negative(qubit: QubitId) -> Self {
        Self {
            qubit,
            polarity: ControlPolarity::Negative,
        }
    }

    /// Whether the gate fires for the given control bit.
    #[inline]
    pub fn fires_on(&self, bit: bool) -> bool {
        match self.polarity {
            ControlPolarity::Positive => bit,
            ControlPolarity::Negative => !bit,
        }
    }
}

/// A user-supplied unitary on one or two qubits.
///
/// Row and column index `k` has bit `j` equal to the value of the
/// instruction's `j`-th operand qubit, so the first operand is the
/// least-significant bit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitaryGate {
    /// Number of qubits the matrix acts on.
    pub num_qubits: u32,
    /// Row-major 2^n × 2^n matrix.
    pub matrix: Vec<Complex64>,
}

impl UnitaryGate {
    /// Create a unitary gate, checking the matrix shape.
    ///
    /// Unitarity itself is checked by the executing backend.
    pub fn new(num_qubits: u32, matrix: Vec<Complex64>) -> IrResult<Self> {
        if !(1..=2).contains(&num_qubits) {
            return Err(IrError::InvalidMatrix(format!(
                "only 1- and 2-qubit matrices are supported, got {num_qubits} qubits"
            )));
        }
        let dim = 1usize << num_qubits;
        if matrix.len() != dim * dim {
            return Err(IrError::InvalidMatrix(format!(
                "expected {} entries for a {num_qubits}-qubit matrix, got {}",
                dim * dim,
                matrix.len()
            )));
        }
        Ok(Self { num_qubits, matrix })
    }
}

/// A gate, either standard or a user matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate with known semantics.
    Standard(StandardGate),
    /// A user-defined matrix.
    Unitary(UnitaryGate),
}

impl GateKind {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &str {
        match self {
            GateKind::Standard(g) => g.name(),
            GateKind::Unitary(_) => "unitary",
        }
    }

    /// Get the number of qubits the base gate acts on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Unitary(g) => g.num_qubits,
        }
    }
}

/// A gate with optional extra controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Extra controls on top of any implied by the gate kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<Control>,
    /// Optional label for the gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self {
            kind: GateKind::Standard(gate),
            controls: vec![],
            label: None,
        }
    }

    /// Create a new gate from a user matrix.
    pub fn unitary(gate: UnitaryGate) -> Self {
        Self {
            kind: GateKind::Unitary(gate),
            controls: vec![],
            label: None,
        }
    }

    /// Attach extra controls.
    #[must_use]
    pub fn with_controls(mut self, controls: impl IntoIterator<Item = Control>) -> Self {
        self.controls.extend(controls);
        self
    }

    /// Add a label to the gate.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> &str {
        self.kind.name()
    }

    /// Number of operand qubits, excluding extra controls.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }

    /// Check if any parameter is still symbolic.
    pub fn is_parameterized(&self) -> bool {
        match &self.kind {
            GateKind::Standard(g) => g.is_parameterized(),
            GateKind::Unitary(_) => false,
        }
    }

    /// Check if the gate is diagonal. Controls preserve diagonality.
    pub fn is_diagonal(&self) -> bool {
        match &self.kind {
            GateKind::Standard(g) => g.is_diagonal(),
            GateKind::Unitary(_) => false,
        }
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<UnitaryGate> for Gate {
    fn from(gate: UnitaryGate) -> Self {
        Gate::unitary(gate)
    }
}
