//! High-level circuit builder API.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{Control, Gate, GateKind, StandardGate, UnitaryGate};
use crate::instruction::{Instruction, InstructionKind};
use crate::parameter::Parameter;
use crate::qubit::{ClbitId, QubitId};

/// A quantum circuit.
///
/// An ordered list of instructions over a register of `num_qubits` qubits
/// and `num_clbits` classical bits. Every builder call validates its
/// operands, so an out-of-range index is rejected when the gate is
/// appended rather than when the circuit runs. Instructions are never
/// reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    name: String,
    num_qubits: u32,
    num_clbits: u32,
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create an empty circuit with no qubits.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_size(name, 0, 0)
    }

    /// Create a circuit with a given number of qubits and classical bits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            instructions: vec![],
        }
    }

    /// Add a single qubit to the circuit.
    pub fn add_qubit(&mut self) -> QubitId {
        let id = QubitId(self.num_qubits);
        self.num_qubits += 1;
        id
    }

    /// Add a single classical bit to the circuit.
    pub fn add_clbit(&mut self) -> ClbitId {
        let id = ClbitId(self.num_clbits);
        self.num_clbits += 1;
        id
    }

    /// Append an instruction after validating its operands.
    pub fn append(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.check(&instruction)?;
        self.instructions.push(instruction);
        Ok(self)
    }

    /// Re-check every instruction against the register sizes.
    ///
    /// Builder-made circuits always pass; this catches circuits that were
    /// deserialized or assembled by hand.
    pub fn validate(&self) -> IrResult<()> {
        self.instructions.iter().try_for_each(|inst| self.check(inst))
    }

    fn check(&self, instruction: &Instruction) -> IrResult<()> {
        let gate_name = match &instruction.kind {
            InstructionKind::Gate(gate) => Some(gate.name().to_string()),
            _ => None,
        };

        if let InstructionKind::Gate(gate) = &instruction.kind {
            let expected = gate.num_qubits();
            let got = instruction.qubits.len() as u32;
            if expected != got {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected,
                    got,
                });
            }
        }

        if instruction.is_measure() && instruction.qubits.len() != instruction.clbits.len() {
            return Err(IrError::QubitCountMismatch {
                gate_name: "measure".into(),
                expected: instruction.clbits.len() as u32,
                got: instruction.qubits.len() as u32,
            });
        }

        let mut seen = FxHashSet::default();
        for qubit in instruction.all_qubits() {
            if qubit.0 >= self.num_qubits {
                return Err(IrError::QubitNotFound {
                    qubit,
                    num_qubits: self.num_qubits,
                    gate_name: gate_name.clone(),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        for &clbit in &instruction.clbits {
            if clbit.0 >= self.num_clbits {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    num_clbits: self.num_clbits,
                });
            }
        }

        Ok(())
    }

    fn push_1q(&mut self, gate: StandardGate, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::single_qubit_gate(gate, qubit))
    }

    fn push_2q(&mut self, gate: StandardGate, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::two_qubit_gate(gate, q1, q2))
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::H, qubit)
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::X, qubit)
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::Y, qubit)
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::Z, qubit)
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::S, qubit)
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::Sdg, qubit)
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::T, qubit)
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::Tdg, qubit)
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::SX, qubit)
    }

    /// Apply Rx rotation gate.
    pub fn rx(&mut self, theta: impl Into<Parameter>, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::Rx(theta.into()), qubit)
    }

    /// Apply Ry rotation gate.
    pub fn ry(&mut self, theta: impl Into<Parameter>, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::Ry(theta.into()), qubit)
    }

    /// Apply Rz rotation gate.
    pub fn rz(&mut self, theta: impl Into<Parameter>, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::Rz(theta.into()), qubit)
    }

    /// Apply phase gate.
    pub fn p(&mut self, lambda: impl Into<Parameter>, qubit: QubitId) -> IrResult<&mut Self> {
        self.push_1q(StandardGate::P(lambda.into()), qubit)
    }

    /// Apply universal U gate.
    pub fn u(
        &mut self,
        theta: impl Into<Parameter>,
        phi: impl Into<Parameter>,
        lambda: impl Into<Parameter>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.push_1q(
            StandardGate::U(theta.into(), phi.into(), lambda.into()),
            qubit,
        )
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::CX, control, target)
    }

    /// Apply CY gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::CY, control, target)
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::CZ, control, target)
    }

    /// Apply controlled-Hadamard gate.
    pub fn ch(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::CH, control, target)
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::Swap, q1, q2)
    }

    /// Apply iSWAP gate.
    pub fn iswap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::ISwap, q1, q2)
    }

    /// Apply controlled-Ry gate.
    pub fn cry(
        &mut self,
        theta: impl Into<Parameter>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::CRy(theta.into()), control, target)
    }

    /// Apply controlled-Rz gate.
    pub fn crz(
        &mut self,
        theta: impl Into<Parameter>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::CRz(theta.into()), control, target)
    }

    /// Apply controlled-phase gate.
    pub fn cp(
        &mut self,
        lambda: impl Into<Parameter>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::CP(lambda.into()), control, target)
    }

    /// Apply RZZ (ZZ rotation) gate.
    pub fn rzz(
        &mut self,
        theta: impl Into<Parameter>,
        q1: QubitId,
        q2: QubitId,
    ) -> IrResult<&mut Self> {
        self.push_2q(StandardGate::RZZ(theta.into()), q1, q2)
    }

    // =========================================================================
    // Multi-qubit and controlled gates
    // =========================================================================

    /// Apply Toffoli (CCX) gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::gate(StandardGate::CCX, [c1, c2, target]))
    }

    /// Apply Fredkin (CSWAP) gate.
    pub fn cswap(&mut self, control: QubitId, t1: QubitId, t2: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::gate(StandardGate::CSwap, [control, t1, t2]))
    }

    /// Apply a standard gate with extra controls.
    pub fn controlled(
        &mut self,
        gate: StandardGate,
        controls: impl IntoIterator<Item = Control>,
        targets: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        let gate = Gate::standard(gate).with_controls(controls);
        self.append(Instruction::gate(gate, targets))
    }

    /// Apply a multi-controlled X.
    pub fn mcx(
        &mut self,
        controls: impl IntoIterator<Item = Control>,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.controlled(StandardGate::X, controls, [target])
    }

    /// Apply a multi-controlled Z.
    pub fn mcz(
        &mut self,
        controls: impl IntoIterator<Item = Control>,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.controlled(StandardGate::Z, controls, [target])
    }

    /// Apply a user matrix on one or two qubits.
    pub fn unitary(
        &mut self,
        gate: UnitaryGate,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.append(Instruction::gate(gate, qubits))
    }

    /// Apply a gate described by name, operands, controls and angles.
    pub fn apply_named(
        &mut self,
        name: &str,
        params: Vec<Parameter>,
        targets: impl IntoIterator<Item = QubitId>,
        controls: impl IntoIterator<Item = Control>,
    ) -> IrResult<&mut Self> {
        let gate = StandardGate::from_name(name, params)?;
        self.controlled(gate, controls, targets)
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.append(Instruction::measure(qubit, clbit))
    }

    /// Measure every qubit `i` into classical bit `i`, adding classical bits
    /// as needed.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        while self.num_clbits < self.num_qubits {
            self.add_clbit();
        }
        let qubits = (0..self.num_qubits).map(QubitId);
        let clbits = (0..self.num_qubits).map(ClbitId);
        self.append(Instruction::measure_many(qubits, clbits))
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.append(Instruction::reset(qubit))
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.append(Instruction::barrier(qubits))
    }

    /// Append every instruction of `other`, which must fit in this circuit.
    pub fn compose(&mut self, other: &Circuit) -> IrResult<&mut Self> {
        if other.num_qubits > self.num_qubits || other.num_clbits > self.num_clbits {
            return Err(IrError::IncompatibleCircuits(format!(
                "'{}' ({}q, {}c) does not fit into '{}' ({}q, {}c)",
                other.name,
                other.num_qubits,
                other.num_clbits,
                self.name,
                self.num_qubits,
                self.num_clbits
            )));
        }
        self.instructions.extend(other.instructions.iter().cloned());
        Ok(self)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits as usize
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits as usize
    }

    /// The instructions in application order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of gate instructions.
    pub fn gate_count(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_gate()).count()
    }

    /// Circuit depth: the longest chain of instructions sharing a wire.
    /// Barriers do not count.
    pub fn depth(&self) -> usize {
        let mut qubit_level = vec![0usize; self.num_qubits()];
        let mut clbit_level = vec![0usize; self.num_clbits()];
        let mut depth = 0;
        for inst in self.instructions.iter().filter(|i| !i.is_barrier()) {
            let level = inst
                .all_qubits()
                .map(|q| qubit_level[q.index()])
                .chain(inst.clbits.iter().map(|c| clbit_level[c.index()]))
                .max()
                .unwrap_or(0)
                + 1;
            for q in inst.all_qubits() {
                qubit_level[q.index()] = level;
            }
            for c in &inst.clbits {
                clbit_level[c.index()] = level;
            }
            depth = depth.max(level);
        }
        depth
    }

    /// `(qubit, clbit)` pairs of every measurement, in circuit order.
    pub fn measurement_map(&self) -> Vec<(QubitId, ClbitId)> {
        self.instructions
            .iter()
            .filter(|i| i.is_measure())
            .flat_map(|i| i.qubits.iter().copied().zip(i.clbits.iter().copied()))
            .collect()
    }

    /// Distinct measured qubits, sorted.
    pub fn measured_qubits(&self) -> Vec<QubitId> {
        let mut qubits: Vec<_> = self.measurement_map().into_iter().map(|(q, _)| q).collect();
        qubits.sort_unstable();
        qubits.dedup();
        qubits
    }

    /// Check whether any measurement outcome can influence later operations.
    ///
    /// True if the circuit contains a reset, or if a gate touches a qubit
    /// after that qubit has been measured. Such circuits cannot be sampled
    /// from a single final state.
    pub fn has_mid_circuit_measurement(&self) -> bool {
        let mut measured = FxHashSet::default();
        for inst in &self.instructions {
            match &inst.kind {
                InstructionKind::Reset => return true,
                InstructionKind::Measure => measured.extend(inst.qubits.iter().copied()),
                InstructionKind::Gate(_) => {
                    if inst.all_qubits().any(|q| measured.contains(&q)) {
                        return true;
                    }
                }
                InstructionKind::Barrier => {}
            }
        }
        false
    }

    /// Check if any gate still has a symbolic parameter.
    pub fn is_parameterized(&self) -> bool {
        self.instructions
            .iter()
            .filter_map(Instruction::as_gate)
            .any(Gate::is_parameterized)
    }

    /// Names of all unbound symbols, sorted.
    pub fn parameter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .instructions
            .iter()
            .filter_map(Instruction::as_gate)
            .filter_map(|g| match &g.kind {
                GateKind::Standard(s) => Some(s.parameters()),
                GateKind::Unitary(_) => None,
            })
            .flatten()
            .filter_map(|p| p.symbol_name().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Bind symbols, returning a new circuit. Unknown symbols stay symbolic.
    pub fn bind_parameters(&self, bindings: &FxHashMap<String, f64>) -> Circuit {
        let mut bound = self.clone();
        for inst in &mut bound.instructions {
            if let InstructionKind::Gate(gate) = &mut inst.kind {
                let rebound = match &gate.kind {
                    GateKind::Standard(s) => s.map_parameters(|p| p.bind(bindings)),
                    GateKind::Unitary(_) => continue,
                };
                gate.kind = GateKind::Standard(rebound);
            }
        }
        bound
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        circuit
            .h(QubitId(0))?
            .cx(QubitId(0), QubitId(1))?
            .measure(QubitId(0), ClbitId(0))?
            .measure(QubitId(1), ClbitId(1))?;
        Ok(circuit)
    }

    /// Create a GHZ state circuit.
    pub fn ghz(n: u32) -> IrResult<Self> {
        if n == 0 {
            return Ok(Self::new("ghz_0"));
        }

        let mut circuit = Self::with_size("ghz", n, n);
        circuit.h(QubitId(0))?;
        for i in 0..n - 1 {
            circuit.cx(QubitId(i), QubitId(i + 1))?;
        }
        for i in 0..n {
            circuit.measure(QubitId(i), ClbitId(i))?;
        }
        Ok(circuit)
    }

    /// Create a QFT circuit (without measurements).
    pub fn qft(n: u32) -> IrResult<Self> {
        use std::f64::consts::PI;

        if n == 0 {
            return Ok(Self::new("qft_0"));
        }

        let mut circuit = Self::with_size("qft", n, 0);
        for i in 0..n {
            circuit.h(QubitId(i))?;
            for j in (i + 1)..n {
                let angle = PI / f64::from(1u32 << (j - i));
                circuit.cp(angle, QubitId(j), QubitId(i))?;
            }
        }
        for i in 0..n / 2 {
            circuit.swap(QubitId(i), QubitId(n - 1 - i))?;
        }
        Ok(circuit)
    }
}
