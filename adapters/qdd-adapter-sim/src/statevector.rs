//! Statevector simulation engine.

use num_complex::Complex64;
use rand::Rng;
use rayon::prelude::*;

use qdd_ir::{
    ControlPolarity, Gate, Instruction, InstructionKind, IrError, Observable, PauliOp, QubitId,
};

use crate::error::{SimError, SimResult};
use crate::kernels::{self, ControlMask};
use crate::unitary::{self, Lowered, Operator};

/// Allowed deviation of the squared norm from 1.
pub const NORM_TOLERANCE: f64 = 1e-9;

/// A dense state vector of `2^n` amplitudes.
///
/// Amplitude `i` belongs to the basis state whose bit `q` is the value of
/// qubit `q` (qubit 0 is the least-significant bit).
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    amplitudes: Vec<Complex64>,
    num_qubits: usize,
    parallel_threshold: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
            parallel_threshold: usize::MAX,
        }
    }

    /// Split gate kernels across rayon workers once the state has at least
    /// `threshold` amplitudes.
    #[must_use]
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The amplitudes, indexed by basis state.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Consume the state and return its amplitudes.
    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    fn parallel(&self) -> bool {
        self.amplitudes.len() >= self.parallel_threshold
    }

    /// Sum of squared magnitudes.
    pub fn norm_sqr(&self) -> f64 {
        if self.parallel() {
            self.amplitudes.par_iter().map(|a| a.norm_sqr()).sum()
        } else {
            self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
        }
    }

    /// Fail if the squared norm is not 1 within [`NORM_TOLERANCE`].
    pub fn check_norm(&self, context: impl FnOnce() -> String) -> SimResult<()> {
        let norm_sqr = self.norm_sqr();
        if (norm_sqr - 1.0).abs() > NORM_TOLERANCE || !norm_sqr.is_finite() {
            return Err(SimError::NormViolation {
                norm_sqr,
                context: context(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Gate application
    // =========================================================================

    /// Apply a gate instruction. Measurements, resets and barriers are
    /// ignored here; the execution engine handles them.
    pub fn apply(&mut self, instruction: &Instruction) -> SimResult<()> {
        if let InstructionKind::Gate(gate) = &instruction.kind {
            let lowered = unitary::lower(&gate.kind)?;
            self.apply_lowered(&lowered, gate, &instruction.qubits)?;
        }
        Ok(())
    }

    /// Apply an already lowered gate.
    pub(crate) fn apply_lowered(
        &mut self,
        lowered: &Lowered,
        gate: &Gate,
        operands: &[QubitId],
    ) -> SimResult<()> {
        let n = self.num_qubits;
        let check = |q: QubitId| -> SimResult<usize> {
            if q.index() < n {
                Ok(q.index())
            } else {
                Err(SimError::Circuit(IrError::QubitNotFound {
                    qubit: q,
                    num_qubits: n as u32,
                    gate_name: Some(gate.name().to_string()),
                }))
            }
        };

        let (implicit, targets) = operands.split_at(lowered.implicit_controls.min(operands.len()));
        let mut ctrl = ControlMask::default();
        for &q in implicit {
            ctrl = ctrl.with(check(q)?, true);
        }
        for control in &gate.controls {
            let on_one = control.polarity == ControlPolarity::Positive;
            ctrl = ctrl.with(check(control.qubit)?, on_one);
        }

        let parallel = self.parallel();
        match (&lowered.op, targets) {
            (Operator::Diagonal(d), [t]) => {
                kernels::apply_diagonal(&mut self.amplitudes, d, check(*t)?, ctrl, parallel);
            }
            (Operator::Single(m), [t]) => {
                kernels::apply_single(&mut self.amplitudes, m, check(*t)?, ctrl, parallel);
            }
            (Operator::Two(m), [t0, t1]) => {
                kernels::apply_two(
                    &mut self.amplitudes,
                    m,
                    check(*t0)?,
                    check(*t1)?,
                    ctrl,
                    parallel,
                );
            }
            _ => {
                return Err(SimError::Circuit(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected: gate.num_qubits(),
                    got: operands.len() as u32,
                }));
            }
        }
        Ok(())
    }

    /// Flip `qubit` unconditionally.
    fn flip(&mut self, qubit: usize) {
        let parallel = self.parallel();
        kernels::apply_single(
            &mut self.amplitudes,
            &unitary::x(),
            qubit,
            ControlMask::default(),
            parallel,
        );
    }

    // =========================================================================
    // Readout
    // =========================================================================

    /// Squared magnitude of every amplitude.
    pub fn probabilities(&self) -> Vec<f64> {
        if self.parallel() {
            self.amplitudes.par_iter().map(|a| a.norm_sqr()).collect()
        } else {
            self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
        }
    }

    /// Probability that measuring `qubit` yields 1.
    pub fn probability_one(&self, qubit: usize) -> f64 {
        let mask = 1usize << qubit;
        let p = |(i, a): (usize, &Complex64)| if i & mask != 0 { a.norm_sqr() } else { 0.0 };
        if self.parallel() {
            self.amplitudes.par_iter().enumerate().map(p).sum()
        } else {
            self.amplitudes.iter().enumerate().map(p).sum()
        }
    }

    /// Distribution over the listed qubits.
    ///
    /// Entry `k` is the total probability of all basis states whose value on
    /// `qubits[j]` equals bit `j` of `k`.
    pub fn marginal_probabilities(&self, qubits: &[QubitId]) -> Vec<f64> {
        let len = 1usize << qubits.len();
        let outcome = |i: usize| {
            qubits
                .iter()
                .enumerate()
                .fold(0usize, |k, (j, q)| k | (((i >> q.index()) & 1) << j))
        };
        let accumulate = |mut marginal: Vec<f64>, (i, amp): (usize, &Complex64)| {
            let p = amp.norm_sqr();
            if p != 0.0 {
                marginal[outcome(i)] += p;
            }
            marginal
        };

        if self.parallel() {
            self.amplitudes
                .par_iter()
                .enumerate()
                .fold(|| vec![0.0; len], accumulate)
                .reduce(
                    || vec![0.0; len],
                    |mut a, b| {
                        a.iter_mut().zip(&b).for_each(|(x, y)| *x += y);
                        a
                    },
                )
        } else {
            self.amplitudes
                .iter()
                .enumerate()
                .fold(vec![0.0; len], accumulate)
        }
    }

    /// ⟨ψ|O|ψ⟩ for a Pauli observable.
    pub fn expectation(&self, observable: &Observable) -> f64 {
        observable
            .terms()
            .iter()
            .map(|term| {
                let mut flip = 0usize;
                let mut sign = 0usize;
                let mut num_y = 0u32;
                for &(q, op) in term.pauli.ops() {
                    let bit = 1usize << q;
                    match op {
                        PauliOp::I => {}
                        PauliOp::X => flip |= bit,
                        PauliOp::Y => {
                            flip |= bit;
                            sign |= bit;
                            num_y += 1;
                        }
                        PauliOp::Z => sign |= bit,
                    }
                }
                // P|i⟩ = i^{num_y} (-1)^{|i & sign|} |i ^ flip⟩
                let global = Complex64::i().powu(num_y);
                let amps = &self.amplitudes;
                let value: Complex64 = amps
                    .iter()
                    .enumerate()
                    .map(|(i, a)| {
                        let s = if (i & sign).count_ones() % 2 == 0 { 1.0 } else { -1.0 };
                        amps[i ^ flip].conj() * a * s
                    })
                    .sum();
                term.coeff * (global * value).re
            })
            .sum()
    }

    // =========================================================================
    // Non-unitary operations
    // =========================================================================

    /// Projectively measure `qubit`, collapsing the state.
    pub fn measure<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) -> SimResult<bool> {
        let mask = 1usize << qubit;
        let (p0, p1) = self.amplitudes.iter().enumerate().fold(
            (0.0, 0.0),
            |(p0, p1), (i, a)| {
                if i & mask == 0 {
                    (p0 + a.norm_sqr(), p1)
                } else {
                    (p0, p1 + a.norm_sqr())
                }
            },
        );
        if ((p0 + p1) - 1.0).abs() > NORM_TOLERANCE {
            return Err(SimError::InconsistentMeasurement {
                qubit: qubit as u32,
                reason: format!("outcome probabilities sum to {}", p0 + p1),
            });
        }

        let outcome = rng.gen_range(0.0..1.0) < p1;
        let p = if outcome { p1 } else { p0 };
        if p <= 0.0 {
            return Err(SimError::InconsistentMeasurement {
                qubit: qubit as u32,
                reason: format!("selected outcome {} has probability {p}", u8::from(outcome)),
            });
        }

        let scale = 1.0 / p.sqrt();
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == outcome {
                *amp *= scale;
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        Ok(outcome)
    }

    /// Reset `qubit` to |0⟩ by measuring it and flipping on 1.
    pub fn reset<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) -> SimResult<()> {
        if self.measure(qubit, rng)? {
            self.flip(qubit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdd_ir::{Circuit, Control, ObservableTerm, PauliString, StandardGate};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::{FRAC_1_SQRT_2, PI};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-10
    }

    fn run(circuit: &Circuit) -> Statevector {
        let mut sv = Statevector::new(circuit.num_qubits());
        for inst in circuit.instructions() {
            sv.apply(inst).unwrap();
        }
        sv
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(2);
        assert!(approx_eq(sv.amplitudes()[0].re, 1.0));
        assert!(approx_eq(sv.norm_sqr(), 1.0));
    }

    #[test]
    fn test_hadamard() {
        let mut c = Circuit::with_size("h", 1, 0);
        c.h(QubitId(0)).unwrap();
        let sv = run(&c);
        assert!(approx_eq(sv.amplitudes()[0].re, FRAC_1_SQRT_2));
        assert!(approx_eq(sv.amplitudes()[1].re, FRAC_1_SQRT_2));
    }

    #[test]
    fn test_bell_state() {
        let mut c = Circuit::with_size("bell", 2, 0);
        c.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        let probs = run(&c).probabilities();
        assert!(approx_eq(probs[0b00], 0.5));
        assert!(approx_eq(probs[0b11], 0.5));
        assert!(approx_eq(probs[0b01] + probs[0b10], 0.0));
    }

    #[test]
    fn test_cx_control_is_first_operand() {
        let mut c = Circuit::with_size("cx", 2, 0);
        c.x(QubitId(1)).unwrap().cx(QubitId(1), QubitId(0)).unwrap();
        assert!(approx_eq(run(&c).probabilities()[0b11], 1.0));
    }

    #[test]
    fn test_negative_control_fires_on_zero() {
        let mut c = Circuit::with_size("negctrl", 2, 0);
        c.mcx([Control::negative(QubitId(0))], QubitId(1)).unwrap();
        assert!(approx_eq(run(&c).probabilities()[0b10], 1.0));

        let mut c = Circuit::with_size("negctrl", 2, 0);
        c.x(QubitId(0))
            .unwrap()
            .mcx([Control::negative(QubitId(0))], QubitId(1))
            .unwrap();
        assert!(approx_eq(run(&c).probabilities()[0b01], 1.0));
    }

    #[test]
    fn test_toffoli_and_fredkin() {
        let mut c = Circuit::with_size("ccx", 3, 0);
        c.x(QubitId(0))
            .unwrap()
            .x(QubitId(1))
            .unwrap()
            .ccx(QubitId(0), QubitId(1), QubitId(2))
            .unwrap();
        assert!(approx_eq(run(&c).probabilities()[0b111], 1.0));

        let mut c = Circuit::with_size("cswap", 3, 0);
        c.x(QubitId(0))
            .unwrap()
            .x(QubitId(1))
            .unwrap()
            .cswap(QubitId(0), QubitId(1), QubitId(2))
            .unwrap();
        assert!(approx_eq(run(&c).probabilities()[0b101], 1.0));
    }

    #[test]
    fn test_rotation_matches_closed_form() {
        let theta = 2.0 * 0.2_f64.sqrt().asin();
        let mut c = Circuit::with_size("bernoulli", 1, 0);
        c.ry(theta, QubitId(0)).unwrap();
        let sv = run(&c);
        assert!(approx_eq(sv.probability_one(0), 0.2));
        assert!(approx_eq(sv.expectation(&Observable::z(0)), 0.6));
    }

    #[test]
    fn test_parallel_kernels_match_sequential() {
        let mut c = Circuit::with_size("mix", 5, 0);
        c.h(QubitId(0))
            .unwrap()
            .rx(0.3, QubitId(4))
            .unwrap()
            .cx(QubitId(0), QubitId(3))
            .unwrap()
            .rzz(0.9, QubitId(1), QubitId(4))
            .unwrap()
            .cp(PI / 3.0, QubitId(3), QubitId(2))
            .unwrap()
            .iswap(QubitId(2), QubitId(0))
            .unwrap();
        let mut seq = Statevector::new(5);
        let mut par = Statevector::new(5).with_parallel_threshold(1);
        for inst in c.instructions() {
            seq.apply(inst).unwrap();
            par.apply(inst).unwrap();
        }
        assert_eq!(seq.amplitudes(), par.amplitudes());
    }

    #[test]
    fn test_parallel_readout_matches_sequential() {
        let mut c = Circuit::with_size("readout", 6, 0);
        for q in 0..6 {
            c.ry(0.2 + 0.3 * f64::from(q), QubitId(q)).unwrap();
        }
        c.cx(QubitId(0), QubitId(5)).unwrap().rzz(0.7, QubitId(2), QubitId(3)).unwrap();
        let seq = run(&c);
        let par = seq.clone().with_parallel_threshold(1);

        for (a, b) in seq.probabilities().iter().zip(&par.probabilities()) {
            assert!(approx_eq(*a, *b));
        }
        for q in 0..6 {
            assert!(approx_eq(seq.probability_one(q), par.probability_one(q)));
        }
        let qubits = [QubitId(4), QubitId(1), QubitId(5)];
        let m_seq = seq.marginal_probabilities(&qubits);
        let m_par = par.marginal_probabilities(&qubits);
        assert_eq!(m_seq.len(), 8);
        for (a, b) in m_seq.iter().zip(&m_par) {
            assert!(approx_eq(*a, *b));
        }
        assert!(approx_eq(m_par.iter().sum(), 1.0));
    }

    #[test]
    fn test_marginal_probabilities_order() {
        let mut c = Circuit::with_size("m", 3, 0);
        c.x(QubitId(2)).unwrap();
        let sv = run(&c);
        // qubits listed as [q2, q0]: k bit 0 = q2
        let m = sv.marginal_probabilities(&[QubitId(2), QubitId(0)]);
        assert!(approx_eq(m[0b01], 1.0));
        assert!(approx_eq(m.iter().sum(), 1.0));
    }

    #[test]
    fn test_expectation_paulis() {
        // |+⟩ ⊗ |0⟩: ⟨X0⟩ = 1, ⟨Z1⟩ = 1, ⟨Y0⟩ = 0
        let mut c = Circuit::with_size("e", 2, 0);
        c.h(QubitId(0)).unwrap();
        let sv = run(&c);
        let obs = |ops: Vec<(u32, PauliOp)>| Observable::pauli(PauliString::from_ops(ops));
        assert!(approx_eq(sv.expectation(&obs(vec![(0, PauliOp::X)])), 1.0));
        assert!(approx_eq(sv.expectation(&obs(vec![(1, PauliOp::Z)])), 1.0));
        assert!(approx_eq(sv.expectation(&obs(vec![(0, PauliOp::Y)])), 0.0));

        // S|+⟩ = |+i⟩: ⟨Y⟩ = 1
        let mut c = Circuit::with_size("y", 1, 0);
        c.h(QubitId(0)).unwrap().s(QubitId(0)).unwrap();
        assert!(approx_eq(run(&c).expectation(&obs(vec![(0, PauliOp::Y)])), 1.0));

        // Bell: ⟨Z0 Z1⟩ = 1, weighted sum with identity offset
        let mut c = Circuit::with_size("bell", 2, 0);
        c.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        let o = Observable::from_terms(vec![
            ObservableTerm::new(-1.0, PauliString::zz([0, 1])),
            ObservableTerm::new(0.5, PauliString::identity()),
        ]);
        assert!(approx_eq(run(&c).expectation(&o), -0.5));
    }

    #[test]
    fn test_measure_collapses() {
        let mut c = Circuit::with_size("bell", 2, 0);
        c.h(QubitId(0)).unwrap().cx(QubitId(0), QubitId(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut sv = run(&c);
            let first = sv.measure(0, &mut rng).unwrap();
            let second = sv.measure(1, &mut rng).unwrap();
            assert_eq!(first, second);
            assert!(sv.check_norm(|| "collapse".into()).is_ok());
        }
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut sv = Statevector::new(1);
        sv.apply(&Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
            .unwrap();
        sv.reset(0, &mut rng).unwrap();
        assert!(approx_eq(sv.probability_one(0), 0.0));
    }

    #[test]
    fn test_reset_keeps_other_qubits() {
        // |1⟩ on q1 and q2; resetting q1 must leave q2 at 1
        for threshold in [usize::MAX, 1] {
            let mut rng = StdRng::seed_from_u64(5);
            let mut sv = Statevector::new(3).with_parallel_threshold(threshold);
            sv.apply(&Instruction::single_qubit_gate(StandardGate::X, QubitId(1)))
                .unwrap();
            sv.apply(&Instruction::single_qubit_gate(StandardGate::X, QubitId(2)))
                .unwrap();
            sv.reset(1, &mut rng).unwrap();
            assert!(approx_eq(sv.probabilities()[0b100], 1.0));
            assert!(sv.check_norm(|| "reset".into()).is_ok());
        }
    }

    #[test]
    fn test_norm_violation_detected() {
        let mut sv = Statevector::new(1);
        sv.amplitudes[1] = Complex64::new(0.5, 0.0);
        assert!(matches!(
            sv.check_norm(|| "test".into()),
            Err(SimError::NormViolation { .. })
        ));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            sv.measure(0, &mut rng),
            Err(SimError::InconsistentMeasurement { .. })
        ));
    }
}
