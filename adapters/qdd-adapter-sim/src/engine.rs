//! Circuit execution in exact and sampled mode.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rustc_hash::FxHashMap;
use std::time::Instant;
use tracing::{debug, instrument};

use qdd_hal::{
    Counts, ExecutionMode, ExecutionRequest, ExecutionResult, StatevectorData,
};
use qdd_ir::{Circuit, ClbitId, Gate, InstructionKind, QubitId};

use crate::error::{SimError, SimResult};
use crate::statevector::Statevector;
use crate::unitary::{self, Lowered};

/// One executable step of a compiled circuit.
enum Step<'a> {
    Gate {
        lowered: Lowered,
        gate: &'a Gate,
        qubits: &'a [QubitId],
    },
    Measure(Vec<(QubitId, ClbitId)>),
    Reset(QubitId),
}

/// Lower every instruction once. Barriers are dropped.
fn compile(circuit: &Circuit) -> SimResult<Vec<Step<'_>>> {
    let mut steps = Vec::with_capacity(circuit.instructions().len());
    for inst in circuit.instructions() {
        match &inst.kind {
            InstructionKind::Gate(gate) => steps.push(Step::Gate {
                lowered: unitary::lower(&gate.kind)?,
                gate,
                qubits: &inst.qubits,
            }),
            InstructionKind::Measure => steps.push(Step::Measure(
                inst.qubits.iter().copied().zip(inst.clbits.iter().copied()).collect(),
            )),
            InstructionKind::Reset => {
                steps.extend(inst.qubits.iter().map(|&q| Step::Reset(q)));
            }
            InstructionKind::Barrier => {}
        }
    }
    Ok(steps)
}

/// Render classical bits with bit 0 rightmost.
fn bitstring(bits: &[bool]) -> String {
    bits.iter().rev().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Runs single requests. Stateless apart from its tunables, so one engine
/// serves every job of a backend.
#[derive(Debug, Clone)]
pub(crate) struct Engine {
    parallel_threshold: usize,
    default_seed: Option<u64>,
}

impl Engine {
    pub fn new(parallel_threshold: usize, default_seed: Option<u64>) -> Self {
        Self {
            parallel_threshold,
            default_seed,
        }
    }

    fn seed_for(&self, request: &ExecutionRequest) -> u64 {
        request
            .options
            .seed_simulator
            .or(self.default_seed)
            .unwrap_or_else(|| rand::thread_rng().next_u64())
    }

    /// Execute one request of a batch.
    #[instrument(skip(self, request), fields(circuit = %request.circuit.name(), mode = %request.options.mode))]
    pub fn execute(&self, index: usize, request: &ExecutionRequest) -> SimResult<ExecutionResult> {
        let start = Instant::now();
        let circuit = request.bound_circuit();
        let steps = compile(&circuit)?;
        debug!(
            "Starting simulation: {} qubits, {} steps",
            circuit.num_qubits(),
            steps.len()
        );

        let result = match request.options.mode {
            ExecutionMode::Exact => self.run_exact(index, &circuit, &steps, request)?,
            ExecutionMode::Sampled => self.run_sampled(index, &circuit, &steps, request)?,
        };

        let elapsed = start.elapsed();
        debug!("Simulation completed in {:?}", elapsed);
        Ok(result.with_execution_time(elapsed.as_millis() as u64))
    }

    fn initial_state(&self, num_qubits: usize) -> Statevector {
        Statevector::new(num_qubits).with_parallel_threshold(self.parallel_threshold)
    }

    /// Apply one unitary step, checking the norm in debug builds.
    fn apply_gate(
        sv: &mut Statevector,
        lowered: &Lowered,
        gate: &Gate,
        qubits: &[QubitId],
    ) -> SimResult<()> {
        sv.apply_lowered(lowered, gate, qubits)?;
        if cfg!(debug_assertions) {
            sv.check_norm(|| format!("gate '{}'", gate.name()))?;
        }
        Ok(())
    }

    fn run_exact(
        &self,
        index: usize,
        circuit: &Circuit,
        steps: &[Step<'_>],
        request: &ExecutionRequest,
    ) -> SimResult<ExecutionResult> {
        let mut sv = self.initial_state(circuit.num_qubits());
        for step in steps {
            // Terminal measurements do not change the pre-measurement state.
            if let Step::Gate {
                lowered,
                gate,
                qubits,
            } = step
            {
                Self::apply_gate(&mut sv, lowered, gate, qubits)?;
            }
        }
        sv.check_norm(|| format!("circuit '{}'", circuit.name()))?;

        let expectation_values = request
            .options
            .observables
            .iter()
            .map(|o| sv.expectation(o))
            .collect();

        let num_qubits = circuit.num_qubits() as u32;
        Ok(ExecutionResult::from_statevector(
            circuit.name(),
            index,
            StatevectorData::new(num_qubits, sv.into_amplitudes()),
        )
        .with_expectation_values(expectation_values)
        .with_seeds(None, request.options.seed_transpiler)
        .with_metadata(serde_json::json!({
            "method": "statevector",
            "num_qubits": num_qubits,
            "gate_count": circuit.gate_count(),
            "depth": circuit.depth(),
        })))
    }

    fn run_sampled(
        &self,
        index: usize,
        circuit: &Circuit,
        steps: &[Step<'_>],
        request: &ExecutionRequest,
    ) -> SimResult<ExecutionResult> {
        let shots = request.options.shots;
        let seed = self.seed_for(request);
        let mut rng = StdRng::seed_from_u64(seed);

        let (counts, method) = if circuit.has_mid_circuit_measurement() {
            (self.sample_trajectories(circuit, steps, shots, &mut rng)?, "trajectory")
        } else {
            (self.sample_final_state(circuit, steps, shots, &mut rng)?, "statevector")
        };

        Ok(ExecutionResult::from_counts(circuit.name(), index, counts, shots)
            .with_seeds(Some(seed), request.options.seed_transpiler)
            .with_metadata(serde_json::json!({
                "method": method,
                "num_qubits": circuit.num_qubits(),
                "num_clbits": circuit.num_clbits(),
                "gate_count": circuit.gate_count(),
            })))
    }

    /// Evolve once and draw every shot from the final distribution.
    fn sample_final_state(
        &self,
        circuit: &Circuit,
        steps: &[Step<'_>],
        shots: u32,
        rng: &mut StdRng,
    ) -> SimResult<Counts> {
        let mut sv = self.initial_state(circuit.num_qubits());
        for step in steps {
            if let Step::Gate {
                lowered,
                gate,
                qubits,
            } = step
            {
                Self::apply_gate(&mut sv, lowered, gate, qubits)?;
            }
        }
        sv.check_norm(|| format!("circuit '{}'", circuit.name()))?;

        // Without measurements the whole register is read out, qubit j into bit j.
        let mut map = circuit.measurement_map();
        let width = if map.is_empty() {
            map = (0..circuit.num_qubits() as u32)
                .map(|q| (QubitId(q), ClbitId(q)))
                .collect();
            circuit.num_qubits()
        } else {
            circuit.num_clbits()
        };

        let measured: Vec<QubitId> = {
            let mut qs: Vec<_> = map.iter().map(|(q, _)| *q).collect();
            qs.sort_unstable();
            qs.dedup();
            qs
        };
        let marginal = sv.marginal_probabilities(&measured);
        let dist = WeightedIndex::new(&marginal).map_err(|e| SimError::Sampling(e.to_string()))?;

        let mut histogram: FxHashMap<usize, u64> = FxHashMap::default();
        for _ in 0..shots {
            *histogram.entry(dist.sample(rng)).or_default() += 1;
        }

        // Position of each measured qubit inside the marginal index.
        let position: FxHashMap<QubitId, usize> =
            measured.iter().enumerate().map(|(j, q)| (*q, j)).collect();
        let mut counts = Counts::new();
        for (outcome, n) in histogram {
            let mut bits = vec![false; width];
            for (q, c) in &map {
                bits[c.index()] = (outcome >> position[q]) & 1 == 1;
            }
            counts.insert(bitstring(&bits), n);
        }
        debug!("Sampled {} shots into {} outcomes", shots, counts.len());
        Ok(counts)
    }

    /// Replay the measurement-dependent suffix once per shot.
    fn sample_trajectories(
        &self,
        circuit: &Circuit,
        steps: &[Step<'_>],
        shots: u32,
        rng: &mut StdRng,
    ) -> SimResult<Counts> {
        let split = steps
            .iter()
            .position(|s| !matches!(s, Step::Gate { .. }))
            .unwrap_or(steps.len());
        let (prefix, suffix) = steps.split_at(split);

        let mut base = self.initial_state(circuit.num_qubits());
        for step in prefix {
            if let Step::Gate {
                lowered,
                gate,
                qubits,
            } = step
            {
                Self::apply_gate(&mut base, lowered, gate, qubits)?;
            }
        }

        let mut counts = Counts::new();
        for shot in 0..shots {
            let mut sv = base.clone();
            let mut bits = vec![false; circuit.num_clbits()];
            for step in suffix {
                match step {
                    Step::Gate {
                        lowered,
                        gate,
                        qubits,
                    } => Self::apply_gate(&mut sv, lowered, gate, qubits)?,
                    Step::Measure(pairs) => {
                        for (q, c) in pairs {
                            bits[c.index()] = sv.measure(q.index(), rng)?;
                        }
                    }
                    Step::Reset(q) => sv.reset(q.index(), rng)?,
                }
            }
            sv.check_norm(|| format!("shot {shot} of circuit '{}'", circuit.name()))?;
            counts.insert(bitstring(&bits), 1);

            if shot > 0 && shot % 1000 == 0 {
                debug!("Completed {} shots", shot);
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdd_hal::RunOptions;
    use std::f64::consts::PI;

    fn engine() -> Engine {
        Engine::new(usize::MAX, None)
    }

    #[test]
    fn test_bitstring_order() {
        assert_eq!(bitstring(&[true, false, false]), "001");
        assert_eq!(bitstring(&[]), "");
    }

    #[test]
    fn test_exact_bell() {
        let result = engine()
            .execute(0, &ExecutionRequest::exact(Circuit::bell().unwrap()))
            .unwrap();
        let sv = result.statevector().unwrap();
        let probs = sv.probabilities();
        assert!((probs[0] - 0.5).abs() < 1e-10);
        assert!((probs[3] - 0.5).abs() < 1e-10);
        assert_eq!(result.mode, ExecutionMode::Exact);
        assert_eq!(result.seed_simulator, None);
    }

    #[test]
    fn test_sampled_records_seed() {
        let request = ExecutionRequest::new(
            Circuit::bell().unwrap(),
            RunOptions::sampled(100).with_seed_simulator(5),
        );
        let result = engine().execute(2, &request).unwrap();
        assert_eq!(result.seed_simulator, Some(5));
        assert_eq!(result.index, 2);
        assert_eq!(result.counts().unwrap().total_shots(), 100);
    }

    #[test]
    fn test_default_seed_fallback() {
        let request = ExecutionRequest::sampled(Circuit::bell().unwrap(), 10);
        let result = Engine::new(usize::MAX, Some(17)).execute(0, &request).unwrap();
        assert_eq!(result.seed_simulator, Some(17));
    }

    #[test]
    fn test_unmeasured_register_read_in_full() {
        let mut c = Circuit::with_size("x2", 3, 0);
        c.x(QubitId(2)).unwrap();
        let result = engine().execute(0, &ExecutionRequest::sampled(c, 50)).unwrap();
        assert_eq!(result.counts().unwrap().get("100"), 50);
    }

    #[test]
    fn test_partial_measurement_clbit_mapping() {
        // q1 -> c0 and q0 -> c2 of a 3-bit register
        let mut c = Circuit::with_size("map", 2, 3);
        c.x(QubitId(1))
            .unwrap()
            .measure(QubitId(1), ClbitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(2))
            .unwrap();
        let result = engine().execute(0, &ExecutionRequest::sampled(c, 20)).unwrap();
        assert_eq!(result.counts().unwrap().get("001"), 20);
    }

    #[test]
    fn test_mid_circuit_reset_uses_trajectories() {
        // measure |1⟩, reset, then measure again: always "01"
        let mut c = Circuit::with_size("reset", 1, 2);
        c.x(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .reset(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(1))
            .unwrap();
        let result = engine().execute(0, &ExecutionRequest::sampled(c, 30)).unwrap();
        assert_eq!(result.counts().unwrap().get("01"), 30);
        assert_eq!(result.metadata["method"], "trajectory");
    }

    #[test]
    fn test_measurement_feeds_later_gate() {
        // H, measure into c0, then CX from the measured qubit: bits always agree
        let mut c = Circuit::with_size("feed", 2, 2);
        c.h(QubitId(0))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .measure(QubitId(1), ClbitId(1))
            .unwrap();
        let request = ExecutionRequest::new(c, RunOptions::sampled(200).with_seed_simulator(1));
        let counts = engine().execute(0, &request).unwrap();
        let counts = counts.counts().unwrap();
        assert_eq!(counts.get("00") + counts.get("11"), 200);
    }

    #[test]
    fn test_symbolic_parameters_bound_before_run() {
        let mut c = Circuit::with_size("param", 1, 0);
        c.rx(qdd_ir::Parameter::symbol("theta"), QubitId(0)).unwrap();
        let request = ExecutionRequest::new(c, RunOptions::exact().with_parameter("theta", PI));
        let result = engine().execute(0, &request).unwrap();
        assert!((result.statevector().unwrap().probability_one(0) - 1.0).abs() < 1e-10);
    }
}
