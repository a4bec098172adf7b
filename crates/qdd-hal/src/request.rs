//! Execution requests.
//!
//! An [`ExecutionRequest`] pairs a circuit with the [`RunOptions`] it should
//! run under. Seeds are carried explicitly on every request; there is no
//! process-wide random state.

use qdd_ir::{Circuit, Observable};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

/// Default shot count for sampled execution.
pub const DEFAULT_SHOTS: u32 = 1024;

/// How a circuit is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Return the final state vector without collapse.
    Exact,
    /// Draw measurement samples and return bitstring counts.
    #[default]
    Sampled,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Exact => write!(f, "exact"),
            ExecutionMode::Sampled => write!(f, "sampled"),
        }
    }
}

/// Options for one circuit execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Execution mode.
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Number of shots. Ignored in exact mode.
    #[serde(default = "default_shots")]
    pub shots: u32,
    /// Seed for measurement sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_simulator: Option<u64>,
    /// Seed for transpiler-level randomness. Echoed back in the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_transpiler: Option<u64>,
    /// Values for symbolic circuit parameters.
    #[serde(default, skip_serializing_if = "FxHashMap::is_empty")]
    pub parameters: FxHashMap<String, f64>,
    /// Observables to evaluate in exact mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observables: Vec<Observable>,
}

fn default_shots() -> u32 {
    DEFAULT_SHOTS
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sampled,
            shots: DEFAULT_SHOTS,
            seed_simulator: None,
            seed_transpiler: None,
            parameters: FxHashMap::default(),
            observables: vec![],
        }
    }
}

impl RunOptions {
    /// Options for exact execution.
    pub fn exact() -> Self {
        Self {
            mode: ExecutionMode::Exact,
            ..Self::default()
        }
    }

    /// Options for sampled execution with `shots` samples.
    pub fn sampled(shots: u32) -> Self {
        Self {
            mode: ExecutionMode::Sampled,
            shots,
            ..Self::default()
        }
    }

    /// Set the simulator seed.
    #[must_use]
    pub fn with_seed_simulator(mut self, seed: u64) -> Self {
        self.seed_simulator = Some(seed);
        self
    }

    /// Set the transpiler seed.
    #[must_use]
    pub fn with_seed_transpiler(mut self, seed: u64) -> Self {
        self.seed_transpiler = Some(seed);
        self
    }

    /// Bind a symbolic parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// Request an expectation value.
    #[must_use]
    pub fn with_observable(mut self, observable: Observable) -> Self {
        self.observables.push(observable);
        self
    }

    /// Check the options for internal consistency.
    ///
    /// A nonzero shot count in exact mode is accepted and ignored.
    pub fn validate(&self) -> HalResult<()> {
        match self.mode {
            ExecutionMode::Sampled if self.shots == 0 => {
                return Err(HalError::InvalidRequest(
                    "sampled mode requires a positive shot count".into(),
                ));
            }
            ExecutionMode::Sampled if !self.observables.is_empty() => {
                return Err(HalError::InvalidRequest(
                    "observables are only evaluated in exact mode".into(),
                ));
            }
            _ => {}
        }
        if let Some((name, value)) = self.parameters.iter().find(|(_, v)| !v.is_finite()) {
            return Err(HalError::InvalidRequest(format!(
                "parameter '{name}' has non-finite value {value}"
            )));
        }
        Ok(())
    }
}

/// A circuit together with the options it runs under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The circuit to execute.
    pub circuit: Circuit,
    /// Execution options.
    #[serde(default)]
    pub options: RunOptions,
}

impl ExecutionRequest {
    /// Create a request.
    pub fn new(circuit: Circuit, options: RunOptions) -> Self {
        Self { circuit, options }
    }

    /// Create an exact-mode request.
    pub fn exact(circuit: Circuit) -> Self {
        Self::new(circuit, RunOptions::exact())
    }

    /// Create a sampled-mode request.
    pub fn sampled(circuit: Circuit, shots: u32) -> Self {
        Self::new(circuit, RunOptions::sampled(shots))
    }

    /// Check everything about the request that does not depend on a backend.
    pub fn validate(&self) -> HalResult<()> {
        self.options.validate()?;
        self.circuit.validate()?;

        if self.options.mode == ExecutionMode::Exact && self.circuit.has_mid_circuit_measurement()
        {
            return Err(HalError::InvalidRequest(format!(
                "circuit '{}' uses mid-circuit measurement or reset, which has no exact state",
                self.circuit.name()
            )));
        }

        let num_qubits = self.circuit.num_qubits();
        if let Some(obs) = self
            .options
            .observables
            .iter()
            .find(|o| o.min_qubits() as usize > num_qubits)
        {
            return Err(HalError::InvalidRequest(format!(
                "observable needs {} qubits but circuit '{}' has {num_qubits}",
                obs.min_qubits(),
                self.circuit.name()
            )));
        }

        let unbound: Vec<String> = self
            .circuit
            .parameter_names()
            .into_iter()
            .filter(|name| !self.options.parameters.contains_key(name))
            .collect();
        if !unbound.is_empty() {
            return Err(HalError::InvalidCircuit(format!(
                "unbound parameters: {}",
                unbound.join(", ")
            )));
        }
        Ok(())
    }

    /// The circuit with all symbolic parameters bound.
    pub fn bound_circuit(&self) -> Circuit {
        if self.circuit.is_parameterized() {
            self.circuit.bind_parameters(&self.options.parameters)
        } else {
            self.circuit.clone()
        }
    }
}
