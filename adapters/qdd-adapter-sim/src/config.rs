//! Simulator configuration.

use serde::{Deserialize, Serialize};

use qdd_hal::{BackendConfig, HalError, HalResult};

/// Largest register any configuration may declare.
///
/// A 34-qubit state already needs 256 GiB of amplitudes.
pub const MAX_SUPPORTED_QUBITS: u32 = 34;

/// Tunables of a [`SimulatorBackend`](crate::SimulatorBackend).
///
/// Read from the `extra` map of a [`BackendConfig`] using the field names
/// as keys. Missing keys take their defaults and unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Largest register accepted at submission.
    pub max_qubits: u32,
    /// Largest shot count accepted per circuit.
    pub max_shots: u32,
    /// Number of jobs allowed to run at the same time.
    pub max_concurrent_jobs: usize,
    /// State size (in amplitudes) from which gate kernels use rayon.
    pub parallel_threshold: usize,
    /// Simulator seed used when a request carries none.
    pub default_seed: Option<u64>,
    /// Finished jobs kept for `status`/`result` lookups. Older ones are
    /// dropped first.
    pub max_retained_jobs: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_qubits: 24,
            max_shots: 1_000_000,
            max_concurrent_jobs: std::thread::available_parallelism().map_or(1, usize::from),
            parallel_threshold: 1 << 14,
            default_seed: None,
            max_retained_jobs: 1024,
        }
    }
}

impl SimulatorConfig {
    /// Parse the simulator settings out of a backend configuration.
    pub fn from_backend_config(config: &BackendConfig) -> HalResult<Self> {
        let parsed: Self = serde_json::from_value(serde_json::Value::Object(config.extra.clone()))
            .map_err(|e| HalError::Configuration(format!("{}: {e}", config.name)))?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Set the qubit limit.
    #[must_use]
    pub fn with_max_qubits(mut self, max_qubits: u32) -> Self {
        self.max_qubits = max_qubits;
        self
    }

    /// Set the number of concurrently running jobs.
    #[must_use]
    pub fn with_max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.max_concurrent_jobs = jobs;
        self
    }

    /// Set the fallback simulator seed.
    #[must_use]
    pub fn with_default_seed(mut self, seed: u64) -> Self {
        self.default_seed = Some(seed);
        self
    }

    /// Set how many finished jobs stay queryable.
    #[must_use]
    pub fn with_max_retained_jobs(mut self, jobs: usize) -> Self {
        self.max_retained_jobs = jobs;
        self
    }

    /// Check that the settings are usable.
    pub fn validate(&self) -> HalResult<()> {
        if self.max_qubits == 0 || self.max_qubits > MAX_SUPPORTED_QUBITS {
            return Err(HalError::Configuration(format!(
                "max_qubits must be in 1..={MAX_SUPPORTED_QUBITS}, got {}",
                self.max_qubits
            )));
        }
        if self.max_shots == 0 {
            return Err(HalError::Configuration("max_shots must be positive".into()));
        }
        if self.max_concurrent_jobs == 0 {
            return Err(HalError::Configuration(
                "max_concurrent_jobs must be positive".into(),
            ));
        }
        if self.max_retained_jobs == 0 {
            return Err(HalError::Configuration(
                "max_retained_jobs must be positive".into(),
            ));
        }
        Ok(())
    }
}
