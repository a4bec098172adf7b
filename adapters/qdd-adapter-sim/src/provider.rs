//! Provider facade handing out simulator backends.

use qdd_hal::{Backend, BackendRegistry, Capabilities, HalResult};

use crate::config::SimulatorConfig;
use crate::simulator::{SIMULATOR_NAME, SimulatorBackend};

/// Entry point for callers that only want "a backend".
///
/// Each call to [`get_backend`](QddProvider::get_backend) returns an
/// independent simulator with its own job table and worker limit.
#[derive(Debug, Clone, Default)]
pub struct QddProvider {
    config: SimulatorConfig,
}

impl QddProvider {
    /// Create a provider with default simulator settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider whose backends use `config`.
    pub fn with_config(config: SimulatorConfig) -> HalResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Names of the backends this provider offers.
    pub fn backends(&self) -> Vec<&'static str> {
        vec![SIMULATOR_NAME]
    }

    /// Capabilities of the backends this provider hands out.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::simulator(self.config.max_qubits)
            .with_name(SIMULATOR_NAME)
            .with_max_shots(self.config.max_shots)
    }

    /// Create a ready-to-use simulator backend.
    pub fn get_backend(&self) -> HalResult<SimulatorBackend> {
        SimulatorBackend::with_config(self.config.clone())
    }

    /// A registry with the simulator registered under its name.
    pub fn registry() -> BackendRegistry {
        let mut registry = BackendRegistry::new();
        registry.register::<SimulatorBackend>(SIMULATOR_NAME);
        registry
    }

    /// Same as [`get_backend`](QddProvider::get_backend), boxed as a trait object.
    pub fn get_dyn_backend(&self) -> HalResult<Box<dyn Backend>> {
        Ok(Box::new(self.get_backend()?))
    }
}
