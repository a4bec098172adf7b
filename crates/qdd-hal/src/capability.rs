//! Backend capability introspection.
//!
//! [`Capabilities`] tells calling code what a backend accepts before it
//! submits anything: the largest register, the gate names it understands,
//! the shot ceiling and which execution modes are available.

use serde::{Deserialize, Serialize};

/// Feature flag: exact results carry the full state vector.
pub const FEATURE_STATEVECTOR: &str = "statevector";
/// Feature flag: sampled results carry bitstring counts.
pub const FEATURE_COUNTS: &str = "counts";
/// Feature flag: exact results carry observable expectation values.
pub const FEATURE_EXPECTATION: &str = "expectation";
/// Feature flag: measurement or reset may be followed by more gates.
pub const FEATURE_MID_CIRCUIT_MEASUREMENT: &str = "mid_circuit_measurement";
/// Feature flag: controls may fire on |0⟩.
pub const FEATURE_NEGATIVE_CONTROLS: &str = "negative_controls";

/// Capabilities of a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Largest register the backend accepts.
    pub num_qubits: u32,
    /// Supported gate set (OpenQASM naming convention).
    pub gate_set: GateSet,
    /// Maximum number of shots per circuit.
    pub max_shots: u32,
    /// Whether this is a simulator.
    pub is_simulator: bool,
    /// Whether exact (state vector) execution is available.
    pub supports_exact: bool,
    /// Whether sampled (shot-based) execution is available.
    pub supports_sampled: bool,
    /// Additional capability flags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Capabilities {
    /// Create capabilities for a state-vector simulator.
    pub fn simulator(num_qubits: u32) -> Self {
        Self {
            name: "simulator".into(),
            num_qubits,
            gate_set: GateSet::universal(),
            max_shots: 1_000_000,
            is_simulator: true,
            supports_exact: true,
            supports_sampled: true,
            features: vec![
                FEATURE_STATEVECTOR.into(),
                FEATURE_COUNTS.into(),
                FEATURE_EXPECTATION.into(),
                FEATURE_MID_CIRCUIT_MEASUREMENT.into(),
                FEATURE_NEGATIVE_CONTROLS.into(),
            ],
        }
    }

    /// Set the backend name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the shot ceiling.
    #[must_use]
    pub fn with_max_shots(mut self, max_shots: u32) -> Self {
        self.max_shots = max_shots;
        self
    }

    /// Check if a feature flag is present.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Gate set supported by a backend.
///
/// Gate names follow the OpenQASM naming convention (lowercase).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSet {
    /// Single-qubit gates supported.
    pub single_qubit: Vec<String>,
    /// Two-qubit gates supported.
    pub two_qubit: Vec<String>,
    /// Three-qubit gates supported.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub three_qubit: Vec<String>,
}

impl GateSet {
    /// The full simulator basis, including user matrices.
    pub fn universal() -> Self {
        let names = |list: &[&str]| list.iter().map(|s| (*s).to_string()).collect();
        Self {
            single_qubit: names(&[
                "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg", "rx", "ry", "rz",
                "p", "u", "u1", "u2", "u3", "r", "unitary",
            ]),
            two_qubit: names(&[
                "cx", "cy", "cz", "ch", "swap", "iswap", "crx", "cry", "crz", "cp", "rxx", "ryy",
                "rzz", "unitary",
            ]),
            three_qubit: names(&["ccx", "cswap"]),
        }
    }

    /// Check if a gate is supported.
    pub fn contains(&self, gate: &str) -> bool {
        self.single_qubit.iter().any(|g| g == gate)
            || self.two_qubit.iter().any(|g| g == gate)
            || self.three_qubit.iter().any(|g| g == gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdd_ir::StandardGate;

    #[test]
    fn test_simulator_capabilities() {
        let caps = Capabilities::simulator(24).with_name("qdd_simulator");
        assert_eq!(caps.name, "qdd_simulator");
        assert_eq!(caps.num_qubits, 24);
        assert!(caps.supports_exact && caps.supports_sampled);
        assert!(caps.has_feature(FEATURE_NEGATIVE_CONTROLS));
        assert!(!caps.has_feature("shuttling"));
    }

    #[test]
    fn test_universal_covers_standard_basis() {
        let gates = GateSet::universal();
        for name in StandardGate::NAMES {
            assert!(gates.contains(name), "missing {name}");
        }
        assert!(gates.contains("unitary"));
        assert!(!gates.contains("ecr"));
    }
}
