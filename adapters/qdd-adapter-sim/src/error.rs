//! Simulator error types.

use qdd_hal::HalError;
use qdd_ir::IrError;
use thiserror::Error;

/// Errors raised inside the simulation engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// A gate matrix is not unitary.
    #[error("Gate '{gate}' is not unitary: {reason}")]
    NonUnitary {
        /// Gate name.
        gate: String,
        /// What failed.
        reason: String,
    },

    /// The state-vector norm drifted beyond tolerance.
    #[error("State norm {norm_sqr:.12} deviates from 1 after {context}")]
    NormViolation {
        /// Observed squared norm.
        norm_sqr: f64,
        /// Where the check ran.
        context: String,
    },

    /// Measurement probabilities are inconsistent with the state.
    #[error("Measurement of qubit {qubit} is inconsistent: {reason}")]
    InconsistentMeasurement {
        /// Measured qubit.
        qubit: u32,
        /// What failed.
        reason: String,
    },

    /// The sampling distribution could not be built.
    #[error("Sampling failed: {0}")]
    Sampling(String),

    /// The circuit cannot be lowered.
    #[error(transparent)]
    Circuit(#[from] IrError),
}

impl From<SimError> for HalError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::Circuit(e) => HalError::InvalidCircuit(e.to_string()),
            other => HalError::ExecutionFailure(other.to_string()),
        }
    }
}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_errors_are_execution_failures() {
        let err: HalError = SimError::NormViolation {
            norm_sqr: 1.5,
            context: "gate 'unitary'".into(),
        }
        .into();
        assert!(matches!(err, HalError::ExecutionFailure(_)));
    }

    #[test]
    fn test_circuit_errors_are_invalid_circuit() {
        let err: HalError = SimError::from(IrError::UnboundParameter("theta".into())).into();
        assert!(matches!(err, HalError::InvalidCircuit(_)));
    }
}
