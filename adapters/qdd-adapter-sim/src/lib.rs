//! QDD Local Statevector Simulator
//!
//! A dense state-vector simulator behind the [`qdd_hal::Backend`] contract.
//! Every job owns its state vectors; jobs run on tokio's blocking pool with
//! a configurable concurrency limit.
//!
//! # Features
//!
//! - **Exact mode**: final amplitudes plus expectation values of Pauli observables
//! - **Sampled mode**: seeded shots drawn from the marginal over measured qubits
//! - **Controlled gates**: positive and negative controls on any gate
//! - **Mid-circuit measurement and reset**: per-shot trajectories
//! - **Parallel kernels**: rayon above a configurable state size
//!
//! # Memory
//!
//! | Qubits | Memory |
//! |--------|--------|
//! | 10 | ~16 KB |
//! | 20 | ~16 MB |
//! | 24 | ~256 MB |
//! | 30 | ~16 GB |
//!
//! # Example
//!
//! ```no_run
//! use qdd_adapter_sim::QddProvider;
//! use qdd_hal::{Backend, ExecutionRequest, RunOptions};
//! use qdd_ir::Circuit;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = QddProvider::new().get_backend()?;
//!
//! let request = ExecutionRequest::new(
//!     Circuit::bell()?,
//!     RunOptions::sampled(1000).with_seed_simulator(42),
//! );
//! let job_id = backend.run(request).await?;
//! let result = backend.wait(&job_id).await?;
//!
//! // Expect ~50% "00" and ~50% "11"
//! println!("{:?}", result.get(0).and_then(|r| r.counts()));
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
mod kernels;
mod provider;
mod simulator;
mod statevector;
mod unitary;

pub use config::{MAX_SUPPORTED_QUBITS, SimulatorConfig};
pub use error::{SimError, SimResult};
pub use provider::QddProvider;
pub use simulator::{SIMULATOR_NAME, SimulatorBackend};
pub use statevector::{NORM_TOLERANCE, Statevector};
