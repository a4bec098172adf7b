//! QDD Backend Contract
//!
//! This crate defines how circuits are handed to a backend and how their
//! outcomes come back:
//! - a common [`Backend`] trait for batch submission, polling and retrieval
//! - [`ExecutionRequest`] and [`RunOptions`] carrying the mode, shot count,
//!   explicit seeds, parameter bindings and observables of one circuit run
//! - [`JobResult`] holding one [`ExecutionResult`] per request, in
//!   submission order
//! - [`Capabilities`] so callers can check circuits before submitting
//! - [`HalError`] with the error taxonomy (`InvalidCircuit`,
//!   `InvalidRequest`, `ExecutionFailure`, `CapacityExceeded`)
//!
//! # Example: Running a Batch
//!
//! ```ignore
//! use qdd_adapter_sim::QddProvider;
//! use qdd_hal::{Backend, ExecutionRequest, RunOptions};
//! use qdd_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = QddProvider::new().get_backend()?;
//!
//!     let job_id = backend
//!         .submit(vec![
//!             ExecutionRequest::new(Circuit::bell()?, RunOptions::sampled(1000).with_seed_simulator(7)),
//!             ExecutionRequest::exact(Circuit::qft(3)?),
//!         ])
//!         .await?;
//!
//!     let results = backend.wait(&job_id).await?;
//!     println!("{:?}", results.get(0).and_then(|r| r.counts()));
//!     println!("{:?}", results.get(1).and_then(|r| r.statevector()));
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod capability;
pub mod error;
pub mod job;
pub mod registry;
pub mod request;
pub mod result;

pub use backend::{Backend, BackendAvailability, BackendConfig, BackendFactory, ValidationResult};
pub use capability::{Capabilities, GateSet};
pub use error::{HalError, HalResult};
pub use job::{Job, JobId, JobStatus};
pub use registry::BackendRegistry;
pub use request::{ExecutionMode, ExecutionRequest, RunOptions};
pub use result::{Counts, ExecutionResult, JobResult, ResultData, StatevectorData};
