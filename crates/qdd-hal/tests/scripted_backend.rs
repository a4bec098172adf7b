//! A test backend whose jobs walk through a fixed status script.
//!
//! Exercises the provided `run()` and `wait()` methods of [`Backend`] and
//! registry construction through [`BackendFactory`], independent of any
//! real simulator.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use qdd_hal::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, BackendRegistry, Capabilities,
    Counts, ExecutionRequest, ExecutionResult, HalError, HalResult, JobId, JobResult, JobStatus,
    ValidationResult,
};
use qdd_ir::Circuit;

struct ScriptedJob {
    script: Vec<JobStatus>,
    polls: usize,
    num_circuits: usize,
}

/// Backend that replays a status script, one step per `status()` call.
struct ScriptedBackend {
    capabilities: Capabilities,
    script: Vec<JobStatus>,
    jobs: Mutex<FxHashMap<JobId, ScriptedJob>>,
    next_job_id: AtomicU64,
}

impl ScriptedBackend {
    fn new(script: Vec<JobStatus>) -> Self {
        Self {
            capabilities: Capabilities::simulator(4).with_name("scripted"),
            script,
            jobs: Mutex::new(FxHashMap::default()),
            next_job_id: AtomicU64::new(0),
        }
    }
}

impl BackendFactory for ScriptedBackend {
    fn from_config(_config: BackendConfig) -> HalResult<Self> {
        Ok(Self::new(vec![JobStatus::Completed]))
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::available(0))
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        if circuit.num_qubits() > self.capabilities.num_qubits as usize {
            return Ok(ValidationResult::Invalid {
                reasons: vec![format!("{} qubits", circuit.num_qubits())],
            });
        }
        Ok(ValidationResult::Valid)
    }

    async fn submit(&self, requests: Vec<ExecutionRequest>) -> HalResult<JobId> {
        for request in &requests {
            request.validate()?;
            self.validate(&request.circuit).await?.into_result()?;
        }
        let id = JobId::new(format!("scripted-{}", self.next_job_id.fetch_add(1, Ordering::Relaxed)));
        self.jobs.lock().unwrap().insert(
            id.clone(),
            ScriptedJob {
                script: self.script.clone(),
                polls: 0,
                num_circuits: requests.len(),
            },
        );
        Ok(id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        let step = job.polls.min(job.script.len() - 1);
        job.polls += 1;
        Ok(job.script[step].clone())
    }

    async fn result(&self, job_id: &JobId) -> HalResult<JobResult> {
        let jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get(job_id)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        let results = (0..job.num_circuits)
            .map(|i| ExecutionResult::from_counts(format!("c{i}"), i, Counts::from_pairs([("0", 1)]), 1))
            .collect();
        Ok(JobResult::new(job_id.clone(), results))
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        Err(HalError::NotCancellable {
            job_id: job_id.0.clone(),
            status: JobStatus::Running,
        })
    }
}

fn small_circuit() -> Circuit {
    Circuit::ghz(2).unwrap()
}

#[tokio::test]
async fn test_wait_follows_script_to_completion() {
    let backend = ScriptedBackend::new(vec![
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Running,
        JobStatus::Completed,
    ]);
    let job_id = backend
        .submit(vec![
            ExecutionRequest::sampled(small_circuit(), 1),
            ExecutionRequest::sampled(small_circuit(), 1),
        ])
        .await
        .unwrap();

    let result = backend.wait(&job_id).await.unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.get(1).unwrap().index, 1);
}

#[tokio::test]
async fn test_wait_reports_failure() {
    let backend = ScriptedBackend::new(vec![
        JobStatus::Running,
        JobStatus::Failed("norm drift".into()),
    ]);
    let job_id = backend
        .run(ExecutionRequest::sampled(small_circuit(), 1))
        .await
        .unwrap();

    match backend.wait(&job_id).await {
        Err(HalError::JobFailed(msg)) => assert_eq!(msg, "norm drift"),
        other => panic!("expected JobFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wait_reports_cancellation() {
    let backend = ScriptedBackend::new(vec![JobStatus::Cancelled]);
    let job_id = backend
        .run(ExecutionRequest::exact(small_circuit()))
        .await
        .unwrap();
    assert!(matches!(backend.wait(&job_id).await, Err(HalError::JobCancelled)));
}

#[tokio::test]
async fn test_submit_rejects_whole_batch() {
    let backend = ScriptedBackend::new(vec![JobStatus::Completed]);
    let too_wide = Circuit::with_size("wide", 8, 0);
    let err = backend
        .submit(vec![
            ExecutionRequest::sampled(small_circuit(), 1),
            ExecutionRequest::sampled(too_wide, 1),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidCircuit(_)));

    let err = backend
        .submit(vec![ExecutionRequest::sampled(small_circuit(), 0)])
        .await
        .unwrap_err();
    assert!(matches!(err, HalError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_unknown_job() {
    let backend = ScriptedBackend::new(vec![JobStatus::Completed]);
    assert!(matches!(
        backend.wait(&JobId::new("missing")).await,
        Err(HalError::JobNotFound(_))
    ));
}

#[tokio::test]
async fn test_registry_builds_backend() {
    let mut registry = BackendRegistry::new();
    registry.register::<ScriptedBackend>("scripted");

    let backend = registry
        .create("scripted", BackendConfig::new("scripted"))
        .unwrap();
    assert_eq!(backend.name(), "scripted");
    let job_id = backend
        .run(ExecutionRequest::sampled(small_circuit(), 1))
        .await
        .unwrap();
    assert_eq!(backend.wait(&job_id).await.unwrap().len(), 1);
}
