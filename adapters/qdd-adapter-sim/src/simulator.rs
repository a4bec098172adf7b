//! Simulator backend implementation.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, instrument, warn};

use qdd_hal::{
    Backend, BackendAvailability, BackendConfig, BackendFactory, Capabilities, ExecutionMode,
    ExecutionRequest, ExecutionResult, HalError, HalResult, Job, JobId, JobResult, JobStatus,
    ValidationResult,
};
use qdd_ir::Circuit;

use crate::config::SimulatorConfig;
use crate::engine::Engine;

/// Name the simulator registers under.
pub const SIMULATOR_NAME: &str = "qdd_simulator";

/// Job data for the simulator.
struct SimJob {
    job: Job,
    result: Option<JobResult>,
    status_tx: watch::Sender<JobStatus>,
}

/// Live and recently finished jobs.
///
/// Finished jobs are kept in completion order and the oldest are dropped
/// once more than `retain` of them have piled up, together with their
/// results.
struct JobStore {
    jobs: FxHashMap<JobId, SimJob>,
    finished: VecDeque<JobId>,
    retain: usize,
}

impl JobStore {
    fn new(retain: usize) -> Self {
        Self {
            jobs: FxHashMap::default(),
            finished: VecDeque::new(),
            retain,
        }
    }

    /// Jobs still queued or running.
    fn pending(&self) -> usize {
        self.jobs.len() - self.finished.len()
    }

    /// Record that `job_id` reached a terminal state and evict the overflow.
    fn finish(&mut self, job_id: &JobId) {
        self.finished.push_back(job_id.clone());
        while self.finished.len() > self.retain {
            if let Some(old) = self.finished.pop_front() {
                self.jobs.remove(&old);
                debug!("Evicted finished job {}", old);
            }
        }
    }

    /// Drop a finished job now.
    fn forget(&mut self, job_id: &JobId) -> HalResult<()> {
        let entry = self
            .jobs
            .get(job_id)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        if !entry.job.status.is_terminal() {
            return Err(HalError::JobPending {
                job_id: job_id.0.clone(),
                status: entry.job.status.clone(),
            });
        }
        self.jobs.remove(job_id);
        self.finished.retain(|id| id != job_id);
        Ok(())
    }
}

type JobTable = Arc<Mutex<JobStore>>;

fn lock(jobs: &Mutex<JobStore>) -> MutexGuard<'_, JobStore> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Move a job to `status`, storing `result` on success, and notify waiters.
///
/// Returns `false` if the job is gone or the transition is not allowed.
fn transition(jobs: &JobTable, job_id: &JobId, status: JobStatus, result: Option<JobResult>) -> bool {
    let mut store = lock(jobs);
    let Some(entry) = store.jobs.get_mut(job_id) else {
        return false;
    };
    if !entry.job.transition(status.clone()) {
        return false;
    }
    if result.is_some() {
        entry.result = result;
    }
    let terminal = status.is_terminal();
    entry.status_tx.send_replace(status);
    if terminal {
        store.finish(job_id);
    }
    true
}

/// Run every request of a batch in order.
///
/// The first failing circuit fails the whole batch.
fn execute_batch(engine: &Engine, requests: &[ExecutionRequest]) -> Result<Vec<ExecutionResult>, String> {
    requests
        .iter()
        .enumerate()
        .map(|(i, request)| {
            engine.execute(i, request).map_err(|e| {
                format!("circuit {i} ('{}'): {}", request.circuit.name(), HalError::from(e))
            })
        })
        .collect()
}

/// Local state-vector simulator backend.
///
/// Submitted jobs run on tokio's blocking pool. At most
/// `max_concurrent_jobs` run at a time; the rest wait in `Queued`, where they
/// can still be cancelled. Every job owns its state vectors. Only the last
/// `max_retained_jobs` finished jobs stay queryable.
pub struct SimulatorBackend {
    name: String,
    config: SimulatorConfig,
    capabilities: Capabilities,
    jobs: JobTable,
    permits: Arc<Semaphore>,
    engine: Engine,
}

impl SimulatorBackend {
    /// Create a new simulator backend with default settings.
    pub fn new() -> Self {
        Self::build(SIMULATOR_NAME.to_string(), SimulatorConfig::default())
    }

    /// Create a simulator with custom settings.
    pub fn with_config(config: SimulatorConfig) -> HalResult<Self> {
        config.validate()?;
        Ok(Self::build(SIMULATOR_NAME.to_string(), config))
    }

    fn build(name: String, config: SimulatorConfig) -> Self {
        let capabilities = Capabilities::simulator(config.max_qubits)
            .with_name(name.clone())
            .with_max_shots(config.max_shots);
        Self {
            name,
            capabilities,
            jobs: Arc::new(Mutex::new(JobStore::new(config.max_retained_jobs))),
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            engine: Engine::new(config.parallel_threshold, config.default_seed),
            config,
        }
    }

    /// The active settings.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Circuit-level checks shared by `validate` and `submit`.
    fn circuit_problems(&self, circuit: &Circuit) -> Vec<String> {
        let mut reasons = vec![];
        let max = self.config.max_qubits as usize;
        if circuit.num_qubits() > max {
            reasons.push(format!(
                "circuit '{}' has {} qubits but {} supports at most {max}",
                circuit.name(),
                circuit.num_qubits(),
                self.name
            ));
        }
        let mut unsupported: Vec<&str> = circuit
            .instructions()
            .iter()
            .filter_map(|inst| inst.as_gate())
            .map(|g| g.name())
            .filter(|name| !self.capabilities.gate_set.contains(name))
            .collect();
        unsupported.sort_unstable();
        unsupported.dedup();
        if !unsupported.is_empty() {
            reasons.push(format!("unsupported gates: {}", unsupported.join(", ")));
        }
        reasons
    }

    fn check_request(&self, index: usize, request: &ExecutionRequest) -> HalResult<()> {
        request.validate()?;
        ValidationResult::from_reasons(self.circuit_problems(&request.circuit)).into_result()?;
        if request.options.mode == ExecutionMode::Sampled
            && request.options.shots > self.config.max_shots
        {
            return Err(HalError::CapacityExceeded(format!(
                "request {index} asks for {} shots, limit is {}",
                request.options.shots, self.config.max_shots
            )));
        }
        Ok(())
    }

    fn pending_jobs(&self) -> usize {
        lock(&self.jobs).pending()
    }

    /// Number of jobs currently held, finished ones included.
    pub fn retained_jobs(&self) -> usize {
        lock(&self.jobs).jobs.len()
    }

    /// Discard a finished job and its result.
    ///
    /// Fails with `JobPending` while the job is queued or running.
    pub fn forget(&self, job_id: &JobId) -> HalResult<()> {
        lock(&self.jobs).forget(job_id)
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Worker body of one job: wait for a permit, run, record the outcome.
async fn run_job(
    jobs: JobTable,
    permits: Arc<Semaphore>,
    engine: Engine,
    job_id: JobId,
    requests: Vec<ExecutionRequest>,
) {
    let Ok(_permit) = permits.acquire_owned().await else {
        transition(&jobs, &job_id, JobStatus::Failed("worker pool closed".into()), None);
        return;
    };

    if !transition(&jobs, &job_id, JobStatus::Running, None) {
        debug!("Job {} cancelled before start", job_id);
        return;
    }
    debug!("Job {} running", job_id);

    let outcome = tokio::task::spawn_blocking(move || execute_batch(&engine, &requests)).await;
    match outcome {
        Ok(Ok(results)) => {
            info!("Job {} completed ({} results)", job_id, results.len());
            let result = JobResult::new(job_id.clone(), results);
            transition(&jobs, &job_id, JobStatus::Completed, Some(result));
        }
        Ok(Err(reason)) => {
            warn!("Job {} failed: {}", job_id, reason);
            transition(&jobs, &job_id, JobStatus::Failed(reason), None);
        }
        Err(join_err) => {
            warn!("Job {} worker aborted: {}", job_id, join_err);
            let reason = format!("simulation worker aborted: {join_err}");
            transition(&jobs, &job_id, JobStatus::Failed(reason), None);
        }
    }
}

#[async_trait]
impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn availability(&self) -> HalResult<BackendAvailability> {
        Ok(BackendAvailability::available(self.pending_jobs() as u32))
    }

    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        Ok(ValidationResult::from_reasons(self.circuit_problems(circuit)))
    }

    #[instrument(skip(self, requests), fields(batch = requests.len()))]
    async fn submit(&self, requests: Vec<ExecutionRequest>) -> HalResult<JobId> {
        if requests.is_empty() {
            return Err(HalError::InvalidRequest("empty batch".into()));
        }
        for (i, request) in requests.iter().enumerate() {
            self.check_request(i, request)?;
        }

        let job_id = JobId::generate();
        let job = Job::new(job_id.clone(), requests.len()).with_backend(self.name.clone());
        let (status_tx, _) = watch::channel(JobStatus::Queued);
        lock(&self.jobs).jobs.insert(
            job_id.clone(),
            SimJob {
                job,
                result: None,
                status_tx,
            },
        );
        info!("Submitted job {} with {} circuits", job_id, requests.len());

        tokio::spawn(run_job(
            Arc::clone(&self.jobs),
            Arc::clone(&self.permits),
            self.engine.clone(),
            job_id.clone(),
            requests,
        ));

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        lock(&self.jobs)
            .jobs
            .get(job_id)
            .map(|j| j.job.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<JobResult> {
        let store = lock(&self.jobs);
        let entry = store
            .jobs
            .get(job_id)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        match &entry.job.status {
            JobStatus::Completed => entry
                .result
                .clone()
                .ok_or_else(|| HalError::Backend(format!("job {job_id} has no stored result"))),
            JobStatus::Failed(reason) => Err(HalError::JobFailed(reason.clone())),
            JobStatus::Cancelled => Err(HalError::JobCancelled),
            status @ (JobStatus::Queued | JobStatus::Running) => Err(HalError::JobPending {
                job_id: job_id.0.clone(),
                status: status.clone(),
            }),
        }
    }

    #[instrument(skip(self))]
    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        let mut store = lock(&self.jobs);
        let entry = store
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        if !entry.job.transition(JobStatus::Cancelled) {
            return Err(HalError::NotCancellable {
                job_id: job_id.0.clone(),
                status: entry.job.status.clone(),
            });
        }
        entry.status_tx.send_replace(JobStatus::Cancelled);
        store.finish(job_id);
        info!("Cancelled job {}", job_id);
        Ok(())
    }

    /// Block on the job's status channel instead of polling.
    async fn wait(&self, job_id: &JobId) -> HalResult<JobResult> {
        let mut rx = lock(&self.jobs)
            .jobs
            .get(job_id)
            .map(|j| j.status_tx.subscribe())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        rx.wait_for(JobStatus::is_terminal)
            .await
            .map(|_| ())
            .map_err(|_| HalError::Backend(format!("status channel of job {job_id} closed")))?;
        self.result(job_id).await
    }
}

impl BackendFactory for SimulatorBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let sim_config = SimulatorConfig::from_backend_config(&config)?;
        Ok(Self::build(config.name, sim_config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdd_hal::RunOptions;
    use qdd_ir::QubitId;
    use serde_json::json;

    #[tokio::test]
    async fn test_simulator_capabilities() {
        let backend = SimulatorBackend::new();
        let caps = backend.capabilities();

        assert!(caps.is_simulator);
        assert_eq!(caps.num_qubits, 24);
        assert_eq!(caps.name, SIMULATOR_NAME);
        assert!(caps.supports_exact && caps.supports_sampled);
    }

    #[tokio::test]
    async fn test_simulator_bell_state() {
        let backend = SimulatorBackend::new();

        let circuit = Circuit::bell().unwrap();
        let job_id = backend
            .run(ExecutionRequest::sampled(circuit, 1000))
            .await
            .unwrap();
        let result = backend.wait(&job_id).await.unwrap();
        assert!(backend.status(&job_id).await.unwrap().is_success());

        let counts = result.get(0).unwrap().counts().unwrap();
        assert_eq!(counts.get("00") + counts.get("11"), 1000);
        assert_eq!(counts.get("01") + counts.get("10"), 0);
    }

    #[tokio::test]
    async fn test_simulator_ghz_state() {
        let backend = SimulatorBackend::new();

        let circuit = Circuit::ghz(3).unwrap();
        let job_id = backend.run(ExecutionRequest::sampled(circuit, 1000)).await.unwrap();
        let result = backend.wait(&job_id).await.unwrap();

        let counts = result.get(0).unwrap().counts().unwrap();
        assert_eq!(counts.get("000") + counts.get("111"), 1000);
    }

    #[tokio::test]
    async fn test_simulator_too_many_qubits() {
        let backend =
            SimulatorBackend::with_config(SimulatorConfig::default().with_max_qubits(5)).unwrap();

        let circuit = Circuit::with_size("test", 10, 0);
        let result = backend.run(ExecutionRequest::sampled(circuit, 100)).await;

        assert!(matches!(result, Err(HalError::InvalidCircuit(_))));
        assert_eq!(backend.pending_jobs(), 0);
    }

    #[tokio::test]
    async fn test_too_many_shots_exceeds_capacity() {
        let backend = SimulatorBackend::new();
        let result = backend
            .run(ExecutionRequest::sampled(Circuit::bell().unwrap(), 2_000_000))
            .await;
        assert!(matches!(result, Err(HalError::CapacityExceeded(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let backend = SimulatorBackend::new();
        assert!(matches!(
            backend.submit(vec![]).await,
            Err(HalError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_result_before_completion_is_pending() {
        // current-thread runtime: the worker has not been polled yet
        let backend = SimulatorBackend::new();
        let job_id = backend
            .run(ExecutionRequest::exact(Circuit::bell().unwrap()))
            .await
            .unwrap();
        assert_eq!(backend.status(&job_id).await.unwrap(), JobStatus::Queued);
        assert!(matches!(
            backend.result(&job_id).await,
            Err(HalError::JobPending { .. })
        ));
        assert!(backend.wait(&job_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_queued_job() {
        let backend = SimulatorBackend::new();
        let job_id = backend
            .run(ExecutionRequest::exact(Circuit::bell().unwrap()))
            .await
            .unwrap();
        backend.cancel(&job_id).await.unwrap();

        assert!(matches!(backend.wait(&job_id).await, Err(HalError::JobCancelled)));
        assert_eq!(backend.status(&job_id).await.unwrap(), JobStatus::Cancelled);
        assert!(matches!(
            backend.cancel(&job_id).await,
            Err(HalError::NotCancellable { .. })
        ));
    }

    #[tokio::test]
    async fn test_finished_jobs_are_evicted() {
        let config = SimulatorConfig::default().with_max_retained_jobs(4);
        let backend = SimulatorBackend::with_config(config).unwrap();

        let mut ids = vec![];
        for _ in 0..50 {
            let job_id = backend
                .run(ExecutionRequest::exact(Circuit::ghz(10).unwrap()))
                .await
                .unwrap();
            backend.wait(&job_id).await.unwrap();
            ids.push(job_id);
        }
        let cancelled = backend
            .run(ExecutionRequest::exact(Circuit::bell().unwrap()))
            .await
            .unwrap();
        backend.cancel(&cancelled).await.unwrap();

        assert_eq!(backend.retained_jobs(), 4);
        assert_eq!(backend.pending_jobs(), 0);
        assert!(matches!(backend.status(&ids[0]).await, Err(HalError::JobNotFound(_))));
        assert!(matches!(backend.result(&ids[45]).await, Err(HalError::JobNotFound(_))));
        assert!(backend.result(&ids[49]).await.is_ok());
        assert_eq!(backend.status(&cancelled).await.unwrap(), JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_forget_finished_job() {
        let backend = SimulatorBackend::new();
        let queued = backend
            .run(ExecutionRequest::exact(Circuit::bell().unwrap()))
            .await
            .unwrap();
        assert!(matches!(
            backend.forget(&queued),
            Err(HalError::JobPending { .. })
        ));

        backend.wait(&queued).await.unwrap();
        backend.forget(&queued).unwrap();
        assert_eq!(backend.retained_jobs(), 0);
        assert!(matches!(backend.result(&queued).await, Err(HalError::JobNotFound(_))));
        assert!(matches!(backend.forget(&queued), Err(HalError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let backend = SimulatorBackend::new();
        let id = JobId::new("missing");
        assert!(matches!(backend.status(&id).await, Err(HalError::JobNotFound(_))));
        assert!(matches!(backend.wait(&id).await, Err(HalError::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = BackendConfig::new("local_sim")
            .with_extra("max_qubits", json!(8))
            .with_extra("default_seed", json!(11));
        let backend = SimulatorBackend::from_config(config).unwrap();
        assert_eq!(backend.name(), "local_sim");
        assert_eq!(backend.capabilities().num_qubits, 8);

        let job_id = backend
            .run(ExecutionRequest::sampled(Circuit::bell().unwrap(), 10))
            .await
            .unwrap();
        let result = backend.wait(&job_id).await.unwrap();
        assert_eq!(result.get(0).unwrap().seed_simulator, Some(11));
    }

    #[tokio::test]
    async fn test_validate_reports_all_problems() {
        let backend =
            SimulatorBackend::with_config(SimulatorConfig::default().with_max_qubits(2)).unwrap();
        let mut circuit = Circuit::with_size("wide", 3, 0);
        circuit.h(QubitId(2)).unwrap();
        let validation = backend.validate(&circuit).await.unwrap();
        assert!(!validation.is_valid());
        assert!(backend.validate(&Circuit::bell().unwrap()).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_batch_results_in_submission_order() {
        let backend = SimulatorBackend::new();
        let requests = (1..=3)
            .map(|n: u32| {
                let mut circuit = Circuit::with_size(format!("width_{n}"), n, 0);
                circuit.x(QubitId(n - 1)).unwrap();
                ExecutionRequest::new(
                    circuit,
                    RunOptions::sampled(16).with_seed_simulator(n.into()),
                )
            })
            .collect();
        let job_id = backend.submit(requests).await.unwrap();
        let result = backend.wait(&job_id).await.unwrap();
        let names: Vec<_> = result.iter().map(|r| r.circuit_name.clone()).collect();
        assert_eq!(names, ["width_1", "width_2", "width_3"]);
        assert_eq!(result.get(2).unwrap().counts().unwrap().get("100"), 16);
        assert!(result.iter().enumerate().all(|(i, r)| r.index == i));
    }
}
