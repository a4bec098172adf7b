//! Execution result types.
//!
//! Bitstring ordering: the rightmost character corresponds to classical
//! bit 0 (OpenQASM convention). For example, the string `"01"` means
//! clbit 0 read `1` and clbit 1 read `0`.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::job::JobId;
use crate::request::ExecutionMode;

/// Measurement counts from circuit execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    counts: FxHashMap<String, u64>,
}

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create counts from (bitstring, count) pairs. Duplicates are summed.
    pub fn from_pairs(iter: impl IntoIterator<Item = (impl Into<String>, u64)>) -> Self {
        let mut counts = Self::new();
        for (k, v) in iter {
            counts.insert(k, v);
        }
        counts
    }

    /// Add `count` occurrences of a bitstring.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        *self.counts.entry(bitstring.into()).or_default() += count;
    }

    /// Get the count for a bitstring.
    pub fn get(&self, bitstring: &str) -> u64 {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Iterate over (bitstring, count) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.counts.iter()
    }

    /// Get the total number of shots.
    pub fn total_shots(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Get the most frequent bitstring.
    pub fn most_frequent(&self) -> Option<(&String, &u64)> {
        self.counts.iter().max_by_key(|&(_, count)| count)
    }

    /// Get the observed frequency of each bitstring.
    #[allow(clippy::cast_precision_loss)]
    pub fn probabilities(&self) -> FxHashMap<String, f64> {
        let total = self.total_shots() as f64;
        if total == 0.0 {
            return FxHashMap::default();
        }
        self.counts
            .iter()
            .map(|(k, &v)| (k.clone(), v as f64 / total))
            .collect()
    }

    /// Get sorted counts (by count descending, then bitstring).
    pub fn sorted(&self) -> Vec<(&String, &u64)> {
        let mut items: Vec<_> = self.counts.iter().collect();
        items.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        items
    }

    /// Get the number of unique bitstrings.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check if counts are empty.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(String, u64)> for Counts {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// A final state vector returned by exact execution.
///
/// Amplitude `i` belongs to the basis state whose bit `q` is the value of
/// qubit `q`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatevectorData {
    /// Register size.
    pub num_qubits: u32,
    /// The 2^n amplitudes.
    pub amplitudes: Vec<Complex64>,
}

impl StatevectorData {
    /// Wrap a list of amplitudes.
    pub fn new(num_qubits: u32, amplitudes: Vec<Complex64>) -> Self {
        Self {
            num_qubits,
            amplitudes,
        }
    }

    /// Amplitude of basis state `index`.
    pub fn amplitude(&self, index: usize) -> Option<Complex64> {
        self.amplitudes.get(index).copied()
    }

    /// Squared magnitudes of every amplitude.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    /// Probability that measuring `qubit` yields 1.
    pub fn probability_one(&self, qubit: u32) -> f64 {
        let mask = 1usize << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Squared-magnitude sum.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
    }
}

/// Payload of a single circuit result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResultData {
    /// Sampled bitstring counts.
    Counts(Counts),
    /// Exact final state.
    Statevector(StatevectorData),
}

/// Result of executing one circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Name of the originating circuit.
    pub circuit_name: String,
    /// Position of the originating request in its batch.
    pub index: usize,
    /// Mode the circuit ran in.
    pub mode: ExecutionMode,
    /// Counts or state vector.
    pub data: ResultData,
    /// Number of shots executed (0 in exact mode).
    pub shots: u32,
    /// Simulator seed that was actually used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_simulator: Option<u64>,
    /// Transpiler seed from the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_transpiler: Option<u64>,
    /// One value per requested observable, in request order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expectation_values: Vec<f64>,
    /// Execution time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    /// Additional metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ExecutionResult {
    /// Create a sampled-mode result.
    pub fn from_counts(circuit_name: impl Into<String>, index: usize, counts: Counts, shots: u32) -> Self {
        Self::new(circuit_name, index, ExecutionMode::Sampled, ResultData::Counts(counts), shots)
    }

    /// Create an exact-mode result.
    pub fn from_statevector(
        circuit_name: impl Into<String>,
        index: usize,
        statevector: StatevectorData,
    ) -> Self {
        Self::new(
            circuit_name,
            index,
            ExecutionMode::Exact,
            ResultData::Statevector(statevector),
            0,
        )
    }

    fn new(
        circuit_name: impl Into<String>,
        index: usize,
        mode: ExecutionMode,
        data: ResultData,
        shots: u32,
    ) -> Self {
        Self {
            circuit_name: circuit_name.into(),
            index,
            mode,
            data,
            shots,
            seed_simulator: None,
            seed_transpiler: None,
            expectation_values: vec![],
            execution_time_ms: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Record the seeds.
    #[must_use]
    pub fn with_seeds(mut self, seed_simulator: Option<u64>, seed_transpiler: Option<u64>) -> Self {
        self.seed_simulator = seed_simulator;
        self.seed_transpiler = seed_transpiler;
        self
    }

    /// Attach expectation values.
    #[must_use]
    pub fn with_expectation_values(mut self, values: Vec<f64>) -> Self {
        self.expectation_values = values;
        self
    }

    /// Set the execution time.
    #[must_use]
    pub fn with_execution_time(mut self, time_ms: u64) -> Self {
        self.execution_time_ms = Some(time_ms);
        self
    }

    /// Set metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Counts, if this is a sampled result.
    pub fn counts(&self) -> Option<&Counts> {
        match &self.data {
            ResultData::Counts(c) => Some(c),
            ResultData::Statevector(_) => None,
        }
    }

    /// State vector, if this is an exact result.
    pub fn statevector(&self) -> Option<&StatevectorData> {
        match &self.data {
            ResultData::Statevector(sv) => Some(sv),
            ResultData::Counts(_) => None,
        }
    }

    /// Get the most frequent measurement result and its frequency.
    #[allow(clippy::cast_precision_loss)]
    pub fn most_frequent(&self) -> Option<(&String, f64)> {
        let counts = self.counts()?;
        let total = counts.total_shots() as f64;
        if total == 0.0 {
            return None;
        }
        counts.most_frequent().map(|(s, &c)| (s, c as f64 / total))
    }
}

/// All results of a job, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// The job that produced these results.
    pub job_id: JobId,
    /// One result per submitted request.
    pub results: Vec<ExecutionResult>,
}

impl JobResult {
    /// Create a job result.
    pub fn new(job_id: JobId, results: Vec<ExecutionResult>) -> Self {
        Self { job_id, results }
    }

    /// Result of the request submitted at `index`.
    pub fn get(&self, index: usize) -> Option<&ExecutionResult> {
        self.results.get(index)
    }

    /// Number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if the job held no circuits.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate over results in submission order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExecutionResult> {
        self.results.iter()
    }
}

impl IntoIterator for JobResult {
    type Item = ExecutionResult;
    type IntoIter = std::vec::IntoIter<ExecutionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}
