//! Gate application kernels.
//!
//! Each kernel walks disjoint amplitude groups (pairs for one target,
//! quadruples for two) and is split across rayon workers when the caller
//! asks for it. A [`ControlMask`] selects the groups the gate acts on; all
//! other amplitudes pass through unchanged.

use num_complex::Complex64;
use rayon::prelude::*;

use crate::unitary::{Matrix2, Matrix4};

/// Control condition over basis-state indices.
///
/// The gate fires on index `i` iff `i & mask == value`. Positive controls
/// set their bit in both fields, negative controls only in `mask`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ControlMask {
    pub mask: usize,
    pub value: usize,
}

impl ControlMask {
    /// Add a control on bit `qubit` firing on `on_one`.
    pub fn with(mut self, qubit: usize, on_one: bool) -> Self {
        self.mask |= 1 << qubit;
        if on_one {
            self.value |= 1 << qubit;
        }
        self
    }

    #[inline]
    fn fires(self, index: usize) -> bool {
        index & self.mask == self.value
    }
}

/// Run `f(offset, chunk)` over consecutive chunks of `chunk_len` amplitudes.
fn for_each_chunk<F>(state: &mut [Complex64], chunk_len: usize, parallel: bool, f: F)
where
    F: Fn(usize, &mut [Complex64]) + Send + Sync,
{
    if parallel {
        state
            .par_chunks_mut(chunk_len)
            .enumerate()
            .for_each(|(k, chunk)| f(k * chunk_len, chunk));
    } else {
        state
            .chunks_mut(chunk_len)
            .enumerate()
            .for_each(|(k, chunk)| f(k * chunk_len, chunk));
    }
}

/// Apply a 2×2 matrix to `target`.
pub(crate) fn apply_single(
    state: &mut [Complex64],
    gate: &Matrix2,
    target: usize,
    ctrl: ControlMask,
    parallel: bool,
) {
    let stride = 1usize << target;
    for_each_chunk(state, stride * 2, parallel, |offset, chunk| {
        for j in 0..stride {
            if !ctrl.fires(offset + j) {
                continue;
            }
            let a = chunk[j];
            let b = chunk[j + stride];
            chunk[j] = gate[0][0] * a + gate[0][1] * b;
            chunk[j + stride] = gate[1][0] * a + gate[1][1] * b;
        }
    });
}

/// Multiply amplitudes by `diag[bit]` where `bit` is the value of `target`.
pub(crate) fn apply_diagonal(
    state: &mut [Complex64],
    diag: &[Complex64; 2],
    target: usize,
    ctrl: ControlMask,
    parallel: bool,
) {
    let mask = 1usize << target;
    let update = |(i, amp): (usize, &mut Complex64)| {
        if ctrl.fires(i) {
            *amp *= diag[usize::from(i & mask != 0)];
        }
    };
    if parallel {
        state.par_iter_mut().enumerate().for_each(update);
    } else {
        state.iter_mut().enumerate().for_each(update);
    }
}

/// Apply a 4×4 matrix to `(t0, t1)`; local index bit 0 is `t0`.
pub(crate) fn apply_two(
    state: &mut [Complex64],
    gate: &Matrix4,
    t0: usize,
    t1: usize,
    ctrl: ControlMask,
    parallel: bool,
) {
    let (m0, m1) = (1usize << t0, 1usize << t1);
    let (lo, hi) = (m0.min(m1), m0.max(m1));
    for_each_chunk(state, hi * 2, parallel, |offset, chunk| {
        for j in (0..hi).filter(|j| j & lo == 0) {
            if !ctrl.fires(offset + j) {
                continue;
            }
            let idx = [j, j | m0, j | m1, j | m0 | m1];
            let v = idx.map(|k| chunk[k]);
            for (row, &k) in idx.iter().enumerate() {
                chunk[k] = gate[row][0] * v[0]
                    + gate[row][1] * v[1]
                    + gate[row][2] * v[2]
                    + gate[row][3] * v[3];
            }
        }
    });
}
