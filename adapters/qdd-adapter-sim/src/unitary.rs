//! Gate lowering.
//!
//! Every gate is reduced to one of three operator shapes plus a number of
//! implicit leading control operands: `cx` becomes X with one control,
//! `ccx` X with two, `cswap` SWAP with one. Diagonal single-qubit gates
//! keep only their two phases.

use num_complex::Complex64;
use rustc_hash::FxHashMap;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4};

use qdd_ir::{GateKind, Parameter, StandardGate, UnitaryGate};

use crate::error::{SimError, SimResult};

/// Tolerance for unitarity of user matrices.
pub(crate) const UNITARITY_TOLERANCE: f64 = 1e-9;

/// Row-major 2×2 matrix.
pub(crate) type Matrix2 = [[Complex64; 2]; 2];
/// Row-major 4×4 matrix. Local index bit 0 is the first target.
pub(crate) type Matrix4 = [[Complex64; 4]; 4];

/// Operator applied to the target qubits.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operator {
    /// diag(d0, d1) on one target.
    Diagonal([Complex64; 2]),
    /// Dense 2×2 on one target.
    Single(Matrix2),
    /// Dense 4×4 on two targets.
    Two(Matrix4),
}

/// A gate reduced to an operator and its implicit controls.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lowered {
    pub op: Operator,
    /// Number of leading operands that act as positive controls.
    pub implicit_controls: usize,
}

impl Lowered {
    fn new(op: Operator) -> Self {
        Self {
            op,
            implicit_controls: 0,
        }
    }

    fn controlled(op: Operator, implicit_controls: usize) -> Self {
        Self {
            op,
            implicit_controls,
        }
    }
}

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

#[inline]
fn c(re: f64) -> Complex64 {
    Complex64::new(re, 0.0)
}

#[inline]
fn phase(theta: f64) -> Complex64 {
    Complex64::from_polar(1.0, theta)
}

fn angle(p: &Parameter) -> SimResult<f64> {
    Ok(p.resolve(&FxHashMap::default())?)
}

pub(crate) fn x() -> Matrix2 {
    [[ZERO, ONE], [ONE, ZERO]]
}

fn y() -> Matrix2 {
    [[ZERO, -I], [I, ZERO]]
}

fn h() -> Matrix2 {
    let s = c(FRAC_1_SQRT_2);
    [[s, s], [s, -s]]
}

fn rx(theta: f64) -> Matrix2 {
    let (s, co) = (theta / 2.0).sin_cos();
    [[c(co), -I * s], [-I * s, c(co)]]
}

fn ry(theta: f64) -> Matrix2 {
    let (s, co) = (theta / 2.0).sin_cos();
    [[c(co), c(-s)], [c(s), c(co)]]
}

fn rz(theta: f64) -> [Complex64; 2] {
    [phase(-theta / 2.0), phase(theta / 2.0)]
}

fn u(theta: f64, phi: f64, lambda: f64) -> Matrix2 {
    let (s, co) = (theta / 2.0).sin_cos();
    [
        [c(co), -phase(lambda) * s],
        [phase(phi) * s, phase(phi + lambda) * co],
    ]
}

/// Rotation by θ around cos(φ)X + sin(φ)Y.
fn r(theta: f64, phi: f64) -> Matrix2 {
    let (s, co) = (theta / 2.0).sin_cos();
    [
        [c(co), -I * phase(-phi) * s],
        [-I * phase(phi) * s, c(co)],
    ]
}

fn swap() -> Matrix4 {
    [
        [ONE, ZERO, ZERO, ZERO],
        [ZERO, ZERO, ONE, ZERO],
        [ZERO, ONE, ZERO, ZERO],
        [ZERO, ZERO, ZERO, ONE],
    ]
}

fn iswap() -> Matrix4 {
    [
        [ONE, ZERO, ZERO, ZERO],
        [ZERO, ZERO, I, ZERO],
        [ZERO, I, ZERO, ZERO],
        [ZERO, ZERO, ZERO, ONE],
    ]
}

fn rxx(theta: f64) -> Matrix4 {
    let (s, co) = (theta / 2.0).sin_cos();
    let (co, m) = (c(co), -I * s);
    [
        [co, ZERO, ZERO, m],
        [ZERO, co, m, ZERO],
        [ZERO, m, co, ZERO],
        [m, ZERO, ZERO, co],
    ]
}

fn ryy(theta: f64) -> Matrix4 {
    let (s, co) = (theta / 2.0).sin_cos();
    let (co, m) = (c(co), -I * s);
    [
        [co, ZERO, ZERO, -m],
        [ZERO, co, m, ZERO],
        [ZERO, m, co, ZERO],
        [-m, ZERO, ZERO, co],
    ]
}

fn rzz(theta: f64) -> Matrix4 {
    let (a, b) = (phase(-theta / 2.0), phase(theta / 2.0));
    [
        [a, ZERO, ZERO, ZERO],
        [ZERO, b, ZERO, ZERO],
        [ZERO, ZERO, b, ZERO],
        [ZERO, ZERO, ZERO, a],
    ]
}

/// Lower a standard gate. Parameters must already be bound.
pub(crate) fn lower_standard(gate: &StandardGate) -> SimResult<Lowered> {
    use Operator::{Diagonal, Single, Two};

    let lowered = match gate {
        StandardGate::I => Lowered::new(Diagonal([ONE, ONE])),
        StandardGate::X => Lowered::new(Single(x())),
        StandardGate::Y => Lowered::new(Single(y())),
        StandardGate::Z => Lowered::new(Diagonal([ONE, -ONE])),
        StandardGate::H => Lowered::new(Single(h())),
        StandardGate::S => Lowered::new(Diagonal([ONE, I])),
        StandardGate::Sdg => Lowered::new(Diagonal([ONE, -I])),
        StandardGate::T => Lowered::new(Diagonal([ONE, phase(FRAC_PI_4)])),
        StandardGate::Tdg => Lowered::new(Diagonal([ONE, phase(-FRAC_PI_4)])),
        StandardGate::SX => {
            let (a, b) = (Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5));
            Lowered::new(Single([[a, b], [b, a]]))
        }
        StandardGate::SXdg => {
            let (a, b) = (Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5));
            Lowered::new(Single([[a, b], [b, a]]))
        }
        StandardGate::Rx(t) => Lowered::new(Single(rx(angle(t)?))),
        StandardGate::Ry(t) => Lowered::new(Single(ry(angle(t)?))),
        StandardGate::Rz(t) => Lowered::new(Diagonal(rz(angle(t)?))),
        StandardGate::P(l) | StandardGate::U1(l) => Lowered::new(Diagonal([ONE, phase(angle(l)?)])),
        StandardGate::U(t, p, l) | StandardGate::U3(t, p, l) => {
            Lowered::new(Single(u(angle(t)?, angle(p)?, angle(l)?)))
        }
        StandardGate::U2(p, l) => Lowered::new(Single(u(FRAC_PI_2, angle(p)?, angle(l)?))),
        StandardGate::R(t, p) => Lowered::new(Single(r(angle(t)?, angle(p)?))),

        StandardGate::CX => Lowered::controlled(Single(x()), 1),
        StandardGate::CY => Lowered::controlled(Single(y()), 1),
        StandardGate::CZ => Lowered::controlled(Diagonal([ONE, -ONE]), 1),
        StandardGate::CH => Lowered::controlled(Single(h()), 1),
        StandardGate::CRx(t) => Lowered::controlled(Single(rx(angle(t)?)), 1),
        StandardGate::CRy(t) => Lowered::controlled(Single(ry(angle(t)?)), 1),
        StandardGate::CRz(t) => Lowered::controlled(Diagonal(rz(angle(t)?)), 1),
        StandardGate::CP(l) => Lowered::controlled(Diagonal([ONE, phase(angle(l)?)]), 1),
        StandardGate::Swap => Lowered::new(Two(swap())),
        StandardGate::ISwap => Lowered::new(Two(iswap())),
        StandardGate::RXX(t) => Lowered::new(Two(rxx(angle(t)?))),
        StandardGate::RYY(t) => Lowered::new(Two(ryy(angle(t)?))),
        StandardGate::RZZ(t) => Lowered::new(Two(rzz(angle(t)?))),

        StandardGate::CCX => Lowered::controlled(Single(x()), 2),
        StandardGate::CSwap => Lowered::controlled(Two(swap()), 1),
    };
    Ok(lowered)
}

/// Lower a user matrix, checking that it is unitary.
pub(crate) fn lower_unitary(gate: &UnitaryGate) -> SimResult<Lowered> {
    let dim = 1usize << gate.num_qubits.min(2);
    if !(1..=2).contains(&gate.num_qubits) || gate.matrix.len() != dim * dim {
        return Err(SimError::NonUnitary {
            gate: "unitary".into(),
            reason: format!(
                "{} entries for a {}-qubit matrix",
                gate.matrix.len(),
                gate.num_qubits
            ),
        });
    }
    check_unitary(&gate.matrix, dim)?;

    let at = |row: usize, col: usize| gate.matrix[row * dim + col];
    let op = if dim == 2 {
        Operator::Single([[at(0, 0), at(0, 1)], [at(1, 0), at(1, 1)]])
    } else {
        let mut m = [[ZERO; 4]; 4];
        for (row, line) in m.iter_mut().enumerate() {
            for (col, entry) in line.iter_mut().enumerate() {
                *entry = at(row, col);
            }
        }
        Operator::Two(m)
    };
    Ok(Lowered::new(op))
}

/// Lower any gate kind.
pub(crate) fn lower(kind: &GateKind) -> SimResult<Lowered> {
    match kind {
        GateKind::Standard(g) => lower_standard(g),
        GateKind::Unitary(u) => lower_unitary(u),
    }
}

/// Check M·M† = I within [`UNITARITY_TOLERANCE`].
fn check_unitary(matrix: &[Complex64], dim: usize) -> SimResult<()> {
    if let Some(bad) = matrix.iter().find(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return Err(SimError::NonUnitary {
            gate: "unitary".into(),
            reason: format!("non-finite entry {bad}"),
        });
    }
    for row in 0..dim {
        for col in 0..dim {
            let dot: Complex64 = (0..dim)
                .map(|k| matrix[row * dim + k] * matrix[col * dim + k].conj())
                .sum();
            let expected = if row == col { ONE } else { ZERO };
            if (dot - expected).norm() > UNITARITY_TOLERANCE {
                return Err(SimError::NonUnitary {
                    gate: "unitary".into(),
                    reason: format!("(U U†)[{row}][{col}] = {dot}"),
                });
            }
        }
    }
    Ok(())
}
