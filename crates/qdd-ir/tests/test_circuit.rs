//! Integration tests for circuit construction.

use proptest::prelude::*;
use qdd_ir::{
    Circuit, ClbitId, Control, Instruction, IrError, Observable, Parameter, QubitId,
    StandardGate, UnitaryGate,
};
use num_complex::Complex64;

#[test]
fn test_circuit_json_roundtrip() {
    let mut circuit = Circuit::with_size("mixed", 3, 3);
    circuit
        .h(QubitId(0))
        .unwrap()
        .ry(Parameter::symbol("theta").shifted(0.1), QubitId(1))
        .unwrap()
        .mcz(
            [Control::positive(QubitId(0)), Control::negative(QubitId(1))],
            QubitId(2),
        )
        .unwrap()
        .unitary(
            UnitaryGate::new(
                1,
                vec![
                    Complex64::new(0.0, 0.0),
                    Complex64::new(1.0, 0.0),
                    Complex64::new(1.0, 0.0),
                    Complex64::new(0.0, 0.0),
                ],
            )
            .unwrap(),
            [QubitId(2)],
        )
        .unwrap()
        .measure_all()
        .unwrap();

    let json = serde_json::to_string(&circuit).unwrap();
    let back: Circuit = serde_json::from_str(&json).unwrap();
    assert_eq!(back, circuit);
    assert_eq!(back.parameter_names(), vec!["theta"]);
}

#[test]
fn test_gate_order_preserved() {
    let mut circuit = Circuit::with_size("ordered", 2, 0);
    circuit
        .x(QubitId(1))
        .unwrap()
        .h(QubitId(0))
        .unwrap()
        .cz(QubitId(0), QubitId(1))
        .unwrap()
        .h(QubitId(0))
        .unwrap();
    let names: Vec<_> = circuit.instructions().iter().map(Instruction::name).collect();
    assert_eq!(names, vec!["x", "h", "cz", "h"]);
}

#[test]
fn test_three_qubit_gates_validate_all_operands() {
    let mut circuit = Circuit::with_size("toffoli", 3, 0);
    circuit.ccx(QubitId(0), QubitId(1), QubitId(2)).unwrap();
    assert!(matches!(
        circuit.ccx(QubitId(0), QubitId(1), QubitId(3)),
        Err(IrError::QubitNotFound { .. })
    ));
    assert!(matches!(
        circuit.cswap(QubitId(0), QubitId(1), QubitId(1)),
        Err(IrError::DuplicateQubit { .. })
    ));
    assert_eq!(circuit.gate_count(), 1);
}

#[test]
fn test_measurement_into_shared_clbit() {
    let mut circuit = Circuit::with_size("overwrite", 2, 1);
    circuit
        .measure(QubitId(0), ClbitId(0))
        .unwrap()
        .measure(QubitId(1), ClbitId(0))
        .unwrap();
    assert_eq!(circuit.measured_qubits(), vec![QubitId(0), QubitId(1)]);
    assert!(!circuit.has_mid_circuit_measurement());
}

#[test]
fn test_observable_fits_circuit() {
    let circuit = Circuit::ghz(3).unwrap();
    let obs = Observable::z(2);
    assert!(obs.min_qubits() as usize <= circuit.num_qubits());
}

// -------------------------------------------------------------------------
// Property tests
// -------------------------------------------------------------------------

fn arb_gate(num_qubits: u32) -> impl Strategy<Value = (StandardGate, Vec<u32>)> {
    let one = (0..num_qubits).prop_flat_map(|q| {
        prop_oneof![
            Just((StandardGate::H, vec![q])),
            Just((StandardGate::X, vec![q])),
            Just((StandardGate::T, vec![q])),
            (-3.0_f64..3.0).prop_map(move |a| (StandardGate::Ry(Parameter::value(a)), vec![q])),
        ]
    });
    let two = (0..num_qubits, 0..num_qubits)
        .prop_filter("distinct operands", |(a, b)| a != b)
        .prop_map(|(a, b)| (StandardGate::CX, vec![a, b]));
    if num_qubits < 2 {
        one.boxed()
    } else {
        prop_oneof![one, two].boxed()
    }
}

fn arb_circuit() -> impl Strategy<Value = (Circuit, usize)> {
    (1_u32..=5).prop_flat_map(|n| {
        prop::collection::vec(arb_gate(n), 0..=20).prop_map(move |gates| {
            let count = gates.len();
            let mut circuit = Circuit::with_size("prop", n, 0);
            for (gate, qubits) in gates {
                circuit
                    .append(Instruction::gate(gate, qubits.into_iter().map(QubitId)))
                    .unwrap();
            }
            (circuit, count)
        })
    })
}

proptest! {
    #[test]
    fn prop_valid_gates_always_accepted((circuit, count) in arb_circuit()) {
        prop_assert_eq!(circuit.gate_count(), count);
        prop_assert!(circuit.depth() <= count);
        prop_assert!(!circuit.has_mid_circuit_measurement());
    }

    #[test]
    fn prop_out_of_range_qubit_rejected(n in 1_u32..8, offset in 0_u32..8) {
        let mut circuit = Circuit::with_size("bad", n, 0);
        let result = circuit.h(QubitId(n + offset));
        let is_not_found = matches!(result, Err(IrError::QubitNotFound { .. }));
        prop_assert!(is_not_found);
        prop_assert!(circuit.instructions().is_empty());
    }
}
