//! Tests for save instructions, measurement and classical control.

use std::collections::BTreeMap;

use densim_engine::{
    DensityMatrixBackend, DensityMatrixState, EngineConfig, EngineError, ExperimentData,
    RngEngine, SavedData,
};
use densim_ir::{ExpvalTerm, Op, OpType, RegComparison, SaveSubtype};
use num_complex::Complex64;

fn bell_ops() -> Vec<Op> {
    vec![Op::gate("h", [0], []), Op::gate("cx", [0, 1], [])]
}

fn new_state(num_qubits: usize) -> DensityMatrixState {
    let mut state = DensityMatrixState::new();
    state.initialize_qreg(num_qubits);
    state.initialize_creg(num_qubits, num_qubits);
    state
}

fn vector(data: &SavedData) -> &[f64] {
    match data {
        SavedData::Vector(v) => v,
        other => panic!("expected vector, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// save_state / save_densmat
// ---------------------------------------------------------------------------

#[test]
fn save_state_promotes_single_to_average() {
    let mut state = new_state(2);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let mut ops = bell_ops();
    ops.push(Op::save(
        OpType::SaveState,
        [0, 1],
        "_method_",
        SaveSubtype::Single,
    ));
    state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();

    let saved = &sink.average["density_matrix"];
    assert_eq!(saved.count(), 1);
    let SavedData::Matrix(rho) = saved.mean() else {
        panic!("expected a matrix");
    };
    assert!((rho[[3, 0]] - Complex64::new(0.5, 0.0)).norm() < 1e-10);
    // copied, not moved
    assert_eq!(state.store().data().len(), 16);
}

#[test]
fn save_state_on_final_op_moves_buffer() {
    let mut state = new_state(1);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let ops = vec![
        Op::gate("x", [0], []),
        Op::save(OpType::SaveState, [0], "rho", SaveSubtype::CSingle),
    ];
    state.apply_ops(&ops, &mut sink, &mut rng, true).unwrap();
    assert!(state.store().data().is_empty());
    let saved = &sink.c_average["rho"]["0x0"];
    assert!(matches!(saved.mean(), SavedData::Matrix(ref m) if m[[1, 1]] == Complex64::new(1.0, 0.0)));
}

#[test]
fn save_state_requires_every_qubit() {
    let mut state = new_state(2);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let op = Op::save(OpType::SaveState, [0], "s", SaveSubtype::Single);
    let err = state.apply_op(&op, &mut sink, &mut rng, false).unwrap_err();
    assert!(matches!(err, EngineError::IncompleteSave(ref n) if n == "save_state"));
    assert!(err.to_string().contains("Only the full state can be saved"));
}

#[test]
fn save_densmat_traces_out_partner() {
    let mut state = new_state(2);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let mut ops = bell_ops();
    ops.push(Op::save(OpType::SaveDensmat, [1], "q1", SaveSubtype::List));
    ops.push(Op::save(OpType::SaveDensmat, [], "tr", SaveSubtype::Single));
    state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();

    let SavedData::Matrix(rho) = &sink.list["q1"][0] else {
        panic!("expected a matrix");
    };
    assert_eq!(rho.dim(), (2, 2));
    assert!((rho[[0, 0]].re - 0.5).abs() < 1e-10);
    assert!(rho[[0, 1]].norm() < 1e-10);

    let SavedData::Matrix(tr) = &sink.single["tr"] else {
        panic!("expected a matrix");
    };
    assert!((tr[[0, 0]].re - 1.0).abs() < 1e-10);
}

// ---------------------------------------------------------------------------
// Probabilities
// ---------------------------------------------------------------------------

#[test]
fn save_probs_and_ket() {
    let config = EngineConfig {
        chop_threshold: 1e-8,
        ..EngineConfig::default()
    };
    let mut state = new_state(2);
    state.set_config(config).unwrap();
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let mut ops = bell_ops();
    ops.push(Op::save(OpType::SaveProbs, [0, 1], "p", SaveSubtype::Single));
    ops.push(Op::save(OpType::SaveProbsKet, [1, 0], "k", SaveSubtype::Single));
    state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();

    let probs = vector(&sink.single["p"]);
    assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-10);
    assert!((probs[0] - 0.5).abs() < 1e-10 && (probs[3] - 0.5).abs() < 1e-10);

    let SavedData::Ket(ket) = &sink.single["k"] else {
        panic!("expected a ket");
    };
    let labels: Vec<&str> = ket.keys().map(String::as_str).collect();
    assert_eq!(labels, vec!["0x0", "0x3"]);
}

#[test]
fn save_amps_sq_reads_diagonal() {
    let mut state = new_state(2);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let ops = vec![
        Op::gate("ry", [0], [1.0]),
        Op::save_amps_sq([0, 1], [1, 0, 3], "amps", SaveSubtype::Single),
    ];
    state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();
    let amps = vector(&sink.single["amps"]);
    let s = (0.5f64).sin().powi(2);
    assert!((amps[0] - s).abs() < 1e-10);
    assert!((amps[1] - (1.0 - s)).abs() < 1e-10);
    assert!(amps[2].abs() < 1e-10);

    let empty = Op::save_amps_sq([0, 1], [], "amps", SaveSubtype::Single);
    assert!(matches!(
        state.apply_op(&empty, &mut sink, &mut rng, false),
        Err(EngineError::MissingParameter { .. })
    ));
}

#[test]
fn save_amps_sq_parallel_path() {
    let mut state = new_state(3);
    state
        .set_config(EngineConfig::default().with_threads(2).with_parallel_threshold(1))
        .unwrap();
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let ops = vec![
        Op::gate("h", [0], []),
        Op::gate("h", [2], []),
        Op::save_amps_sq([0, 1, 2], 0..8, "amps", SaveSubtype::Single),
    ];
    state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();
    let amps = vector(&sink.single["amps"]);
    assert_eq!(amps.len(), 8);
    for (i, a) in amps.iter().enumerate() {
        let expected = if i & 0b010 == 0 { 0.25 } else { 0.0 };
        assert!((a - expected).abs() < 1e-10, "amps[{i}] = {a}");
    }
}

// ---------------------------------------------------------------------------
// Expectation values
// ---------------------------------------------------------------------------

#[test]
fn save_expval_and_variance() {
    let mut state = new_state(2);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let terms = vec![
        ExpvalTerm::new("ZZ", 1.0, 1.0),
        ExpvalTerm::new("XX", 0.5, 0.25),
        ExpvalTerm::new("IZ", 2.0, 4.0),
    ];
    let mut ops = bell_ops();
    ops.push(Op::save_expval(
        [0, 1],
        terms.clone(),
        "e",
        false,
        SaveSubtype::Single,
    ));
    ops.push(Op::save_expval([0, 1], terms, "v", true, SaveSubtype::Single));
    state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();

    // ⟨ZZ⟩ = ⟨XX⟩ = 1, ⟨IZ⟩ = 0 on the Bell state
    let SavedData::Scalar(e) = sink.single["e"] else {
        panic!("expected a scalar");
    };
    assert!((e - 1.5).abs() < 1e-10);
    let var = vector(&sink.single["v"]);
    assert!((var[0] - 1.5).abs() < 1e-10);
    assert!((var[1] - (1.25 - 2.25)).abs() < 1e-10);
}

// ---------------------------------------------------------------------------
// Measurement and classical control
// ---------------------------------------------------------------------------

#[test]
fn measurement_outcomes_follow_probabilities() {
    let mut ones = 0;
    for seed in 0..200 {
        let mut state = new_state(1);
        let mut sink = ExperimentData::new();
        let mut rng = RngEngine::new(seed);
        let ops = vec![
            Op::gate("ry", [0], [2.0 * (0.3f64).sqrt().asin()]),
            Op::measure([0], [0]),
            Op::save(OpType::SaveProbs, [0], "p", SaveSubtype::Single),
        ];
        state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();
        let outcome = usize::from(state.creg().memory()[0]);
        ones += outcome;
        // collapsed onto the recorded outcome
        assert!((vector(&sink.single["p"])[outcome] - 1.0).abs() < 1e-10);
    }
    assert!((30..90).contains(&ones), "ones = {ones}");
}

#[test]
fn conditional_correction_from_measurement() {
    // teleport-style fix-up: measure q0 and flip q1 when the result is 1
    for seed in 0..20 {
        let mut state = new_state(2);
        let mut sink = ExperimentData::new();
        let mut rng = RngEngine::new(seed);
        let mut ops = bell_ops();
        ops.extend([
            Op::measure([0], [0]).with_registers([0]),
            Op::gate("x", [1], []).with_condition(0),
            Op::save(OpType::SaveProbs, [1], "q1", SaveSubtype::Single),
        ]);
        state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();
        assert!((vector(&sink.single["q1"])[0] - 1.0).abs() < 1e-10);
    }
}

#[test]
fn bfunc_drives_conditionals_and_keys() {
    let mut state = new_state(2);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let ops = vec![
        Op::gate("x", [0], []),
        Op::measure([0], [0]).with_registers([0]),
        Op::bfunc("0x1", "0x1", RegComparison::Equal, 1, Some(1)),
        Op::gate("x", [1], []).with_condition(1),
        Op::save(OpType::SaveProbs, [0, 1], "p", SaveSubtype::CList),
    ];
    state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();
    let by_memory: &BTreeMap<String, Vec<SavedData>> = &sink.c_list["p"];
    let probs = vector(&by_memory["0x3"][0]);
    assert!((probs[0b11] - 1.0).abs() < 1e-10);
}

#[test]
fn readout_error_flips_memory() {
    let mut state = new_state(1);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let ops = vec![
        Op::measure([0], [0]),
        Op::roerror([0], vec![vec![0.0, 1.0], vec![1.0, 0.0]]),
    ];
    state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();
    assert_eq!(state.creg().memory(), &[true]);
    // the quantum state is untouched by readout errors
    assert!((state.store().probability(0) - 1.0).abs() < 1e-12);
}

#[test]
fn reset_instruction() {
    let mut state = new_state(2);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(0);
    let mut ops = bell_ops();
    ops.push(Op::reset([0, 1]));
    state.apply_ops(&ops, &mut sink, &mut rng, false).unwrap();
    assert!((state.store().probability(0) - 1.0).abs() < 1e-12);
    assert!((state.store().trace() - 1.0).abs() < 1e-12);
}

#[test]
fn sample_measure_counts() {
    let mut state = new_state(2);
    let mut sink = ExperimentData::new();
    let mut rng = RngEngine::new(21);
    state
        .apply_ops(&bell_ops(), &mut sink, &mut rng, false)
        .unwrap();
    let samples = state.sample_measure(&[0, 1], 1000, &mut rng).unwrap();
    let ones = samples.iter().filter(|&&s| s == 0b11).count();
    assert!(samples.iter().all(|&s| s == 0 || s == 0b11));
    assert!((400..600).contains(&ones), "ones = {ones}");
}
