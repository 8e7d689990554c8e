//! Range engine vs brute-force oracle on seeded random timelines.
//!
//! The generator already cross-checks small cases; these tests push wider
//! arrays, deeper branching and adversarial key patterns through both
//! evaluators and compare every answer.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spellbook_core::generate::{self, CaseShape, GeneratorConfig};
use spellbook_core::oracle::{self, NaiveState};
use spellbook_core::{
    Command, Label, Layer, LayerState, Parity, Problem, RangeEngine, Timeline, VersionId, solve,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Random timeline with a configurable key pool.
fn random_problem(rng: &mut StdRng, n: usize, q: usize, key_pool: i64) -> Problem {
    let base = (0..n).map(|_| rng.gen_range(-1_000_000_000..=1_000_000_000)).collect();
    let mut commands = Vec::with_capacity(q);
    for index in 1..=q {
        if index > 1 && rng.gen_bool(0.3) {
            commands.push(Command::Rewind(VersionId::new(rng.gen_range(0..index))));
            continue;
        }
        let a = rng.gen_range(1..=n);
        let b = rng.gen_range(1..=n);
        let parity = if rng.gen_bool(0.5) { Parity::Odd } else { Parity::Even };
        let label = Label::new(rng.gen_range(-key_pool..=key_pool), parity, rng.gen_range(0..=1_000_000_000));
        commands.push(Command::Energize(Layer::new(a.min(b), a.max(b), label)));
    }
    Problem::new(base, commands)
}

#[test]
fn test_engine_matches_oracle_on_random_timelines() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for round in 0..60 {
        let n = rng.gen_range(1..=40);
        let q = rng.gen_range(1..=80);
        // Small key pools force plenty of equal-key clashes.
        let key_pool = if round % 2 == 0 { 4 } else { 1_000 };
        let problem = random_problem(&mut rng, n, q, key_pool);

        let fast = solve(&problem).unwrap();
        let slow = oracle::solve(&problem).unwrap();
        assert_eq!(fast, slow, "round {round}:\n{problem}");
    }
}

#[test]
fn test_generated_batches_verify() {
    init_tracing();
    for shape in [CaseShape::Random, CaseShape::Nested, CaseShape::Edge] {
        let config = GeneratorConfig {
            cases: 5,
            seed: 99,
            n_max: 64,
            q_max: 120,
            shapes: vec![shape],
            ..GeneratorConfig::default()
        };
        for case in generate::generate(&config).unwrap() {
            let answers = oracle::verify(&case.problem).unwrap();
            assert_eq!(answers, case.expected, "{} failed", case.file_stem());
        }
    }
}

#[test]
fn test_apply_then_undo_round_trips() {
    let mut rng = StdRng::seed_from_u64(17);
    let n = 50;
    let base: Vec<i64> = (0..n).map(|_| rng.gen_range(-50..=50)).collect();
    let mut engine = RangeEngine::new(&base);
    let mut naive = NaiveState::new(&base);

    // Keep a random stack of active layers, push and pop at random.
    let mut active = Vec::new();
    for _ in 0..2_000 {
        if !active.is_empty() && rng.gen_bool(0.45) {
            let (checkpoint, mark, before) = active.pop().unwrap();
            engine.undo_last(checkpoint).unwrap();
            naive.revert(mark).unwrap();
            assert_eq!(engine.total(), before);
        } else {
            let a = rng.gen_range(1..=n);
            let b = rng.gen_range(1..=n);
            let parity = if rng.gen_bool(0.5) { Parity::Odd } else { Parity::Even };
            let layer = Layer::new(a.min(b), a.max(b), Label::new(rng.gen_range(0..30), parity, rng.gen_range(0..20)));

            let before = engine.total();
            let checkpoint = engine.apply(&layer).unwrap();
            let mark = naive.apply(&layer).unwrap();
            active.push((checkpoint, mark, before));
        }

        assert_eq!(engine.total(), naive.total());
        for pos in [1, n / 2, n] {
            let cell = engine.probe(pos).unwrap();
            assert_eq!(cell.top, naive.top(pos));
        }
    }
}

#[test]
fn test_rewind_answers_are_target_answers() {
    let mut rng = StdRng::seed_from_u64(4242);
    let problem = random_problem(&mut rng, 30, 400, 50);
    let answers = solve(&problem).unwrap();

    for (i, command) in problem.commands.iter().enumerate() {
        if let Command::Rewind(target) = command {
            let expected = if target.index() == 0 {
                problem.base.iter().map(|&v| v as i128).sum()
            } else {
                answers.get(target.index()).unwrap()
            };
            assert_eq!(answers.get(i + 1), Some(expected), "command {}", i + 1);
        }
    }
}

#[test]
fn test_large_magnitudes_do_not_overflow() {
    let n = 1_000;
    let base = vec![i64::MAX / 2; n];
    let commands: Vec<_> = (0..50)
        .map(|i| {
            let parity = if i % 2 == 0 { Parity::Even } else { Parity::Odd };
            Command::Energize(Layer::new(1, n, Label::new(i, parity, i64::MAX)))
        })
        .collect();
    let problem = Problem::new(base, commands);

    let answers = solve(&problem).unwrap();
    let base_sum = (i64::MAX / 2) as i128 * n as i128;
    // After layer i the coverage is i + 1 and layer i wins; its parity is
    // always the opposite of the coverage parity.
    let expected = base_sum - i64::MAX as i128 * n as i128;
    assert!(answers.iter().all(|total| total == expected));
}

#[test]
fn test_timeline_is_reusable_across_states() {
    let mut rng = StdRng::seed_from_u64(8);
    let problem = random_problem(&mut rng, 12, 60, 6);
    let timeline = Timeline::from_commands(problem.positions(), problem.commands.iter().copied()).unwrap();

    let mut engine = RangeEngine::new(&problem.base);
    let first = timeline.walk(&mut engine).unwrap();
    let second = timeline.walk(&mut engine).unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.journal_len(), 0);
}
