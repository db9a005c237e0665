use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use recourse_match::bound::global_bound;
use recourse_match::cost::recourse_cost;
use recourse_match::weight::recourse_weight;
use recourse_match::{
    Backend, Bank, Engine, EngineConfig, MatchError, MatchOutcome, Problem, Seeker, TieBreak,
};

const DIMENSION: usize = 3;

fn random_problem(rng: &mut StdRng, seekers: u32, banks: u32, max_capacity: i64) -> Problem {
    let seekers = (0..seekers)
        .map(|id| {
            let features: Vec<f64> = (0..DIMENSION).map(|_| rng.gen_range(-2.0..2.0)).collect();
            Seeker::from_slice(id, &features)
        })
        .collect();
    let banks = (0..banks)
        .map(|id| {
            let weights: Vec<f64> = (0..DIMENSION).map(|_| rng.gen_range(-1.0..1.0)).collect();
            Bank::from_slice(
                id,
                &weights,
                rng.gen_range(-1.0..1.0),
                rng.gen_range(0..=max_capacity),
            )
        })
        .collect();
    Problem::new(seekers, banks).unwrap()
}

fn run(problem: &Problem, backend: Backend) -> MatchOutcome {
    Engine::new(EngineConfig::default().with_beta(0.7).with_backend(backend))
        .unwrap()
        .run(problem)
        .unwrap()
}

fn assert_feasible(problem: &Problem, outcome: &MatchOutcome) {
    assert_eq!(outcome.assignment.len(), problem.seekers().len());
    for bank in problem.banks() {
        let count = outcome.assigned_to(bank.id()).len() as i64;
        assert!(count <= bank.capacity(), "bank {} over capacity", bank.id());
    }
    let assigned = outcome.assignment.values().flatten().count();
    assert_eq!(assigned, outcome.matches.len());
}

#[test]
fn backends_agree_on_random_instances() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for round in 0..40 {
        let seekers = rng.gen_range(1..25);
        let banks = rng.gen_range(1..6);
        let problem = random_problem(&mut rng, seekers, banks, 4);

        let hungarian = run(&problem, Backend::Hungarian);
        let flow = run(&problem, Backend::Flow);
        assert_feasible(&problem, &hungarian);
        assert_feasible(&problem, &flow);
        assert!(
            (hungarian.objective - flow.objective).abs() < 1e-9,
            "round {round}: hungarian {} vs flow {}",
            hungarian.objective,
            flow.objective
        );
        assert!(flow.objective <= flow.global_bound + 1e-12);
        assert_eq!(hungarian.global_bound, flow.global_bound);
    }
}

#[test]
fn pair_costs_and_weights_are_bounded() {
    let mut rng = StdRng::seed_from_u64(7);
    let problem = random_problem(&mut rng, 30, 5, 3);
    let (costs, weights) = Engine::new(EngineConfig::default())
        .unwrap()
        .tables(&problem)
        .unwrap();
    for (i, seeker) in problem.seekers().iter().enumerate() {
        for (j, bank) in problem.banks().iter().enumerate() {
            let cost = costs.get(i, j);
            let weight = weights.get(i, j);
            assert!(cost >= 0.);
            assert_eq!(cost == 0., bank.decision(seeker.features()) >= 0.);
            assert!(weight > 0. && weight <= 1.);
            assert_eq!(weight == 1., cost == 0.);
        }
    }
}

#[test]
fn uncontested_seekers_reach_the_bound() {
    // every seeker sits inside exactly one bank's acceptance region
    let problem = Problem::new(
        vec![
            Seeker::from_slice(0, &[5., 0.]),
            Seeker::from_slice(1, &[0., 5.]),
            Seeker::from_slice(2, &[-5., 0.]),
        ],
        vec![
            Bank::from_slice(10, &[1., 0.], -4., 1),
            Bank::from_slice(11, &[0., 1.], -4., 1),
            Bank::from_slice(12, &[-1., 0.], -4., 1),
        ],
    )
    .unwrap();
    for backend in [Backend::Hungarian, Backend::Flow] {
        let outcome = run(&problem, backend);
        assert!(outcome.contention_free());
        assert!((outcome.objective - outcome.global_bound).abs() < 1e-12);
        assert!((outcome.global_bound - 3.).abs() < 1e-12);
        assert_eq!(outcome.bank_of(0), Some(10));
        assert_eq!(outcome.bank_of(1), Some(11));
        assert_eq!(outcome.bank_of(2), Some(12));
    }
}

#[test]
fn two_seekers_one_slot() {
    // weights 0.9 and 0.3 at beta = 1
    let problem = Problem::new(
        vec![
            Seeker::from_slice(1, &[-(0.9f64.ln().abs())]),
            Seeker::from_slice(2, &[-(0.3f64.ln().abs())]),
        ],
        vec![Bank::from_slice(0, &[1.], 0., 1)],
    )
    .unwrap();
    for backend in [Backend::Hungarian, Backend::Flow] {
        let outcome = Engine::new(EngineConfig::default().with_backend(backend))
            .unwrap()
            .run(&problem)
            .unwrap();
        assert_eq!(outcome.bank_of(1), Some(0));
        assert_eq!(outcome.bank_of(2), None);
        assert!((outcome.objective - 0.9).abs() < 1e-12);
        assert!((outcome.global_bound - 1.2).abs() < 1e-12);
    }
}

#[test]
fn zero_norm_bank_fails_before_assignment() {
    let err = Problem::new(
        vec![Seeker::from_slice(0, &[1., 2.]), Seeker::from_slice(1, &[0., 0.])],
        vec![
            Bank::from_slice(0, &[1., 0.], 0., 1),
            Bank::from_slice(1, &[0., 0.], 3., 1),
        ],
    )
    .unwrap_err();
    assert_eq!(err, MatchError::InvalidClassifier { bank: 1 });

    let degenerate = Bank::from_slice(1, &[0., 0.], 3., 1);
    for seeker in [[1., 2.], [0., 0.]] {
        assert_eq!(
            recourse_cost(&nalgebra::DVector::from_column_slice(&seeker), &degenerate),
            Err(MatchError::InvalidClassifier { bank: 1 })
        );
    }
}

#[test]
fn repeated_runs_are_identical() {
    let mut rng = StdRng::seed_from_u64(42);
    let problem = random_problem(&mut rng, 20, 4, 3);
    for backend in [Backend::Hungarian, Backend::Flow] {
        let first = run(&problem, backend);
        let second = run(&problem, backend);
        assert_eq!(first, second);
    }

    let sequential = Engine::new(EngineConfig::default().with_parallel(false))
        .unwrap()
        .tables(&problem)
        .unwrap();
    let parallel = Engine::new(EngineConfig::default().with_parallel(true))
        .unwrap()
        .tables(&problem)
        .unwrap();
    assert_eq!(sequential, parallel);
}

fn lexicographic(problem: &Problem, backend: Backend) -> Vec<Option<u32>> {
    Engine::new(
        EngineConfig::default()
            .with_backend(backend)
            .with_tie_break(TieBreak::Lexicographic),
    )
    .unwrap()
    .run(problem)
    .unwrap()
    .assignment
    .into_values()
    .collect()
}

/// Seekers every bank already accepts, so all pair weights are exactly 1.
fn all_tied(seekers: u32, capacities: &[i64]) -> Problem {
    let seekers = (0..seekers).map(|id| Seeker::from_slice(id, &[1.])).collect();
    let banks = capacities
        .iter()
        .zip(0..)
        .map(|(&capacity, id)| Bank::from_slice(id, &[1.], 0., capacity))
        .collect();
    Problem::new(seekers, banks).unwrap()
}

#[test]
fn lexicographic_tie_break_is_shared_by_backends() {
    let problem = all_tied(5, &[2, 2]);
    for backend in [Backend::Hungarian, Backend::Flow] {
        assert_eq!(
            lexicographic(&problem, backend),
            vec![Some(0), Some(0), Some(1), Some(1), None]
        );
    }
}

#[test]
fn lexicographic_tie_break_scales_to_many_seekers() {
    let problem = all_tied(40, &[20, 15]);
    let mut expected = vec![Some(0); 20];
    expected.extend(vec![Some(1); 15]);
    expected.extend(vec![None; 5]);
    for backend in [Backend::Hungarian, Backend::Flow] {
        assert_eq!(lexicographic(&problem, backend), expected, "{backend:?}");
    }

    let problem = all_tied(64, &[3, 0, 7, 50]);
    let mut expected = vec![Some(0); 3];
    expected.extend(vec![Some(2); 7]);
    expected.extend(vec![Some(3); 50]);
    expected.extend(vec![None; 4]);
    for backend in [Backend::Hungarian, Backend::Flow] {
        assert_eq!(lexicographic(&problem, backend), expected, "{backend:?}");
    }
}

#[test]
fn lexicographic_backends_agree_on_random_instances() {
    let mut rng = StdRng::seed_from_u64(0x71e);
    for round in 0..20 {
        let seekers = rng.gen_range(1..16);
        let banks = rng.gen_range(1..5);
        let problem = random_problem(&mut rng, seekers, banks, 3);
        assert_eq!(
            lexicographic(&problem, Backend::Hungarian),
            lexicographic(&problem, Backend::Flow),
            "round {round}"
        );
    }
}

#[test]
fn extreme_magnitudes_still_solve() {
    // a huge weight vector and a seeker whose raw decision value overflows
    let problem = Problem::new(
        vec![
            Seeker::from_slice(0, &[1e300, -1e300]),
            Seeker::from_slice(1, &[-1., -1.]),
        ],
        vec![
            Bank::from_slice(0, &[1e10, 1e10], -1., 1),
            Bank::from_slice(1, &[1e200, 0.], 0., 1),
        ],
    )
    .unwrap();
    for backend in [Backend::Hungarian, Backend::Flow] {
        let outcome = run(&problem, backend);
        assert!(outcome.objective.is_finite());
        assert!(outcome.matches.iter().all(|m| m.cost.is_finite()));
        assert_eq!(outcome.matches.len(), 2);
    }
}

#[test]
fn weight_ordering_over_beta() {
    for cost in [0.05, 0.5, 2., 10.] {
        let mut previous = 1.;
        for beta in [0.1, 0.5, 1., 3.] {
            let weight = recourse_weight(cost, beta).unwrap();
            assert!(weight < previous);
            previous = weight;
        }
    }
}

#[test]
fn bound_is_independent_of_capacity() {
    let mut rng = StdRng::seed_from_u64(99);
    let problem = random_problem(&mut rng, 12, 3, 0);
    let engine = Engine::new(EngineConfig::default()).unwrap();
    let (_, weights) = engine.tables(&problem).unwrap();
    let outcome = engine.run(&problem).unwrap();
    assert_eq!(outcome.objective, 0.);
    assert_eq!(outcome.global_bound, global_bound(weights.matrix()));
    assert!(outcome.global_bound > 0.);
    assert_eq!(outcome.unassigned().len(), 12);
}
