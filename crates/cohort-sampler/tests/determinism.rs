use cohort_core::{Child, CountingMethod, Model, Parameter, Probability, Rewards, RunConfig};
use cohort_sampler::{ParameterRng, PsaConfig, PsaRunner};

fn uncertain_model() -> Model {
    let mut b = Model::builder();
    let well = b.add_state(
        "well",
        1.0,
        Rewards::new().with("cost", Parameter::gamma(250.0, 4.0, 62.5)).with("qaly", 1.0),
    );
    let ill = b.add_state(
        "ill",
        0.0,
        Rewards::new().with("cost", Parameter::gamma(2000.0, 2.0, 1000.0)).with("qaly", Parameter::beta(0.6, 12.0, 8.0)),
    );
    let dead = b.add_state("dead", 0.0, Rewards::new());

    let flare = b.add_chance(well, "flare", Parameter::beta(0.15, 3.0, 17.0), Rewards::new().with("cost", 300.0));
    b.add_transition(flare, "flare_to_ill", ill, Parameter::beta(0.4, 4.0, 6.0), Rewards::new());
    b.add_transition(flare, "flare_resolves", well, Probability::Complement, Rewards::new());
    b.add_transition(well, "well_stays", well, Probability::Complement, Rewards::new());

    b.add_transition(ill, "ill_to_dead", dead, Parameter::uniform(0.1, 0.05, 0.15), Rewards::new());
    b.add_transition(ill, "ill_stays", ill, Probability::Complement, Rewards::new());
    b.add_transition(dead, "dead_stays", dead, 1.0, Rewards::new());
    b.build()
}

#[test]
fn parallel_and_sequential_psa_agree() {
    let model = uncertain_model();
    let run = RunConfig::new(15, CountingMethod::Half, 0.035);

    let sequential = PsaRunner::new(run.clone(), PsaConfig::new(32, 2024).with_parallel(false))
        .run(&model)
        .unwrap();
    let parallel = PsaRunner::new(run, PsaConfig::new(32, 2024).with_parallel(true))
        .run(&model)
        .unwrap();

    assert_eq!(sequential.iterations, parallel.iterations);
    for (i, it) in parallel.iterations.iter().enumerate() {
        assert_eq!(it.id, i);
    }
}

#[test]
fn same_seed_reproduces_different_seed_does_not() {
    let model = uncertain_model();
    let run = RunConfig::new(10, CountingMethod::End, 0.03);

    let a = PsaRunner::new(run.clone(), PsaConfig::new(16, 5)).run(&model).unwrap();
    let b = PsaRunner::new(run.clone(), PsaConfig::new(16, 5)).run(&model).unwrap();
    let c = PsaRunner::new(run, PsaConfig::new(16, 6)).run(&model).unwrap();

    assert_eq!(a.totals("cost"), b.totals("cost"));
    assert_ne!(a.totals("cost"), c.totals("cost"));
    assert_eq!(a.summary(), b.summary());
}

#[test]
fn every_iteration_conserves_mass() {
    let model = uncertain_model();
    let ensemble = PsaRunner::new(RunConfig::new(20, CountingMethod::Start, 0.0), PsaConfig::new(24, 11))
        .run(&model)
        .unwrap();

    for it in &ensemble.iterations {
        for record in &it.results.cycles {
            let total: f64 = record.state_probabilities.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "iteration {} cycle {}", it.id, record.cycle);
        }
    }

    let summary = ensemble.summary();
    assert_eq!(summary.n_iterations, 24);
    let mass: f64 = summary.mean_final_distribution.iter().sum();
    assert!((mass - 1.0).abs() < 1e-9);
    let cost = summary.variable("cost").unwrap();
    assert!(cost.lower <= cost.mean && cost.mean <= cost.upper);
}

#[test]
fn shared_mortality_curve_is_drawn_once() {
    let mut b = Model::builder();
    let mortality = b.add_shared(
        "background_mortality",
        Probability::TimeVarying((0..5).map(|t| {
            let p = 0.0001 + t as f64 * 0.0001;
            Parameter::uniform(p, p - 0.0001, p + 0.0001)
        }).collect()),
    );
    let well = b.add_state("well", 1.0, Rewards::new());
    let ill = b.add_state("ill", 0.0, Rewards::new());
    let dead = b.add_state("dead", 0.0, Rewards::new());
    b.add_transition(well, "well_to_ill", ill, 0.2, Rewards::new());
    let well_dead = b.add_transition(well, "well_to_dead", dead, mortality, Rewards::new());
    b.add_transition(well, "well_stays", well, Probability::Complement, Rewards::new());
    let ill_dead = b.add_transition(ill, "ill_to_dead", dead, mortality, Rewards::new());
    b.add_transition(ill, "ill_stays", ill, Probability::Complement, Rewards::new());
    b.add_transition(dead, "dead_stays", dead, 1.0, Rewards::new());
    let mut model = b.build();

    model.resample(&mut ParameterRng::new(7)).unwrap();
    for cycle in 0..5 {
        let from_well = model.child_probability(Child::Transition(well_dead)).value(cycle).unwrap();
        let from_ill = model.child_probability(Child::Transition(ill_dead)).value(cycle).unwrap();
        assert_eq!(from_well, from_ill, "cycle {cycle}");
        let estimate = 0.0001 + cycle as f64 * 0.0001;
        assert!((from_well - estimate).abs() <= 0.0001 + 1e-12);
    }
}

#[test]
fn sampled_initial_split_varies_per_iteration() {
    let mut b = Model::builder();
    let mild = b.add_state("mild", Parameter::beta(0.7, 14.0, 6.0), Rewards::new().with("cost", 100.0));
    let severe = b.add_state("severe", Probability::Complement, Rewards::new().with("cost", 900.0));
    let dead = b.add_state("dead", 0.0, Rewards::new());
    b.add_transition(mild, "mild_to_severe", severe, 0.1, Rewards::new());
    b.add_transition(mild, "mild_stays", mild, Probability::Complement, Rewards::new());
    b.add_transition(severe, "severe_to_dead", dead, 0.3, Rewards::new());
    b.add_transition(severe, "severe_stays", severe, Probability::Complement, Rewards::new());
    b.add_transition(dead, "dead_stays", dead, 1.0, Rewards::new());
    let model = b.build();

    let ensemble = PsaRunner::new(RunConfig::new(6, CountingMethod::Half, 0.0), PsaConfig::new(10, 3))
        .run(&model)
        .unwrap();

    let splits: Vec<f64> = ensemble.iterations.iter().map(|it| it.results.initial_distribution[0]).collect();
    assert!(splits.windows(2).any(|w| w[0] != w[1]));
    for it in &ensemble.iterations {
        let initial = &it.results.initial_distribution;
        assert!((0.0..=1.0).contains(&initial[0]));
        assert_eq!(initial[1], 1.0 - (0.0 + initial[0]));
        assert_eq!(initial[2], 0.0);
    }
}
