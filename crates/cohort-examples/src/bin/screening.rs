use anyhow::Result;
use clap::Parser;
use cohort_core::{CountingMethod, Model, Parameter, Probability, Rewards, RunConfig, Strategy};
use cohort_sampler::{PsaConfig, PsaRunner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Three-state screening model with nested chance nodes and optional PSA")]
struct Args {
    #[arg(long, default_value_t = 20)]
    cycles: usize,

    #[arg(long, default_value_t = 0.02)]
    discount_rate: f64,

    /// Number of PSA iterations; 0 runs the point estimate only
    #[arg(long, default_value_t = 0)]
    psa: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long)]
    parallel: bool,
}

/// Background mortality rising by 1e-4 per cycle, each value uncertain by +/- 1e-4
fn background_mortality(cycles: usize) -> Probability {
    Probability::TimeVarying(
        (0..cycles.max(1))
            .map(|t| {
                let p = 0.0001 + t as f64 * 0.0001;
                Parameter::uniform(p, p - 0.0001, p + 0.0001)
            })
            .collect(),
    )
}

fn screening_model(cycles: usize) -> Model {
    let mut b = Model::builder();
    // One curve for both states, so a PSA draw moves them together
    let mortality = b.add_shared("background_mortality", background_mortality(cycles));

    let a = b.add_state("state_a", 1.0, Rewards::new().with("cost", 50.0).with("utility", 1.0));
    let bb = b.add_state("state_b", 0.0, Rewards::new().with("cost", 100.0).with("utility", 0.7));
    let c = b.add_state("state_c", 0.0, Rewards::new().with("cost", 0.0).with("utility", 0.0));

    b.add_transition(a, "a_to_a", a, Probability::Complement, Rewards::new().with("cost", 1.0));
    b.add_transition(a, "a_to_b", bb, 0.2, Rewards::new().with("cost", 2.0).with("utility", -0.1));
    b.add_transition(a, "a_to_c", c, mortality, Rewards::new().with("cost", 2.0).with("utility", -0.1));

    let k1 = b.add_chance(bb, "k1", Probability::Complement, Rewards::new().with("cost", 20.0).with("utility", -0.1));
    let k2 = b.add_chance(k1, "k2", Probability::Complement, Rewards::new().with("cost", 30.0).with("utility", -0.2));
    b.add_transition(k2, "k2_to_a", a, 0.3, Rewards::new().with("cost", 6.0).with("utility", -0.2));
    b.add_transition(k2, "k2_to_b", bb, Probability::Complement, Rewards::new().with("cost", 7.0).with("utility", -0.1));
    b.add_transition(k1, "k1_to_c", c, 0.01, Rewards::new());
    b.add_transition(bb, "b_to_c", c, mortality, Rewards::new());

    b.add_transition(c, "c_to_c", c, 1.0, Rewards::new());
    b.build()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let model = screening_model(args.cycles);
    let run = RunConfig::new(args.cycles, CountingMethod::Half, args.discount_rate).with_parallel(args.parallel);

    let strategy = Strategy::new("screening", model.clone(), run.clone());
    let results = strategy.run()?;

    println!("{:>5} {:>10} {:>10} {:>10} {:>12} {:>10}", "cycle", "state_a", "state_b", "state_c", "cost", "utility");
    for record in &results.cycles {
        let p = &record.state_probabilities;
        println!(
            "{:>5} {:>10.6} {:>10.6} {:>10.6} {:>12.6} {:>10.6}",
            record.cycle,
            p[0],
            p[1],
            p[2],
            record.outcomes.get("cost").unwrap_or(0.0),
            record.outcomes.get("utility").unwrap_or(0.0),
        );
    }
    for (name, total) in results.totals().iter() {
        println!("total {}: {:.6}", name, total);
    }

    if args.psa > 0 {
        let psa = PsaConfig::new(args.psa, args.seed).with_parallel(args.parallel);
        let ensemble = PsaRunner::new(run, psa).run(&model)?;
        let summary = ensemble.summary();

        println!();
        println!("PSA over {} iterations (seed {})", summary.n_iterations, args.seed);
        for v in &summary.variables {
            println!(
                "{:>8}: mean {:.4}  sd {:.4}  95% [{:.4}, {:.4}]",
                v.name,
                v.mean,
                v.std_dev(),
                v.lower,
                v.upper
            );
        }
        println!("mean final distribution: {:?}", summary.mean_final_distribution);
    }

    Ok(())
}
