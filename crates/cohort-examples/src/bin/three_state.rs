use anyhow::Result;
use clap::{Parser, ValueEnum};
use cohort_core::{CountingMethod, DiscountTiming, Model, Probability, Rewards, RunConfig, Strategy};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Counting {
    #[value(name = "start")]
    Start,
    #[value(name = "end")]
    End,
    #[value(name = "half")]
    Half,
}

impl From<Counting> for CountingMethod {
    fn from(counting: Counting) -> Self {
        match counting {
            Counting::Start => CountingMethod::Start,
            Counting::End => CountingMethod::End,
            Counting::Half => CountingMethod::Half,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Healthy/Sick/Dead cohort under every counting convention")]
struct Args {
    #[arg(long, default_value_t = 10)]
    cycles: usize,

    #[arg(long, default_value_t = 0.03)]
    discount_rate: f64,

    /// Only run this convention instead of all three
    #[arg(long, value_enum)]
    counting: Option<Counting>,

    /// Start discounting at cycle one instead of cycle zero
    #[arg(long)]
    discount_from_one: bool,

    /// Print each run's results as JSON
    #[arg(long)]
    json: bool,
}

fn healthy_sick_dead() -> Model {
    let mut b = Model::builder();
    let healthy = b.add_state("healthy", 1.0, Rewards::new().with("cost", 100.0).with("qaly", 1.0));
    let sick = b.add_state("sick", 0.0, Rewards::new().with("cost", 500.0).with("qaly", 0.6));
    let dead = b.add_state("dead", 0.0, Rewards::new());

    b.add_transition(healthy, "healthy_to_sick", sick, 0.1, Rewards::new().with("cost", 250.0));
    b.add_transition(healthy, "healthy_to_healthy", healthy, Probability::Complement, Rewards::new());
    b.add_transition(sick, "sick_to_dead", dead, 0.2, Rewards::new());
    b.add_transition(sick, "sick_to_sick", sick, Probability::Complement, Rewards::new());
    b.add_transition(dead, "dead_to_dead", dead, 1.0, Rewards::new());
    b.build()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let timing = if args.discount_from_one {
        DiscountTiming::FromCycleOne
    } else {
        DiscountTiming::FromCycleZero
    };
    let conventions = match args.counting {
        Some(c) => vec![c],
        None => vec![Counting::Start, Counting::Half, Counting::End],
    };

    let model = healthy_sick_dead();
    for counting in conventions {
        let config = RunConfig::new(args.cycles, counting.into(), args.discount_rate).with_discount_timing(timing);
        let strategy = Strategy::new(&format!("{:?}", counting).to_lowercase(), model.clone(), config);
        let results = strategy.run()?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&results)?);
            continue;
        }

        println!("== {} counting ==", strategy.name);
        println!("{:>5} {:>10} {:>10} {:>10}", "cycle", "healthy", "sick", "dead");
        for record in &results.cycles {
            let p = &record.state_probabilities;
            println!("{:>5} {:>10.6} {:>10.6} {:>10.6}", record.cycle, p[0], p[1], p[2]);
        }
        for (name, total) in results.totals().iter() {
            println!("total {}: {:.6}", name, total);
        }
        println!();
    }

    Ok(())
}
