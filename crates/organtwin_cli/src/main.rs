use anyhow::Context;
use clap::Parser;
use organtwin_agent::{Session, SessionSnapshot};
use organtwin_core::{Intervention, NutrientVector, OrganTwinConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "organtwin", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "organtwin.toml")]
    config: PathBuf,

    /// Simulated days to run
    #[arg(short, long, default_value_t = 1)]
    days: u32,

    /// Meals per simulated day
    #[arg(short, long, default_value_t = 3)]
    meals_per_day: u32,

    /// Portion size in grams
    #[arg(short, long, default_value_t = 100.0)]
    portion: f64,

    /// Meal as JSON, e.g. '{"calories": 450, "sodium": 1800}'. Missing fields are zero.
    #[arg(long)]
    meal: Option<String>,

    /// Override the simulation seed
    #[arg(long, env = "ORGANTWIN_SEED")]
    seed: Option<u64>,

    /// Intervention applied once at the end of each day
    #[arg(long)]
    intervention: Option<Intervention>,

    /// Intervention intensity
    #[arg(long, default_value_t = 1.0)]
    intensity: f64,

    /// Resume from a session snapshot
    #[arg(long)]
    snapshot_in: Option<PathBuf>,

    /// Write the session snapshot here when done
    #[arg(long)]
    snapshot_out: Option<PathBuf>,

    /// Print the final organ report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = OrganTwinConfig::load_or_default(&args.config)
        .with_context(|| format!("Invalid config file {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    let mut session = match &args.snapshot_in {
        Some(path) => {
            let snapshot = SessionSnapshot::load(path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            Session::restore(&config, snapshot).context("Snapshot does not fit this config")?
        }
        None => Session::new(&config).context("Invalid configuration")?,
    };

    let meal: NutrientVector = match &args.meal {
        Some(json) => serde_json::from_str(json).context("Failed to parse --meal JSON")?,
        None => NutrientVector::typical_meal(),
    };

    info!(
        days = args.days,
        meals_per_day = args.meals_per_day,
        portion = args.portion,
        "Starting simulation"
    );

    for day in 1..=args.days {
        let mut total_reward = 0.0;
        for n in 1..=args.meals_per_day {
            let label = format!("day {} meal {}", day, n);
            let out = session.step(&meal, args.portion, &label)?;
            total_reward += out.reward;
            info!(
                meal = %label,
                action = %out.action_label,
                reward = out.reward,
                loss = out.train.loss,
                "Meal processed"
            );
        }
        if let Some(kind) = args.intervention {
            session.apply_intervention(kind, args.intensity)?;
        }
        if !args.json {
            println!(
                "Day {}: overall health {:.3}, reward {:+.3}, epsilon {:.3}",
                day,
                session.get_overall_health(),
                total_reward,
                session.trainer().epsilon()
            );
        }
    }

    let recommendation = session.recommend(&meal)?;

    if args.json {
        let organs: Vec<_> = session
            .twin()
            .organs()
            .map(|(def, state)| {
                serde_json::json!({
                    "organ": def.name,
                    "health": state.health,
                    "band": state.band(),
                    "metrics": state.readings(def),
                })
            })
            .collect();
        let report = serde_json::json!({
            "overall_health": session.get_overall_health(),
            "meals_simulated": session.twin().meals_simulated(),
            "epsilon": session.trainer().epsilon(),
            "organs": organs,
            "recommendation": recommendation,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&session);
        println!();
        println!("Recommendation: {}", recommendation.label);
        println!("  {}", recommendation.text);
    }

    if let Some(path) = &args.snapshot_out {
        session
            .snapshot()
            .save(path)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    }

    Ok(())
}

fn print_report(session: &Session) {
    println!();
    println!(
        "Overall health {:.3} (previous {:.3})",
        session.get_overall_health(),
        session.twin().previous_overall_health()
    );
    for (def, state) in session.twin().organs() {
        println!(
            "{:<9} {:.3}  {:<11}  {}",
            def.name,
            state.health,
            state.band().label(),
            def.system
        );
        for r in state.readings(def) {
            match r.deviation_pct {
                Some(pct) => println!("    {:<22} {:>9.2} ({:+.1}%)", r.name, r.value, pct),
                None => println!("    {:<22} {:>9.2}", r.name, r.value),
            }
        }
    }
}
