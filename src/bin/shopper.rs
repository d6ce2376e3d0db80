//! `shopper` — fit the Shopper model from the command line.
//!
//! Loads the trips and prices TSV files, builds the model (hyperparameters
//! from an optional TOML file), fits it and prints the posterior summary
//! together with the tail of the ELBO history (ADVI) or the per-chain E-BFMI
//! (Hamiltonian MCMC). Logs go to stderr; `RUST_LOG` overrides the default
//! `info` level.
use std::path::PathBuf;

use clap::Parser;
use rust_shopper::{
    Shopper,
    inference::{ConvergenceDiff, FitMethod, FitOptions, StepMethod},
    model::ShopperConfig,
    results::Posterior,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Number of trailing ELBO values printed.
const ELBO_TAIL: usize = 10;

#[derive(Debug, Parser)]
#[command(name = "shopper", version, about = "Fit the Shopper basket choice model")]
struct Cli {
    /// Trips file: user_id, item_id, session_id, quantity (tab-separated).
    #[arg(long)]
    trips: PathBuf,

    /// Prices file: item_id, session_id, price (tab-separated).
    #[arg(long)]
    prices: PathBuf,

    /// TOML file with model hyperparameters.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inference method: ADVI or MCMC.
    #[arg(long, default_value = "advi")]
    method: FitMethod,

    /// Iterations (ADVI) or kept draws per chain (MCMC).
    #[arg(short, long, default_value_t = 10_000)]
    n: usize,

    #[arg(long, default_value_t = FitOptions::DEFAULT_SEED)]
    seed: u64,

    /// ADVI convergence difference: relative or absolute.
    #[arg(long)]
    diff: Option<ConvergenceDiff>,

    /// MCMC step method: nuts, hmc or metropolis.
    #[arg(long)]
    step: Option<StepMethod>,

    /// Number of MCMC chains.
    #[arg(long)]
    chains: Option<usize>,

    /// MCMC tuning iterations per chain.
    #[arg(long)]
    tune: Option<usize>,

    /// Draws taken from an ADVI approximation for the summary.
    #[arg(long, default_value_t = 500)]
    summary_draws: usize,

    /// Print the results as JSON.
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = match &cli.config {
        Some(path) => ShopperConfig::from_toml_path(path)?,
        None => ShopperConfig::default(),
    };
    let shopper = Shopper::from_files(&cli.trips, &cli.prices, config)?;

    let mut opts = FitOptions::new(cli.n, cli.method)?.with_seed(cli.seed);
    if let Some(diff) = cli.diff {
        opts = opts.with_diff(diff);
    }
    if let Some(step) = cli.step {
        opts = opts.with_step(step);
    }
    if let Some(chains) = cli.chains {
        opts.sample.chains = chains;
    }
    if let Some(tune) = cli.tune {
        opts.sample.tune = tune;
    }

    let results = shopper.fit(&opts)?;
    let summary = results.summary(Some(cli.summary_draws))?;
    let elbo_tail: Option<Vec<f64>> = results.elbo_trace().ok().map(|hist| {
        hist[hist.len().saturating_sub(ELBO_TAIL)..].to_vec()
    });
    let bfmi: Option<Vec<f64>> =
        results.energy().ok().map(|chains| chains.iter().map(|e| e.bfmi).collect());
    let converged_at = match results.posterior() {
        Posterior::Approximation(q) => q.converged_at,
        Posterior::Trace(_) => None,
    };

    if cli.json {
        let out = json!({
            "method": cli.method,
            "posterior": results.posterior().kind(),
            "converged_at": converged_at,
            "summary": summary,
            "elbo_tail": elbo_tail,
            "bfmi": bfmi,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!("{summary}");
        if let Some(tail) = elbo_tail {
            println!("\nELBO (last {}): {tail:?}", tail.len());
        }
        if let Some(at) = converged_at {
            println!("Converged at iteration {at}.");
        }
        if let Some(bfmi) = bfmi {
            println!("\nE-BFMI per chain: {bfmi:?}");
        }
    }
    info!("Done.");
    Ok(())
}
