mod manifest;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use covgate_core::OrgConfig;
use covgate_coverage::Strategy;
use covgate_sfapi::Connection;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Pre-deployment Apex coverage gate.
///
/// Reads the Apex classes and triggers named by one or more `package.xml`
/// manifests, validates their org-side coverage against the 75% threshold
/// and prints the minimal set of test classes that reproduces it.
#[derive(Debug, Parser)]
#[command(name = "covgate", version, about)]
struct Cli {
    /// Org connection settings (JSON)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Deployment manifests to read targets from, comma separated
    #[arg(short, long, value_delimiter = ',', default_value = "package.xml")]
    packages: Vec<PathBuf>,

    /// How the set of validated artifacts is determined
    #[arg(short, long, value_enum, default_value_t = StrategyArg::MaxCoverage)]
    strategy: StrategyArg,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Validate exactly the artifacts the manifests name
    MaxCoverage,
    /// Also pull in artifacts the named ones depend on
    MaxCoverageWithDeps,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::MaxCoverage => Strategy::MaxCoverage,
            StrategyArg::MaxCoverageWithDeps => Strategy::MaxCoverageWithDeps,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "covgate=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<Vec<String>> {
    let targets = manifest::read_targets(&cli.packages)?;
    if targets.is_empty() {
        debug!("manifests name no Apex artifacts, nothing to validate");
        return Ok(Vec::new());
    }

    let cfg = OrgConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let connection = Connection::new(cfg)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let strategy = Strategy::from(cli.strategy);
    debug!(%strategy, classes = targets.classes.len(), triggers = targets.triggers.len(), "validating coverage");
    let tests = strategy
        .select_tests(&connection, &targets.classes, &targets.triggers, &cancel)
        .await?;
    Ok(tests)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(tests) => println!("{}", tests.join(" ")),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(1);
        }
    }
}
