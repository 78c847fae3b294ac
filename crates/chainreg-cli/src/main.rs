//! chainreg CLI - verify and reconcile a chain registry against live networks

use anyhow::Context;
use chainreg_core::{ChainReport, LivenessReport, RegistryVerifier, VerifierConfig};
use chainreg_registry::storage::RegistryFile;
use chainreg_registry::{check_integrity, Registry};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "chainreg")]
#[command(version)]
#[command(about = "Verify and reconcile a chain registry against live networks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry file
    #[arg(short, long, global = true, default_value = "chains.json")]
    registry: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Report duplicate keys, chain ids and LayerZero ids
    Check,

    /// Probe RPC endpoints and report liveness per chain
    VerifyRpcs,

    /// Probe RPC endpoints and contract roles (read-only)
    VerifyContracts,

    /// Verify everything and write the corrected registry
    Fix {
        /// Output file (defaults to the registry file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report changes without writing
        #[arg(long)]
        dry_run: bool,

        /// Print the correction plan as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let file = RegistryFile::new(&cli.registry);
    let registry = file
        .load()
        .with_context(|| format!("failed to load registry {}", cli.registry.display()))?;

    match cli.command {
        Commands::Check => print_issues(&registry),
        Commands::VerifyRpcs => {
            let verifier = connect(cli.config.as_deref())?;
            for report in verifier.verify_rpcs(&registry).await {
                print_liveness(&report);
            }
        }
        Commands::VerifyContracts => {
            let verifier = connect(cli.config.as_deref())?;
            for report in verifier.verify_contracts(&registry).await {
                print_chain(&report);
            }
        }
        Commands::Fix {
            output,
            dry_run,
            json,
        } => {
            let verifier = connect(cli.config.as_deref())?;
            let result = verifier.fix(&registry).await;

            if json {
                println!("{}", result.plan.to_json_pretty()?);
            } else if result.has_changes() {
                print!("{}", result.log);
            } else {
                println!("no changes");
            }

            if result.has_changes() && !dry_run {
                let target = RegistryFile::new(output.as_ref().unwrap_or(&cli.registry));
                target
                    .write(&result.registry)
                    .with_context(|| format!("failed to write {}", target.path().display()))?;
                info!(path = %target.path().display(), changes = result.log.len(), "Registry updated");
            }
        }
    }

    Ok(())
}

fn connect(config: Option<&Path>) -> anyhow::Result<RegistryVerifier> {
    let config = match config {
        Some(path) => VerifierConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => VerifierConfig::default(),
    };
    RegistryVerifier::connect(&config).context("failed to set up verifier")
}

fn print_issues(registry: &Registry) {
    let issues = check_integrity(registry);
    if issues.is_empty() {
        println!("no integrity issues");
    }
    for issue in issues {
        println!("{}", issue);
    }
}

fn print_liveness(report: &LivenessReport) {
    println!("{}", report.key);
    for probe in &report.probes {
        println!("  {}", probe);
    }
    println!("  preferredRpcIndex: {}", report.preferred_rpc_index);
    println!("  chainId: {}", report.chain_id);
}

fn print_chain(report: &ChainReport) {
    print_liveness(&report.liveness);
    match &report.contracts {
        Some(contracts) => {
            println!("  contracts via {}", contracts.endpoint);
            for check in &contracts.roles {
                println!("    {}", check);
            }
        }
        None => println!("  contracts skipped: no reachable endpoint"),
    }
}
