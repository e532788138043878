use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nodelaunch_tools::tasks::{Task, TaskOutcome, TaskRunner};
use nodelaunch_tools::{watcher, Config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nodelaunch")]
#[command(about = "NodeLaunch project tools: configuration, source preparation, contract tests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved configuration
    Config {
        /// Network to resolve (defaults to the configured default network)
        #[arg(short, long)]
        network: Option<String>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List declared networks
    Networks,
    /// Run one or more tasks in order (compile, test, clean)
    Run {
        #[arg(required = true)]
        tasks: Vec<String>,
        #[arg(short, long)]
        network: Option<String>,
    },
    /// Deploy the example contract and check its getter
    Test {
        #[arg(short, long)]
        network: Option<String>,
    },
    /// Re-run the watcher tasks whenever watched files change
    Watch {
        #[arg(short, long)]
        network: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load().context("failed to load project configuration")?;

    match cli.command {
        Commands::Config { network, json } => {
            let profile = config.network(network.as_deref())?;
            info!(network = %profile.name, chain_id = profile.chain_id, "network selected");
            if json {
                println!("{}", config.to_json()?);
            } else {
                config.print_summary();
            }
            Ok(())
        }
        Commands::Networks => {
            for profile in config.networks.iter() {
                let is_default = profile.name == config.networks.default_name();
                let marker = if is_default { "*" } else { " " };
                println!(
                    "{} {:<12} chain {:<6} {}",
                    marker,
                    profile.name,
                    profile.chain_id,
                    profile.url.as_deref().unwrap_or("(in-process)")
                );
            }
            Ok(())
        }
        Commands::Run { tasks, network } => {
            let tasks = tasks
                .iter()
                .map(|name| name.parse::<Task>())
                .collect::<Result<Vec<_>, _>>()?;
            let profile = config.network(network.as_deref())?;
            let runner = TaskRunner::new(&config, profile);
            for outcome in runner.run_all(&tasks)? {
                report(&outcome);
            }
            Ok(())
        }
        Commands::Test { network } => {
            let profile = config.network(network.as_deref())?;
            let runner = TaskRunner::new(&config, profile);
            report(&runner.run(Task::Test)?);
            Ok(())
        }
        Commands::Watch { network } => {
            let profile = config.network(network.as_deref())?;
            let runner = TaskRunner::new(&config, profile);
            watcher::watch(&runner, &config.watcher).await?;
            Ok(())
        }
    }
}

fn report(outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Compiled(report) => println!(
            "Prepared {} source(s) in {}",
            report.files,
            report.output_dir.display()
        ),
        TaskOutcome::Tested(report) => println!(
            "Contract: getAmount() == {} on {} ({})",
            report.amount, report.network, report.address
        ),
        TaskOutcome::Cleaned(dirs) if dirs.is_empty() => println!("Nothing to clean"),
        TaskOutcome::Cleaned(dirs) => {
            for dir in dirs {
                println!("Removed {}", dir.display());
            }
        }
    }
}
