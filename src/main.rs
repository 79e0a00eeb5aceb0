use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mapf::request::SolveRequest;
use mapf::scenario::{Scenario, ScenarioSpec};
use mapf::Algorithm;

#[derive(Parser, Debug)]
#[command(
    name = "mapf",
    about = "Multi-agent pathfinding on 2D grids.",
    version = "1.0"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve a JSON request file and print the JSON response.
    Solve {
        #[arg(long, short, help = "Path to the solve request JSON")]
        request: PathBuf,
    },
    /// Generate a random scenario and print it as a solve request.
    Generate {
        #[arg(long, default_value_t = 10)]
        size: usize,
        #[arg(long, default_value_t = 4)]
        agents: usize,
        #[arg(long, default_value_t = 0.15)]
        obstacles: f64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "cbs")]
        algorithm: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Solve { request } => {
            let text = fs::read_to_string(&request)
                .with_context(|| format!("reading request {}", request.display()))?;
            let request: SolveRequest = serde_json::from_str(&text).context("parsing request")?;
            let response = mapf::solve(&request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Generate { size, agents, obstacles, seed, algorithm } => {
            let algorithm: Algorithm = serde_json::from_value(serde_json::json!(algorithm))
                .context("unknown algorithm name")?;
            let scenario = Scenario::generate(&ScenarioSpec {
                size,
                num_agents: agents,
                obstacle_percentage: obstacles,
                seed,
            })?;
            let request = scenario.to_request(algorithm);
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
    }
    Ok(())
}
