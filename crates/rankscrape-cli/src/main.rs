mod collect;
mod operator;
mod sink;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::collect::{Collection, RunOptions};

#[derive(Debug, Parser)]
#[command(name = "rankscrape")]
#[command(about = "Collects leaderboard and player profile data from the game API")]
struct Cli {
    /// Never prompt; abort wherever an operator decision would be needed.
    #[arg(long, global = true)]
    unattended: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Grand-prix day ranking plus a profile for every ranked player.
    Ranking {
        /// Collect the final ranking of the previous day.
        #[arg(long)]
        previous_day: bool,
        /// Only fetch the first page of each ladder.
        #[arg(long)]
        test: bool,
        /// Record each player's last login time.
        #[arg(long)]
        last_login: bool,
    },
    /// Season-grade ladder plus a profile for every ranked player.
    Grade {
        /// Only fetch the first page of the ladder.
        #[arg(long)]
        test: bool,
        /// Record each player's last login time.
        #[arg(long)]
        last_login: bool,
    },
    /// Print the event ids and output file prefix that a run today would use.
    Plan {
        #[arg(long)]
        previous_day: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = rankscrape_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let today = chrono::Local::now().date_naive();
    match cli.command {
        Commands::Ranking {
            previous_day,
            test,
            last_login,
        } => {
            let options = RunOptions {
                test_mode: test,
                last_login,
                unattended: cli.unattended,
            };
            collect::run(&config, Collection::Ranking { previous_day }, options, today).await
        }
        Commands::Grade { test, last_login } => {
            let options = RunOptions {
                test_mode: test,
                last_login,
                unattended: cli.unattended,
            };
            collect::run(&config, Collection::Grade, options, today).await
        }
        Commands::Plan { previous_day } => {
            collect::print_plan(&config, previous_day, today);
            Ok(ExitCode::SUCCESS)
        }
    }
}
