mod commands;
mod scan;
mod display;

use clap::{ArgAction, Parser};
use anyhow::Result;

#[derive(Parser)]
#[command(name = "refwatch")]
#[command(
    about = "List module references and check that they are still reachable",
    long_about = None
)]
struct Cli {
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase log verbosity (-v info, -vv debug)"
    )]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    #[command(about = "Display module references, optionally checking each one")]
    Audit(commands::Audit),

    #[command(about = "List supported reference types")]
    Kinds(commands::Kinds),
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Audit(cmd) => {
            cmd.run().await?;
        }
        Commands::Kinds(cmd) => {
            cmd.run()?;
        }
    }

    Ok(())
}
