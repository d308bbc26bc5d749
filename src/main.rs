use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use dcasim::cli::setup::setup;
use dcasim::core::Frequency;
use dcasim::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for dcasim::AppCommand {
    fn from(cmd: Commands) -> dcasim::AppCommand {
        match cmd {
            Commands::Compare {
                frequency,
                native,
                refresh,
            } => dcasim::AppCommand::Compare {
                frequency,
                native,
                refresh,
            },
            Commands::Quotes {
                symbol,
                native,
                refresh,
            } => dcasim::AppCommand::Quotes {
                symbol,
                native,
                refresh,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compare DCA, lump-sum and structured note strategies
    Compare {
        /// Purchase frequency (daily, weekly, monthly)
        #[arg(short, long)]
        frequency: Option<Frequency>,
        /// Keep foreign assets in their own currency
        #[arg(short, long)]
        native: bool,
        /// Drop cached quotes and fetch them again
        #[arg(short, long)]
        refresh: bool,
    },
    /// Show the daily series for a symbol
    Quotes {
        symbol: String,
        /// Keep foreign assets in their own currency
        #[arg(short, long)]
        native: bool,
        /// Drop cached quotes and fetch them again
        #[arg(short, long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => dcasim::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
