use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod session;

#[derive(Parser)]
#[command(name = "cravingstop", version, about = "Craving Stopper CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stopwatch control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Logged durations
    Log {
        #[command(subcommand)]
        action: commands::log::LogAction,
    },
    /// History statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Device identity
    Identity {
        #[command(subcommand)]
        action: commands::identity::IdentityAction,
    },
    /// Interactive stopwatch (Enter to click, q to quit)
    Run,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("CRAVINGSTOP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Log { action } => commands::log::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Identity { action } => commands::identity::run(action),
        Commands::Run => commands::run::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
