use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "briefsmith")]
#[command(
    version,
    about = "Turns debate-training notes into citation-backed lesson packs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process note files into lesson packs
    Run {
        #[arg(required = true, help = "Note files or directories")]
        inputs: Vec<PathBuf>,
        #[arg(long, short, help = "Extra course context given to the model")]
        context: Option<String>,
        #[arg(long, help = "Skip publishing even when the config enables it")]
        no_publish: bool,
        #[arg(long, help = "Model override")]
        model: Option<String>,
    },

    /// Create the configuration skeleton
    Init {
        #[arg(long, short, help = "Initialize global config instead of project")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run {
            inputs,
            context,
            no_publish,
            model,
        } => {
            let all_succeeded = briefsmith::cli::commands::run::run(
                briefsmith::cli::commands::run::RunOptions {
                    inputs,
                    context,
                    no_publish,
                    model,
                },
            )?;
            Ok(all_succeeded)
        }
        Commands::Init { global, force } => {
            briefsmith::cli::commands::init::run(global, force)?;
            Ok(true)
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show { format } => {
                    briefsmith::cli::commands::config::show(&format)?;
                }
                ConfigAction::Path => {
                    briefsmith::cli::commands::config::path()?;
                }
            }
            Ok(true)
        }
    }
}
