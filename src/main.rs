use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tinytales::cli::commands;

#[derive(Parser)]
#[command(name = "tinytales")]
#[command(
    version,
    about = "Illustrated story generation over pluggable text and image backends"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an illustrated story
    Generate {
        #[arg(long, short, help = "Story prompt")]
        prompt: String,
        #[arg(long, short, help = "Requesting user")]
        user: String,
        #[arg(long, short, help = "Genre (default from config)")]
        genre: Option<String>,
        #[arg(long, short, help = "Target audience (default from config)")]
        audience: Option<String>,
        #[arg(long, short, help = "Number of scenes (default from config)")]
        scenes: Option<usize>,
        #[arg(
            short = 'f',
            long,
            default_value = "json",
            help = "Output format: json, yaml"
        )]
        format: String,
        #[arg(long, short, help = "Write the story to a file instead of stdout")]
        output: Option<PathBuf>,
        #[arg(long, help = "Write decoded scene images to this directory")]
        images_dir: Option<PathBuf>,
    },

    /// Invoke a registered capability with JSON input
    Run {
        #[arg(help = "Capability name")]
        capability: String,
        #[arg(long, short, help = "JSON input file ('-' or omitted for stdin)")]
        input: Option<PathBuf>,
    },

    /// List registered capabilities
    Capabilities {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Check the text backend and show the image cascade
    Health,

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
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mTinyTales encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
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
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Generate {
            prompt,
            user,
            genre,
            audience,
            scenes,
            format,
            output,
            images_dir,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::generate::run(commands::generate::GenerateOptions {
                prompt,
                user,
                genre,
                audience,
                scenes,
                format,
                output,
                images_dir,
            }))?;
        }
        Commands::Run { capability, input } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::run::run(&capability, input))?;
        }
        Commands::Capabilities { format } => {
            commands::capabilities::run(&format)?;
        }
        Commands::Health => {
            let rt = Runtime::new()?;
            rt.block_on(commands::health::run())?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                commands::config::show(&format)?;
            }
            ConfigAction::Path => {
                commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
