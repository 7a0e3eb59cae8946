//! Kiln CLI - asset pipeline for static sites.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use kiln_config::Watched;

mod commands;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Build templates, styles, scripts and images for a static site")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to kiln.toml config file
    #[arg(short, long, default_value = "kiln.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks by name, after the tasks they depend on
    Run {
        /// Task names (see `kiln list`)
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Run only the named tasks, in the given order
        #[arg(long)]
        no_deps: bool,
    },

    /// Run every build task
    Build,

    /// List tasks
    List,

    /// Start the live-reload server
    Serve {
        /// Port to listen on (defaults to config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Open a browser once listening
        #[arg(long)]
        open: bool,
    },

    /// Re-run one compile task whenever its sources change
    Watch {
        #[arg(value_enum)]
        target: WatchTarget,
    },

    /// Run the server and all watchers as separate processes
    #[command(alias = "watch-dev")]
    Dev,

    /// Create kiln.toml and a starter source tree
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum WatchTarget {
    Templates,
    Styles,
    Scripts,
}

impl From<WatchTarget> for Watched {
    fn from(target: WatchTarget) -> Self {
        match target {
            WatchTarget::Templates => Watched::Templates,
            WatchTarget::Styles => Watched::Styles,
            WatchTarget::Scripts => Watched::Scripts,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Run { tasks, no_deps } => {
            commands::run::run(&cli.config, &tasks, !no_deps).await?;
        }
        Commands::Build => {
            commands::build::run(&cli.config).await?;
        }
        Commands::List => {
            commands::list::run(&cli.config)?;
        }
        Commands::Serve { port, open } => {
            commands::serve::run(&cli.config, port, open).await?;
        }
        Commands::Watch { target } => {
            commands::watch::run(&cli.config, target.into()).await?;
        }
        Commands::Dev => {
            commands::dev::run(&cli.config, cli.verbose).await?;
        }
        Commands::Init { yes } => {
            commands::init::run(std::path::Path::new("."), yes)?;
        }
    }

    Ok(())
}
