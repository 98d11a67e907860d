mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    campaign::CampaignSubcommand, config::ConfigSubcommand, credential::CredentialSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "provision",
    about = "Assign pooled credentials to campaigns by driving the remote setup workflow",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .provision/)
    #[arg(long, global = true, env = "PROVISION_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize provision in the current directory
    Init {
        /// Project name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Manage the credential pool
    Credential {
        #[command(subcommand)]
        subcommand: CredentialSubcommand,
    },

    /// Manage the campaign catalog
    Campaign {
        #[command(subcommand)]
        subcommand: CampaignSubcommand,
    },

    /// Inspect and validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Preview eligible work items in the order a cycle would take them
    Items {
        /// Show at most N items
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Run one cycle in the foreground
    Run {
        /// Seconds to pause after each iteration (default: cycle.delay_seconds)
        #[arg(long)]
        delay: Option<f64>,
        /// Maximum iterations, bounded by cycle.max_iterations_ceiling
        #[arg(long)]
        max: Option<u32>,
    },

    /// Start the HTTP control surface
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } | Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref(), cli.json),
        Commands::Credential { subcommand } => cmd::credential::run(&root, subcommand, cli.json),
        Commands::Campaign { subcommand } => cmd::campaign::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Items { limit } => cmd::items::run(&root, limit, cli.json),
        Commands::Run { delay, max } => cmd::run::run(&root, delay, max, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
