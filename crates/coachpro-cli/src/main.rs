mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    analytics::AnalyticsSubcommand, coach::CoachSubcommand, product::ProductSubcommand,
    program::ProgramSubcommand, settings::SettingsSubcommand, user::UserSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "coachpro",
    about = "CoachPro coaching LMS: programs, coaches, enrollments and the HTTP API",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .coachpro/)
    #[arg(long, global = true, env = "COACHPRO_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config and database in the project root
    Init {
        /// Site name shown on program pages (default: directory name)
        #[arg(long)]
        site_name: Option<String>,
        /// Overwrite an existing config with fresh defaults and a new secret
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Address to bind (default: server.host from config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Manage users and issue API tokens
    User {
        #[command(subcommand)]
        subcommand: UserSubcommand,
    },

    /// Manage coaching programs
    Program {
        #[command(subcommand)]
        subcommand: ProgramSubcommand,
    },

    /// Manage coach profiles
    Coach {
        #[command(subcommand)]
        subcommand: CoachSubcommand,
    },

    /// Map store products to programs
    Product {
        #[command(subcommand)]
        subcommand: ProductSubcommand,
    },

    /// Show or change plugin settings
    Settings {
        #[command(subcommand)]
        subcommand: SettingsSubcommand,
    },

    /// Record and query analytics snapshots
    Analytics {
        #[command(subcommand)]
        subcommand: AnalyticsSubcommand,
    },

    /// Drop all data and remove the config
    Uninstall {
        /// Confirm the irreversible removal
        #[arg(long)]
        yes: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { site_name, force } => {
            cmd::init::run(&root, site_name.as_deref(), force, cli.json)
        }
        Commands::Serve { host, port } => cmd::serve::run(&root, host, port),
        Commands::User { subcommand } => cmd::user::run(&root, subcommand, cli.json),
        Commands::Program { subcommand } => cmd::program::run(&root, subcommand, cli.json),
        Commands::Coach { subcommand } => cmd::coach::run(&root, subcommand, cli.json),
        Commands::Product { subcommand } => cmd::product::run(&root, subcommand, cli.json),
        Commands::Settings { subcommand } => cmd::settings::run(&root, subcommand, cli.json),
        Commands::Analytics { subcommand } => cmd::analytics::run(&root, subcommand, cli.json),
        Commands::Uninstall { yes } => cmd::uninstall::run(&root, yes),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
