use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wheelhouse::cli::{
    AdminCommands, StatsCommands, init_store, load_settings, run_admin_change_password,
    run_admin_create, run_admin_feature, run_make_config, run_migrate, run_stats_cleanup,
};
use wheelhouse::config::DEFAULT_CONFIG_PATH;
use wheelhouse::server::{AppState, create_router};

#[derive(Parser)]
#[command(name = "wheelhouse")]
#[command(about = "A private Python package index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Path to the configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Create the database schema and seed default features
    Migrate {
        /// Path to the configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Write a new configuration file with a fresh secret key
    MakeConfig {
        /// Where to write the file
        #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,

        /// Accept every default without prompting
        #[arg(long)]
        non_interactive: bool,
    },

    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Download statistics maintenance
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },
}

async fn serve(config: PathBuf) -> anyhow::Result<()> {
    let settings = load_settings(&config)?;
    let store = init_store(&settings)?;
    let addr = settings.socket_addr()?;

    info!("Using database {}", settings.database.path.display());
    info!("Storing packages in {}", settings.packages.directory.display());

    let state = Arc::new(AppState::new(Arc::new(store), settings));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wheelhouse=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(config).await?,
        Commands::Migrate { config } => run_migrate(&config)?,
        Commands::MakeConfig {
            output,
            non_interactive,
        } => run_make_config(output, non_interactive)?,
        Commands::Admin { command } => match command {
            AdminCommands::Create {
                config,
                username,
                email,
                password,
                non_interactive,
            } => run_admin_create(&config, username, email, password, non_interactive)?,
            AdminCommands::ChangePassword {
                config,
                username,
                password,
                non_interactive,
            } => run_admin_change_password(&config, username, password, non_interactive)?,
            AdminCommands::Feature {
                config,
                name,
                enable,
                disable,
            } => run_admin_feature(&config, &name, enable && !disable)?,
        },
        Commands::Stats { command } => match command {
            StatsCommands::Cleanup { config } => run_stats_cleanup(&config)?,
        },
    }

    Ok(())
}
