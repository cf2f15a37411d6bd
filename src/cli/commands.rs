use std::path::PathBuf;

use clap::Subcommand;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create an active admin user with every capability
    Create {
        /// Path to the configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Username for the new admin
        #[arg(long)]
        username: Option<String>,

        /// Email address for the new admin
        #[arg(long)]
        email: Option<String>,

        /// Password for the new admin
        #[arg(long)]
        password: Option<String>,

        /// Skip interactive prompts (requires --username and --password)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Replace a user's password
    ChangePassword {
        /// Path to the configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// User whose password changes
        #[arg(long)]
        username: Option<String>,

        /// The new password
        #[arg(long)]
        password: Option<String>,

        /// Skip interactive prompts (requires --username and --password)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Turn a server feature on or off
    Feature {
        /// Path to the configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Feature id, e.g. download_stats
        #[arg(long)]
        name: String,

        /// Enable the feature
        #[arg(long, conflicts_with = "disable", required_unless_present = "disable")]
        enable: bool,

        /// Disable the feature
        #[arg(long)]
        disable: bool,
    },
}

#[derive(Subcommand)]
pub enum StatsCommands {
    /// Delete download rollups older than the configured retention
    Cleanup {
        /// Path to the configuration file
        #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}
