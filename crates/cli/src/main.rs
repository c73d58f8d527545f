mod config_commands;
mod doctor_commands;
mod portal_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "portalbot", about = "Portalbot: work-order portal automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (default: ./portalbot.toml, then ~/.config/portalbot/).
    #[arg(long, global = true, env = "PORTALBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Portal username (overrides config).
    #[arg(long, global = true, env = "PORTALBOT_USERNAME")]
    username: Option<String>,

    /// Portal password (overrides config).
    #[arg(long, global = true, env = "PORTALBOT_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the full snapshot of one work order.
    Details {
        /// Work-order identifier.
        id: String,
    },
    /// Move an IN_PROGRESS work order to ALLOCATED.
    Allocate {
        /// Work-order identifier.
        id: String,
    },
    /// Process several work orders concurrently, one JSON line per id.
    Batch {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Allocate instead of fetching details.
        #[arg(long)]
        allocate: bool,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Check config, credentials and the local browser.
    Doctor {
        /// Also launch a browser and open the portal login page.
        #[arg(long)]
        probe: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays machine-readable.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "portalbot starting");

    let overrides = portal_commands::CredentialOverrides {
        username: cli.username,
        password: cli.password,
    };

    match cli.command {
        Commands::Details { id } => {
            portal_commands::details(cli.config.as_deref(), overrides, &id).await
        },
        Commands::Allocate { id } => {
            portal_commands::allocate(cli.config.as_deref(), overrides, &id).await
        },
        Commands::Batch { ids, allocate } => {
            portal_commands::batch(cli.config.as_deref(), overrides, &ids, allocate).await
        },
        Commands::Config { action } => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
        Commands::Doctor { probe } => {
            doctor_commands::handle_doctor(cli.config.as_deref(), &overrides, probe).await
        },
    }
}
