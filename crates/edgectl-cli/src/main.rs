//! edgectl CLI - reconcile CDN distributions from declarative configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::Connection;

#[derive(Parser)]
#[command(name = "edgectl")]
#[command(version)]
#[command(about = "Reconcile CDN distributions from declarative configuration", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Controller configuration file (default: ~/.config/edgectl/config.yaml)
    #[arg(long, global = true, env = "EDGECTL_CONFIG", value_name = "PATH")]
    controller_config: Option<PathBuf>,

    /// Control-plane endpoint, overriding the configuration file
    #[arg(long, global = true, env = "EDGECTL_ENDPOINT")]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the wire record a configuration maps to
    Expand {
        /// Distribution configuration (YAML)
        config: PathBuf,
    },

    /// Print the declarative configuration for a wire record
    Flatten {
        /// Distribution record (JSON)
        record: PathBuf,
    },

    /// Check a configuration without contacting the control plane
    Validate {
        /// Distribution configuration (YAML)
        config: PathBuf,

        /// Output validation results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a distribution, or update an existing one
    Apply {
        /// Distribution configuration (YAML)
        config: PathBuf,

        /// Id of the distribution to update; a new one is created when omitted
        #[arg(long)]
        id: Option<String>,

        /// Return as soon as the change is accepted
        #[arg(long)]
        no_wait: bool,

        /// Give up waiting for deployment after this long (e.g. 30m)
        #[arg(long, value_parser = parse_duration)]
        timeout: Option<Duration>,

        /// Output the resulting handle as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the current state of a distribution
    Status {
        /// Distribution id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a distribution, disabling it first when needed
    Delete {
        /// Distribution id
        id: String,

        /// Disable the distribution and keep it
        #[arg(long)]
        retain: bool,

        /// Do not wait for the distribution to disappear
        #[arg(long)]
        no_wait: bool,

        /// Give up waiting after this long
        #[arg(long, value_parser = parse_duration)]
        timeout: Option<Duration>,
    },
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

fn init_tracing(debug: bool) {
    let filter = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let connection = Connection {
        config: cli.controller_config,
        endpoint: cli.endpoint,
    };

    let result = match cli.command {
        Commands::Expand { config } => commands::expand::run(&config),

        Commands::Flatten { record } => commands::flatten::run(&record),

        Commands::Validate { config, json } => commands::validate::run(&config, json),

        Commands::Apply {
            config,
            id,
            no_wait,
            timeout,
            json,
        } => {
            commands::apply::run(&connection, &config, id.as_deref(), !no_wait, timeout, json)
                .await
        }

        Commands::Status { id, json } => commands::status::run(&connection, &id, json).await,

        Commands::Delete {
            id,
            retain,
            no_wait,
            timeout,
        } => commands::delete::run(&connection, &id, retain, !no_wait, timeout).await,
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
