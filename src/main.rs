use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use smart_kuku::config::{CliOverrides, ServerConfig};
use smart_kuku::setup::{self, seed, AdminCredentials, SetupError};
use smart_kuku::store::{Store, StoreError};
use smart_kuku::{server, subscriptions};

/// Smart Kuku - poultry farm management backend
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve(ServeArgs),

    /// Prepare .env, the data directory, the snapshot and the admin account
    Setup {
        /// Project directory holding .env / .env.example
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Snapshot location (defaults to SMART_KUKU_DATA_FILE)
        #[arg(long)]
        data_file: Option<PathBuf>,
    },

    /// Load the default plans, sensor types and breed reference data
    Seed {
        #[arg(long)]
        data_file: Option<String>,

        /// Also create a demo farmer, farm, batch, device and readings
        #[arg(long)]
        demo: bool,
    },

    /// Run the subscription status sweep once and exit
    CheckSubscriptions {
        #[arg(long)]
        data_file: Option<String>,
    },
}

#[derive(Args, Clone, Default)]
struct ServeArgs {
    /// YAML configuration file (replaces environment configuration)
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP server host address
    #[arg(long)]
    http_host: Option<String>,

    /// HTTP server port
    #[arg(long)]
    http_port: Option<u16>,

    /// JSON snapshot file
    #[arg(long)]
    data_file: Option<String>,

    /// Seconds between subscription status checks (0 disables)
    #[arg(long)]
    subscription_check_secs: Option<u64>,
}

impl From<ServeArgs> for CliOverrides {
    fn from(args: ServeArgs) -> Self {
        CliOverrides {
            http_host: args.http_host,
            http_port: args.http_port,
            data_file: args.data_file,
            subscription_check_secs: args.subscription_check_secs,
        }
    }
}

fn load_config(args: ServeArgs) -> anyhow::Result<ServerConfig> {
    let base = match &args.config {
        Some(path) => ServerConfig::from_yaml_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => ServerConfig::from_env()?,
    };
    Ok(base.with_overrides(args.into())?)
}

fn data_file_config(data_file: Option<String>) -> anyhow::Result<ServerConfig> {
    load_config(ServeArgs {
        data_file,
        ..Default::default()
    })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        None => server::run_with_config(load_config(cli.serve)?).await,
        Some(Command::Serve(args)) => server::run_with_config(load_config(args)?).await,
        Some(Command::Setup { root, data_file }) => {
            let report = setup::run(&root, data_file.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Some(Command::Seed { data_file, demo }) => {
            let config = data_file_config(data_file)?;
            let store = Store::open(&config.data_file)?;
            let now = Utc::now();
            let admin = AdminCredentials::from_env().username;
            let report = store
                .write(|t| {
                    let mut report = seed::seed_all(t, now);
                    if demo {
                        report.absorb(seed::seed_demo(t, &admin, now)?);
                    }
                    Ok::<_, SetupError>(report)
                })
                .await?;
            println!("Seeded {} records into {}", report.total(), config.data_file);
            Ok(())
        }
        Some(Command::CheckSubscriptions { data_file }) => {
            let config = data_file_config(data_file)?;
            let store = Store::open(&config.data_file)?;
            let report = store
                .write(|t| {
                    Ok::<_, StoreError>(subscriptions::check_subscription_status(t, Utc::now()))
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    println!("\nSmart Kuku v{}\n", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
