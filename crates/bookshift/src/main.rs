//! bookshift: move books between uploaders on a Parse Server
//!
//! Main binary with subcommands:
//! - `migrate`: list, preview and apply named migrations
//! - `bulk-update`: transfer every book of the old uploader to the new one
//! - `fix-acl`: repair write access on books already transferred

use bookshift_parse::ParseClient;
use clap::{Parser, Subcommand};
use miette::Result;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod migrate;

use config::{Config, ConnectionArgs};
use migrate::MigrateOptions;

#[derive(Parser)]
#[command(name = "bookshift")]
#[command(about = "Transfer book ownership between Parse users", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run data migrations
    Migrate {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Migration name to run
        #[arg(value_name = "MIGRATION")]
        migration: Option<String>,

        /// List available migrations
        #[arg(long)]
        list: bool,

        /// Preview changes without applying (dry-run)
        #[arg(long)]
        dry_run: bool,

        /// Run all pending migrations
        #[arg(long)]
        all: bool,

        /// Leave base URLs untouched
        #[arg(long)]
        no_base_url_rewrite: bool,
    },

    /// Transfer every book from the old uploader to the new one
    BulkUpdate {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Preview changes without applying (dry-run)
        #[arg(long)]
        dry_run: bool,

        /// Leave base URLs untouched
        #[arg(long)]
        no_base_url_rewrite: bool,
    },

    /// Revoke the old uploader's write access on transferred books
    FixAcl {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Preview changes without applying (dry-run)
        #[arg(long)]
        dry_run: bool,
    },
}

impl Commands {
    fn into_parts(self) -> (ConnectionArgs, MigrateOptions) {
        match self {
            Commands::Migrate {
                connection,
                migration,
                list,
                dry_run,
                all,
                no_base_url_rewrite,
            } => (
                connection,
                MigrateOptions {
                    migration,
                    list,
                    dry_run,
                    all,
                    rewrite_base_url: !no_base_url_rewrite,
                },
            ),
            Commands::BulkUpdate {
                connection,
                dry_run,
                no_base_url_rewrite,
            } => (
                connection,
                MigrateOptions {
                    migration: Some("transfer-ownership".to_string()),
                    dry_run,
                    rewrite_base_url: !no_base_url_rewrite,
                    ..MigrateOptions::default()
                },
            ),
            Commands::FixAcl {
                connection,
                dry_run,
            } => (
                connection,
                MigrateOptions {
                    migration: Some("repair-acl".to_string()),
                    dry_run,
                    ..MigrateOptions::default()
                },
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Settings from a `.env` file; variables already set take precedence.
    let env_file = dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "bookshift=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = env_file {
        debug!(path = %path.display(), "loaded environment file");
    }

    let cli = Cli::parse();
    let (connection, options) = cli.command.into_parts();

    let config = Config::from_args(connection).map_err(|e| miette::miette!("{}", e))?;
    info!(
        server_url = %config.server_url,
        old_uploader = %config.old_uploader_id,
        new_uploader = %config.new_uploader_id,
        "loaded configuration"
    );

    let mut client =
        ParseClient::new(&config.server_url, &config.app_id).map_err(|e| miette::miette!("{}", e))?;
    if let Some(key) = &config.rest_api_key {
        client = client.with_rest_api_key(key);
    }

    migrate::run_migrate_command(&client, &config, &options).await
}
