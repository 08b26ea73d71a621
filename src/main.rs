//! SQLBot - conversational SQL client
//!
#![doc = "Main entry point for the SQLBot command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sqlbot::cli::{Cli, Commands, DataSourceCommand};
use sqlbot::commands::{self, chat::ChatStart};
use sqlbot::config::Config;
use sqlbot::store::metrics::init_metrics_exporter;
use sqlbot::{HttpSessionApi, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);
    init_metrics_exporter();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    let api = HttpSessionApi::new(&config.api)?;
    tracing::debug!("Using API at {}", api.base_url());

    match cli.command {
        Commands::Sessions => {
            let store = SessionStore::new(api);
            commands::sessions::list_sessions(&store).await?;
        }
        Commands::New { data_source, title } => {
            let store = SessionStore::new(api);
            commands::sessions::create_session(&store, &config.chat, data_source, title.as_deref())
                .await?;
        }
        Commands::Show { session } => {
            let store = SessionStore::new(api);
            commands::sessions::show_session(&store, &config.chat, &session).await?;
        }
        Commands::Ask { session, question } => {
            let store = SessionStore::new(api);
            commands::sessions::ask(&store, &config.chat, &session, &question.join(" ")).await?;
        }
        Commands::Delete { session } => {
            let store = SessionStore::new(api);
            commands::sessions::delete_session(&store, &session).await?;
        }
        Commands::Datasource { command } => match command {
            DataSourceCommand::List => commands::data_sources::list_data_sources(&api).await?,
            DataSourceCommand::Show { id } => {
                commands::data_sources::show_data_source(&api, id).await?
            }
            DataSourceCommand::Test { id } => {
                commands::data_sources::test_data_source(&api, id).await?
            }
            DataSourceCommand::SyncSchema { id } => {
                commands::data_sources::sync_schema(&api, id).await?
            }
        },
        Commands::Chat {
            session,
            data_source,
            title,
        } => {
            tracing::info!("Starting interactive chat mode");
            if let Some(s) = &session {
                tracing::debug!("Resuming session: {}", s);
            }
            let store = SessionStore::new(api);
            let start = ChatStart {
                session,
                data_source,
                title,
            };
            commands::chat::run_chat(&store, &config.chat, start).await?;
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins over the `-v` flag.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "sqlbot=debug" } else { "sqlbot=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
