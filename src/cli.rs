//! Command-line interface definition for SQLBot
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for managing sessions and chatting with the service.

use clap::{Parser, Subcommand};

/// SQLBot - ask questions about your databases in plain language
///
/// Manages chat sessions on a SQLBot server and renders the generated SQL,
/// query results and analysis in the terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the API base URL (e.g. http://localhost:8080/api)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for SQLBot
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List chat sessions
    Sessions,

    /// Create a new chat session
    New {
        /// Data source the session queries (defaults to chat.default_data_source_id)
        #[arg(short, long)]
        data_source: Option<i64>,

        /// Session title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Show the messages of a session
    Show {
        /// Session identifier
        session: String,
    },

    /// Ask a single question in an existing session
    Ask {
        /// Session identifier
        session: String,

        /// Question text
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Delete a session and its messages
    Delete {
        /// Session identifier
        session: String,
    },

    /// Inspect the data sources sessions can be bound to
    #[command(visible_alias = "datasources")]
    Datasource {
        /// Data source subcommand
        #[command(subcommand)]
        command: DataSourceCommand,
    },

    /// Start an interactive chat
    Chat {
        /// Resume an existing session
        #[arg(short, long, conflicts_with = "data_source")]
        session: Option<String>,

        /// Start a new session on this data source
        #[arg(short, long)]
        data_source: Option<i64>,

        /// Title for the new session
        #[arg(short, long)]
        title: Option<String>,
    },
}

/// Data source subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum DataSourceCommand {
    /// List data sources
    List,

    /// Show one data source
    Show {
        /// Data source identifier
        id: i64,
    },

    /// Test the connection to a data source
    Test {
        /// Data source identifier
        id: i64,
    },

    /// Re-read the schema of a data source
    SyncSchema {
        /// Data source identifier
        id: i64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            api_url: None,
            command: Commands::Sessions,
        }
    }
}
