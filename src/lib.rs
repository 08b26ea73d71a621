//! SQLBot - conversational SQL client library
//!
//! This library provides the client side of SQLBot: the remote session API,
//! the session store that keeps the active conversation consistent while
//! calls overlap, and the command handlers behind the `sqlbot` binary.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: Wire types, the `SessionApi` contract and its HTTP implementation
//! - `store`: Session store, its state and remote call metrics
//! - `commands`: CLI handlers, interactive chat and terminal rendering
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use sqlbot::{Config, HttpSessionApi, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let store = SessionStore::new(HttpSessionApi::new(&config.api)?);
//!     let session = store.create_session(1, Some("Sales")).await?;
//!     store.send_message("top 5 products by revenue").await;
//!     println!("{} messages in {}", store.messages().len(), session.id);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod store;

// Re-export commonly used types
pub use api::{HttpSessionApi, SessionApi};
pub use config::Config;
pub use error::{Result, SqlbotError};
pub use store::{LoadOutcome, SendOutcome, SessionStore};

#[cfg(test)]
pub mod test_utils;
