/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `sessions`: one-shot commands over the session store
- `data_sources`: listing, inspecting and checking data sources
- `chat`: the interactive chat loop

Session handlers drive a [`SessionStore`] and print through [`render`].
*/

use crate::api::{HttpSessionApi, Session, SessionApi};
use crate::config::ChatConfig;
use crate::error::{Result, SqlbotError};
use crate::store::{LoadOutcome, SendOutcome, SessionStore};
use colored::Colorize;

// Terminal rendering helpers
pub mod render;

// Special commands parser for the chat loop
pub mod special_commands;

/// Picks the data source for a new session
///
/// An explicit id wins over `chat.default_data_source_id`.
///
/// # Errors
///
/// Returns `SqlbotError::Command` if neither is set.
pub fn resolve_data_source(explicit: Option<i64>, chat: &ChatConfig) -> Result<i64> {
    explicit
        .or(chat.default_data_source_id)
        .ok_or_else(|| {
            SqlbotError::Command(
                "No data source given; pass --data-source or set chat.default_data_source_id"
                    .to_string(),
            )
            .into()
        })
}

fn resolve_title<'a>(explicit: Option<&'a str>, chat: &'a ChatConfig) -> Option<&'a str> {
    explicit.or(chat.default_title.as_deref())
}

// One-shot session commands
pub mod sessions {
    //! Handlers for the non-interactive subcommands.

    use super::*;

    /// List sessions
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the list cannot be fetched.
    pub async fn list_sessions<A: SessionApi>(store: &SessionStore<A>) -> Result<()> {
        if !store.refresh_sessions().await {
            return Err(SqlbotError::Remote("could not list sessions".to_string()).into());
        }
        println!("\nSessions:");
        print!(
            "{}",
            render::format_session_table(&store.sessions(), store.active_session_id().as_deref())
        );
        println!();
        Ok(())
    }

    /// Create a session and print its id
    ///
    /// # Errors
    ///
    /// Returns error if no data source can be resolved or the create call fails
    pub async fn create_session<A: SessionApi>(
        store: &SessionStore<A>,
        chat: &ChatConfig,
        data_source: Option<i64>,
        title: Option<&str>,
    ) -> Result<Session> {
        let data_source_id = resolve_data_source(data_source, chat)?;
        let session = store
            .create_session(data_source_id, resolve_title(title, chat))
            .await?;
        println!(
            "{} {} ({})",
            "Created session".green(),
            session.id.cyan(),
            session.title
        );
        Ok(session)
    }

    /// Print every message of a session
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the messages cannot be fetched.
    pub async fn show_session<A: SessionApi>(
        store: &SessionStore<A>,
        chat: &ChatConfig,
        session_id: &str,
    ) -> Result<()> {
        match store.select_session(session_id).await? {
            LoadOutcome::Applied { count: 0 } => {
                println!("{}", "This session has no messages yet.".yellow());
            }
            LoadOutcome::Applied { .. } => {
                for message in store.messages() {
                    println!("{}", render::format_message(&message, chat));
                }
            }
            LoadOutcome::Superseded => {
                tracing::debug!(session_id, "Selection superseded before display");
            }
        }
        Ok(())
    }

    /// Ask one question in an existing session and print the reply
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the session cannot be loaded or the
    /// question cannot be delivered. The synthesized failure message is
    /// printed before the error is returned.
    pub async fn ask<A: SessionApi>(
        store: &SessionStore<A>,
        chat: &ChatConfig,
        session_id: &str,
        question: &str,
    ) -> Result<()> {
        if question.trim().is_empty() {
            return Err(SqlbotError::Command("Question cannot be empty".to_string()).into());
        }

        store.select_session(session_id).await?;
        match store.send_message(question.trim()).await {
            SendOutcome::Replied(reply) => {
                println!("{}", render::format_message(&reply, chat));
                Ok(())
            }
            SendOutcome::Failed(diagnostic) => {
                if let Some(failure) = store.messages().last() {
                    println!("{}", render::format_message(failure, chat));
                }
                Err(SqlbotError::Remote(diagnostic).into())
            }
            SendOutcome::NoActiveSession | SendOutcome::Superseded => Err(SqlbotError::Command(
                format!("Session {} is no longer active", session_id),
            )
            .into()),
        }
    }

    /// Delete a session
    ///
    /// The list is refreshed first so unknown ids can be reported; the delete
    /// is still attempted since the server is authoritative.
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the delete call fails.
    pub async fn delete_session<A: SessionApi>(
        store: &SessionStore<A>,
        session_id: &str,
    ) -> Result<()> {
        if store.refresh_sessions().await && !store.sessions().iter().any(|s| s.id == session_id)
        {
            tracing::warn!(session_id, "Deleting a session that is not in the session list");
        }
        store.delete_session(session_id).await?;
        println!("{}", format!("Deleted session {}", session_id).green());
        Ok(())
    }

}

// Data source commands
pub mod data_sources {
    //! Handlers for the `datasource` subcommands.
    //!
    //! Data sources are managed on the server; the client can list and
    //! inspect them and trigger a connection test or a schema sync.

    use super::*;
    use crate::api::OperationStatus;

    /// List the data sources sessions can be created on
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the list cannot be fetched.
    pub async fn list_data_sources(api: &HttpSessionApi) -> Result<()> {
        let data_sources = api
            .list_data_sources()
            .await
            .map_err(SqlbotError::remote)?;
        println!("\nData sources:");
        print!("{}", render::format_data_source_table(&data_sources));
        println!();
        println!(
            "Use {} to start a session.",
            "sqlbot new --data-source <ID>".cyan()
        );
        println!();
        Ok(())
    }

    /// Show one data source
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the data source cannot be fetched.
    pub async fn show_data_source(api: &HttpSessionApi, id: i64) -> Result<()> {
        let data_source = api.get_data_source(id).await.map_err(SqlbotError::remote)?;
        println!();
        print!("{}", render::format_data_source_details(&data_source));
        println!();
        Ok(())
    }

    /// Test the connection of a data source
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the call fails or the server could
    /// not connect.
    pub async fn test_data_source(api: &HttpSessionApi, id: i64) -> Result<()> {
        let status = api.test_data_source(id).await.map_err(SqlbotError::remote)?;
        report(status, "Connection OK")
    }

    /// Synchronise the schema of a data source
    ///
    /// # Errors
    ///
    /// Returns `SqlbotError::Remote` if the call fails or the sync did not
    /// succeed.
    pub async fn sync_schema(api: &HttpSessionApi, id: i64) -> Result<()> {
        let status = api
            .sync_data_source_schema(id)
            .await
            .map_err(SqlbotError::remote)?;
        report(status, "Schema synced")
    }

    fn report(status: OperationStatus, fallback: &str) -> Result<()> {
        let message = if status.message.is_empty() {
            fallback.to_string()
        } else {
            status.message
        };
        if status.success {
            println!("{}", message.green());
            Ok(())
        } else {
            Err(SqlbotError::Remote(message).into())
        }
    }

}

// Interactive chat handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Runs a readline loop over a [`SessionStore`]. Slash commands manage
    //! sessions; any other input is sent as a question to the active session.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// How the chat loop picks its first session
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ChatStart {
        /// Resume this session
        pub session: Option<String>,
        /// Otherwise create a session on this data source
        pub data_source: Option<i64>,
        /// Title for a created session
        pub title: Option<String>,
    }

    /// Start interactive chat mode
    ///
    /// # Errors
    ///
    /// Returns error if the line editor cannot be initialized. Failures of
    /// individual commands are printed and the loop continues.
    pub async fn run_chat<A: SessionApi>(
        store: &SessionStore<A>,
        chat: &ChatConfig,
        start: ChatStart,
    ) -> Result<()> {
        let mut rl = DefaultEditor::new().map_err(SqlbotError::Readline)?;

        print_welcome_banner();
        if let Err(e) = open_initial_session(store, chat, start).await {
            print_error(&e);
        }

        loop {
            match rl.readline(&format_prompt(store)) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)
                        .map_err(SqlbotError::Readline)?;

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", e.to_string().red());
                            continue;
                        }
                    };

                    let keep_going = match command {
                        SpecialCommand::None => {
                            ask_active(store, chat, trimmed).await;
                            true
                        }
                        other => match handle_special_command(store, chat, other).await {
                            Ok(keep_going) => keep_going,
                            Err(e) => {
                                print_error(&e);
                                true
                            }
                        },
                    };
                    if !keep_going {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Loads the session list and opens the starting session, if any
    ///
    /// # Errors
    ///
    /// Returns error if the requested session cannot be opened
    pub async fn open_initial_session<A: SessionApi>(
        store: &SessionStore<A>,
        chat: &ChatConfig,
        start: ChatStart,
    ) -> Result<()> {
        store.refresh_sessions().await;

        if let Some(session_id) = start.session {
            store.select_session(&session_id).await?;
            print_history(store, chat);
            return Ok(());
        }

        if start.data_source.is_some() || chat.default_data_source_id.is_some() {
            let data_source_id = resolve_data_source(start.data_source, chat)?;
            let session = store
                .create_session(data_source_id, resolve_title(start.title.as_deref(), chat))
                .await?;
            println!("Started session {} ({})\n", session.id.cyan(), session.title);
            return Ok(());
        }

        println!(
            "{}",
            "No active session. Use /new <data-source-id> or /switch <session-id>.\n".yellow()
        );
        Ok(())
    }

    /// Executes a special command
    ///
    /// Returns `false` when the loop should exit.
    ///
    /// # Errors
    ///
    /// Returns error if the command's remote call fails
    pub async fn handle_special_command<A: SessionApi>(
        store: &SessionStore<A>,
        chat: &ChatConfig,
        command: SpecialCommand,
    ) -> Result<bool> {
        match command {
            SpecialCommand::ListSessions => {
                if !store.refresh_sessions().await {
                    println!("{}", "Could not refresh sessions; showing the last known list.".yellow());
                }
                print!(
                    "{}",
                    render::format_session_table(
                        &store.sessions(),
                        store.active_session_id().as_deref()
                    )
                );
            }
            SpecialCommand::NewSession {
                data_source_id,
                title,
            } => {
                let data_source_id = resolve_data_source(data_source_id, chat)?;
                let session = store
                    .create_session(data_source_id, resolve_title(title.as_deref(), chat))
                    .await?;
                println!("Switched to new session {} ({})\n", session.id.cyan(), session.title);
            }
            SpecialCommand::Switch(session_id) => {
                if let LoadOutcome::Applied { count } = store.select_session(&session_id).await? {
                    println!("Switched to session {} ({} messages)\n", session_id.cyan(), count);
                    print_history(store, chat);
                }
            }
            SpecialCommand::Delete(session_id) => {
                store.delete_session(&session_id).await?;
                println!("{}", format!("Deleted session {}", session_id).green());
                if store.active_session_id().is_none() {
                    println!(
                        "{}",
                        "No active session. Use /new or /switch to continue.".yellow()
                    );
                }
            }
            SpecialCommand::History => print_history(store, chat),
            SpecialCommand::ShowStatus => print_status_display(store),
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit => return Ok(false),
            SpecialCommand::None => {}
        }
        Ok(true)
    }

    /// Sends a question to the active session and prints the outcome
    pub async fn ask_active<A: SessionApi>(
        store: &SessionStore<A>,
        chat: &ChatConfig,
        question: &str,
    ) -> SendOutcome {
        let outcome = store.send_message(question).await;
        match &outcome {
            SendOutcome::NoActiveSession => {
                println!(
                    "{}",
                    "No active session. Use /new <data-source-id> or /switch <session-id>.".yellow()
                );
            }
            SendOutcome::Replied(reply) => println!("{}", render::format_message(reply, chat)),
            SendOutcome::Failed(_) => {
                if let Some(failure) = store.messages().last() {
                    println!("{}", render::format_message(failure, chat));
                }
            }
            SendOutcome::Superseded => {
                println!("{}", "(reply arrived after switching sessions)".dimmed());
            }
        }
        outcome
    }

    fn print_error(err: &anyhow::Error) {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
    }

    fn format_prompt<A: SessionApi>(store: &SessionStore<A>) -> String {
        match store.active_session() {
            Some(session) => format!("[{}] >> ", session.title.cyan()),
            None => match store.active_session_id() {
                Some(id) => format!("[{}] >> ", id.cyan()),
                None => format!("[{}] >> ", "no session".dimmed()),
            },
        }
    }

    fn print_history<A: SessionApi>(store: &SessionStore<A>, chat: &ChatConfig) {
        let messages = store.messages();
        if messages.is_empty() {
            println!("{}", "No messages yet.".dimmed());
            return;
        }
        for message in &messages {
            println!("{}", render::format_message(message, chat));
        }
    }

    fn print_welcome_banner() {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║            SQLBot Interactive Chat - Welcome!                ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Ask questions about your data in plain language.");
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    fn print_status_display<A: SessionApi>(store: &SessionStore<A>) {
        let state = store.snapshot();
        let pending = state.entries().iter().filter(|e| e.is_pending()).count();

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     SQLBot Session Status                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        match state.active_session() {
            Some(session) => println!(
                "Active Session:    {} ({}, data source {})",
                session.id.cyan(),
                session.title,
                session.data_source_id
            ),
            None => println!(
                "Active Session:    {}",
                state.active_session_id().unwrap_or("none")
            ),
        }
        println!("Messages:          {}", state.entries().len());
        println!("Pending Messages:  {}", pending);
        println!("Known Sessions:    {}", state.sessions().len());
        println!(
            "Busy:              {}",
            if state.is_busy() { "yes".yellow() } else { "no".green() }
        );
        println!();
    }

}
