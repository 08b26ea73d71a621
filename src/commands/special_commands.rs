//! Special commands parser for interactive chat mode
//!
//! Special commands manage sessions from inside the chat loop instead of
//! being sent to the assistant. Commands are prefixed with `/`; the command
//! word is case-insensitive, its arguments are kept as typed.

use colored::Colorize;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unusable argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Refresh and list sessions
    ListSessions,

    /// Create a session and switch to it
    ///
    /// Without a data source the configured default is used.
    NewSession {
        /// Data source id
        data_source_id: Option<i64>,
        /// Title, everything after the data source id
        title: Option<String>,
    },

    /// Switch to another session and load its messages
    Switch(String),

    /// Delete a session
    Delete(String),

    /// Print the active session's messages again
    History,

    /// Show the active session and store status
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent to the assistant.
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not a valid command.
/// Returns `CommandError::UnsupportedArgument` if a command receives an invalid argument.
/// Returns `CommandError::MissingArgument` if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use sqlbot::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(
///     parse_special_command("/switch 4f1c").unwrap(),
///     SpecialCommand::Switch("4f1c".to_string())
/// );
/// assert_eq!(
///     parse_special_command("how many orders today?").unwrap(),
///     SpecialCommand::None
/// );
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Ok(match trimmed.to_lowercase().as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (trimmed, ""),
    };

    match word.to_lowercase().as_str() {
        "/sessions" | "/ls" => Ok(SpecialCommand::ListSessions),
        "/new" => parse_new(rest),
        "/switch" | "/open" => {
            required_argument("/switch", "/switch <session-id>", rest).map(SpecialCommand::Switch)
        }
        "/delete" | "/rm" => {
            required_argument("/delete", "/delete <session-id>", rest).map(SpecialCommand::Delete)
        }
        "/history" => Ok(SpecialCommand::History),
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" | "/q" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(word.to_string())),
    }
}

fn required_argument(command: &str, usage: &str, arg: &str) -> Result<String, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        });
    }
    if arg.split_whitespace().count() > 1 {
        return Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        });
    }
    Ok(arg.to_string())
}

fn parse_new(rest: &str) -> Result<SpecialCommand, CommandError> {
    if rest.is_empty() {
        return Ok(SpecialCommand::NewSession {
            data_source_id: None,
            title: None,
        });
    }

    let (id, title) = match rest.split_once(char::is_whitespace) {
        Some((id, title)) => (id, Some(title.trim().to_string())),
        None => (rest, None),
    };
    let data_source_id = id
        .parse::<i64>()
        .map_err(|_| CommandError::UnsupportedArgument {
            command: "/new".to_string(),
            arg: id.to_string(),
        })?;

    Ok(SpecialCommand::NewSession {
        data_source_id: Some(data_source_id),
        title: title.filter(|t| !t.is_empty()),
    })
}

/// Print help for the special commands
pub fn print_help() {
    println!("\n{}", "Session commands:".bold());
    println!("  /sessions                     List sessions (alias: /ls)");
    println!("  /new [data-source-id] [title] Start a new session");
    println!("  /switch <session-id>          Switch session and load its messages");
    println!("  /delete <session-id>          Delete a session (alias: /rm)");
    println!("  /history                      Show the active session's messages");
    println!("  /status                       Show the active session");
    println!("  /help                         Show this help");
    println!("  /exit                         Leave the chat (also: exit, quit, /q)");
    println!("\nAnything else is sent as a question to the active session.\n");
}
