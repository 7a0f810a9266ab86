//! Parsing of terminal input lines into client commands.
//!
//! A line starting with `/` is a command; anything else is chat text.

use chat_core::domain::names::is_valid_identifier;
use thiserror::Error;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        identifier: String,
        password: String,
        host: String,
        port: u16,
    },
    Logout,
    JoinSession(String),
    LeaveSession,
    CreateSession(String),
    List,
    Quit,
    /// Bare text to send to the current session.
    Text(String),
}

/// Input that could not be turned into a [`Command`].
///
/// The `Display` text is what the user sees after `[warning]: `.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty input")]
    Empty,
    #[error("Usage: /login <client ID> <password> <server-IP> <server-port>")]
    LoginUsage,
    #[error("Invalid client ID {0:?}.")]
    InvalidIdentifier(String),
    #[error("Usage: /joinsession <session ID>")]
    JoinUsage,
    #[error("Usage: /createsession <session ID>")]
    CreateUsage,
    #[error(
        "Use one of the following commands: /login, /logout, /joinsession, \
         /leavesession, /createsession, /list, /quit"
    )]
    Unknown(String),
}

impl Command {
    /// Parses one input line (without its terminator).
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] describing the expected usage.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(CommandError::Empty);
        }
        if !line.starts_with('/') {
            return Ok(Command::Text(line.to_string()));
        }

        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match name {
            "/login" => parse_login(&args),
            "/logout" => Ok(Command::Logout),
            "/joinsession" => match args.first() {
                Some(session) => Ok(Command::JoinSession((*session).to_string())),
                None => Err(CommandError::JoinUsage),
            },
            "/leavesession" => Ok(Command::LeaveSession),
            "/createsession" => match args.first() {
                Some(session) => Ok(Command::CreateSession((*session).to_string())),
                None => Err(CommandError::CreateUsage),
            },
            "/list" => Ok(Command::List),
            "/quit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_login(args: &[&str]) -> Result<Command, CommandError> {
    let [identifier, password, host, port, ..] = args else {
        return Err(CommandError::LoginUsage);
    };
    let port: u16 = port.parse().map_err(|_| CommandError::LoginUsage)?;
    if !is_valid_identifier(identifier) {
        return Err(CommandError::InvalidIdentifier((*identifier).to_string()));
    }
    Ok(Command::Login {
        identifier: (*identifier).to_string(),
        password: (*password).to_string(),
        host: (*host).to_string(),
        port,
    })
}
