//! Command-line argument parsing for the blogdesk CLI.
//!
//! This module handles parsing command-line arguments and determining
//! which CLI command to execute.

use thiserror::Error;

/// Usage text printed by `--help` and on parse errors.
pub const USAGE: &str = "\
Usage: blogdesk [-v] <command>

Commands:
  login <access-token> [--refresh <token>] [--subject <id>] [--username <name>]
                 Store a freshly issued session
  status         Show the persisted session
  refresh        Renew the session if it is expiring soon
  logout         Remove the session
  watch          Keep the session fresh until interrupted

Options:
  -v, --verbose  Debug logging
  -V, --version  Print version
  -h, --help     Print this help";

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Install tokens issued by the login flow
    Login {
        access_token: String,
        refresh_token: Option<String>,
        subject: Option<String>,
        username: Option<String>,
    },
    /// Show the current session
    Status,
    /// Renew if expiring soon
    Refresh,
    /// Sign out
    Logout,
    /// Run the background scheduler in the foreground
    Watch,
}

/// Command plus global flags.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub command: CliCommand,
    pub verbose: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error("no command given")]
    MissingCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error("'{0}' needs a value")]
    MissingValue(String),
    #[error("login needs an access token")]
    MissingAccessToken,
}

/// Parse command-line arguments.
///
/// The first item is the program name and is skipped.
///
/// # Examples
///
/// ```
/// use blogdesk::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["blogdesk".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()).unwrap().command, CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> Result<CliArgs, ArgsError>
where
    I: Iterator<Item = String>,
{
    let mut verbose = false;
    let mut rest = Vec::new();

    for arg in args.skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                return Ok(CliArgs {
                    command: CliCommand::Version,
                    verbose,
                })
            }
            "--help" | "-h" => {
                return Ok(CliArgs {
                    command: CliCommand::Help,
                    verbose,
                })
            }
            "--verbose" | "-v" => verbose = true,
            _ => rest.push(arg),
        }
    }

    let mut rest = rest.into_iter();
    let name = rest.next().ok_or(ArgsError::MissingCommand)?;
    let command = match name.as_str() {
        "login" => parse_login(rest)?,
        "status" => no_more_args(rest, CliCommand::Status)?,
        "refresh" => no_more_args(rest, CliCommand::Refresh)?,
        "logout" => no_more_args(rest, CliCommand::Logout)?,
        "watch" => no_more_args(rest, CliCommand::Watch)?,
        "help" => CliCommand::Help,
        _ => return Err(ArgsError::UnknownCommand(name)),
    };

    Ok(CliArgs { command, verbose })
}

fn parse_login<I>(mut args: I) -> Result<CliCommand, ArgsError>
where
    I: Iterator<Item = String>,
{
    let mut access_token = None;
    let mut refresh_token = None;
    let mut subject = None;
    let mut username = None;

    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--refresh" => &mut refresh_token,
            "--subject" => &mut subject,
            "--username" => &mut username,
            flag if flag.starts_with("--") => {
                return Err(ArgsError::UnexpectedArgument(arg));
            }
            _ if access_token.is_none() => {
                access_token = Some(arg);
                continue;
            }
            _ => return Err(ArgsError::UnexpectedArgument(arg)),
        };
        *slot = Some(args.next().ok_or(ArgsError::MissingValue(arg))?);
    }

    Ok(CliCommand::Login {
        access_token: access_token.ok_or(ArgsError::MissingAccessToken)?,
        refresh_token,
        subject,
        username,
    })
}

fn no_more_args<I>(mut args: I, command: CliCommand) -> Result<CliCommand, ArgsError>
where
    I: Iterator<Item = String>,
{
    match args.next() {
        Some(extra) => Err(ArgsError::UnexpectedArgument(extra)),
        None => Ok(command),
    }
}
