//! CLI module for blogdesk.
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing
//! - Version and help display
//! - Session commands backed by [`crate::session::SessionManager`]
//!
//! # Usage
//!
//! ```ignore
//! use blogdesk::cli::{parse_args, run_cli_command};
//!
//! let args = parse_args(std::env::args())?;
//! run_cli_command(args.command).await?;
//! ```

pub mod args;
pub mod session;
pub mod version;

pub use args::{parse_args, ArgsError, CliArgs, CliCommand, USAGE};
pub use version::{handle_help_command, handle_version_command, VERSION};

use color_eyre::Result;

use crate::config::SessionConfig;
use crate::session::SessionManager;

/// Run a parsed command.
///
/// Session commands build a [`SessionManager`] from the environment.
pub async fn run_cli_command(command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => {
            handle_version_command();
            Ok(())
        }
        CliCommand::Help => {
            handle_help_command();
            Ok(())
        }
        command => {
            let manager = SessionManager::from_config(SessionConfig::from_env())?;
            run_session_command(&manager, command).await
        }
    }
}

/// Run a session command against an existing manager.
pub async fn run_session_command(manager: &SessionManager, command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Login {
            access_token,
            refresh_token,
            subject,
            username,
        } => {
            session::handle_login_command(manager, access_token, refresh_token, subject, username)
        }
        CliCommand::Status => session::handle_status_command(manager).await,
        CliCommand::Refresh => session::handle_refresh_command(manager).await,
        CliCommand::Logout => session::handle_logout_command(manager),
        CliCommand::Watch => session::handle_watch_command(manager).await,
        CliCommand::Version => {
            handle_version_command();
            Ok(())
        }
        CliCommand::Help => {
            handle_help_command();
            Ok(())
        }
    }
}
