//! Version and help output.

use super::args::USAGE;

/// The current version of blogdesk, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version_line() -> String {
    format!("blogdesk {}", VERSION)
}

/// Handle the --version command.
pub fn handle_version_command() {
    println!("{}", version_line());
}

/// Handle --help.
pub fn handle_help_command() {
    println!("{}\n\n{}", version_line(), USAGE);
}
