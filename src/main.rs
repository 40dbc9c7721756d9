use blogdesk::cli::{parse_args, run_cli_command, USAGE};
use blogdesk::logging;

use color_eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = match parse_args(std::env::args()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    logging::init_tracing(args.verbose);
    run_cli_command(args.command).await
}
