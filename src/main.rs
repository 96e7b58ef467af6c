use std::process::ExitCode;

use log::error;

use piko_poll::options::Options;

#[tokio::main]
async fn main() -> ExitCode {
    // clap exits with its own code (2) on missing or malformed arguments.
    let options = Options::new();
    piko_poll::init_logging(options.verbosity);

    match piko_poll::app(options).await {
        Ok(()) => {
            // The scripting contract inherited from the original tool:
            // a clean run prints 0 on stdout.
            println!("0");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
