//! `csm` binary entry point.

use std::process::ExitCode;

use clap::Parser;

use camera_service_monitor::cli_app::{self, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli_app::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("csm: {err}");
            ExitCode::FAILURE
        }
    }
}
