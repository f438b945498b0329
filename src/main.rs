mod app;

use std::process::ExitCode;

use clap::Parser;
use log::error;

use app::{cli, config::Args};

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if !args.commands.is_empty() {
        return cli::run_batch(&args);
    }

    match cli::run_cli(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Terminal error: {}", err);
            ExitCode::FAILURE
        }
    }
}
