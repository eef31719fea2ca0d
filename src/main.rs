//! Binary entry point for `hmtester`.
//!
//! The run logic lives in [`hmtester::app`]; this binary parses arguments,
//! installs logging, and prints the report.

#![expect(clippy::print_stdout, reason = "the report is the program's output")]
#![expect(clippy::print_stderr, reason = "fatal errors are reported on stderr")]

use std::process::ExitCode;

use clap::{CommandFactory, Parser, error::ContextKind};
use hmtester::{
    app,
    cli::{Cli, load_config, normalize_args},
    logging,
};

/// Status for malformed arguments, matching clap's own.
const USAGE_EXIT: u8 = 2;

fn main() -> ExitCode {
    let args = normalize_args(std::env::args_os());
    if let Err(err) = Cli::try_parse_from(&args) {
        if !err.use_stderr() {
            err.exit();
        }
        // Value errors carry no usage line of their own.
        eprint!("{err}");
        if err.get(ContextKind::Usage).is_none() {
            eprintln!("\n{}", Cli::command().render_usage());
        }
        return ExitCode::from(USAGE_EXIT);
    }

    let outcome = load_config(&args).and_then(|config| {
        logging::init()?;
        app::run(&config)
    });
    match outcome {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("hmtester: {err:#}");
            ExitCode::FAILURE
        }
    }
}
