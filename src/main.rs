// Headless entry point.  The interactive engine lives in the library; this
// binary drives it from command-line flags.

use std::process::ExitCode;

use clap::Parser;

use pixlift::cli::{self, CliArgs};

fn main() -> ExitCode {
    cli::run(CliArgs::parse())
}
