use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod input;
mod retry;

use cli::{Cli, Command};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("grubcount_core={}", level).parse()?)
                .add_directive(format!("grubcount={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Watch(args) => commands::watch::run(args),
        Command::Once { process } => commands::once::run(process, cli.verbose),
        Command::Save { file, dir } => commands::save::run(file, dir),
    }
}
