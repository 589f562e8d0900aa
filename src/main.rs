use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use relimport::cli::commands;
use relimport::cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let outcome = commands::run(&cli, &cwd)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(outcome.stdout.as_bytes())?;
    if !outcome.stdout.is_empty() && !outcome.stdout.ends_with('\n') {
        writeln!(stdout)?;
    }
    stdout.flush()?;

    if outcome.exit_code != 0 {
        std::process::exit(outcome.exit_code);
    }

    Ok(())
}
