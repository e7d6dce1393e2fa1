mod cli;
mod config;
mod core;
mod repl;
mod tui;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use crate::cli::{Cli, Commands, Outcome};
use crate::config::{init_logging, Config, LogTarget};
use crate::core::error::BlancError;
use crate::core::store::{demo_jobs, JobStore, JsonJobStore, MemoryJobStore};

fn open_store(cli: &Cli, config: &Config) -> Box<dyn JobStore> {
    if cli.demo {
        return Box::new(MemoryJobStore::new(demo_jobs()));
    }
    let path = cli.store.clone().unwrap_or_else(|| config.store.path.clone());
    let store = JsonJobStore::new(path);
    debug!(path = %store.path().display(), "using json job store");
    Box::new(store)
}

fn run(cli: Cli) -> Result<Outcome, BlancError> {
    let config = Config::load(&cli.config)?;

    let target = match cli.command {
        None | Some(Commands::Board) => LogTarget::FileOnly,
        _ => LogTarget::Stderr,
    };
    init_logging(&config.log, cli.verbose, target)?;
    let store = open_store(&cli, &config);

    match cli.command {
        None | Some(Commands::Board) => tui::run(store.as_ref()).map(|_| Outcome::Done),
        Some(Commands::Repl) => repl::run(store.as_ref()).map(|_| Outcome::Done),
        Some(command) => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            cli::execute(command, store.as_ref(), &mut out, &mut io::stderr())
        }
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Denied) => ExitCode::from(1),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}
