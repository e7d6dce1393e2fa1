use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::warn;

use crate::core::batch::{parse_batch_file, run_batch};
use crate::core::error::BlancError;
use crate::core::filter::{sort_jobs, status_counts, JobFilter, SortKey};
use crate::core::formatter::{format_change, format_counts, format_job_detail, format_job_row};
use crate::core::lifecycle::change_status_by_id;
use crate::core::status::JobStatus;
use crate::core::store::JobStore;
use crate::core::transition::{
    allowed_transitions, allowed_transitions_for, is_terminal, is_transition_allowed_str,
};

#[derive(Debug, Parser)]
#[command(name = "blanc", version, about = "Field-service job lifecycle tool")]
pub struct Cli {
    /// Path to blanc.toml
    #[arg(long, global = true, default_value = "blanc.toml")]
    pub config: PathBuf,
    /// Job store file, overrides [store] path
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,
    /// Use a built-in in-memory roster instead of the store file
    #[arg(long, global = true)]
    pub demo: bool,
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the statuses a job may move to next
    Transitions { status: String },
    /// Check whether a single move is permitted
    Check { from: String, to: String },
    /// Print every status with its outbound moves
    Statuses,
    #[command(subcommand)]
    Jobs(JobsCommand),
    /// Apply a file of `<job-id> -> <status>` lines
    Batch { file: PathBuf },
    Repl,
    Board,
}

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    List(ListArgs),
    Show { id: String },
    SetStatus {
        id: String,
        #[arg(value_parser = parse_status)]
        status: JobStatus,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ListArgs {
    #[arg(long = "status", value_parser = parse_status)]
    pub statuses: Vec<JobStatus>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long, value_enum, default_value_t = SortKey::Id)]
    pub sort: SortKey,
    #[arg(long)]
    pub desc: bool,
    #[arg(long)]
    pub include_unknown: bool,
}

impl ListArgs {
    pub fn filter(&self) -> JobFilter {
        JobFilter {
            statuses: self.statuses.clone(),
            search: self.search.clone(),
            provider: self.provider.clone(),
            include_unknown: self.include_unknown,
        }
    }
}

fn parse_status(value: &str) -> Result<JobStatus, String> {
    JobStatus::parse(value).ok_or_else(|| {
        let known: Vec<&str> = JobStatus::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown status '{value}' (expected one of: {})", known.join(", "))
    })
}

/// Whether the command answered affirmatively; `check` maps a denial to exit code 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Denied,
}

pub fn parse_line(line: &str) -> Result<Commands, String> {
    let mut argv = Vec::new();
    argv.push("blanc".to_string());

    let tokens = shell_words::split(line).map_err(|err| err.to_string())?;
    argv.extend(tokens);

    let parsed = Cli::try_parse_from(argv).map_err(|err| err.to_string())?;
    parsed
        .command
        .ok_or_else(|| "missing command (try 'help')".to_string())
}

fn emit(out: &mut dyn Write, line: impl AsRef<str>) -> Result<(), BlancError> {
    writeln!(out, "{}", line.as_ref()).map_err(|e| BlancError::Terminal {
        message: e.to_string(),
    })
}

/// Runs a non-interactive command. `Repl` and `Board` are handled by the caller.
///
/// Results go to `out`; user-facing notices go to `err_out` regardless of the
/// log filter.
pub fn execute(
    command: Commands,
    store: &dyn JobStore,
    out: &mut dyn Write,
    err_out: &mut dyn Write,
) -> Result<Outcome, BlancError> {
    match command {
        Commands::Transitions { status } => {
            if JobStatus::parse(&status).is_none() {
                warn!(%status, "unrecognized status, offering no transitions");
                emit(
                    err_out,
                    format!("warning: unrecognized status '{status}', offering no transitions"),
                )?;
            }
            for next in allowed_transitions_for(&status) {
                emit(out, next.as_str())?;
            }
            Ok(Outcome::Done)
        }
        Commands::Check { from, to } => {
            if is_transition_allowed_str(&from, &to) {
                emit(out, "allowed")?;
                Ok(Outcome::Done)
            } else {
                emit(out, "denied")?;
                Ok(Outcome::Denied)
            }
        }
        Commands::Statuses => {
            for status in JobStatus::ALL {
                let row = if is_terminal(status) {
                    "(terminal)".to_string()
                } else {
                    let names: Vec<&str> = allowed_transitions(status)
                        .iter()
                        .map(|s| s.as_str())
                        .collect();
                    names.join(", ")
                };
                emit(out, format!("{:<22} -> {}", status.as_str(), row))?;
            }
            Ok(Outcome::Done)
        }
        Commands::Jobs(JobsCommand::List(args)) => {
            let jobs = store.list()?;
            let filter = args.filter();
            let mut view = filter.apply(&jobs);
            sort_jobs(&mut view, args.sort, args.desc);
            for job in &view {
                emit(out, format_job_row(job))?;
            }
            emit(out, format_counts(&status_counts(&jobs)))?;
            Ok(Outcome::Done)
        }
        Commands::Jobs(JobsCommand::Show { id }) => {
            let job = store.get(&id)?;
            for line in format_job_detail(&job) {
                emit(out, line)?;
            }
            Ok(Outcome::Done)
        }
        Commands::Jobs(JobsCommand::SetStatus { id, status }) => {
            let change = change_status_by_id(store, &id, status)?;
            emit(out, format_change(&change))?;
            Ok(Outcome::Done)
        }
        Commands::Batch { file } => {
            let report = run_batch(store, parse_batch_file(&file)?);
            for outcome in &report.outcomes {
                let line = match &outcome.result {
                    Ok(change) => format!("ok    line {}: {}", outcome.line, format_change(change)),
                    Err(err) => format!("fail  line {}: {err}", outcome.line),
                };
                emit(out, line)?;
            }
            emit(
                out,
                format!("{} applied, {} failed", report.applied(), report.failed()),
            )?;
            if report.failed() > 0 {
                Ok(Outcome::Denied)
            } else {
                Ok(Outcome::Done)
            }
        }
        Commands::Repl | Commands::Board => Err(BlancError::InvalidCommand {
            message: "interactive modes cannot be nested".to_string(),
        }),
    }
}
