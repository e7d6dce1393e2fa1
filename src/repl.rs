use std::io::{self, BufRead, Write};

use crate::cli::{execute, parse_line, Commands};
use crate::core::error::BlancError;
use crate::core::store::JobStore;

const HELP: &[&str] = &[
    "Commands:",
    "  transitions <status>",
    "  check <from> <to>",
    "  statuses",
    "  jobs list [--status S]... [--search Q] [--provider P]",
    "            [--sort id|customer|scheduled|status] [--desc]",
    "  jobs show <id>",
    "  jobs set-status <id> <status>",
    "  batch <file.blanc>",
    "  help / exit",
    "Quote statuses that contain spaces: jobs set-status J-1001 'Waiting for parts'",
];

pub fn run(store: &dyn JobStore) -> Result<(), BlancError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_with(store, stdin.lock(), &mut stdout.lock(), &mut io::stderr())
}

pub fn run_with(
    store: &dyn JobStore,
    mut input: impl BufRead,
    out: &mut dyn Write,
    err_out: &mut dyn Write,
) -> Result<(), BlancError> {
    let io_err = |e: io::Error| BlancError::Terminal {
        message: e.to_string(),
    };
    let mut line = String::new();

    loop {
        line.clear();
        write!(out, "blanc> ").map_err(io_err)?;
        out.flush().map_err(io_err)?;

        let bytes_read = input.read_line(&mut line).map_err(io_err)?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        if trimmed.eq_ignore_ascii_case("help") {
            for help_line in HELP {
                writeln!(out, "{help_line}").map_err(io_err)?;
            }
            continue;
        }

        match parse_line(trimmed) {
            Ok(Commands::Repl) | Ok(Commands::Board) => {
                writeln!(err_out, "Already in interactive mode.").map_err(io_err)?;
            }
            Ok(command) => {
                if let Err(err) = execute(command, store, out, err_out) {
                    writeln!(err_out, "error: {err}").map_err(io_err)?;
                }
            }
            Err(err) => {
                writeln!(err_out, "{err}").map_err(io_err)?;
            }
        }
    }

    Ok(())
}
