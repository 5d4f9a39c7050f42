//! Shared plumbing for the canvas-sync binaries.

use canvas_sync::{DirectoryStore, StoreError, SyncConfig};
use clap::Parser;
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber; `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "warn,canvas_sync=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Parses arguments like `Parser::parse`, but usage errors exit 1.
/// `--help` and `--version` still exit 0.
pub fn parse_args<T: Parser>() -> T {
    T::try_parse().unwrap_or_else(|err| {
        let code = if err.use_stderr() { 1 } else { 0 };
        let _ = err.print();
        std::process::exit(code);
    })
}

pub fn open_store(config: &SyncConfig) -> Result<DirectoryStore, StoreError> {
    Ok(DirectoryStore::open(&config.store)?.with_page_size(config.page_size))
}

/// Prints `prompt` and reads one line. Only `y` (any case) is a yes;
/// end of input is a no.
pub fn confirm(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
    write!(output, "{prompt}")?;
    output.flush()?;
    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        writeln!(output)?;
        return Ok(false);
    }
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

pub fn fail(err: impl Display) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(1);
}
