use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod parse;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect, stay online and print received messages.
    Listen(ListenArgs),
    /// Send one command line, optionally waiting for a reply.
    Send(SendArgs),
    /// Parse protocol lines from a file or stdin.
    Parse(ParseArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Parse(args) => parse::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Server address (host:port).
    pub addr: String,
    /// Raw line to send after connecting. Repeatable, sent in order.
    #[arg(long, value_name = "LINE")]
    pub send: Vec<String>,
    /// Only print these commands (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub commands: Option<Vec<String>>,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Do not answer PING automatically.
    #[arg(long)]
    pub no_pong: bool,
    /// Drop inbound lines longer than this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_line_length: Option<usize>,
    /// Connection timeout (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s")]
    pub connect_timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server address (host:port).
    pub addr: String,
    /// Command parts, joined with single spaces.
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub parts: Vec<String>,
    /// Wait for the first reply with one of these commands and print it.
    #[arg(long, value_delimiter = ',', value_name = "CMD")]
    pub wait: Option<Vec<String>>,
    /// Maximum time to wait when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    /// Raw line to send before the command. Repeatable, sent in order.
    #[arg(long, value_name = "LINE")]
    pub before: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// File to read. Reads stdin when omitted.
    pub file: Option<PathBuf>,
    /// Only print these commands (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub commands: Option<Vec<String>>,
    /// Keep a `\r` that precedes the line terminator.
    #[arg(long)]
    pub keep_cr: bool,
    /// Decode bytes as UTF-8 (lossy) instead of Latin-1.
    #[arg(long)]
    pub utf8: bool,
    /// Drop lines longer than this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_line_length: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
