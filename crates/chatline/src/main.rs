mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "chatline", version, about = "Line-oriented chat protocol client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "CHATLINE_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "chatline",
            "send",
            "127.0.0.1:6667",
            "PRIVMSG",
            "#rust",
            ":hello there",
            "--wait",
            "PONG,ERROR",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.parts, ["PRIVMSG", "#rust", ":hello there"]);
                assert_eq!(
                    args.wait,
                    Some(vec!["PONG".to_string(), "ERROR".to_string()])
                );
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn send_requires_parts() {
        let err = Cli::try_parse_from(["chatline", "send", "127.0.0.1:6667"])
            .expect_err("missing parts should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_listen_with_repeated_send() {
        let cli = Cli::try_parse_from([
            "chatline",
            "listen",
            "irc.example.net:6667",
            "--send",
            "NICK bot",
            "--send",
            "USER bot 0 * :bot",
            "--commands",
            "PRIVMSG,NOTICE",
            "--count",
            "3",
        ])
        .expect("listen args should parse");

        match cli.command {
            Command::Listen(args) => {
                assert_eq!(args.send.len(), 2);
                assert_eq!(args.count, Some(3));
                assert!(!args.no_pong);
            }
            other => panic!("expected listen, got {other:?}"),
        }
    }

    #[test]
    fn parses_parse_without_file() {
        let cli = Cli::try_parse_from(["chatline", "--format", "json", "parse"])
            .expect("parse args should parse");
        assert!(matches!(cli.command, Command::Parse(ref args) if args.file.is_none()));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
