use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use chatline_frame::{Message, UserMask};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    command: &'a str,
    prefix: Option<&'a str>,
    nick: Option<String>,
    trailing: Option<&'a str>,
    numeric: bool,
    timestamp: String,
}

pub fn print_message(message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                command: &message.command,
                prefix: message.prefix.as_deref(),
                nick: origin_nick(message),
                trailing: message.trailing.as_deref(),
                numeric: message.is_numeric(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "FROM", "TRAILING"])
                .add_row(vec![
                    message.command.clone(),
                    origin_nick(message).unwrap_or_default(),
                    message.trailing_or_empty().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "command={} from={} trailing={}",
                display_command(message),
                origin_nick(message).as_deref().unwrap_or("-"),
                message.trailing_or_empty()
            );
        }
        OutputFormat::Raw => {
            let mut line = message.to_string();
            line.push('\n');
            print_raw(line.as_bytes());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn origin_nick(message: &Message) -> Option<String> {
    message
        .prefix
        .as_deref()
        .map(|prefix| UserMask::parse(prefix).nick)
        .filter(|nick| !nick.is_empty())
}

fn display_command(message: &Message) -> &str {
    if message.command.is_empty() {
        "<none>"
    } else {
        &message.command
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
