use std::fs::File;
use std::io::Read;

use chatline_client::Target;
use chatline_frame::{FrameConfig, FrameError, LineReader, Message, Record, TextEncoding};
use tracing::debug;

use crate::cmd::ParseArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ParseArgs, format: OutputFormat) -> CliResult<i32> {
    let input: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(std::io::stdin().lock()),
    };

    let config = FrameConfig {
        max_line_length: args.max_line_length,
        strip_cr: !args.keep_cr,
        encoding: if args.utf8 {
            TextEncoding::Utf8Lossy
        } else {
            TextEncoding::Latin1
        },
        ..FrameConfig::default()
    };
    let encoding = config.encoding;
    let target = match args.commands {
        Some(commands) => Target::from(commands),
        None => Target::All,
    };

    let mut reader = LineReader::with_config(input, config);
    let mut printed = 0usize;
    let mut emit = |record: &Record| {
        let message = Message::parse(&record.text(encoding));
        if target.matches(&message) {
            print_message(&message, format);
            printed += 1;
        }
    };

    loop {
        match reader.read_record() {
            Ok(record) => emit(&record),
            Err(FrameError::ConnectionClosed) => break,
            // Already logged by the framer, which resumes at the next terminator.
            Err(FrameError::LineTooLong { .. }) => continue,
            Err(err) => return Err(frame_error("read failed", err)),
        }
    }
    if let Some(tail) = reader.take_remainder() {
        emit(&tail);
    }

    debug!(printed, "parse finished");
    Ok(SUCCESS)
}
