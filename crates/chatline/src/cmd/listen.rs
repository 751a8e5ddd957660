use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chatline_client::{connect_with_config, ClientConfig, Target};
use tracing::{debug, info};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_message, OutputFormat};

// Read timeout used so the loop can observe Ctrl-C between deliveries.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = ClientConfig {
        connect_timeout: Some(parse_duration(&args.connect_timeout)?),
        ..ClientConfig::default()
    };
    config.frame.read_timeout = Some(POLL_INTERVAL);
    config.frame.max_line_length = args.max_line_length;

    let mut client = connect_with_config(&args.addr, config)
        .map_err(|err| client_error("connect failed", err))?;
    info!(addr = %args.addr, "connected");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    if !args.no_pong {
        let tx = client.sender();
        client.subscribe("PING", move |msg| {
            tx.send_command(["PONG", msg.trailing_or_empty()])?;
            Ok(())
        });
    }

    let printed = Arc::new(AtomicUsize::new(0));
    let target = match args.commands {
        Some(commands) => Target::from(commands),
        None => Target::All,
    };
    {
        let printed = Arc::clone(&printed);
        let limit = args.count;
        client.subscribe(target, move |msg| {
            if limit.is_some_and(|max| printed.load(Ordering::SeqCst) >= max) {
                return Ok(());
            }
            print_message(msg, format);
            printed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    for line in &args.send {
        client
            .send_raw(line)
            .map_err(|err| client_error("send failed", err))?;
    }

    let totals = client
        .run_while(|_| {
            running.load(Ordering::SeqCst)
                && args
                    .count
                    .is_none_or(|max| printed.load(Ordering::SeqCst) < max)
        })
        .map_err(|err| client_error("receive failed", err))?;

    debug!(
        records = totals.records,
        failed = totals.failed,
        oversized = totals.oversized,
        closed = client.is_closed(),
        "listen finished"
    );
    client.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
