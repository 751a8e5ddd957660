use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chatline_client::{connect_with_config, ClientConfig, Target};
use chatline_frame::Message;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{client_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT};
use crate::output::{print_message, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let mut config = ClientConfig::default();
    config.frame.read_timeout = Some(POLL_INTERVAL.min(wait_timeout));

    let mut client = connect_with_config(&args.addr, config)
        .map_err(|err| client_error("connect failed", err))?;

    let reply: Arc<Mutex<Option<Message>>> = Arc::default();
    if let Some(wait) = &args.wait {
        let tx = client.sender();
        client.subscribe("PING", move |msg| {
            tx.send_command(["PONG", msg.trailing_or_empty()])?;
            Ok(())
        });

        let slot = Arc::clone(&reply);
        client.subscribe(Target::from(wait.clone()), move |msg| {
            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(msg.clone());
            }
            Ok(())
        });
    }

    for line in &args.before {
        client
            .send_raw(line)
            .map_err(|err| client_error("send failed", err))?;
    }
    client
        .send_command(&args.parts)
        .map_err(|err| client_error("send failed", err))?;

    if args.wait.is_none() {
        return Ok(SUCCESS);
    }

    let has_reply = || {
        reply
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    };
    let deadline = Instant::now() + wait_timeout;
    client
        .run_while(|_| !has_reply() && Instant::now() < deadline)
        .map_err(|err| client_error("receive failed", err))?;

    let captured = reply.lock().unwrap_or_else(PoisonError::into_inner).take();
    match captured {
        Some(message) => {
            print_message(&message, format);
            Ok(SUCCESS)
        }
        None if client.is_closed() => Err(CliError::new(
            FAILURE,
            "connection closed before a reply arrived",
        )),
        None => Err(CliError::new(
            TIMEOUT,
            format!("no reply within {wait_timeout:?}"),
        )),
    }
}
