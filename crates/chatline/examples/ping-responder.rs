//! Minimal bot: registers, answers PING and prints channel messages.
//!
//! Run with:
//!   cargo run --example ping-responder -- irc.libera.chat:6667 mynick '#chatline'

use chatline::client::connect;
use chatline::frame::{split_params, strip_sentinel, UserMask};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:6667".to_string());
    let nick = args.next().unwrap_or_else(|| "chatline".to_string());
    let channel = args.next().unwrap_or_else(|| "#chatline".to_string());

    let mut client = connect(&addr)?;
    let tx = client.sender();
    let join = client.sender();

    client
        .subscribe("PING", move |msg| {
            tx.send_command(["PONG", msg.trailing_or_empty()])?;
            Ok(())
        })
        .subscribe("001", move |_| {
            join.send_command(["JOIN", channel.as_str()])?;
            Ok(())
        })
        .subscribe("PRIVMSG", |msg| {
            let params = split_params(msg.trailing_or_empty(), 1);
            let from = msg.prefix.as_deref().map(UserMask::parse);
            if let [target, text] = params.as_slice() {
                let nick = from.map(|m| m.nick).unwrap_or_default();
                println!("{target} <{nick}> {}", strip_sentinel(text));
            }
            Ok(())
        });

    client
        .send_command(["NICK", nick.as_str()])?
        .send_command(["USER", nick.as_str(), "0", "*", nick.as_str()])?;

    let total = client.run()?;
    eprintln!("connection closed after {} records", total.records);
    Ok(())
}
