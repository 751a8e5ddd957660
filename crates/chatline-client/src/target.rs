use std::fmt;
use std::sync::Arc;

use chatline_frame::Message;

type MessagePredicate = dyn Fn(&Message) -> bool + Send + Sync;

/// What a client subscription listens for.
///
/// Resolved once into a predicate when the subscription is registered.
#[derive(Clone)]
pub enum Target {
    /// Every message.
    All,
    /// Messages whose command equals this string.
    Command(String),
    /// Messages whose command is any of these.
    AnyOf(Vec<String>),
    /// Messages accepted by an arbitrary predicate.
    Matching(Arc<MessagePredicate>),
}

impl Target {
    /// Build a target from a predicate over the parsed message.
    pub fn matching<F>(predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        Target::Matching(Arc::new(predicate))
    }

    /// Test a message against this target.
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Target::All => true,
            Target::Command(command) => message.command == *command,
            Target::AnyOf(commands) => commands.iter().any(|c| *c == message.command),
            Target::Matching(predicate) => predicate(message),
        }
    }

    pub(crate) fn into_predicate(self) -> impl Fn(&Message) -> bool + Send + Sync + 'static {
        move |message: &Message| self.matches(message)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::All => f.write_str("All"),
            Target::Command(command) => f.debug_tuple("Command").field(command).finish(),
            Target::AnyOf(commands) => f.debug_tuple("AnyOf").field(commands).finish(),
            Target::Matching(_) => f.write_str("Matching(<predicate>)"),
        }
    }
}

impl From<&str> for Target {
    fn from(command: &str) -> Self {
        Target::Command(command.to_string())
    }
}

impl From<String> for Target {
    fn from(command: String) -> Self {
        Target::Command(command)
    }
}

impl From<Vec<String>> for Target {
    fn from(commands: Vec<String>) -> Self {
        Target::AnyOf(commands)
    }
}

impl From<Vec<&str>> for Target {
    fn from(commands: Vec<&str>) -> Self {
        Target::AnyOf(commands.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Target {
    fn from(commands: &[&str]) -> Self {
        Target::AnyOf(commands.iter().map(|c| c.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Target {
    fn from(commands: [&str; N]) -> Self {
        Target::AnyOf(commands.iter().map(|c| c.to_string()).collect())
    }
}
