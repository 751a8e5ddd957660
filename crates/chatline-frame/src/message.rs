//! Record parsing.
//!
//! A record is split at most twice: once after the optional prefix and once
//! after the command. Everything past the command is kept verbatim as the
//! trailing text, so message bodies are never word-split.

use std::fmt;

use crate::codec::PREFIX_SENTINEL;

/// A parsed record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Origin token including its leading `:`, when present.
    pub prefix: Option<String>,
    /// Command or numeric reply token. Empty for a blank record.
    pub command: String,
    /// Everything after the command, unsplit. `None` when nothing follows.
    pub trailing: Option<String>,
}

impl Message {
    /// Parse one record. Total: every input yields a message.
    ///
    /// ```
    /// use chatline_frame::Message;
    ///
    /// let msg = Message::parse(":nick!user@host PRIVMSG #chan :hello world");
    /// assert_eq!(msg.prefix.as_deref(), Some(":nick!user@host"));
    /// assert_eq!(msg.command, "PRIVMSG");
    /// assert_eq!(msg.trailing.as_deref(), Some("#chan :hello world"));
    /// ```
    pub fn parse(record: &str) -> Self {
        let (token, rest) = split_first(record);

        if token.starts_with(PREFIX_SENTINEL) {
            let (command, trailing) = rest.map(split_first).unwrap_or(("", None));
            Self {
                prefix: Some(token.to_string()),
                command: command.to_string(),
                trailing: trailing.map(str::to_string),
            }
        } else {
            Self {
                prefix: None,
                command: token.to_string(),
                trailing: rest.map(str::to_string),
            }
        }
    }

    /// Build an outbound message from a command and its trailing text.
    pub fn new(command: impl Into<String>, trailing: Option<String>) -> Self {
        Self {
            prefix: None,
            command: command.into(),
            trailing,
        }
    }

    /// The dispatch view: `(trailing, prefix, command)`, in that order.
    pub fn parts(&self) -> (Option<&str>, Option<&str>, &str) {
        (
            self.trailing.as_deref(),
            self.prefix.as_deref(),
            self.command.as_str(),
        )
    }

    /// Trailing text, or `""` when absent.
    pub fn trailing_or_empty(&self) -> &str {
        self.trailing.as_deref().unwrap_or("")
    }

    /// Split the trailing text at most `n` times (see [`split_params`]).
    pub fn params(&self, n: usize) -> Vec<&str> {
        split_params(self.trailing_or_empty(), n)
    }

    /// True when the command is a three-digit numeric reply.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for Message {
    /// Render back into wire text, without the terminator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{prefix} ")?;
        }
        f.write_str(&self.command)?;
        if let Some(trailing) = &self.trailing {
            write!(f, " {trailing}")?;
        }
        Ok(())
    }
}

/// Split on the first space. An empty remainder counts as absent.
fn split_first(text: &str) -> (&str, Option<&str>) {
    match text.split_once(' ') {
        Some((head, rest)) if !rest.is_empty() => (head, Some(rest)),
        Some((head, _)) => (head, None),
        None => (text, None),
    }
}

/// Split `text` on single spaces at most `n` times, keeping the remainder whole.
///
/// ```
/// use chatline_frame::split_params;
///
/// assert_eq!(split_params("me = #chan :a b c", 2), vec!["me", "=", "#chan :a b c"]);
/// ```
pub fn split_params(text: &str, n: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.splitn(n.saturating_add(1), ' ').collect()
}

/// Remove one leading `:` from a parameter, if present.
pub fn strip_sentinel(text: &str) -> &str {
    text.strip_prefix(PREFIX_SENTINEL).unwrap_or(text)
}
