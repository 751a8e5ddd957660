use std::fmt;

use crate::message::strip_sentinel;

/// The `nick!user@host` origin carried in a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMask {
    pub nick: String,
    pub user: Option<String>,
    pub host: Option<String>,
}

impl UserMask {
    /// Parse a prefix with or without its leading `:`.
    ///
    /// Missing parts are tolerated: a server prefix yields only a `nick`.
    pub fn parse(prefix: &str) -> Self {
        let mask = strip_sentinel(prefix);
        let (nick, rest) = match mask.split_once('!') {
            Some((nick, rest)) => (nick, Some(rest)),
            None => (mask, None),
        };

        let (nick, user, host) = match rest {
            Some(rest) => match rest.split_once('@') {
                Some((user, host)) => (nick, Some(user), Some(host)),
                None => (nick, Some(rest), None),
            },
            None => match nick.split_once('@') {
                Some((nick, host)) => (nick, None, Some(host)),
                None => (nick, None, None),
            },
        };

        Self {
            nick: nick.to_string(),
            user: user.map(str::to_string),
            host: host.map(str::to_string),
        }
    }
}

impl fmt::Display for UserMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nick)?;
        if let Some(user) = &self.user {
            write!(f, "!{user}")?;
        }
        if let Some(host) = &self.host {
            write!(f, "@{host}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mask() {
        let mask = UserMask::parse(":curtis!~curtis@example.org");
        assert_eq!(mask.nick, "curtis");
        assert_eq!(mask.user.as_deref(), Some("~curtis"));
        assert_eq!(mask.host.as_deref(), Some("example.org"));
        assert_eq!(mask.to_string(), "curtis!~curtis@example.org");
    }

    #[test]
    fn server_prefix() {
        let mask = UserMask::parse(":irc.example.net");
        assert_eq!(mask.nick, "irc.example.net");
        assert_eq!(mask.user, None);
        assert_eq!(mask.host, None);
    }

    #[test]
    fn partial_masks() {
        let mask = UserMask::parse("nick@host");
        assert_eq!((mask.nick.as_str(), mask.host.as_deref()), ("nick", Some("host")));
        assert_eq!(mask.user, None);

        let mask = UserMask::parse(":nick!user");
        assert_eq!(mask.user.as_deref(), Some("user"));
        assert_eq!(mask.host, None);
    }
}
