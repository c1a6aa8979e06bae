//! Minimal IRC line parsing
//!
//! Only splits a line into prefix, command and parameters. Command
//! semantics belong to the sessions.

/// A borrowed view of one IRC line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: Vec<&'a str>,
}

impl<'a> Message<'a> {
    /// Parse a decoded line. Returns `None` for blank lines.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']).trim_start();

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, tail) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = tail.trim_start();
                Some(prefix)
            }
            None => None,
        };

        let (command, mut tail) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            tail = tail.trim_start_matches(' ');
            if tail.is_empty() {
                break;
            }
            if let Some(trailing) = tail.strip_prefix(':') {
                params.push(trailing);
                break;
            }
            let (param, next) = tail.split_once(' ').unwrap_or((tail, ""));
            params.push(param);
            tail = next;
        }

        Some(Self {
            prefix,
            command,
            params,
        })
    }

    /// Case-insensitive command comparison
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ping() {
        let msg = Message::parse("PING :irc.example.org\r\n").unwrap();
        assert_eq!(msg.prefix, None);
        assert!(msg.is("ping"));
        assert_eq!(msg.params, vec!["irc.example.org"]);
    }

    #[test]
    fn test_parse_prefix_and_trailing() {
        let msg = Message::parse(":alice!a@host PRIVMSG #rust :hi there").unwrap();
        assert_eq!(msg.prefix, Some("alice!a@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#rust", "hi there"]);
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(Message::parse("\r\n"), None);
        assert_eq!(Message::parse(":prefix-only"), None);
    }
}
