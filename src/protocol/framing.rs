//! Line framing shared by every session type
//!
//! IRC peers are not reliably UTF-8, so decoding falls back to Latin-1,
//! which maps every byte to a code point and therefore cannot fail.
//! Outbound lines are always emitted with a single write that ends in the
//! terminator.

use std::borrow::Cow;

use crate::common::Result;

/// IRC line terminator
pub const CRLF: &str = "\r\n";

/// Decode bytes as UTF-8, falling back to Latin-1.
pub fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Ensure `line` ends with CRLF.
pub fn normalize(line: &str) -> Cow<'_, str> {
    normalize_with(line, CRLF)
}

/// Ensure `line` ends with `terminator`.
///
/// Embedded terminators are left alone; an already terminated line is
/// returned unchanged.
pub fn normalize_with<'a>(line: &'a str, terminator: &str) -> Cow<'a, str> {
    if line.ends_with(terminator) {
        Cow::Borrowed(line)
    } else {
        let mut owned = String::with_capacity(line.len() + terminator.len());
        owned.push_str(line);
        owned.push_str(terminator);
        Cow::Owned(owned)
    }
}

/// Join `parts` with single spaces and terminate the result, as wire bytes.
pub fn frame(parts: &[&str], terminator: &str) -> Vec<u8> {
    normalize_with(&parts.join(" "), terminator)
        .into_owned()
        .into_bytes()
}

/// Anything a framed line can be written to in one call.
pub trait LineSink: Send + Sync {
    fn write(&self, bytes: Vec<u8>) -> Result<()>;
}

/// The framing capability.
///
/// A session gets `decode`, `normalize` and `send` by pointing at its
/// transport; the session types only differ in how they interpret lines.
pub trait Framing {
    /// Where framed lines are written
    fn sink(&self) -> &dyn LineSink;

    /// Line terminator used by `normalize` and `send`
    fn terminator(&self) -> &str {
        CRLF
    }

    fn decode(&self, bytes: &[u8]) -> String {
        decode(bytes)
    }

    fn normalize<'a>(&self, line: &'a str) -> Cow<'a, str> {
        normalize_with(line, self.terminator())
    }

    /// Emit one protocol line built from space-separated `parts`.
    fn send(&self, parts: &[&str]) -> Result<()> {
        self.sink().write(frame(parts, self.terminator()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<Vec<u8>>>,
    }

    impl LineSink for RecordingSink {
        fn write(&self, bytes: Vec<u8>) -> Result<()> {
            self.writes.lock().push(bytes);
            Ok(())
        }
    }

    struct Peer {
        sink: RecordingSink,
        terminator: &'static str,
    }

    impl Framing for Peer {
        fn sink(&self) -> &dyn LineSink {
            &self.sink
        }

        fn terminator(&self) -> &str {
            self.terminator
        }
    }

    fn peer(terminator: &'static str) -> Peer {
        Peer {
            sink: RecordingSink::default(),
            terminator,
        }
    }

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode("héllo ☃".as_bytes()), "héllo ☃");
    }

    #[test]
    fn test_decode_falls_back_to_latin1() {
        // 0xE9 alone is invalid UTF-8, Latin-1 'é'
        assert_eq!(decode(b"caf\xe9"), "café");
        // Truncated multi-byte sequence
        assert_eq!(decode(b"\xe2\x98"), "\u{e2}\u{98}");
    }

    #[test]
    fn test_decode_every_byte() {
        let all: Vec<u8> = (0..=255).collect();
        let text = decode(&all);
        assert_eq!(text.chars().count(), 256);
        assert!(text.chars().zip(0u32..).all(|(c, b)| c as u32 == b));
    }

    #[test]
    fn test_normalize_appends_terminator() {
        assert_eq!(normalize("NICK alice"), "NICK alice\r\n");
        assert_eq!(normalize(""), "\r\n");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for line in ["PING :x", "PING :x\r\n", "a\r\nb", "trailing\n", "\r"] {
            for terminator in ["\r\n", "\n"] {
                let once = normalize_with(line, terminator).into_owned();
                let twice = normalize_with(&once, terminator).into_owned();
                assert_eq!(once, twice);
                assert!(once.ends_with(terminator));
            }
        }
    }

    #[test]
    fn test_normalize_keeps_embedded_terminators() {
        assert_eq!(normalize("a\r\nb"), "a\r\nb\r\n");
        assert!(matches!(normalize("done\r\n"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_send_is_one_write() {
        let peer = peer(CRLF);
        peer.send(&["PRIVMSG", "#rust", ":hello world"]).unwrap();

        let writes = peer.sink.writes.lock();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], b"PRIVMSG #rust :hello world\r\n");
    }

    #[test]
    fn test_send_does_not_double_terminate() {
        let peer = peer(CRLF);
        peer.send(&["PONG", ":irc.example.org\r\n"]).unwrap();
        assert_eq!(peer.sink.writes.lock()[0], b"PONG :irc.example.org\r\n");
    }

    #[test]
    fn test_send_encodes_utf8() {
        let peer = peer(CRLF);
        peer.send(&["PRIVMSG", "#café", ":☃"]).unwrap();
        assert_eq!(
            peer.sink.writes.lock()[0],
            "PRIVMSG #café :☃\r\n".as_bytes()
        );
    }

    #[test]
    fn test_custom_terminator() {
        let peer = peer("\n");
        assert_eq!(peer.normalize("QUIT"), "QUIT\n");
        peer.send(&["QUIT"]).unwrap();
        assert_eq!(peer.sink.writes.lock()[0], b"QUIT\n");
    }
}
