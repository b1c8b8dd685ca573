//! Line framing for rsync output.
//!
//! `--info=progress2` rewrites its status line in place with `\r`, so a line
//! ends at either `\r` or `\n`. Invalid UTF-8 (file names in odd encodings)
//! is replaced rather than rejected.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Longest line kept before it is cut and emitted as is
const DEFAULT_MAX_LINE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct TransferLineCodec {
    max_length: usize,
    /// Bytes of the buffer already scanned for a terminator
    next_index: usize,
}

impl TransferLineCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
            next_index: 0,
        }
    }
}

impl Default for TransferLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn to_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for TransferLineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        let terminator = buf[self.next_index..]
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r');

        if let Some(offset) = terminator {
            let end = self.next_index + offset;
            self.next_index = 0;
            let line = buf.split_to(end + 1);
            return Ok(Some(to_line(&line[..end])));
        }

        if buf.len() >= self.max_length {
            self.next_index = 0;
            let line = buf.split_to(self.max_length);
            return Ok(Some(to_line(&line)));
        }

        self.next_index = buf.len();
        Ok(None)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        self.next_index = 0;
        let line = buf.split_to(buf.len());
        Ok(Some(to_line(&line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8], codec: &mut TransferLineCodec) -> Vec<String> {
        let mut buf = BytesMut::from(input);
        let mut lines = Vec::new();
        while let Some(line) = codec.decode_eof(&mut buf).unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_splits_on_carriage_return_and_newline() {
        let mut codec = TransferLineCodec::new();
        let lines = decode_all(b"etc/hosts\n  1,024  1%\r  2,048  2%\rdone", &mut codec);
        assert_eq!(lines, vec!["etc/hosts", "  1,024  1%", "  2,048  2%", "done"]);
    }

    #[test]
    fn test_crlf_yields_empty_line() {
        let mut codec = TransferLineCodec::new();
        let lines = decode_all(b"a\r\nb\n", &mut codec);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn test_partial_line_waits_for_terminator() {
        let mut codec = TransferLineCodec::new();
        let mut buf = BytesMut::from(&b"usr/lib/libc"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(b".so.6\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("usr/lib/libc.so.6"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_overlong_line_is_cut() {
        let mut codec = TransferLineCodec::with_max_length(4);
        let lines = decode_all(b"abcdefg\n", &mut codec);
        assert_eq!(lines, vec!["abcd", "efg"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut codec = TransferLineCodec::new();
        let lines = decode_all(b"home/u/caf\xe9.txt\n", &mut codec);
        assert_eq!(lines, vec!["home/u/caf\u{fffd}.txt"]);
    }
}
