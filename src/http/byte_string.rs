//! Zero-copy views over a raw request buffer.
//!
//! [`ByteParser`] walks a buffer line by line and hands out [`ByteString`]
//! views into it. Nothing is copied until [`ByteString::to_string_lossy`] or
//! [`ByteString::to_bytes`] is called.

use std::ops::Range;

/// A borrowed view over a byte range of a larger buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteString<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteString<'a> {
    /// Creates a view over `bytes`, which started at `offset` in its parent buffer.
    pub fn new(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Offset of this view inside the buffer it was cut from.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Range of this view inside the buffer it was cut from.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.bytes.len()
    }

    pub fn index_of(&self, byte: u8) -> Option<usize> {
        self.index_of_from(byte, 0)
    }

    pub fn index_of_from(&self, byte: u8, from: usize) -> Option<usize> {
        self.bytes
            .get(from..)?
            .iter()
            .position(|&b| b == byte)
            .map(|i| i + from)
    }

    pub fn substring(&self, start: usize) -> ByteString<'a> {
        let start = start.min(self.bytes.len());
        ByteString::new(&self.bytes[start..], self.offset + start)
    }

    pub fn substring_len(&self, start: usize, len: usize) -> ByteString<'a> {
        let start = start.min(self.bytes.len());
        let end = (start + len).min(self.bytes.len());
        ByteString::new(&self.bytes[start..end], self.offset + start)
    }

    /// Splits on every occurrence of `sep`. Runs of separators collapse, so
    /// the result never contains an empty token.
    pub fn split(&self, sep: u8) -> Vec<ByteString<'a>> {
        let mut tokens = Vec::new();
        let mut pos = 0;

        while pos < self.bytes.len() {
            match self.index_of_from(sep, pos) {
                Some(i) => {
                    if i > pos {
                        tokens.push(self.substring_len(pos, i - pos));
                    }
                    pos = i + 1;
                }
                None => {
                    tokens.push(self.substring(pos));
                    break;
                }
            }
        }

        tokens
    }

    /// Decodes the view as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.bytes).into_owned()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

/// One step of [`ByteParser::read_line`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// A line terminated by `LF` (an optional `CR` before it is stripped).
    /// An empty complete line marks the end of a header block.
    Complete(ByteString<'a>),
    /// Trailing bytes with no terminator yet: more input is needed.
    Partial(ByteString<'a>),
}

/// Sequential line reader over a byte buffer.
#[derive(Debug)]
pub struct ByteParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteParser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Offset just past the last line returned.
    pub fn current_offset(&self) -> usize {
        self.pos
    }

    /// Returns the next line, or `None` once the buffer is exhausted.
    pub fn read_line(&mut self) -> Option<Line<'a>> {
        if self.pos >= self.bytes.len() {
            return None;
        }

        let start = self.pos;
        let rest = &self.bytes[start..];

        match rest.iter().position(|&b| b == b'\n') {
            Some(i) => {
                let mut len = i;
                if len > 0 && rest[len - 1] == b'\r' {
                    len -= 1;
                }
                self.pos = start + i + 1;
                Some(Line::Complete(ByteString::new(&rest[..len], start)))
            }
            None => {
                self.pos = self.bytes.len();
                Some(Line::Partial(ByteString::new(rest, start)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_line_strips_crlf_and_bare_lf() {
        let mut parser = ByteParser::new(b"GET / HTTP/1.1\r\nHost: a\n\r\n");

        let Some(Line::Complete(first)) = parser.read_line() else {
            panic!("expected request line");
        };
        assert_eq!(first.as_bytes(), b"GET / HTTP/1.1");
        assert_eq!(parser.current_offset(), 16);

        let Some(Line::Complete(second)) = parser.read_line() else {
            panic!("expected header line");
        };
        assert_eq!(second.as_bytes(), b"Host: a");

        let Some(Line::Complete(end)) = parser.read_line() else {
            panic!("expected terminator");
        };
        assert!(end.is_empty());
        assert_eq!(parser.read_line(), None);
    }

    #[test]
    fn read_line_reports_partial_tail() {
        let mut parser = ByteParser::new(b"GET / HT");
        assert!(matches!(parser.read_line(), Some(Line::Partial(p)) if p.as_bytes() == b"GET / HT"));
        assert_eq!(parser.read_line(), None);
    }

    #[test]
    fn split_collapses_separators() {
        let line = ByteString::new(b"  GET   /index.html  HTTP/1.1", 0);
        let tokens: Vec<_> = line.split(b' ').iter().map(|t| t.to_string_lossy()).collect();
        assert_eq!(tokens, vec!["GET", "/index.html", "HTTP/1.1"]);
    }

    #[test]
    fn substring_keeps_parent_offsets() {
        let line = ByteString::new(b"/a?b=c", 10);
        let query = line.substring(line.index_of(b'?').unwrap() + 1);
        assert_eq!(query.as_bytes(), b"b=c");
        assert_eq!(query.range(), 13..16);
    }
}
