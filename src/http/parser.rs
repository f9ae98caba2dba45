use std::ops::Range;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::connection::Connection;
use crate::host::{Application, PathScope};
use crate::http::byte_string::{ByteParser, ByteString, Line};
use crate::http::headers::RequestHeader;
use crate::http::request::{HeaderSet, Method, ParsedRequest};
use crate::http::response::StatusCode;

/// Largest header block accepted, terminator included.
pub const MAX_HEADER_BYTES: usize = 32 * 1024;

const BAD_PATH_CHARS: &[char] = &['%', '>', '<', ':', '\\'];

/// Why a request was refused before reaching the application.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("connection yielded no request bytes")]
    NoData,
    #[error("header block exceeds {MAX_HEADER_BYTES} bytes")]
    HeadersTooLarge,
    #[error("missing request line")]
    MissingRequestLine,
    #[error("request line has {tokens} tokens, expected 2 or 3")]
    MalformedRequestLine { tokens: usize },
    #[error("bad path: {0}")]
    BadPath(String),
    #[error("path outside application: {0}")]
    OutsideApplication(String),
}

impl ParseError {
    /// Status the connection answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            ParseError::OutsideApplication(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// A complete header block plus whatever arrived after it.
#[derive(Debug, Clone)]
pub struct HeaderBlock {
    bytes: Bytes,
    lines: Vec<Range<usize>>,
    start_headers: usize,
    end_headers: usize,
}

impl HeaderBlock {
    /// Scans `bytes` for a complete header block, or `None` if the
    /// terminating empty line has not arrived yet.
    pub fn scan(bytes: Bytes) -> Option<Self> {
        let mut parser = ByteParser::new(&bytes);
        let mut lines = Vec::new();
        let mut start_headers = None;
        let mut end_headers = None;

        while let Some(Line::Complete(line)) = parser.read_line() {
            if start_headers.is_none() {
                start_headers = Some(parser.current_offset());
            }
            if line.is_empty() {
                end_headers = Some(parser.current_offset());
                break;
            }
            lines.push(line.range());
        }

        let end_headers = end_headers?;
        Some(Self {
            start_headers: start_headers.unwrap_or(end_headers),
            end_headers,
            lines,
            bytes,
        })
    }

    /// Non-empty lines of the block, request line first.
    pub fn lines(&self) -> impl Iterator<Item = ByteString<'_>> {
        self.lines
            .iter()
            .map(|r| ByteString::new(&self.bytes[r.clone()], r.start))
    }

    pub fn request_line(&self) -> Option<ByteString<'_>> {
        self.lines().next()
    }

    /// Every header line after the request line, up to and including the
    /// terminator. Empty when the request carried no headers.
    pub fn all_raw(&self) -> String {
        if self.lines.len() > 1 {
            String::from_utf8_lossy(&self.bytes[self.start_headers..self.end_headers]).into_owned()
        } else {
            String::new()
        }
    }

    /// Offset just past the terminating empty line.
    pub fn end_headers(&self) -> usize {
        self.end_headers
    }

    /// Bytes received past the header block.
    pub fn trailing(&self) -> Bytes {
        self.bytes.slice(self.end_headers..)
    }
}

/// Pulls bytes from `conn` until a full header block is buffered.
///
/// Each read asks only for the headroom left under [`MAX_HEADER_BYTES`].
pub fn read_header_block(conn: &mut dyn Connection) -> Result<HeaderBlock, ParseError> {
    let mut buf = BytesMut::new();

    loop {
        let headroom = MAX_HEADER_BYTES.saturating_sub(buf.len());
        if headroom == 0 {
            return Err(ParseError::HeadersTooLarge);
        }

        let chunk = match conn.read_request_bytes(headroom) {
            Some(chunk) if !chunk.is_empty() => chunk,
            _ => return Err(ParseError::NoData),
        };

        if buf.len() + chunk.len() > MAX_HEADER_BYTES {
            return Err(ParseError::HeadersTooLarge);
        }
        buf.extend_from_slice(&chunk);

        if let Some(block) = HeaderBlock::scan(Bytes::copy_from_slice(&buf)) {
            return Ok(block);
        }
    }
}

/// The request line, split and decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub verb: Method,
    pub url: String,
    pub protocol: String,
    pub path: String,
    pub file_path: String,
    pub path_info: String,
    pub query_string: Option<String>,
    pub query_string_bytes: Bytes,
}

pub fn parse_request_line(line: ByteString<'_>) -> Result<RequestLine, ParseError> {
    let tokens = line.split(b' ');
    if tokens.len() < 2 || tokens.len() > 3 {
        return Err(ParseError::MalformedRequestLine { tokens: tokens.len() });
    }

    let verb = Method::parse(&tokens[0].to_string_lossy());
    let url_bytes = tokens[1];
    let mut url = url_bytes.to_string_lossy();
    let protocol = tokens
        .get(2)
        .map(|t| t.to_string_lossy())
        .unwrap_or_else(|| "HTTP/1.0".to_string());

    // a leading '?' belongs to the path
    let (mut path, query_string, query_string_bytes) = match url_bytes.index_of(b'?') {
        Some(i) if i > 0 => {
            let query = url_bytes.substring(i + 1);
            (
                url_bytes.substring_len(0, i).to_string_lossy(),
                Some(query.to_string_lossy()),
                Bytes::copy_from_slice(query.as_bytes()),
            )
        }
        _ => (url.clone(), None, Bytes::new()),
    };

    if path.contains('%') {
        path = url_decode(&path);
        url = match &query_string {
            Some(qs) => format!("{path}?{qs}"),
            None => path.clone(),
        };
    }

    let (file_path, path_info) = split_path_info(&path);

    Ok(RequestLine {
        verb,
        url,
        protocol,
        file_path,
        path_info,
        path,
        query_string,
        query_string_bytes,
    })
}

fn url_decode(path: &str) -> String {
    let plus_as_space = path.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(plus_as_space.as_bytes())).into_owned()
}

/// Splits `/a/page.aspx/extra` into `/a/page.aspx` and `/extra`.
fn split_path_info(path: &str) -> (String, String) {
    if let (Some(dot), Some(slash)) = (path.rfind('.'), path.rfind('/')) {
        if dot < slash {
            if let Some(ipi) = path[dot..].find('/').map(|i| i + dot) {
                return (path[..ipi].to_string(), path[ipi..].to_string());
            }
        }
    }
    (path.to_string(), String::new())
}

/// Paths the engine refuses outright.
pub fn is_bad_path(path: &str) -> bool {
    path.contains(BAD_PATH_CHARS) || path.contains("..") || path.contains("//")
}

/// Classifies the header lines after the request line.
pub fn parse_headers(block: &HeaderBlock) -> HeaderSet {
    let mut headers = HeaderSet::default();

    for line in block.lines().skip(1) {
        let text = line.to_string_lossy();
        if let Some((name, value)) = text.split_once(':') {
            headers.insert(name.trim(), value.trim());
        }
    }

    headers.set_all_raw(block.all_raw());
    headers
}

/// Reads and validates one request from `conn`.
///
/// The request is logged on the connection as it is parsed. Nothing is
/// written back on failure; answering with [`ParseError::status`] is up to
/// the caller.
pub fn read_request(conn: &mut dyn Connection, app: &dyn Application) -> Result<ParsedRequest, ParseError> {
    let block = read_header_block(conn)?;

    let logged: Vec<String> = block.lines().map(|l| l.to_string_lossy()).collect();
    if !logged.is_empty() {
        conn.log_request_headers(&logged.join("\r\n"));
    }

    let line = block.request_line().ok_or(ParseError::MissingRequestLine)?;
    let target = parse_request_line(line)?;

    let path_translated = app.map_path(&target.file_path);
    conn.log_request(&path_translated, &target.url);

    if is_bad_path(&target.path) {
        return Err(ParseError::BadPath(target.path));
    }

    let scope = app
        .path_scope(&target.path)
        .ok_or_else(|| ParseError::OutsideApplication(target.path.clone()))?;

    let headers = parse_headers(&block);

    let content_length = headers
        .known(RequestHeader::ContentLength)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let trailing = block.trailing();
    let preloaded_body = trailing.slice(..trailing.len().min(content_length));
    if !preloaded_body.is_empty() {
        conn.log_request_body(&preloaded_body);
    }

    debug!(
        connection = %conn.id(),
        method = %target.verb,
        url = %target.url,
        content_length,
        preloaded = preloaded_body.len(),
        "Parsed request"
    );

    Ok(ParsedRequest {
        verb: target.verb,
        url: target.url,
        protocol: target.protocol,
        path: target.path,
        file_path: target.file_path,
        path_info: target.path_info,
        path_translated,
        query_string: target.query_string,
        query_string_bytes: target.query_string_bytes,
        is_client_script_path: scope == PathScope::ClientScript,
        headers,
        content_length,
        preloaded_body,
    })
}
