use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::http::headers::RequestHeader;

/// HTTP request methods.
///
/// Any token is accepted on the request line; the common verbs get their own
/// variant so the engine can branch on them without string compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// Any other verb, kept verbatim
    Other(String),
}

impl Method {
    /// Parses an HTTP method. Matching is case-sensitive, so `get` is
    /// carried as `Other("get")`.
    ///
    /// # Example
    ///
    /// ```
    /// # use huygens::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("PROPFIND"), Method::Other("PROPFIND".to_string()));
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "PATCH" => Method::PATCH,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request headers split into known slots and an unknown list.
///
/// A header line lands in exactly one of the two partitions. A repeated
/// known header keeps the last value.
#[derive(Debug, Clone)]
pub struct HeaderSet {
    known: Vec<Option<String>>,
    unknown: Vec<(String, String)>,
    all_raw: String,
}

impl Default for HeaderSet {
    fn default() -> Self {
        Self {
            known: vec![None; RequestHeader::COUNT],
            unknown: Vec::new(),
            all_raw: String::new(),
        }
    }
}

impl HeaderSet {
    /// Records one `name: value` pair.
    pub fn insert(&mut self, name: &str, value: &str) {
        match RequestHeader::from_name(name) {
            Some(known) => self.known[known.index()] = Some(value.to_string()),
            None => self.unknown.push((name.to_string(), value.to_string())),
        }
    }

    pub fn set_all_raw(&mut self, raw: String) {
        self.all_raw = raw;
    }

    pub fn known(&self, header: RequestHeader) -> Option<&str> {
        self.known[header.index()].as_deref()
    }

    /// First unknown header matching `name`, ignoring case.
    pub fn unknown(&self, name: &str) -> Option<&str> {
        self.unknown
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn unknown_headers(&self) -> &[(String, String)] {
        &self.unknown
    }

    /// Looks a header up by name in whichever partition holds it.
    pub fn get(&self, name: &str) -> Option<&str> {
        match RequestHeader::from_name(name) {
            Some(known) => self.known(known),
            None => self.unknown(name),
        }
    }

    /// Every raw header line after the request line, terminator included.
    pub fn all_raw(&self) -> &str {
        &self.all_raw
    }

    /// Known and unknown headers as `(name, value)` pairs, known ones first
    /// under their canonical names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        RequestHeader::ALL
            .iter()
            .filter_map(|h| self.known(*h).map(|v| (h.name(), v)))
            .chain(self.unknown.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }
}

/// The fully parsed state of one inbound request.
///
/// Built once per connection by [`crate::http::parser::read_request`] and
/// never reset. The only later change is the default-document rewrite, which
/// produces a new value.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub(crate) verb: Method,
    pub(crate) url: String,
    pub(crate) protocol: String,
    pub(crate) path: String,
    pub(crate) file_path: String,
    pub(crate) path_info: String,
    pub(crate) path_translated: PathBuf,
    pub(crate) query_string: Option<String>,
    pub(crate) query_string_bytes: Bytes,
    pub(crate) is_client_script_path: bool,
    pub(crate) headers: HeaderSet,
    pub(crate) content_length: usize,
    pub(crate) preloaded_body: Bytes,
}

impl ParsedRequest {
    pub fn verb(&self) -> &Method {
        &self.verb
    }

    /// The URL as received, with the path part percent-decoded.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    pub fn path_translated(&self) -> &Path {
        &self.path_translated
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    pub fn query_string_bytes(&self) -> &[u8] {
        &self.query_string_bytes
    }

    pub fn is_client_script_path(&self) -> bool {
        self.is_client_script_path
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Declared `Content-Length`, zero when missing or unparsable.
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    pub fn preloaded_body(&self) -> &[u8] {
        &self.preloaded_body
    }

    pub fn is_entire_body_preloaded(&self) -> bool {
        self.content_length == self.preloaded_body.len()
    }

    /// Points the request at a default document inside the requested
    /// directory, as if it had been asked for directly.
    pub fn with_default_document(&self, file_name: &str, translated: PathBuf) -> Self {
        let mut next = self.clone();
        next.path = format!("{}{}", self.path, file_name);
        next.file_path = next.path.clone();
        next.path_info = String::new();
        next.url = match &self.query_string {
            Some(qs) => format!("{}?{}", next.path, qs),
            None => next.path.clone(),
        };
        next.path_translated = translated;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_set_partitions_by_name() {
        let mut headers = HeaderSet::default();
        headers.insert("host", "example.com");
        headers.insert("X-Trace", "abc");

        assert_eq!(headers.known(RequestHeader::Host), Some("example.com"));
        assert_eq!(headers.unknown("x-trace"), Some("abc"));
        assert_eq!(headers.unknown("host"), None);
        assert_eq!(headers.unknown_headers().len(), 1);
        assert_eq!(headers.get("HOST"), Some("example.com"));
    }
}
