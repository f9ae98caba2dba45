use crate::http::headers::ResponseHeader;

/// HTTP status code.
///
/// Applications may send any numeric code; the associated constants cover
/// the ones the protocol engine produces itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 100 Continue
    pub const CONTINUE: StatusCode = StatusCode(100);
    /// 200 OK
    pub const OK: StatusCode = StatusCode(200);
    /// 302 Found
    pub const FOUND: StatusCode = StatusCode(302);
    /// 400 Bad Request
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    /// 403 Forbidden
    pub const FORBIDDEN: StatusCode = StatusCode(403);
    /// 404 Not Found
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    /// 500 Internal Server Error
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    pub const fn new(code: u16) -> Self {
        StatusCode(code)
    }

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use huygens::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.as_u16(), 200);
    /// assert_eq!(StatusCode::NOT_FOUND.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns the standard reason phrase, or an empty string for codes
    /// without one.
    ///
    /// # Example
    ///
    /// ```
    /// # use huygens::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::new(302).reason_phrase(), "Found");
    /// assert_eq!(StatusCode::new(299).reason_phrase(), "");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            100 => "Continue",
            101 => "Switching Protocols",
            102 => "Processing",
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",
            207 => "Multi-Status",
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            305 => "Use Proxy",
            307 => "Temporary Redirect",
            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            407 => "Proxy Authentication Required",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Request Entity Too Large",
            414 => "Request-Uri Too Long",
            415 => "Unsupported Media Type",
            416 => "Requested Range Not Satisfiable",
            417 => "Expectation Failed",
            422 => "Unprocessable Entity",
            423 => "Locked",
            424 => "Failed Dependency",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "Http Version Not Supported",
            507 => "Insufficient Storage",
            _ => "",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content type the runtime falls back to when it cannot tell.
pub const GENERIC_BINARY: &str = "application/octet-stream";

/// Response being assembled for one request.
///
/// Status and headers can change until the first flush; after that every
/// header mutation is a no-op. Body chunks queue up until the next flush.
#[derive(Debug)]
pub struct ResponseState {
    status: StatusCode,
    reason: String,
    headers: Vec<(String, String)>,
    body: Vec<Vec<u8>>,
    headers_sent: bool,
    static_file: bool,
    finished: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            reason: StatusCode::OK.reason_phrase().to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            headers_sent: false,
            static_file: false,
            finished: false,
        }
    }
}

impl ResponseState {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn set_status(&mut self, status: StatusCode, reason: &str) {
        self.status = status;
        self.reason = reason.to_string();
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn mark_headers_sent(&mut self) {
        self.headers_sent = true;
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    /// Whether the runtime signalled it is serving a plain file.
    pub fn is_static_file(&self) -> bool {
        self.static_file
    }

    pub fn add_known_header(&mut self, header: ResponseHeader, value: &str) {
        if self.headers_sent {
            return;
        }

        match header {
            // the connection owns these
            ResponseHeader::Server | ResponseHeader::Date | ResponseHeader::Connection => {}
            ResponseHeader::AcceptRanges if value == "bytes" => {
                self.static_file = true;
                self.headers.push((header.name().to_string(), value.to_string()));
            }
            _ => self.headers.push((header.name().to_string(), value.to_string())),
        }
    }

    pub fn add_header(&mut self, name: &str, value: &str) {
        if self.headers_sent {
            return;
        }
        self.headers.push((name.to_string(), value.to_string()));
    }

    pub fn pending_headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Headers as they go on the wire.
    ///
    /// Caching headers survive only for static files, and a generic binary
    /// content type is swapped for `guess` in that case too.
    pub fn wire_headers(&self, guess: Option<&str>) -> Vec<(String, String)> {
        let caching = [
            ResponseHeader::AcceptRanges,
            ResponseHeader::Expires,
            ResponseHeader::LastModified,
        ];

        self.headers
            .iter()
            .filter(|(name, _)| {
                self.static_file || !caching.iter().any(|h| h.name().eq_ignore_ascii_case(name))
            })
            .map(|(name, value)| {
                let is_type = ResponseHeader::ContentType.name().eq_ignore_ascii_case(name);
                match guess {
                    Some(g) if self.static_file && is_type && value == GENERIC_BINARY => {
                        (name.clone(), g.to_string())
                    }
                    _ => (name.clone(), value.clone()),
                }
            })
            .collect()
    }

    pub fn push_body(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.body.push(bytes.to_vec());
        }
    }

    pub fn pending_body_len(&self) -> usize {
        self.body.iter().map(Vec::len).sum()
    }

    pub(crate) fn take_body(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.body)
    }
}
