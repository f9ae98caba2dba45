use std::time::SystemTime;

use crate::http::response::StatusCode;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Status line and header block of an outgoing response.
///
/// Both transports render responses from this, so `Date`, `Content-Length`
/// and `Connection: Close` follow one policy everywhere.
#[derive(Debug, Clone)]
pub struct ResponseHead<'a> {
    pub status: StatusCode,
    /// Reason phrase; empty means the standard one for `status`.
    pub reason: &'a str,
    pub content_length: Option<usize>,
    pub extra_headers: &'a [(String, String)],
    pub keep_alive: bool,
}

impl<'a> ResponseHead<'a> {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: "",
            content_length: None,
            extra_headers: &[],
            keep_alive: false,
        }
    }

    pub fn reason(&self) -> &str {
        if self.reason.is_empty() {
            self.status.reason_phrase()
        } else {
            self.reason
        }
    }

    /// Header fields in wire order.
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::with_capacity(self.extra_headers.len() + 3);

        fields.push(("Date".to_string(), httpdate::fmt_http_date(SystemTime::now())));

        if let Some(len) = self.content_length {
            fields.push(("Content-Length".to_string(), len.to_string()));
        }

        fields.extend(self.extra_headers.iter().cloned());

        if !self.keep_alive {
            fields.push(("Connection".to_string(), "Close".to_string()));
        }

        fields
    }

    /// Header fields as a CRLF-joined string, without the status line.
    pub fn header_text(&self) -> String {
        self.fields()
            .iter()
            .map(|(k, v)| format!("{k}: {v}\r\n"))
            .collect()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serialize_head(self)
    }
}

fn serialize_head(head: &ResponseHead<'_>) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!("{} {} {}\r\n", HTTP_VERSION, head.status.as_u16(), head.reason());
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in head.fields() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Interim response sent before the body of a large POST is read.
pub fn continue_head() -> &'static [u8] {
    b"HTTP/1.1 100 Continue\r\n\r\n"
}

/// HTML page for an error status, with an optional diagnostic comment.
pub fn error_body(status: StatusCode, virtual_path: &str, message: Option<&str>) -> String {
    let reason = status.reason_phrase();
    let mut body = format!(
        "<html>\r\n<head><title>{reason}</title></head>\r\n<body>\r\n\
         <h1>Server Error in '{virtual_path}' Application.</h1>\r\n\
         <h2><i>HTTP Error {code} - {reason}.</i></h2>\r\n\
         </body>\r\n</html>\r\n",
        code = status.as_u16(),
    );

    if let Some(message) = message.filter(|m| !m.is_empty()) {
        body.push_str("\r\n<!--\r\n");
        body.push_str(message);
        body.push_str("\r\n-->");
    }

    body
}

/// Body of the 302 sent when a directory is requested without its slash.
pub fn redirect_body(location: &str) -> String {
    format!(
        "<html><head><title>Object moved</title></head><body>\r\n\
         <h2>Object moved to <a href='{location}'>here</a>.</h2>\r\n\
         </body></html>\r\n"
    )
}

/// Escapes a redirect target: non-ASCII bytes become `%xx` and spaces
/// become `%20`. Nothing else is touched.
pub fn url_encode_redirect(path: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let mut out = String::with_capacity(path.len());
    for &b in path.as_bytes() {
        if b & 0x80 != 0 {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0f) as usize] as char);
        } else if b == b' ' {
            out.push_str("%20");
        } else {
            out.push(b as char);
        }
    }
    out
}
