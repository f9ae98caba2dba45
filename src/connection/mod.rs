//! Transports a worker request reads from and writes to.
//!
//! [`Connection`] has exactly two implementations with different suspension
//! behaviour, kept apart on purpose:
//!
//! - [`MemoryConnection`]: the whole request is already in memory. Nothing
//!   ever blocks and the response is buffered into a [`DirectResponse`].
//! - [`SocketConnection`]: a live TCP stream. Reads poll the socket with a
//!   short then a long timeout and block the owning worker thread.
//!
//! [`DirectResponse`]: crate::server::direct::DirectResponse

pub mod log;
pub mod memory;
pub mod socket;

use std::path::Path;

use bytes::Bytes;
use uuid::Uuid;

use crate::http::mime;
use crate::http::response::StatusCode;
use crate::http::writer::{ResponseHead, error_body};

pub use log::{LogInfo, LogKind};
pub use memory::MemoryConnection;
pub use socket::{PollTimeouts, SocketConnection};

/// One inbound request's transport.
///
/// Implementors supply the transport primitives; the composite writes
/// (`write_headers`, whole responses, error pages) are shared.
pub trait Connection {
    fn id(&self) -> Uuid;

    /// Whether the peer is still there. Always true in memory.
    fn connected(&self) -> bool;

    fn local_ip(&self) -> String;

    fn local_port(&self) -> u16;

    fn remote_ip(&self) -> String;

    /// Virtual path of the hosted application, shown on error pages.
    fn virtual_path(&self) -> &str;

    fn request_log(&self) -> &LogInfo;

    fn request_log_mut(&mut self) -> &mut LogInfo;

    fn response_log(&self) -> &LogInfo;

    fn response_log_mut(&mut self) -> &mut LogInfo;

    /// Returns up to `max_bytes` of request data, or `None` when nothing
    /// more will arrive.
    fn read_request_bytes(&mut self, max_bytes: usize) -> Option<Bytes>;

    /// Number of request bytes ready to read, waiting for some if the
    /// transport has a notion of waiting. Zero means none arrived.
    fn wait_for_request_bytes(&mut self) -> usize;

    fn write_100_continue(&mut self);

    /// Sends a status line and header block.
    fn transmit_head(&mut self, head: &ResponseHead<'_>);

    /// Sends body bytes. Failures are swallowed.
    fn transmit_body(&mut self, data: &[u8]);

    fn close(&mut self);

    fn log_request(&mut self, path_translated: &Path, url: &str) {
        let log = self.request_log_mut();
        log.path_translated = Some(path_translated.to_path_buf());
        log.url = Some(url.to_string());
    }

    fn log_request_body(&mut self, body: &[u8]) {
        self.request_log_mut().body = Some(body.to_vec());
    }

    fn log_request_headers(&mut self, headers: &str) {
        self.request_log_mut().headers = Some(headers.to_string());
    }

    fn write_body(&mut self, data: &[u8]) {
        self.transmit_body(data);
    }

    /// Sends the response head with no `Content-Length`. The body follows
    /// through [`Connection::write_body`].
    fn write_headers(&mut self, status: StatusCode, extra_headers: &[(String, String)], reason: &str) {
        let head = ResponseHead {
            status,
            reason,
            content_length: None,
            extra_headers,
            keep_alive: false,
        };
        record_head(self.response_log_mut(), &head);
        self.transmit_head(&head);
    }

    fn write_entire_response_from_string(
        &mut self,
        status: StatusCode,
        extra_headers: &[(String, String)],
        body: &str,
        keep_alive: bool,
    ) {
        let head = ResponseHead {
            status,
            reason: "",
            content_length: Some(body.len()),
            extra_headers,
            keep_alive,
        };
        record_head(self.response_log_mut(), &head);
        self.transmit_head(&head);
        self.transmit_body(body.as_bytes());

        if !keep_alive {
            self.close();
        }
    }

    /// Serves a file as a complete 200 response, or a 404 if it is missing.
    fn write_entire_response_from_file(&mut self, path: &Path, keep_alive: bool) {
        if !path.is_file() {
            self.write_error_and_close(StatusCode::NOT_FOUND, None);
            return;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(connection = %self.id(), error = %e, path = %path.display(), "Failed to read file");
                self.write_error_and_close(StatusCode::NOT_FOUND, None);
                return;
            }
        };

        let content_type = vec![("Content-Type".to_string(), mime::guess_or_binary(path).to_string())];
        let head = ResponseHead {
            status: StatusCode::OK,
            reason: "",
            content_length: Some(bytes.len()),
            extra_headers: &content_type,
            keep_alive,
        };
        record_head(self.response_log_mut(), &head);
        self.transmit_head(&head);
        self.transmit_body(&bytes);

        if !keep_alive {
            self.close();
        }
    }

    fn write_error_and_close(&mut self, status: StatusCode, message: Option<&str>) {
        let body = error_body(status, self.virtual_path(), message);
        self.write_entire_response_from_string(status, &[], &body, false);
    }

    fn write_error_with_extra_headers_and_keep_alive(
        &mut self,
        status: StatusCode,
        extra_headers: &[(String, String)],
    ) {
        let body = error_body(status, self.virtual_path(), None);
        self.write_entire_response_from_string(status, extra_headers, &body, true);
    }
}

fn record_head(log: &mut LogInfo, head: &ResponseHead<'_>) {
    log.headers = Some(head.header_text());
    log.status_code = Some(head.status.as_u16());
}
