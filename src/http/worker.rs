//! The protocol engine and the worker-request contract applications see.
//!
//! [`process`] drives one connection from raw bytes to a closed response:
//! parse, refuse, short-circuit, or hand over to the [`Application`] through
//! a [`WorkerRequest`].

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::connection::Connection;
use crate::host::{Application, DirectoryListing, ProcessError};
use crate::http::headers::{RequestHeader, ResponseHeader};
use crate::http::mime;
use crate::http::parser;
use crate::http::request::{Method, ParsedRequest};
use crate::http::response::{ResponseState, StatusCode};
use crate::http::writer::{redirect_body, url_encode_redirect};

/// Largest body chunk queued from a file before flushing.
pub const MAX_CHUNK_LENGTH: usize = 64 * 1024;

/// Documents probed, in order, when a directory is requested.
pub const DEFAULT_FILE_NAMES: &[&str] = &["default.aspx", "default.htm", "default.html"];

const RESTRICTED_DIRS: &[&str] = &[
    "/bin",
    "/app_browsers",
    "/app_code",
    "/app_data",
    "/app_localresources",
    "/app_globalresources",
    "/app_webreferences",
];

/// Serves the single request waiting on `conn`.
///
/// Protocol and policy failures are answered on the connection and count as
/// success. Only a failure raised by the application comes back as `Err`.
pub fn process(app: &dyn Application, conn: &mut dyn Connection) -> anyhow::Result<()> {
    let request = match parser::read_request(conn, app) {
        Ok(request) => request,
        Err(e) => {
            warn!(connection = %conn.id(), status = e.status().as_u16(), error = %e, "Rejected request");
            conn.write_error_and_close(e.status(), None);
            return Ok(());
        }
    };

    if *request.verb() == Method::POST
        && request.content_length() > 0
        && request.preloaded_body().len() < request.content_length()
    {
        conn.write_100_continue();
    }

    if request.is_client_script_path() {
        let paths = app.paths();
        let rest = request
            .path()
            .get(paths.normalized_client_script_path().len()..)
            .unwrap_or("");
        let file = join_virtual(paths.physical_client_script_path(), rest);
        conn.write_entire_response_from_file(&file, false);
        return Ok(());
    }

    if is_restricted(app.paths().virtual_path(), request.path()) {
        warn!(connection = %conn.id(), path = %request.path(), "Refused restricted directory");
        conn.write_error_and_close(StatusCode::FORBIDDEN, None);
        return Ok(());
    }

    let Some(request) = resolve_directory(app, conn, request) else {
        return Ok(());
    };

    let mut worker = WorkerRequest::new(app, conn, request);

    match app.process_request(&mut worker) {
        Ok(()) => {}
        Err(ProcessError::ResponseEnded) => {
            debug!(connection = %worker.conn.id(), "Application ended response early");
        }
        Err(ProcessError::Failed(e)) => {
            error!(connection = %worker.conn.id(), url = %worker.raw_url(), error = %e, "Application failed");
            return Err(e);
        }
    }

    if !worker.response.is_finished() {
        worker.flush_response(true);
    }

    Ok(())
}

/// Whether `path` points into one of the reserved application folders.
pub fn is_restricted(virtual_path: &str, path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let p = if virtual_path == "/" {
        lower.as_str()
    } else {
        lower.get(virtual_path.len()..).unwrap_or("")
    };

    RESTRICTED_DIRS.iter().any(|dir| {
        p.strip_prefix(dir)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Redirects `/dir` to `/dir/` and rewrites `/dir/` to its default document.
///
/// Returns `None` once a response has been written.
fn resolve_directory(
    app: &dyn Application,
    conn: &mut dyn Connection,
    request: ParsedRequest,
) -> Option<ParsedRequest> {
    let dir = directory_path(app, &request);
    if !dir.is_dir() {
        return Some(request);
    }

    if !request.path().ends_with('/') {
        let new_path = format!("{}/", request.path());
        let location = vec![("Location".to_string(), url_encode_redirect(&new_path))];
        debug!(connection = %conn.id(), location = %new_path, "Redirecting directory request");
        conn.write_entire_response_from_string(StatusCode::FOUND, &location, &redirect_body(&new_path), false);
        return None;
    }

    for name in DEFAULT_FILE_NAMES {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(request.with_default_document(name, candidate));
        }
    }

    Some(request)
}

/// A directory never carries path-info, so map the whole path in that case.
fn directory_path(app: &dyn Application, request: &ParsedRequest) -> PathBuf {
    if request.path_info().is_empty() {
        request.path_translated().to_path_buf()
    } else {
        app.map_path(request.path())
    }
}

fn join_virtual(root: &Path, rest: &str) -> PathBuf {
    rest.split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |acc, s| acc.join(s))
}

/// One request in flight, as the application sees it.
///
/// Reads go to the parsed request or straight to the connection. Writes
/// queue up in a [`ResponseState`] until [`WorkerRequest::flush_response`].
pub struct WorkerRequest<'a> {
    app: &'a dyn Application,
    conn: &'a mut dyn Connection,
    request: ParsedRequest,
    response: ResponseState,
}

impl<'a> WorkerRequest<'a> {
    pub fn new(app: &'a dyn Application, conn: &'a mut dyn Connection, request: ParsedRequest) -> Self {
        Self {
            app,
            conn,
            request,
            response: ResponseState::default(),
        }
    }

    pub fn request(&self) -> &ParsedRequest {
        &self.request
    }

    pub fn response(&self) -> &ResponseState {
        &self.response
    }

    // Request side

    pub fn verb(&self) -> &Method {
        self.request.verb()
    }

    pub fn http_version(&self) -> &str {
        self.request.protocol()
    }

    pub fn raw_url(&self) -> &str {
        self.request.url()
    }

    pub fn uri_path(&self) -> &str {
        self.request.path()
    }

    pub fn file_path(&self) -> &str {
        self.request.file_path()
    }

    pub fn path_info(&self) -> &str {
        self.request.path_info()
    }

    pub fn file_path_translated(&self) -> &Path {
        self.request.path_translated()
    }

    pub fn query_string(&self) -> Option<&str> {
        self.request.query_string()
    }

    pub fn query_string_raw_bytes(&self) -> &[u8] {
        self.request.query_string_bytes()
    }

    pub fn known_request_header(&self, header: RequestHeader) -> Option<&str> {
        self.request.headers().known(header)
    }

    pub fn unknown_request_header(&self, name: &str) -> Option<&str> {
        self.request.headers().unknown(name)
    }

    pub fn unknown_request_headers(&self) -> &[(String, String)] {
        self.request.headers().unknown_headers()
    }

    /// `ALL_RAW` and `SERVER_PROTOCOL`; every other name reads as empty.
    pub fn server_variable(&self, name: &str) -> &str {
        match name {
            "ALL_RAW" => self.request.headers().all_raw(),
            "SERVER_PROTOCOL" => self.request.protocol(),
            _ => "",
        }
    }

    pub fn preloaded_entity_body(&self) -> &[u8] {
        self.request.preloaded_body()
    }

    pub fn is_entire_entity_body_preloaded(&self) -> bool {
        self.request.is_entire_body_preloaded()
    }

    /// Reads more of the body from the connection, up to `size` bytes where
    /// the transport honours it. Empty once nothing more arrives.
    pub fn read_entity_body(&mut self, size: usize) -> Bytes {
        self.conn.read_request_bytes(size).unwrap_or_default()
    }

    /// The preloaded body followed by whatever else the connection delivers,
    /// up to the declared `Content-Length`.
    pub fn read_full_entity_body(&mut self) -> Vec<u8> {
        let expected = self.request.content_length();
        let mut body = self.request.preloaded_body().to_vec();

        while body.len() < expected {
            let chunk = self.read_entity_body(expected - body.len());
            if chunk.is_empty() {
                break;
            }
            body.extend_from_slice(&chunk);
        }

        body.truncate(expected);
        body
    }

    pub fn app_path(&self) -> &str {
        self.app.paths().virtual_path()
    }

    pub fn app_path_translated(&self) -> &Path {
        self.app.paths().physical_path()
    }

    pub fn map_path(&self, path: &str) -> PathBuf {
        self.app.map_path(path)
    }

    pub fn local_address(&self) -> String {
        self.conn.local_ip()
    }

    pub fn local_port(&self) -> u16 {
        self.conn.local_port()
    }

    pub fn remote_address(&self) -> String {
        self.conn.remote_ip()
    }

    pub fn headers_sent(&self) -> bool {
        self.response.headers_sent()
    }

    pub fn is_client_connected(&self) -> bool {
        self.conn.connected()
    }

    // Response side

    pub fn send_status(&mut self, status: StatusCode, reason: &str) {
        self.response.set_status(status, reason);
    }

    pub fn send_known_response_header(&mut self, header: ResponseHeader, value: &str) {
        self.response.add_known_header(header, value);
    }

    pub fn send_unknown_response_header(&mut self, name: &str, value: &str) {
        self.response.add_header(name, value);
    }

    pub fn send_calculated_content_length(&mut self, length: usize) {
        self.response.add_header("Content-Length", &length.to_string());
    }

    pub fn send_response_from_memory(&mut self, data: &[u8]) {
        self.response.push_body(data);
    }

    /// Queues `length` bytes of `path` starting at `offset`, or the rest of
    /// the file when `length` is `None`. Large ranges go out in
    /// [`MAX_CHUNK_LENGTH`] pieces with a flush between them.
    pub fn send_response_from_file(&mut self, path: &Path, offset: u64, length: Option<u64>) -> io::Result<()> {
        if length == Some(0) {
            return Ok(());
        }

        let mut file = File::open(path)?;
        let size = file.metadata()?.len();
        let available = size.saturating_sub(offset);
        let length = length.unwrap_or(available);

        if length == 0 || offset > size || length > available {
            return Ok(());
        }

        if offset > 0 {
            file.seek(SeekFrom::Start(offset))?;
        }

        let mut remaining = length as usize;
        let mut chunk = vec![0; remaining.min(MAX_CHUNK_LENGTH)];

        while remaining > 0 {
            let want = remaining.min(MAX_CHUNK_LENGTH);
            let read = file.read(&mut chunk[..want])?;
            if read == 0 {
                break;
            }

            self.response.push_body(&chunk[..read]);
            remaining -= read;

            if remaining > 0 {
                self.flush_response(false);
            }
        }

        Ok(())
    }

    /// Sends the status line and headers if not yet sent, then every queued
    /// body chunk. A final flush also closes the connection.
    pub fn flush_response(&mut self, final_flush: bool) {
        if self.response.is_finished() {
            return;
        }

        if final_flush
            && self.response.status() == StatusCode::NOT_FOUND
            && !self.response.headers_sent()
            && *self.request.verb() == Method::GET
            && self.try_directory_listing()
        {
            self.response.mark_finished();
            return;
        }

        if !self.response.headers_sent() {
            let guess = mime::guess(self.request.path_translated());
            let headers = self.response.wire_headers(guess);
            self.conn
                .write_headers(self.response.status(), &headers, self.response.reason());
            self.response.mark_headers_sent();
        }

        for chunk in self.response.take_body() {
            self.conn.write_body(&chunk);
        }

        if final_flush {
            debug!(
                connection = %self.conn.id(),
                url = %self.request.url(),
                status = self.response.status().as_u16(),
                "Completed request"
            );
            self.conn.close();
            self.response.mark_finished();
        }
    }

    fn try_directory_listing(&mut self) -> bool {
        if !self.app.paths().directory_listing() {
            return false;
        }

        let dir = directory_path(self.app, &self.request);
        if !dir.is_dir() {
            return false;
        }

        let path = self.request.path();
        let parent = (path.len() > 1)
            .then(|| match path[..path.len() - 1].rfind('/') {
                Some(i) if i > 0 => path[..i].to_string(),
                _ => "/".to_string(),
            })
            .filter(|p| self.app.path_scope(p).is_some());

        let listing = DirectoryListing::read(&dir, path, parent);
        let Some(body) = self.app.format_directory_listing(&listing) else {
            return false;
        };

        let content_type = vec![("Content-Type".to_string(), "text/html; charset=utf-8".to_string())];
        self.conn
            .write_entire_response_from_string(StatusCode::OK, &content_type, &body, false);
        true
    }
}
