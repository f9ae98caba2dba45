use bytes::Bytes;
use uuid::Uuid;

use crate::connection::{Connection, LogInfo};
use crate::host::AppPaths;
use crate::http::writer::ResponseHead;
use crate::server::direct::{DirectRequest, DirectResponse};

/// Headers the transport owns and therefore replaces instead of appending.
const SINGLE_VALUED: &[&str] = &["Date", "Content-Length", "Connection"];

/// Connection over a request the caller already holds in memory.
///
/// The first read yields a synthesized header block, the second the whole
/// body, and every later read nothing. Writes build up a [`DirectResponse`].
#[derive(Debug)]
pub struct MemoryConnection {
    id: Uuid,
    request: DirectRequest,
    headers_read: bool,
    body_read: bool,
    response: DirectResponse,
    virtual_path: String,
    request_log: LogInfo,
    response_log: LogInfo,
}

impl MemoryConnection {
    pub fn new(request: DirectRequest, paths: &AppPaths) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            request,
            headers_read: false,
            body_read: false,
            response: DirectResponse::empty(),
            virtual_path: paths.virtual_path().to_string(),
            request_log: LogInfo::request(id, paths.physical_path().to_path_buf()),
            response_log: LogInfo::response(id),
        }
    }

    /// Copies the buffered body into the response log.
    pub fn finalize_log(&mut self) {
        let body = self.response.content.clone();
        self.response_log.finalize_response(&self.request_log, body);
    }

    pub fn response(&self) -> &DirectResponse {
        &self.response
    }

    pub fn into_response(self) -> DirectResponse {
        self.response
    }
}

/// Renders a request line and headers as the wire would carry them.
pub fn synthesize_header_block(request: &DirectRequest) -> Vec<u8> {
    let mut block = format!("{} {} HTTP/1.1\r\n", request.method, request.request_uri);
    for (name, value) in &request.headers {
        block.push_str(name);
        block.push_str(": ");
        block.push_str(value);
        block.push_str("\r\n");
    }
    block.push_str("\r\n");
    block.into_bytes()
}

impl Connection for MemoryConnection {
    fn id(&self) -> Uuid {
        self.id
    }

    fn connected(&self) -> bool {
        true
    }

    fn local_ip(&self) -> String {
        "0.0.0.0".to_string()
    }

    fn local_port(&self) -> u16 {
        0
    }

    fn remote_ip(&self) -> String {
        "*".to_string()
    }

    fn virtual_path(&self) -> &str {
        &self.virtual_path
    }

    fn request_log(&self) -> &LogInfo {
        &self.request_log
    }

    fn request_log_mut(&mut self) -> &mut LogInfo {
        &mut self.request_log
    }

    fn response_log(&self) -> &LogInfo {
        &self.response_log
    }

    fn response_log_mut(&mut self) -> &mut LogInfo {
        &mut self.response_log
    }

    fn read_request_bytes(&mut self, _max_bytes: usize) -> Option<Bytes> {
        if !self.headers_read {
            self.headers_read = true;
            return Some(Bytes::from(synthesize_header_block(&self.request)));
        }

        if self.body_read {
            return None;
        }
        self.body_read = true;

        self.request
            .content
            .as_ref()
            .filter(|c| !c.is_empty())
            .map(|c| Bytes::copy_from_slice(c))
    }

    fn wait_for_request_bytes(&mut self) -> usize {
        self.request.content.as_ref().map_or(0, Vec::len)
    }

    fn write_100_continue(&mut self) {
        // interim responses have no place in a buffered result
    }

    fn transmit_head(&mut self, head: &ResponseHead<'_>) {
        self.response.status_code = head.status.as_u16();
        self.response.status_message = head.reason().to_string();

        for (name, value) in head.fields() {
            if SINGLE_VALUED.iter().any(|h| h.eq_ignore_ascii_case(&name)) {
                self.response.set_header(&name, &value);
            } else {
                self.response.add_header(&name, &value);
            }
        }
    }

    fn transmit_body(&mut self, data: &[u8]) {
        self.response.content.extend_from_slice(data);
    }

    fn close(&mut self) {}
}
