//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;

use bytes::Bytes;
use huygens::connection::{Connection, LogInfo};
use huygens::http::writer::ResponseHead;
use uuid::Uuid;

/// Connection fed from a fixed list of chunks, recording everything written
/// as raw wire bytes.
pub struct ScriptedConnection {
    id: Uuid,
    chunks: VecDeque<Vec<u8>>,
    pub output: Vec<u8>,
    pub closed: bool,
    pub continues: usize,
    request_log: LogInfo,
    response_log: LogInfo,
}

impl ScriptedConnection {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        let id = Uuid::new_v4();
        Self {
            id,
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            output: Vec::new(),
            closed: false,
            continues: 0,
            request_log: LogInfo::request(id, PathBuf::from("/srv/site")),
            response_log: LogInfo::response(id),
        }
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Connection for ScriptedConnection {
    fn id(&self) -> Uuid {
        self.id
    }

    fn connected(&self) -> bool {
        !self.closed
    }

    fn local_ip(&self) -> String {
        "127.0.0.1".to_string()
    }

    fn local_port(&self) -> u16 {
        8080
    }

    fn remote_ip(&self) -> String {
        "127.0.0.1".to_string()
    }

    fn virtual_path(&self) -> &str {
        "/"
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

    fn read_request_bytes(&mut self, max_bytes: usize) -> Option<Bytes> {
        let mut chunk = self.chunks.pop_front()?;
        if chunk.len() > max_bytes {
            let rest = chunk.split_off(max_bytes);
            self.chunks.push_front(rest);
        }
        Some(Bytes::from(chunk))
    }

    fn wait_for_request_bytes(&mut self) -> usize {
        self.chunks.front().map_or(0, Vec::len)
    }

    fn write_100_continue(&mut self) {
        self.continues += 1;
    }

    fn transmit_head(&mut self, head: &ResponseHead<'_>) {
        self.output.extend_from_slice(&head.to_bytes());
    }

    fn transmit_body(&mut self, data: &[u8]) {
        self.output.extend_from_slice(data);
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// A header block padded with one `X-Pad` header to exactly `total` bytes.
pub fn padded_header_block(total: usize) -> Vec<u8> {
    let head = b"GET / HTTP/1.1\r\nX-Pad: ";
    let tail = b"\r\n\r\n";
    let pad = total - head.len() - tail.len();

    let mut block = head.to_vec();
    block.extend(std::iter::repeat_n(b'a', pad));
    block.extend_from_slice(tail);
    block
}
