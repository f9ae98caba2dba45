use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::connection::{Connection, LogInfo};
use crate::host::AppPaths;
use crate::http::parser::MAX_HEADER_BYTES;
use crate::http::writer::{ResponseHead, continue_head};

/// How long [`SocketConnection::wait_for_request_bytes`] polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeouts {
    /// First wait for bytes to show up.
    pub initial: Duration,
    /// Second, longer wait while the peer stays connected but silent.
    pub fallback: Duration,
}

impl Default for PollTimeouts {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            fallback: Duration::from_secs(30),
        }
    }
}

/// Connection over an accepted TCP stream.
///
/// Owned by exactly one worker thread for the whole request. Every send
/// failure is swallowed; after the first one the connection counts as dead
/// and later writes are skipped.
pub struct SocketConnection {
    id: Uuid,
    stream: Option<TcpStream>,
    connected: bool,
    local: Option<SocketAddr>,
    remote: Option<SocketAddr>,
    timeouts: PollTimeouts,
    peek_buf: Vec<u8>,
    response_content: Vec<u8>,
    virtual_path: String,
    request_log: LogInfo,
    response_log: LogInfo,
}

impl SocketConnection {
    pub fn new(stream: TcpStream, paths: &AppPaths, timeouts: PollTimeouts) -> Self {
        let id = Uuid::new_v4();
        let local = stream.local_addr().ok();
        let remote = stream.peer_addr().ok();

        Self {
            id,
            stream: Some(stream),
            connected: true,
            local,
            remote,
            timeouts,
            peek_buf: vec![0; MAX_HEADER_BYTES],
            response_content: Vec::new(),
            virtual_path: paths.virtual_path().to_string(),
            request_log: LogInfo::request(id, paths.physical_path().to_path_buf()),
            response_log: LogInfo::response(id),
        }
    }

    /// Bytes currently buffered on the socket, waiting at most `timeout`.
    fn available(&mut self, timeout: Duration) -> usize {
        let Some(stream) = self.stream.as_ref() else {
            return 0;
        };

        if stream.set_read_timeout(Some(timeout)).is_err() {
            self.connected = false;
            return 0;
        }

        match stream.peek(&mut self.peek_buf) {
            Ok(0) => {
                // orderly shutdown from the peer
                self.connected = false;
                0
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => 0,
            Err(e) => {
                debug!(connection = %self.id, error = %e, "Socket poll failed");
                self.connected = false;
                0
            }
        }
    }

    fn send(&mut self, data: &[u8]) {
        if !self.connected {
            return;
        }
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        if let Err(e) = stream.write_all(data).and_then(|_| stream.flush()) {
            debug!(connection = %self.id, error = %e, "Socket send failed");
            self.connected = false;
        }
    }

    fn finalize_log(&mut self) {
        let body = std::mem::take(&mut self.response_content);
        self.response_log.finalize_response(&self.request_log, body);
    }
}

impl Connection for SocketConnection {
    fn id(&self) -> Uuid {
        self.id
    }

    fn connected(&self) -> bool {
        self.connected && self.stream.is_some()
    }

    fn local_ip(&self) -> String {
        self.local
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    fn local_port(&self) -> u16 {
        self.local.map_or(0, |a| a.port())
    }

    fn remote_ip(&self) -> String {
        self.remote
            .map(|a| a.ip().to_string())
            .unwrap_or_else(|| "127.0.0.1".to_string())
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

    fn read_request_bytes(&mut self, max_bytes: usize) -> Option<Bytes> {
        // a zero-length read would come back as Ok(0), which reads as a hangup
        if max_bytes == 0 {
            return Some(Bytes::new());
        }

        let available = self.wait_for_request_bytes();
        if available == 0 {
            return None;
        }

        let mut buf = vec![0; available.min(max_bytes)];
        let stream = self.stream.as_mut()?;

        match stream.read(&mut buf) {
            Ok(0) => {
                self.connected = false;
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some(Bytes::from(buf))
            }
            Err(e) => {
                debug!(connection = %self.id, error = %e, "Socket receive failed");
                None
            }
        }
    }

    fn wait_for_request_bytes(&mut self) -> usize {
        let mut available = self.available(self.timeouts.initial);

        if available == 0 && self.connected {
            available = self.available(self.timeouts.fallback);
        }

        available
    }

    fn write_100_continue(&mut self) {
        self.send(continue_head());
    }

    fn transmit_head(&mut self, head: &ResponseHead<'_>) {
        self.send(&head.to_bytes());
    }

    fn transmit_body(&mut self, data: &[u8]) {
        self.response_content.extend_from_slice(data);
        self.send(data);
    }

    fn close(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };

        self.finalize_log();
        // the peer may already be gone
        let _ = stream.shutdown(Shutdown::Both);
        self.connected = false;
    }
}

impl Drop for SocketConnection {
    fn drop(&mut self) {
        self.close();
    }
}
