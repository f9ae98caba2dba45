use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::connection::MemoryConnection;
use crate::host::Application;
use crate::http::worker;
use crate::server::events::{RequestCompleted, RequestEvents};

/// A request handed over in memory instead of read off a socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectRequest {
    pub method: String,
    /// Path and query, e.g. `/app/page.aspx?id=1`.
    pub request_uri: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub content: Option<Vec<u8>>,
}

/// Builder for [`DirectRequest`].
///
/// # Example
///
/// ```
/// # use huygens::server::DirectRequest;
/// let request = DirectRequest::builder()
///     .method("POST")
///     .uri("/form.aspx")
///     .header("Content-Type", "text/plain")
///     .content(b"hello".to_vec())
///     .build()
///     .unwrap();
/// assert_eq!(request.headers["Content-Length"], "5");
/// ```
#[derive(Debug, Default)]
pub struct DirectRequestBuilder {
    method: Option<String>,
    request_uri: Option<String>,
    headers: HashMap<String, String>,
    content: Option<Vec<u8>>,
}

impl DirectRequest {
    /// A bodyless request with no headers.
    pub fn new(method: impl Into<String>, request_uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            request_uri: request_uri.into(),
            headers: HashMap::new(),
            content: None,
        }
    }

    pub fn builder() -> DirectRequestBuilder {
        DirectRequestBuilder::default()
    }
}

impl DirectRequestBuilder {
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.request_uri = Some(uri.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the body, and `Content-Length` unless a header already names one.
    pub fn content(mut self, content: Vec<u8>) -> Self {
        if !self.headers.keys().any(|k| k.eq_ignore_ascii_case("Content-Length")) {
            self.headers
                .insert("Content-Length".to_string(), content.len().to_string());
        }
        self.content = Some(content);
        self
    }

    pub fn build(self) -> Result<DirectRequest, &'static str> {
        Ok(DirectRequest {
            method: self.method.ok_or("method missing")?,
            request_uri: self.request_uri.ok_or("uri missing")?,
            headers: self.headers,
            content: self.content,
        })
    }
}

/// A fully buffered response to a [`DirectRequest`].
///
/// Headers keep their first-seen order; a repeated name collects its values
/// under one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectResponse {
    pub status_code: u16,
    pub status_message: String,
    pub headers: Vec<(String, Vec<String>)>,
    pub content: Vec<u8>,
}

impl DirectResponse {
    /// A blank `200 OK`.
    pub fn empty() -> Self {
        Self {
            status_code: 200,
            status_message: "OK".to_string(),
            headers: Vec::new(),
            content: Vec::new(),
        }
    }

    /// First value of the header `name`, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    pub fn header_values(&self, name: &str) -> &[String] {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Replaces every value of `name` with `value`.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, values)) => *values = vec![value.to_string()],
            None => self
                .headers
                .push((name.to_string(), vec![value.to_string()])),
        }
    }

    /// Appends `value` to the values of `name`.
    pub fn add_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, values)) => values.push(value.to_string()),
            None => self
                .headers
                .push((name.to_string(), vec![value.to_string()])),
        }
    }

    pub fn content_text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Serves requests straight from memory, one call at a time per caller.
///
/// Shareable across threads; concurrent calls each get their own connection.
#[derive(Clone)]
pub struct DirectServer {
    app: Arc<dyn Application>,
    events: RequestEvents,
}

impl DirectServer {
    pub fn new(app: Arc<dyn Application>) -> Self {
        Self::with_events(app, RequestEvents::default())
    }

    pub fn with_events(app: Arc<dyn Application>, events: RequestEvents) -> Self {
        Self { app, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RequestCompleted> {
        self.events.subscribe()
    }

    /// Runs `request` through the engine and returns what it answered.
    ///
    /// Only an application failure is an error; protocol refusals come back
    /// as ordinary 4xx responses.
    pub fn direct_call(&self, request: DirectRequest) -> anyhow::Result<DirectResponse> {
        debug!(method = %request.method, uri = %request.request_uri, "Direct call");

        let mut conn = MemoryConnection::new(request, self.app.paths());
        let result = worker::process(self.app.as_ref(), &mut conn);

        conn.finalize_log();
        self.events.publish(&conn);

        result?;
        Ok(conn.into_response())
    }
}
