//! HTTP/1.x protocol implementation.
//!
//! This module parses one request per connection and drives it to a response
//! through the hosted application.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`byte_string`**: Zero-copy line and token views over the raw request buffer
//! - **`headers`**: Canonical request and response header enumerations
//! - **`parser`**: Assembles the header block and parses the request line and headers
//! - **`request`**: The parsed request value and its header set
//! - **`response`**: Status codes and the response being assembled
//! - **`writer`**: Serializes status lines and header blocks, error and redirect pages
//! - **`mime`**: MIME type detection based on file extensions
//! - **`worker`**: The protocol engine and the worker request handed to applications
//!
//! # Request State Machine
//!
//! Each connection serves exactly one request and goes through these states:
//!
//! ```text
//!        ┌──────────────────┐
//!        │  ReadingHeaders  │ ← Accumulate bytes until the empty line (≤ 32 KiB)
//!        └──────┬───────────┘
//!               │ Header block complete          (no data / too large → 400)
//!               ▼
//!        ┌──────────────────┐
//!        │ HeadersComplete  │ ← Request line, path checks, headers, preloaded body
//!        └──────┬───────────┘
//!               │ Path accepted             (bad path → 400, outside app → 404)
//!               ▼
//!        ┌──────────────────┐
//!        │  Policy checks   │ ← Client script, restricted dirs, directory requests
//!        └──────┬───────────┘
//!               │ Not short-circuited          (403 / 302 / file → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatched     │ ← Application reads the body and queues the response
//!        └──────┬───────────┘
//!               │ Flush
//!               ▼
//!        ┌──────────────────┐
//!        │ ResponseInFlight │ ← Status line and headers once, then body chunks
//!        └──────┬───────────┘
//!               │ Final flush
//!               ▼
//!            Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use huygens::connection::MemoryConnection;
//! use huygens::http::worker;
//!
//! let mut conn = MemoryConnection::new(request, app.paths());
//! worker::process(&app, &mut conn)?;
//! let response = conn.into_response();
//! ```

pub mod byte_string;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod worker;
pub mod writer;
