//! Entry points that feed requests into the protocol engine.
//!
//! - [`DirectServer`]: one in-memory call per request, fully buffered.
//! - [`SocketServer`]: a TCP acceptor handing each connection to a blocking
//!   worker thread.

pub mod direct;
pub mod events;
pub mod listener;

pub use direct::{DirectRequest, DirectResponse, DirectServer};
pub use events::{RequestCompleted, RequestEvents};
pub use listener::{ShutdownHandle, SocketServer};
