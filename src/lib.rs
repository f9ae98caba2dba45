//! Huygens - in-process HTTP/1.x worker-request host
//!
//! Core library for request parsing, connection transports and the
//! in-memory and TCP servers that drive a hosted application.

pub mod config;
pub mod connection;
pub mod host;
pub mod http;
pub mod server;
