//! Minimal HTTP/1.1 plumbing
//!
//! This module parses request heads with `httparse` and writes responses by
//! hand over any async stream, which keeps the same code path working for
//! plain TCP and TLS connections. The server speaks one request per
//! connection and closes after responding; NDJSON bodies are delimited by
//! that close.

pub mod request;
pub mod response;


pub use request::{Header, Request};
