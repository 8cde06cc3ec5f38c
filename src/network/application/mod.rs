//! # Application Layer Protocols
//!
//! Protocols layered on top of a modem socket. The only one the field sensor
//! needs is HTTP, used to push measurements as JSON.
//!
//! All protocol implementations in this module:
//!
//! - **Connection Agnostic**: Work with any type implementing [`Connection`](crate::network::Connection)
//! - **No-std Compatible**: No heap allocation
//! - **Resource Conscious**: Fixed-size buffers

/// HTTP client implementation.
///
/// Provides a simple HTTP/1.1 client suitable for embedded systems,
/// supporting GET and POST methods with custom headers.
pub mod http;
