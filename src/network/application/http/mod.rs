//! HTTP/1.1 protocol implementation for embedded systems.
//!
//! This module provides a lightweight HTTP client designed for `no_std`
//! environments, plus the small URL splitter the modem uses to decide where to
//! open a socket.
//!
//! ```rust,no_run
//! use libmodem::network::application::http::{Client, Request, Method, Url};
//! # use libmodem::network::Connection;
//! # use libmodem::network::error::Error;
//! # struct MockConnection;
//! # impl Connection for MockConnection {}
//! # impl libmodem::network::Read for MockConnection {
//! #     type Error = Error;
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl libmodem::network::Write for MockConnection {
//! #     type Error = Error;
//! #     fn write(&mut self, _buf: &[u8]) -> Result<usize, Self::Error> { Ok(0) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl libmodem::network::Close for MockConnection {
//! #     type Error = Error;
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//!
//! let url = Url::parse("https://api.example.com/hives").unwrap();
//! let mut client = Client::new(MockConnection);
//!
//! let request = Request {
//!     method: Method::Post,
//!     path: url.path,
//!     headers: heapless::Vec::new(),
//!     body: Some(br#"{"wt":42}"#),
//! };
//!
//! // let response = client.request(&request)?;
//! ```

/// HTTP client implementation and supporting types.
pub mod client;

/// URL splitting for outbound requests.
pub mod url;

pub use client::{Client, Header, Method, Request, Response};
pub use url::{Scheme, Url, UrlError};
