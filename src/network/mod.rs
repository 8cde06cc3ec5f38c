//! Byte-stream abstraction layer for the modem link.
//!
//! The modem speaks AT commands over a serial port, and once a bearer is up it
//! hands out TCP/TLS sockets. Both are plain byte streams, so they share the
//! same small set of synchronous traits defined here.
//!

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for stream operations
pub mod error;

/// Application protocols layered on a socket
pub mod application;

/// Line-buffered transcript tap for the AT serial link
pub mod tap;

use error::Error;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connection, Read, SerialPort, Write};
}

// Core synchronous traits
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Read whatever is available, returning `Ok(0)` when nothing is pending
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Write data to the stream
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write the whole buffer, failing if the stream stops accepting bytes
    fn write_all(&mut self, mut buf: &[u8]) -> Result<(), Error> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => return Err(Error::WriteError),
                Ok(n) => buf = &buf[n..],
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug + Into<Error>;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A socket handed out by the modem once packet data is active
pub trait Connection: Read + Write + Close {}

/// A UART the modem or a discrete GPS receiver is wired to
pub trait SerialPort: Read + Write {
    /// Configure and enable the port
    fn open(&mut self, baud_rate: u32) -> Result<(), Error>;
    /// Release the port
    fn close(&mut self);
}
