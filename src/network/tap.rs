//! Transcript tap for the AT serial link.
//!
//! [`Tap`] sits between the AT driver and the raw UART. It is transparent
//! unless debugging is switched on, in which case every byte read or written
//! is collected into a line buffer and each completed line is logged as
//! `<< ...` (modem to host) or `>> ...` (host to modem).
//!
//! ```rust
//! use libmodem::network::tap::Tap;
//! # use libmodem::network::{Read, Write, SerialPort};
//! # use libmodem::network::error::Error;
//! # struct Uart;
//! # impl Read for Uart {
//! #     type Error = Error;
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Error> { Ok(0) }
//! # }
//! # impl Write for Uart {
//! #     type Error = Error;
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Error> { Ok(()) }
//! # }
//! # impl SerialPort for Uart {
//! #     fn open(&mut self, _baud_rate: u32) -> Result<(), Error> { Ok(()) }
//! #     fn close(&mut self) {}
//! # }
//!
//! let mut tap = Tap::new(Uart);
//! tap.set_debug(true);
//! tap.write_all(b"AT+CSQ\r\n").unwrap();
//! ```

use super::error::Error;
use super::{Read, SerialPort, Write};
use heapless::String;

/// Capacity of each transcript line buffer, prefix included.
pub const TRANSCRIPT_LINE_SIZE: usize = 512;

const READ_PREFIX: &str = "<< ";
const WRITE_PREFIX: &str = ">> ";

/// Receives each completed transcript line, prefix included.
pub type TranscriptFn = fn(line: &str);

/// Serial port wrapper that can record line-buffered transcripts.
#[derive(Debug)]
pub struct Tap<S> {
    inner: S,
    debug: bool,
    sink: Option<TranscriptFn>,
    peeked: Option<u8>,
    rx_line: String<TRANSCRIPT_LINE_SIZE>,
    tx_line: String<TRANSCRIPT_LINE_SIZE>,
}

impl<S> Tap<S> {
    /// Wrap a port. Transcripts start disabled.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            debug: false,
            sink: None,
            peeked: None,
            rx_line: String::new(),
            tx_line: String::new(),
        }
    }

    /// Turn transcript recording on or off. Partial lines are discarded.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
        self.rx_line.clear();
        self.tx_line.clear();
    }

    /// Whether transcripts are being recorded.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Forward transcript lines to `sink` in addition to the log.
    pub fn set_transcript_sink(&mut self, sink: Option<TranscriptFn>) {
        self.sink = sink;
    }

    /// The wrapped port.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The wrapped port, mutably. Bytes moved through it are not recorded.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    fn record_read(&mut self, bytes: &[u8]) {
        if self.debug {
            Self::record(&mut self.rx_line, READ_PREFIX, bytes, self.sink);
        }
    }

    fn record_write(&mut self, bytes: &[u8]) {
        if self.debug {
            Self::record(&mut self.tx_line, WRITE_PREFIX, bytes, self.sink);
        }
    }

    fn record(
        line: &mut String<TRANSCRIPT_LINE_SIZE>,
        prefix: &str,
        bytes: &[u8],
        sink: Option<TranscriptFn>,
    ) {
        for &byte in bytes {
            if line.is_empty() {
                // Prefix always fits in an empty buffer.
                let _ = line.push_str(prefix);
            }
            match byte {
                b'\n' => Self::emit(line, sink),
                b'\r' => {}
                _ => {
                    let c = if byte.is_ascii() { byte as char } else { '?' };
                    if line.push(c).is_err() {
                        Self::emit(line, sink);
                        let _ = line.push_str(prefix);
                        let _ = line.push(c);
                    }
                }
            }
        }
    }

    fn emit(line: &mut String<TRANSCRIPT_LINE_SIZE>, sink: Option<TranscriptFn>) {
        debug!("{}", line.as_str());
        if let Some(sink) = sink {
            sink(line.as_str());
        }
        line.clear();
    }
}

impl<S: Read> Tap<S> {
    /// Whether at least one byte can be read without waiting.
    ///
    /// A byte pulled from the port to answer this is kept and handed out by
    /// the next [`Read::read`].
    pub fn available(&mut self) -> bool {
        if self.peeked.is_some() {
            return true;
        }
        let mut byte = [0u8; 1];
        match self.inner.read(&mut byte) {
            Ok(1) => {
                self.record_read(&byte);
                self.peeked = Some(byte[0]);
                true
            }
            _ => false,
        }
    }

    /// Read and discard everything currently pending, returning the count.
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        let mut buf = [0u8; 64];
        loop {
            match self.read(&mut buf) {
                Ok(0) | Err(_) => return dropped,
                Ok(n) => dropped += n,
            }
        }
    }
}

impl<S: Read> Read for Tap<S> {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.peeked.take() {
            buf[0] = byte;
            return Ok(1);
        }
        let n = self.inner.read(buf).map_err(Into::<Error>::into)?;
        self.record_read(&buf[..n]);
        Ok(n)
    }
}

impl<S: Write> Write for Tap<S> {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let n = self.inner.write(buf).map_err(Into::<Error>::into)?;
        self.record_write(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.inner.flush().map_err(Into::into)
    }
}

impl<S: SerialPort> SerialPort for Tap<S> {
    fn open(&mut self, baud_rate: u32) -> Result<(), Error> {
        self.peeked = None;
        self.inner.open(baud_rate)
    }

    fn close(&mut self) {
        self.peeked = None;
        self.inner.close();
    }
}
