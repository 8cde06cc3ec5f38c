use crate::network::{Connection, Read, Write};
use crate::network::error::Error;
use core::fmt::Write as _;
use heapless::{String, Vec};

const MAX_HEADERS: usize = 8;
const MAX_HEADER_NAME_LEN: usize = 32;
const MAX_HEADER_VALUE_LEN: usize = 128;
const REQUEST_BUFFER_SIZE: usize = 2048;
const RESPONSE_BUFFER_SIZE: usize = 1024;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A single request or response header.
#[derive(Debug, Clone)]
pub struct Header {
    pub name: String<MAX_HEADER_NAME_LEN>,
    pub value: String<MAX_HEADER_VALUE_LEN>,
}

impl Header {
    /// Build a header, failing if either part exceeds its fixed capacity.
    pub fn new(name: &str, value: &str) -> Result<Self, Error> {
        Ok(Self {
            name: String::try_from(name).map_err(|_| Error::BufferFull)?,
            value: String::try_from(value).map_err(|_| Error::BufferFull)?,
        })
    }
}

pub struct Request<'a> {
    pub method: Method,
    pub path: &'a str,
    pub headers: Vec<Header, MAX_HEADERS>,
    pub body: Option<&'a [u8]>,
}

#[derive(Debug)]
pub struct Response {
    pub status_code: u16,
    pub headers: Vec<Header, MAX_HEADERS>,
    pub body: Vec<u8, RESPONSE_BUFFER_SIZE>,
}

impl Response {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// HTTP/1.1 client over a single socket.
#[derive(Debug)]
pub struct Client<C: Connection> {
    connection: C,
}

impl<C: Connection> Client<C> {
    pub fn new(connection: C) -> Self {
        Self { connection }
    }

    /// Give back the socket, e.g. to close it.
    pub fn into_inner(self) -> C {
        self.connection
    }

    /// Send a `POST` with a body of the given content type.
    pub fn post(
        &mut self,
        host: &str,
        path: &str,
        content_type: &str,
        user_agent: &str,
        body: &[u8],
    ) -> Result<Response, Error> {
        let mut headers: Vec<Header, MAX_HEADERS> = Vec::new();
        for (name, value) in [
            ("Host", host),
            ("Content-Type", content_type),
            ("User-Agent", user_agent),
            ("Connection", "close"),
        ] {
            if name == "User-Agent" && value.is_empty() {
                continue;
            }
            headers
                .push(Header::new(name, value)?)
                .map_err(|_| Error::BufferFull)?;
        }

        self.request(&Request {
            method: Method::Post,
            path,
            headers,
            body: Some(body),
        })
    }

    pub fn request(&mut self, request: &Request) -> Result<Response, Error> {
        // --- Build Request ---
        let mut request_buf: Vec<u8, REQUEST_BUFFER_SIZE> = Vec::new();

        // Request line
        push(&mut request_buf, request.method.as_str().as_bytes())?;
        push(&mut request_buf, b" ")?;
        push(&mut request_buf, request.path.as_bytes())?;
        push(&mut request_buf, b" HTTP/1.1\r\n")?;

        // Headers
        let mut has_user_agent = false;
        for header in &request.headers {
            if header.name.eq_ignore_ascii_case("User-Agent") {
                has_user_agent = true;
            }
            push(&mut request_buf, header.name.as_bytes())?;
            push(&mut request_buf, b": ")?;
            push(&mut request_buf, header.value.as_bytes())?;
            push(&mut request_buf, b"\r\n")?;
        }

        if !has_user_agent {
            push(&mut request_buf, b"User-Agent: libmodem\r\n")?;
        }

        // Body
        if let Some(body) = request.body {
            let mut len_str: String<10> = String::new();
            write!(len_str, "{}", body.len()).map_err(|_| Error::BufferFull)?;

            push(&mut request_buf, b"Content-Length: ")?;
            push(&mut request_buf, len_str.as_bytes())?;
            push(&mut request_buf, b"\r\n\r\n")?;
            push(&mut request_buf, body)?;
        } else {
            push(&mut request_buf, b"\r\n")?;
        }

        // --- Send Request ---
        self.connection.write_all(&request_buf)?;
        self.connection.flush().map_err(Into::<Error>::into)?;

        // --- Receive Response ---
        let mut response_buf = [0u8; RESPONSE_BUFFER_SIZE];
        let mut total_read = 0;
        loop {
            match self.connection.read(&mut response_buf[total_read..]) {
                Ok(0) if total_read > 0 => break,
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => {
                    total_read += n;
                    if total_read >= response_buf.len() {
                        break;
                    }
                    if find_slice(&response_buf[..total_read], b"\r\n\r\n").is_some() {
                        break;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        // --- Parse Response ---
        let response_data = &response_buf[..total_read];

        let header_end_pos = find_slice(response_data, b"\r\n\r\n").ok_or(Error::ProtocolError)?;
        let header_data = &response_data[..header_end_pos];
        let body_data = &response_data[header_end_pos + 4..];

        let header_str = core::str::from_utf8(header_data).map_err(|_| Error::ProtocolError)?;
        let mut lines = header_str.lines();

        // Status line
        let status_line = lines.next().ok_or(Error::ProtocolError)?;
        let mut status_parts = status_line.splitn(3, ' ');
        let version = status_parts.next().ok_or(Error::ProtocolError)?;
        if !version.starts_with("HTTP/") {
            return Err(Error::ProtocolError);
        }
        let status_code = status_parts
            .next()
            .ok_or(Error::ProtocolError)?
            .parse::<u16>()
            .map_err(|_| Error::ProtocolError)?;

        // Headers beyond our capacity are skipped rather than failing the request.
        let mut response_headers: Vec<Header, MAX_HEADERS> = Vec::new();
        let mut content_length: Option<usize> = None;

        for line in lines {
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(2, ':');
            let name = parts.next().ok_or(Error::ProtocolError)?.trim();
            let value = parts.next().ok_or(Error::ProtocolError)?.trim();

            if name.eq_ignore_ascii_case("Content-Length") {
                content_length = value.parse::<usize>().ok();
            }

            if let Ok(header) = Header::new(name, value) {
                let _ = response_headers.push(header);
            }
        }

        let mut body: Vec<u8, RESPONSE_BUFFER_SIZE> =
            Vec::from_slice(body_data).map_err(|_| Error::BufferFull)?;
        if let Some(len) = content_length {
            while body.len() < len {
                if body.len() == body.capacity() {
                    // Body larger than our buffer: keep what fits.
                    break;
                }

                let mut temp_buf = [0; 256];
                let remaining = (len - body.len()).min(body.capacity() - body.len());
                let read_len = remaining.min(temp_buf.len());

                match self.connection.read(&mut temp_buf[..read_len]) {
                    Ok(0) => return Err(Error::ConnectionClosed),
                    Ok(n) => body
                        .extend_from_slice(&temp_buf[..n])
                        .map_err(|_| Error::BufferFull)?,
                    Err(e) => return Err(e.into()),
                }
            }

            if body.len() > len {
                body.truncate(len);
            }
        }

        Ok(Response {
            status_code,
            headers: response_headers,
            body,
        })
    }
}

fn push(buf: &mut Vec<u8, REQUEST_BUFFER_SIZE>, bytes: &[u8]) -> Result<(), Error> {
    buf.extend_from_slice(bytes).map_err(|_| Error::BufferFull)
}

/// Finds the first occurrence of a slice in another slice and returns its starting position.
fn find_slice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
