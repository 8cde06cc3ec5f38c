//! Outbound data once the bearer is up.
//!
//! Two HTTP strategies are offered and one is picked when the modem is built:
//! [`SocketHttp`] speaks HTTP/1.1 itself over a driver socket (plain or TLS),
//! while [`NativeHttps`] drives the modem's own HTTPS client.

use super::driver::{AtDriver, HttpsCommands};
use crate::network::application::http::{Client, Url};
use crate::network::error::Error;
use crate::network::Close;

/// Content type of every POST.
pub const CONTENT_TYPE: &str = "application/json";

/// Why a data-path operation failed. Never retried internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataError {
    /// Bad URL or empty payload. Nothing was sent.
    InvalidArgument,
    /// The peer or the modem did not answer in time.
    Timeout,
    /// No connection could be made.
    ConnectionFailed,
    /// The peer answered with something that is not HTTP.
    InvalidResponse,
    /// Anything else.
    UnknownError,
}

impl From<Error> for DataError {
    fn from(e: Error) -> Self {
        match e {
            Error::Timeout => DataError::Timeout,
            Error::ConnectionRefused | Error::NotOpen => DataError::ConnectionFailed,
            Error::ProtocolError | Error::ConnectionClosed => DataError::InvalidResponse,
            _ => DataError::UnknownError,
        }
    }
}

impl core::fmt::Display for DataError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DataError::InvalidArgument => write!(f, "invalid argument"),
            DataError::Timeout => write!(f, "timeout"),
            DataError::ConnectionFailed => write!(f, "connection failed"),
            DataError::InvalidResponse => write!(f, "invalid response"),
            DataError::UnknownError => write!(f, "unknown error"),
        }
    }
}

/// A way of sending an HTTP POST through the modem.
pub trait HttpStack<D: AtDriver> {
    /// POST `body` to `url` (also given `raw` as configured) and return the
    /// response status.
    fn post(
        &mut self,
        driver: &mut D,
        url: &Url<'_>,
        raw: &str,
        body: &[u8],
        user_agent: &str,
        timeout_secs: u16,
    ) -> Result<u16, DataError>;
}

/// HTTP/1.1 over a driver socket, TLS for `https`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketHttp;

impl<D: AtDriver> HttpStack<D> for SocketHttp {
    fn post(
        &mut self,
        driver: &mut D,
        url: &Url<'_>,
        _raw: &str,
        body: &[u8],
        user_agent: &str,
        timeout_secs: u16,
    ) -> Result<u16, DataError> {
        if !driver.is_network_connected() {
            return Err(DataError::ConnectionFailed);
        }

        let socket = driver
            .connect(url.host, url.port, url.scheme.is_secure(), timeout_secs)
            .map_err(|e| match e {
                Error::Timeout => DataError::Timeout,
                _ => DataError::ConnectionFailed,
            })?;

        let mut client = Client::new(socket);
        let result = client.post(url.host, url.path, CONTENT_TYPE, user_agent, body);
        if client.into_inner().close().is_err() {
            debug!("Socket close failed");
        }

        let response = result?;
        debug!("POST {} -> {}", url.path, response.status_code);
        Ok(response.status_code)
    }
}

/// The modem's built-in HTTPS client.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeHttps;

impl<D: HttpsCommands> HttpStack<D> for NativeHttps {
    fn post(
        &mut self,
        driver: &mut D,
        _url: &Url<'_>,
        raw: &str,
        body: &[u8],
        user_agent: &str,
        timeout_secs: u16,
    ) -> Result<u16, DataError> {
        if !driver.https_begin() {
            return Err(DataError::ConnectionFailed);
        }
        if !driver.https_set_url(raw) {
            driver.https_end();
            return Err(DataError::InvalidArgument);
        }
        driver.https_set_timeout(timeout_secs);
        driver.https_set_user_agent(user_agent);
        driver.https_set_content_type(CONTENT_TYPE);
        let status = driver.https_post(body);
        driver.https_end();
        status.ok_or(DataError::ConnectionFailed)
    }
}
