//! Errors from modem control and configuration.

use crate::network;
use crate::time::TzError;

/// Errors returned by [`Modem`](super::Modem) operations outside the data path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The pending AT command queue is full.
    QueueFull,
    /// The command does not fit in a queue slot.
    CommandTooLong,
    /// A configuration string does not fit its fixed capacity.
    ValueTooLong,
    /// The timezone rule could not be parsed.
    Timezone(TzError),
    /// The configuration document could not be decoded.
    InvalidConfig,
    /// The serial link failed.
    Transport(network::error::Error),
}

impl From<network::error::Error> for Error {
    fn from(e: network::error::Error) -> Self {
        Error::Transport(e)
    }
}

impl From<TzError> for Error {
    fn from(e: TzError) -> Self {
        Error::Timezone(e)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::QueueFull => write!(f, "AT command queue full"),
            Error::CommandTooLong => write!(f, "AT command too long"),
            Error::ValueTooLong => write!(f, "value too long"),
            Error::Timezone(e) => write!(f, "timezone: {}", e),
            Error::InvalidConfig => write!(f, "invalid configuration"),
            Error::Transport(e) => write!(f, "transport: {}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::QueueFull => defmt::write!(f, "QueueFull"),
            Error::CommandTooLong => defmt::write!(f, "CommandTooLong"),
            Error::ValueTooLong => defmt::write!(f, "ValueTooLong"),
            Error::Timezone(e) => defmt::write!(f, "Timezone({})", e),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
            Error::Transport(e) => defmt::write!(f, "Transport({})", e),
        }
    }
}
