//! # libmodem - cellular connectivity for field sensors
//!
//! Brings an LTE-M / NB-IoT / Cat-1 modem from power-up to a usable data
//! bearer and keeps it there. This library is designed for battery powered
//! embedded devices and supports `no_std` environments.
//!
//! ## Features
//!
//! ### Connectivity
//! - **Lifecycle state machine**: SIM unlock, registration, bearer activation
//! - **Operator fallback**: manual scan and association when automatic
//!   registration stalls
//! - **Data path**: raw TCP sends and JSON HTTP POSTs, either over a socket or
//!   through the modem's own HTTPS client
//!
//! ### Location and Time
//! - GPS from the modem's integrated GNSS engine or a discrete NMEA receiver
//! - Wall-clock sync from GPS, falling back to network time
//! - POSIX timezone rules for local time display
//!
//! ### Diagnostics
//! - Line-buffered AT transcripts
//! - Queued raw AT commands for field debugging
//! - JSON status snapshot
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libmodem = "0.1.0"
//! ```
//!
//! ### Bring-up Example
//!
//! ```rust,ignore
//! use libmodem::gps::IntegratedGps;
//! use libmodem::modem::{Config, Modem, SocketHttp};
//!
//! let config = Config::from_json(settings)?;
//! let mut modem = Modem::new(driver, board, IntegratedGps, SocketHttp, config)
//!     .with_observer(|state| led.show(state));
//! modem.begin()?;
//!
//! loop {
//!     modem.step();
//!     if modem.is_ready() {
//!         modem.http_post("https://api.example.com/hive", payload, 30)?;
//!     }
//! }
//! ```
//!
//! The AT command library and the board are supplied by implementing
//! [`modem::AtDriver`] and [`modem::Platform`].
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Byte-stream layer: serial and socket traits, transcript tap and HTTP.
///
/// Everything the modem exchanges, AT commands and application payloads
/// alike, goes through the synchronous traits defined here.
pub mod network;

/// GPS acquisition backends and NMEA parsing.
pub mod gps;

/// Calendar conversions, wall-clock tracking and timezone rules.
pub mod time;

/// The connectivity state machine and its seams to the AT library and board.
pub mod modem;
