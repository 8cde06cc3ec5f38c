//! Seams to the AT command library and the board.
//!
//! The state machine never formats wire-level commands for standard services
//! itself; it goes through [`AtDriver`]. Raw commands (band configuration,
//! operator selection, injected debug commands) go through
//! [`AtDriver::send_at`], which writes via the driver's transcript [`Tap`] so
//! they show up in debug transcripts.

use crate::gps::GpsFix;
use crate::modem::state::SimStatus;
use crate::network::error::Error;
use crate::network::tap::Tap;
use crate::network::{Connection, SerialPort, Write};
use crate::time::NetworkTime;
use core::fmt::Write as _;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use heapless::String;

/// Longest command [`AtDriver::command`] will format.
pub const COMMAND_LEN: usize = 192;

/// How long [`AtDriver::command`] callers usually wait for a result code.
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u32 = 1000;

/// Capacity of identity strings returned by the driver.
pub const TEXT_LEN: usize = 64;

/// An identity or status string (ICCID, IMEI, operator name, ...).
pub type Text = String<TEXT_LEN>;

/// Outcome of waiting for a command's final result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtReply {
    /// `OK`
    Ok,
    /// `ERROR` or `+CME ERROR`
    Error,
    /// Nothing conclusive within the timeout.
    Timeout,
}

/// The AT command library driving the modem.
///
/// Every method is synchronous and bounded by the timeout it is given or by
/// the library's own default.
pub trait AtDriver {
    /// UART the modem is wired to.
    type Uart: SerialPort;
    /// Socket handed out by [`connect`](Self::connect).
    type Socket: Connection;

    /// The UART, behind the transcript tap.
    fn tap(&mut self) -> &mut Tap<Self::Uart>;

    /// Send `AT<command>\r\n`.
    fn send_at(&mut self, command: &str) -> Result<(), Error> {
        let tap = self.tap();
        tap.write_all(b"AT")?;
        tap.write_all(command.as_bytes())?;
        tap.write_all(b"\r\n")?;
        tap.flush()
    }

    /// Format a command, send it and wait for its result code.
    ///
    /// ```rust,ignore
    /// driver.command(format_args!("+CGDCONT=1,\"IP\",\"{}\"", apn), DEFAULT_RESPONSE_TIMEOUT_MS);
    /// ```
    fn command(&mut self, args: core::fmt::Arguments<'_>, timeout_ms: u32) -> AtReply {
        let mut command: String<COMMAND_LEN> = String::new();
        if command.write_fmt(args).is_err() {
            warn!("AT command too long, not sent");
            return AtReply::Error;
        }
        if let Err(e) = self.send_at(&command) {
            warn!("Failed to send AT{}: {}", command.as_str(), e);
            return AtReply::Error;
        }
        self.wait_response(timeout_ms)
    }

    /// Wait for the final result code of the last command.
    fn wait_response(&mut self, timeout_ms: u32) -> AtReply;

    /// Whether the modem answers a bare `AT`.
    fn test_at(&mut self, timeout_ms: u32) -> bool;

    /// Restart the command interface and unlock the SIM with `pin`.
    fn init(&mut self, pin: Option<&str>) -> bool;

    /// Current SIM state.
    fn sim_status(&mut self) -> SimStatus;

    /// Registered on a network (home or roaming).
    fn is_network_connected(&mut self) -> bool;

    /// Block until registered and attached, or `timeout_ms` passes.
    fn wait_for_network(&mut self, timeout_ms: u32) -> bool;

    /// Raw `+CSQ` RSSI: 0 to 31, 99 for unknown, negative on failure.
    fn signal_quality(&mut self) -> i16;

    /// SIM ICCID.
    fn sim_ccid(&mut self) -> Text;

    /// Modem IMEI.
    fn imei(&mut self) -> Text;

    /// SIM IMSI.
    fn imsi(&mut self) -> Text;

    /// Address assigned by the packet-data bearer.
    fn local_ip(&mut self) -> Text;

    /// Modem model name.
    fn modem_name(&mut self) -> Text;

    /// Name of the registered operator.
    fn operator(&mut self) -> Text;

    /// Network date as `yy/MM/dd,hh:mm:ss±zz`.
    fn gsm_date_time(&mut self) -> Text;

    /// Network date and time with its zone offset.
    fn network_time(&mut self) -> Option<NetworkTime>;

    /// Attach and activate a PDP context on `apn`.
    fn gprs_connect(&mut self, apn: &str) -> bool;

    /// Power up the integrated GNSS engine.
    fn enable_gps(&mut self) -> bool;

    /// Power down the integrated GNSS engine.
    fn disable_gps(&mut self) -> bool;

    /// Current integrated GNSS reading, if the engine has a solution.
    fn query_gps(&mut self) -> Option<GpsFix>;

    /// Ask the modem to shut down.
    fn power_off(&mut self) -> bool;

    /// Open a TCP (or TLS when `secure`) socket.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        secure: bool,
        timeout_secs: u16,
    ) -> Result<Self::Socket, Error>;
}

/// The modem's built-in HTTPS client (`+HTTP*` commands).
pub trait HttpsCommands: AtDriver {
    /// Start an HTTPS session.
    fn https_begin(&mut self) -> bool;
    /// Set the request URL.
    fn https_set_url(&mut self, url: &str) -> bool;
    /// Set the receive timeout.
    fn https_set_timeout(&mut self, timeout_secs: u16) -> bool;
    /// Set the `User-Agent` header.
    fn https_set_user_agent(&mut self, user_agent: &str) -> bool;
    /// Set the `Content-Type` header.
    fn https_set_content_type(&mut self, content_type: &str) -> bool;
    /// POST `body`, returning the HTTP status or `None` on failure.
    fn https_post(&mut self, body: &[u8]) -> Option<u16>;
    /// Tear the session down.
    fn https_end(&mut self);
}

/// Board services the state machine needs.
pub trait Platform: DelayNs {
    /// Output pin type for the power and reset lines.
    type Pin: OutputPin;

    /// Line pulsed to toggle modem power.
    fn power_pin(&mut self) -> &mut Self::Pin;

    /// Reset line, when the board has one.
    fn reset_pin(&mut self) -> Option<&mut Self::Pin>;

    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Set the system wall clock to `unix_secs` (UTC).
    fn set_system_time(&mut self, unix_secs: i64);
}
