//! Operator discovery and manual association.
//!
//! `AT+COPS=?` answers with one long line of parenthesized tuples:
//!
//! ```text
//! +COPS: (1,"Orange F","Orange","20801",7),(3,"SFR","SFR","20810",9),,(0-4),(0-2)
//! ```
//!
//! The scan can take over a minute and the line is longer than a normal
//! response buffer, so it is parsed byte by byte straight off the serial
//! link. Range tuples at the end (`(0-4)`) are skipped, forbidden operators
//! are dropped and the rest are kept in the order the modem listed them.

use super::driver::{AtDriver, AtReply};
use super::profile::ModemProfile;
use crate::network::Read;
use crate::network::tap::Tap;
use embedded_hal::delay::DelayNs;
use heapless::{String, Vec};
use serde::Serialize;

/// Most operators kept from one scan.
pub const MAX_OPERATORS: usize = 16;
/// Longest operator name kept.
pub const NAME_LEN: usize = 32;
/// Longest numeric code (MCC + MNC) kept.
pub const CODE_LEN: usize = 8;

/// How long to wait for the scan to start answering.
pub const SCAN_HEADER_TIMEOUT_MS: u32 = 70_000;
/// Gap between bytes that ends the scan response.
pub const SCAN_BYTE_TIMEOUT_MS: u32 = 1_000;
/// How long the modem may take to accept a manual association.
pub const ASSOCIATION_TIMEOUT_MS: u32 = 60_000;

/// Bytes tolerated before `+COPS:` shows up (echo, URCs).
const MAX_HEADER_NOISE: usize = 512;
/// Longest tuple, parentheses excluded.
const TUPLE_LEN: usize = 96;
const POLL_INTERVAL_MS: u32 = 10;

/// Operator status from a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Visibility {
    /// Status unknown.
    Unknown,
    /// Operator available.
    Available,
    /// Currently registered.
    Current,
    /// Listed in the SIM's forbidden networks.
    Forbidden,
}

impl Visibility {
    /// From the `<stat>` field; out-of-range codes are `Unknown`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Visibility::Available,
            2 => Visibility::Current,
            3 => Visibility::Forbidden,
            _ => Visibility::Unknown,
        }
    }
}

/// An operator found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorCandidate {
    /// Status at scan time.
    pub visibility: Visibility,
    /// Long alphanumeric name.
    pub name: String<NAME_LEN>,
    /// MCC and MNC, e.g. `20801`.
    pub numeric_code: String<CODE_LEN>,
    /// Access technology code (7 = LTE-M, 9 = NB-IoT).
    pub access_technology: u8,
}

/// Operators kept from the last scan, in discovery order.
pub type OperatorList = Vec<OperatorCandidate, MAX_OPERATORS>;

/// Why a scan produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanError {
    /// The modem never started its `+COPS:` answer.
    NoResponse,
    /// Something other than a scan answer came back.
    UnexpectedResponse,
    /// The scan command could not be written.
    Transport,
}

impl core::fmt::Display for ScanError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ScanError::NoResponse => write!(f, "no scan response"),
            ScanError::UnexpectedResponse => write!(f, "unexpected scan response"),
            ScanError::Transport => write!(f, "transport error"),
        }
    }
}

/// Bytes arriving over time.
pub trait ByteSource {
    /// Next byte, or `None` if none arrives within `timeout_ms`.
    fn next_byte(&mut self, timeout_ms: u32) -> Option<u8>;
}

/// A [`ByteSource`] reading the modem's tap and waiting with the platform's
/// delay.
pub struct TimedReader<'a, S, P> {
    tap: &'a mut Tap<S>,
    delay: &'a mut P,
}

impl<'a, S: Read, P: DelayNs> TimedReader<'a, S, P> {
    /// Read from `tap`, sleeping on `delay` while it is idle.
    pub fn new(tap: &'a mut Tap<S>, delay: &'a mut P) -> Self {
        Self { tap, delay }
    }
}

impl<S: Read, P: DelayNs> ByteSource for TimedReader<'_, S, P> {
    fn next_byte(&mut self, timeout_ms: u32) -> Option<u8> {
        let mut waited = 0;
        loop {
            if self.tap.available() {
                let mut byte = [0u8; 1];
                return match self.tap.read(&mut byte) {
                    Ok(1) => Some(byte[0]),
                    _ => None,
                };
            }
            if waited >= timeout_ms {
                return None;
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
            waited += POLL_INTERVAL_MS;
        }
    }
}

impl<S, P> core::fmt::Debug for TimedReader<'_, S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimedReader").finish_non_exhaustive()
    }
}

/// Parse a `+COPS=?` answer from `source` into `operators`.
///
/// Returns once the tuple list ends (end of line or a byte gap of
/// [`SCAN_BYTE_TIMEOUT_MS`]). Bytes after the list are left unread.
pub fn parse_scan<B: ByteSource>(
    source: &mut B,
    operators: &mut OperatorList,
) -> Result<(), ScanError> {
    wait_header(source)?;

    loop {
        // Between tuples: commas and spaces, a '(' opens the next one.
        match source.next_byte(SCAN_BYTE_TIMEOUT_MS) {
            Some(b'(') => {}
            Some(b',') | Some(b' ') => continue,
            Some(_) | None => return Ok(()),
        }

        let Some(tuple) = read_tuple(source) else {
            return Ok(());
        };
        let Some(candidate) = parse_tuple(&tuple) else {
            continue;
        };

        if candidate.visibility == Visibility::Forbidden {
            warn!(
                "Skipping forbidden operator {} ({})",
                candidate.name.as_str(),
                candidate.access_technology
            );
            continue;
        }

        info!(
            "Found operator {} ({}) code={}, state={:?}",
            candidate.name.as_str(),
            candidate.access_technology,
            candidate.numeric_code.as_str(),
            candidate.visibility
        );
        if operators.push(candidate).is_err() {
            warn!("Operator list full, ignoring the rest");
        }
    }
}

/// Consume up to and including `+COPS:`.
fn wait_header<B: ByteSource>(source: &mut B) -> Result<(), ScanError> {
    const HEADER: &[u8] = b"+COPS:";
    let mut matched = 0;
    for _ in 0..MAX_HEADER_NOISE {
        let byte = source
            .next_byte(SCAN_HEADER_TIMEOUT_MS)
            .ok_or(ScanError::NoResponse)?;
        if byte == HEADER[matched] {
            matched += 1;
            if matched == HEADER.len() {
                return Ok(());
            }
        } else {
            matched = usize::from(byte == HEADER[0]);
        }
    }
    Err(ScanError::UnexpectedResponse)
}

/// Read a tuple body up to its closing parenthesis. `None` if the response
/// stops first. Non-ASCII bytes become `?` and oversized tuples come back
/// truncated.
fn read_tuple<B: ByteSource>(source: &mut B) -> Option<String<TUPLE_LEN>> {
    let mut tuple = String::new();
    let mut quoted = false;
    let mut dropped = 0usize;
    loop {
        let byte = source.next_byte(SCAN_BYTE_TIMEOUT_MS)?;
        match byte {
            b')' if !quoted => {
                if dropped > 0 {
                    debug!("Operator entry truncated, {} bytes dropped", dropped);
                }
                return Some(tuple);
            }
            b'\r' | b'\n' => return None,
            b'"' => quoted = !quoted,
            _ => {}
        }
        let c = if byte.is_ascii() { byte as char } else { '?' };
        if tuple.push(c).is_err() {
            dropped += 1;
        }
    }
}

/// `stat,"long","short","numeric",act`. Range tuples and nameless entries
/// yield `None`.
fn parse_tuple(tuple: &str) -> Option<OperatorCandidate> {
    let mut fields: Vec<&str, 6> = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, b) in tuple.bytes().enumerate() {
        match b {
            b'"' => quoted = !quoted,
            b',' if !quoted => {
                fields.push(&tuple[start..i]).ok()?;
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&tuple[start..]).ok()?;

    let visibility = fields.first()?.trim().parse::<u8>().ok()?;
    let name = unquote(fields.get(1)?);
    if name.is_empty() {
        return None;
    }
    let numeric_code = unquote(fields.get(3).copied().unwrap_or_default());
    let access_technology = fields
        .get(4)
        .and_then(|f| f.trim().parse::<u8>().ok())
        .unwrap_or(0);

    Some(OperatorCandidate {
        visibility: Visibility::from_code(visibility),
        name: truncated(name),
        numeric_code: truncated(numeric_code),
        access_technology,
    })
}

fn unquote(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Ask the modem to register on `candidate`. Success only means the request
/// was accepted; registration itself shows up later.
pub fn associate<D: AtDriver>(
    driver: &mut D,
    profile: ModemProfile,
    candidate: &OperatorCandidate,
) -> bool {
    profile.apply_access_technology(driver, candidate.access_technology);
    driver.command(
        format_args!(
            "+COPS=1,2,\"{}\",{}",
            candidate.numeric_code.as_str(),
            candidate.access_technology
        ),
        ASSOCIATION_TIMEOUT_MS,
    ) == AtReply::Ok
}
