//! Hand-written mocks shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use libmodem::gps::{GpsFix, IntegratedGps};
use libmodem::modem::{
    AtDriver, AtReply, Config, HttpStack, HttpsCommands, Modem, Platform, SimStatus, SocketHttp,
    Text,
};
use libmodem::network::error::Error;
use libmodem::network::tap::Tap;
use libmodem::network::{Close, Connection, Read, SerialPort, Write};
use libmodem::time::{CalendarTime, NetworkTime};

// -------------------------
// Serial port
// -------------------------

#[derive(Debug, Default)]
pub struct MockUart {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
    pub baud_rate: Option<u32>,
}

impl MockUart {
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }
}

impl Read for MockUart {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MockUart {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl SerialPort for MockUart {
    fn open(&mut self, baud_rate: u32) -> Result<(), Error> {
        self.baud_rate = Some(baud_rate);
        Ok(())
    }

    fn close(&mut self) {
        self.baud_rate = None;
    }
}

// -------------------------
// Socket
// -------------------------

#[derive(Debug)]
pub struct MockSocket {
    rx: VecDeque<u8>,
    tx: Rc<RefCell<Vec<u8>>>,
    closed: Rc<Cell<bool>>,
}

impl Read for MockSocket {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for MockSocket {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MockSocket {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        self.closed.set(true);
        Ok(())
    }
}

impl Connection for MockSocket {}

// -------------------------
// AT driver
// -------------------------

pub const SCAN_RESPONSE: &[u8] = b"AT+COPS=?\r\r\n+COPS: (1,\"OpA\",\"A\",\"001\",7),(3,\"OpB\",\"B\",\"002\",9),(1,\"OpC\",\"C\",\"003\",7),,(0-4),(0-2)\r\n\r\nOK\r\n";

#[derive(Debug)]
pub struct MockDriver {
    tap: Tap<MockUart>,
    last_command: String,

    // SIM
    pub init_ok: bool,
    pub sim: SimStatus,
    pub pins: Vec<Option<String>>,

    // Registration
    pub registered: bool,
    pub registers_on: Vec<&'static str>,
    pub accepts: Vec<&'static str>,
    pub associated: Option<String>,
    pub registration_polls: usize,
    pub scan_response: Vec<u8>,
    pub scans: usize,

    // Bearer
    pub bearer_ok: bool,
    pub bearer_waits: Vec<u32>,
    pub gprs_attaches: Vec<String>,

    // Attributes
    pub csq: i16,
    pub network_date: &'static str,
    pub network_time: Option<NetworkTime>,

    // GNSS
    pub gps_fix: Option<GpsFix>,
    pub gps_enabled: bool,
    pub gps_toggles: usize,

    // Power
    pub alive_checks: usize,
    pub powered_off: bool,

    // Response pushed after the next raw command
    pub next_reply: Option<Vec<u8>>,

    // Sockets
    pub connect_error: Option<Error>,
    pub connects: Vec<(String, u16, bool, u16)>,
    pub http_response: &'static [u8],
    pub socket_tx: Rc<RefCell<Vec<u8>>>,
    pub socket_closed: Rc<Cell<bool>>,

    // Native HTTPS
    pub https_calls: Vec<String>,
    pub https_url_ok: bool,
    pub https_status: Option<u16>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            tap: Tap::new(MockUart::default()),
            last_command: String::new(),
            init_ok: true,
            sim: SimStatus::Ready,
            pins: Vec::new(),
            registered: true,
            registers_on: Vec::new(),
            accepts: Vec::new(),
            associated: None,
            registration_polls: 0,
            scan_response: SCAN_RESPONSE.to_vec(),
            scans: 0,
            bearer_ok: true,
            bearer_waits: Vec::new(),
            gprs_attaches: Vec::new(),
            csq: 20,
            network_date: "80/01/06,00:00:00+00",
            network_time: None,
            gps_fix: Some(fix()),
            gps_enabled: false,
            gps_toggles: 0,
            alive_checks: 0,
            powered_off: false,
            next_reply: None,
            connect_error: None,
            connects: Vec::new(),
            http_response: b"HTTP/1.1 201 Created\r\n\r\n",
            socket_tx: Rc::new(RefCell::new(Vec::new())),
            socket_closed: Rc::new(Cell::new(false)),
            https_calls: Vec::new(),
            https_url_ok: true,
            https_status: Some(200),
        }
    }
}

impl MockDriver {
    /// Every command written to the modem, without the `AT` prefix.
    pub fn sent(&mut self) -> Vec<String> {
        let tx = String::from_utf8_lossy(&self.tap.inner().tx).into_owned();
        tx.split("\r\n")
            .filter(|line| !line.is_empty())
            .map(|line| line.strip_prefix("AT").unwrap_or(line).to_string())
            .collect()
    }

    pub fn uart(&self) -> &MockUart {
        self.tap.inner()
    }

    pub fn uart_mut(&mut self) -> &mut MockUart {
        self.tap.inner_mut()
    }
}

fn text(s: &str) -> Text {
    Text::try_from(s).unwrap()
}

impl AtDriver for MockDriver {
    type Uart = MockUart;
    type Socket = MockSocket;

    fn tap(&mut self) -> &mut Tap<MockUart> {
        &mut self.tap
    }

    fn send_at(&mut self, command: &str) -> Result<(), Error> {
        self.tap.write_all(b"AT")?;
        self.tap.write_all(command.as_bytes())?;
        self.tap.write_all(b"\r\n")?;
        self.last_command = command.to_string();

        if command == "+COPS=?" {
            self.scans += 1;
            let response = self.scan_response.clone();
            self.tap.inner_mut().feed(&response);
        } else if let Some(reply) = self.next_reply.take() {
            self.tap.inner_mut().feed(&reply);
        }
        Ok(())
    }

    fn wait_response(&mut self, _timeout_ms: u32) -> AtReply {
        if let Some(rest) = self.last_command.strip_prefix("+COPS=1,2,\"") {
            let code = rest.split('"').next().unwrap_or_default();
            return if self.accepts.iter().any(|c| *c == code) {
                self.associated = Some(code.to_string());
                AtReply::Ok
            } else {
                AtReply::Error
            };
        }
        AtReply::Ok
    }

    fn test_at(&mut self, _timeout_ms: u32) -> bool {
        if self.alive_checks > 0 {
            self.alive_checks -= 1;
            true
        } else {
            false
        }
    }

    fn init(&mut self, pin: Option<&str>) -> bool {
        self.pins.push(pin.map(str::to_string));
        self.init_ok
    }

    fn sim_status(&mut self) -> SimStatus {
        self.sim
    }

    fn is_network_connected(&mut self) -> bool {
        self.registration_polls += 1;
        self.registered
            || self
                .associated
                .as_deref()
                .is_some_and(|code| self.registers_on.iter().any(|c| *c == code))
    }

    fn wait_for_network(&mut self, timeout_ms: u32) -> bool {
        self.bearer_waits.push(timeout_ms);
        self.bearer_ok
    }

    fn signal_quality(&mut self) -> i16 {
        self.csq
    }

    fn sim_ccid(&mut self) -> Text {
        text("8933150319000000000")
    }

    fn imei(&mut self) -> Text {
        text("869951030000000")
    }

    fn imsi(&mut self) -> Text {
        text("208150000000000")
    }

    fn local_ip(&mut self) -> Text {
        text("10.0.0.2")
    }

    fn modem_name(&mut self) -> Text {
        text("SIM7080")
    }

    fn operator(&mut self) -> Text {
        text("Orange F")
    }

    fn gsm_date_time(&mut self) -> Text {
        text(self.network_date)
    }

    fn network_time(&mut self) -> Option<NetworkTime> {
        self.network_time
    }

    fn gprs_connect(&mut self, apn: &str) -> bool {
        self.gprs_attaches.push(apn.to_string());
        true
    }

    fn enable_gps(&mut self) -> bool {
        self.gps_enabled = true;
        self.gps_toggles += 1;
        true
    }

    fn disable_gps(&mut self) -> bool {
        self.gps_enabled = false;
        self.gps_toggles += 1;
        true
    }

    fn query_gps(&mut self) -> Option<GpsFix> {
        if self.gps_enabled { self.gps_fix } else { None }
    }

    fn power_off(&mut self) -> bool {
        self.powered_off = true;
        true
    }

    fn connect(
        &mut self,
        host: &str,
        port: u16,
        secure: bool,
        timeout_secs: u16,
    ) -> Result<MockSocket, Error> {
        self.connects
            .push((host.to_string(), port, secure, timeout_secs));
        if let Some(e) = self.connect_error {
            return Err(e);
        }
        Ok(MockSocket {
            rx: self.http_response.iter().copied().collect(),
            tx: self.socket_tx.clone(),
            closed: self.socket_closed.clone(),
        })
    }
}

impl HttpsCommands for MockDriver {
    fn https_begin(&mut self) -> bool {
        self.https_calls.push("begin".to_string());
        true
    }

    fn https_set_url(&mut self, url: &str) -> bool {
        self.https_calls.push(format!("url {}", url));
        self.https_url_ok
    }

    fn https_set_timeout(&mut self, timeout_secs: u16) -> bool {
        self.https_calls.push(format!("timeout {}", timeout_secs));
        true
    }

    fn https_set_user_agent(&mut self, user_agent: &str) -> bool {
        self.https_calls.push(format!("user-agent {}", user_agent));
        true
    }

    fn https_set_content_type(&mut self, content_type: &str) -> bool {
        self.https_calls.push(format!("content-type {}", content_type));
        true
    }

    fn https_post(&mut self, body: &[u8]) -> Option<u16> {
        self.https_calls.push(format!("post {}", body.len()));
        self.https_status
    }

    fn https_end(&mut self) {
        self.https_calls.push("end".to_string());
    }
}

// -------------------------
// Platform
// -------------------------

/// Fake monotonic clock shared between a test and its platform.
#[derive(Debug, Clone, Default)]
pub struct Clock(Rc<Cell<u64>>);

impl Clock {
    pub fn now_ms(&self) -> u64 {
        self.0.get() / 1_000_000
    }

    pub fn advance_ms(&self, ms: u64) {
        self.0.set(self.0.get() + ms * 1_000_000);
    }

    fn advance_ns(&self, ns: u64) {
        self.0.set(self.0.get() + ns);
    }
}

#[derive(Debug, Default)]
pub struct MockPin {
    pub levels: Vec<bool>,
}

impl MockPin {
    pub fn is_high(&self) -> bool {
        self.levels.last().copied().unwrap_or(false)
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.push(true);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockPlatform {
    pub clock: Clock,
    pub power: MockPin,
    pub reset: Option<MockPin>,
    pub system_time: Option<i64>,
    pub time_sets: Vec<i64>,
}

impl embedded_hal::delay::DelayNs for MockPlatform {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_ns(u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.clock.advance_ms(u64::from(ms));
    }
}

impl Platform for MockPlatform {
    type Pin = MockPin;

    fn power_pin(&mut self) -> &mut MockPin {
        &mut self.power
    }

    fn reset_pin(&mut self) -> Option<&mut MockPin> {
        self.reset.as_mut()
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn set_system_time(&mut self, unix_secs: i64) {
        self.system_time = Some(unix_secs);
        self.time_sets.push(unix_secs);
    }
}

// -------------------------
// Fixtures
// -------------------------

/// 2024-04-02 11:39:57 UTC, somewhere in Brittany.
pub fn fix() -> GpsFix {
    GpsFix {
        latitude: 48.117,
        longitude: -1.677,
        altitude: 52.0,
        accuracy: 1.2,
        time: CalendarTime {
            year: 2024,
            month: 4,
            day: 2,
            hour: 11,
            minute: 39,
            second: 57,
        },
    }
}

pub const FIX_UNIX: i64 = 1_712_057_997;

pub type TestModem<H = SocketHttp> = Modem<MockDriver, MockPlatform, IntegratedGps, H>;

pub fn modem_with<H: HttpStack<MockDriver>>(
    driver: MockDriver,
    config: Config,
    http: H,
) -> (TestModem<H>, Clock) {
    let platform = MockPlatform::default();
    let clock = platform.clock.clone();
    (
        Modem::new(driver, platform, IntegratedGps, http, config),
        clock,
    )
}

pub fn modem(driver: MockDriver) -> (TestModem, Clock) {
    modem_with(driver, Config::default(), SocketHttp)
}
