//! Cellular modem connectivity state machine.
//!
//! [`Modem`] takes the modem from power-up to a usable packet-data bearer:
//! SIM unlock, network registration (falling back to a manual operator scan
//! when automatic registration stalls), a GPS fix, bearer activation and
//! wall-clock synchronization.
//!
//! It is driven by calling [`Modem::step`] from a single polling context. Each
//! call does whatever the current state's time guard allows and returns.
//! Stages run in lifecycle order within one call, so a transition made early
//! in a step is acted on later in the same step.
//!
//! ```text
//!  Off ──begin()──▶ Starting ──SIM ok──▶ WaitRegistration ──registered──▶ AcquiringFix
//!                     ▲   │                  │       ▲                        │
//!                     │   └─SIM fault─▶ Error│       │accepted          fix / timeout
//!                     │                      ▼       │                        ▼
//!                     │                    Searching ┘                   Connecting
//!                     └──────────────────── bearer failed ◀──────────────────┤
//!                                                                            ▼
//!                                                                          Ready
//! ```
//!
//! Transitions are reported to a [`StateObserver`], synchronously and once
//! per actual change.

use crate::gps::{GpsBackend, GpsFix, GpsFixState};
use crate::network::application::http::Url;
use crate::network::error::Error as TransportError;
use crate::network::tap::TranscriptFn;
use crate::network::{Close, SerialPort, Write};
use crate::time::{self, LocalTime, TimeSyncState, TzRule, WallClock};
use embedded_hal::digital::OutputPin;
use heapless::{Deque, String};

pub mod config;
pub mod data;
pub mod driver;
pub mod error;
pub mod operator;
pub mod profile;
pub mod state;
pub mod status;

pub use config::Config;
pub use data::{DataError, HttpStack, NativeHttps, SocketHttp};
pub use driver::{AtDriver, AtReply, HttpsCommands, Platform, Text};
pub use error::Error;
pub use operator::{OperatorCandidate, OperatorList, ScanError, Visibility};
pub use profile::ModemProfile;
pub use state::{LifecycleState, PreferredMode, SimFailurePolicy, SimFault, SimStatus, StateObserver};
pub use status::ModemStatus;

use driver::DEFAULT_RESPONSE_TIMEOUT_MS;
use operator::TimedReader;

/// Modem UART speed.
pub const MODEM_BAUD_RATE: u32 = 115_200;

/// Registration checks allowed per association attempt.
pub const REGISTRATION_CHECKS: i8 = 7;
/// Interval between registration checks.
pub const REGISTRATION_CHECK_INTERVAL_MS: u64 = 2_000;
/// Interval between GPS polls while acquiring a fix.
pub const GPS_POLL_INTERVAL_MS: u64 = 5_000;
/// Interval between refreshes of the cached modem attributes.
pub const REFRESH_INTERVAL_MS: u64 = 30_000;

/// Queued AT commands waiting to be sent.
pub const AT_QUEUE_LEN: usize = 8;
/// Longest queued AT command.
pub const AT_COMMAND_LEN: usize = 128;

const AT_SETTLE_MS: u32 = 5_000;
const AT_ACTIVITY_WAIT_MS: u32 = 10_000;
const AT_ACTIVITY_POLL_MS: u32 = 500;

const POWER_OFF_ATTEMPTS: u32 = 60;
const POWER_OFF_CHECK_MS: u32 = 500;

const FPLMN_CLEAR_TIMEOUT_MS: u32 = 2_000;

/// A queued raw AT command.
pub type AtCommand = String<AT_COMMAND_LEN>;

/// Attributes read back from the modem on every refresh.
#[derive(Debug, Default, Clone)]
struct ModemInfo {
    model: Text,
    iccid: Text,
    imei: Text,
    imsi: Text,
    local_ip: Text,
    operator: Text,
    signal: u8,
}

/// Map a raw `+CSQ` RSSI (0 to 31, 99 unknown) onto 0 to 100.
pub fn signal_percent(csq: i16) -> u8 {
    if (0..=31).contains(&csq) {
        (csq * 100 / 31) as u8
    } else {
        0
    }
}

/// The connectivity state machine.
///
/// * `D`: AT command library
/// * `P`: board services (pins, delays, clocks)
/// * `G`: GPS backend
/// * `H`: HTTP strategy
/// * `O`: transition observer
pub struct Modem<D, P, G, H, O = ()> {
    driver: D,
    platform: P,
    gps: G,
    http: H,
    observer: O,
    config: Config,
    tz: TzRule,

    state: LifecycleState,
    time_state: TimeSyncState,
    gps_state: GpsFixState,
    fix: GpsFix,
    sim_fault: Option<SimFault>,
    info: ModemInfo,
    clock: Option<WallClock>,

    operators: OperatorList,
    candidate: Option<usize>,
    registration_checks: i8,

    last_registration_check: Option<u64>,
    last_gps_poll: Option<u64>,
    last_refresh: Option<u64>,
    gps_started_at: u64,

    commands: Deque<AtCommand, AT_QUEUE_LEN>,
}

impl<D, P, G, H> Modem<D, P, G, H, ()>
where
    D: AtDriver,
    P: Platform,
    G: GpsBackend<D>,
    H: HttpStack<D>,
{
    /// Build a powered-off modem.
    pub fn new(driver: D, platform: P, gps: G, http: H, config: Config) -> Self {
        let tz = parse_timezone(&config.timezone);
        Self {
            driver,
            platform,
            gps,
            http,
            observer: (),
            config,
            tz,
            state: LifecycleState::Off,
            time_state: TimeSyncState::Off,
            gps_state: GpsFixState::Off,
            fix: GpsFix::default(),
            sim_fault: None,
            info: ModemInfo::default(),
            clock: None,
            operators: OperatorList::new(),
            candidate: None,
            registration_checks: REGISTRATION_CHECKS,
            last_registration_check: None,
            last_gps_poll: None,
            last_refresh: None,
            gps_started_at: 0,
            commands: Deque::new(),
        }
    }
}

impl<D, P, G, H, O> Modem<D, P, G, H, O>
where
    D: AtDriver,
    P: Platform,
    G: GpsBackend<D>,
    H: HttpStack<D>,
    O: StateObserver,
{
    /// Replace the transition observer.
    pub fn with_observer<O2: StateObserver>(self, observer: O2) -> Modem<D, P, G, H, O2> {
        Modem {
            driver: self.driver,
            platform: self.platform,
            gps: self.gps,
            http: self.http,
            observer,
            config: self.config,
            tz: self.tz,
            state: self.state,
            time_state: self.time_state,
            gps_state: self.gps_state,
            fix: self.fix,
            sim_fault: self.sim_fault,
            info: self.info,
            clock: self.clock,
            operators: self.operators,
            candidate: self.candidate,
            registration_checks: self.registration_checks,
            last_registration_check: self.last_registration_check,
            last_gps_poll: self.last_gps_poll,
            last_refresh: self.last_refresh,
            gps_started_at: self.gps_started_at,
            commands: self.commands,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Power the modem up and enter [`LifecycleState::Starting`].
    ///
    /// Does nothing unless the modem is [`Off`](LifecycleState::Off).
    pub fn begin(&mut self) -> Result<(), Error> {
        if self.state != LifecycleState::Off {
            return Ok(());
        }

        info!("Starting modem...");

        if self.set_reset(false) {
            self.platform.delay_ms(100);
            self.set_reset(true);
            self.platform.delay_ms(2600);
            self.set_reset(false);
        }

        self.pulse_power();

        self.driver.tap().open(MODEM_BAUD_RATE)?;
        self.gps.start()?;

        self.set_state(LifecycleState::Starting);
        Ok(())
    }

    /// Run one cooperative tick.
    pub fn step(&mut self) {
        if self.state == LifecycleState::Starting {
            self.start_sim();
        }

        if self.state == LifecycleState::WaitRegistration
            && self.due(self.last_registration_check, REGISTRATION_CHECK_INTERVAL_MS)
        {
            self.check_registration();
            self.last_registration_check = Some(self.platform.now_ms());
        }

        if self.state == LifecycleState::Searching {
            self.search();
        }

        if self.state == LifecycleState::AcquiringFix
            && self.due(self.last_gps_poll, GPS_POLL_INTERVAL_MS)
        {
            self.acquire_fix();
        }

        if self.state == LifecycleState::Connecting {
            self.connect();
        }

        if self.state > LifecycleState::Off && self.due(self.last_refresh, REFRESH_INTERVAL_MS) {
            self.sync();
            self.last_refresh = Some(self.platform.now_ms());
        }

        self.dequeue_command();
    }

    /// Shut the modem down and enter [`LifecycleState::Off`].
    ///
    /// Waits for the modem to stop answering `AT`: at most 60 checks, each a
    /// 500 ms `AT` timeout plus a 500 ms pause, so about a minute.
    pub fn power_off(&mut self) {
        info!("Powering off modem...");

        if !self.driver.power_off() {
            warn!("Power-off command not acknowledged");
        }

        let mut attempts = 0;
        while attempts < POWER_OFF_ATTEMPTS && self.driver.test_at(POWER_OFF_CHECK_MS) {
            self.platform.delay_ms(POWER_OFF_CHECK_MS);
            attempts += 1;
        }
        if attempts == POWER_OFF_ATTEMPTS {
            warn!("Modem still answering after power-off");
        }

        self.driver.tap().close();
        self.gps.stop();
        self.set_power(false);
        self.set_reset(false);

        self.candidate = None;
        self.set_state(LifecycleState::Off);
    }

    /// Force an operator scan on the next step.
    pub fn scan_for_operators(&mut self) {
        if self.state <= LifecycleState::Off {
            warn!("Cannot scan while modem is {}", self.state.as_str());
            return;
        }
        self.set_state(LifecycleState::Searching);
    }

    // ------------------------------------------------------------------
    // Stages
    // ------------------------------------------------------------------

    fn start_sim(&mut self) {
        info!("Init SIM...");

        let pin = (!self.config.pin.is_empty()).then_some(self.config.pin.as_str());
        if self.driver.init(pin) {
            info!("SIM Ready!");
            self.sim_fault = None;

            self.config.profile.configure_radio(&mut self.driver, &self.config);
            let reply = self.driver.command(
                format_args!("+CGDCONT=1,\"IP\",\"{}\"", self.config.apn.as_str()),
                DEFAULT_RESPONSE_TIMEOUT_MS,
            );
            if reply != AtReply::Ok {
                warn!("+CGDCONT not acknowledged: {:?}", reply);
            }
            self.config
                .profile
                .apply_access_technology(&mut self.driver, self.config.preferred_mode.act());

            self.time_state = TimeSyncState::Syncing;
            self.registration_checks = REGISTRATION_CHECKS;
            self.last_registration_check = None;
            self.set_state(LifecycleState::WaitRegistration);
            return;
        }

        let status = self.driver.sim_status();
        let Some(fault) = SimFault::from_status(status) else {
            warn!("SIM reports ready but init failed, retrying");
            return;
        };

        error!("Init SIM Error: {}", fault);
        self.sim_fault = Some(fault);
        match self.config.sim_failure {
            SimFailurePolicy::Repower => self.pulse_power(),
            SimFailurePolicy::Halt => self.set_state(LifecycleState::Error),
        }
    }

    fn check_registration(&mut self) {
        info!("Check registration...");
        self.registration_checks -= 1;

        if self.driver.is_network_connected() {
            info!("Registered!");
            self.activate_gps();
            self.gps_started_at = self.platform.now_ms();
            self.last_gps_poll = None;
            self.set_state(LifecycleState::AcquiringFix);
        } else if self.registration_checks <= 0 {
            if let Some(index) = self.candidate {
                if let Some(candidate) = self.operators.get(index) {
                    warn!(
                        "Timeout registering with {} ({})",
                        candidate.name.as_str(),
                        candidate.access_technology
                    );
                }
                self.try_candidates(index + 1);
            } else {
                warn!("Timeout registering with any operator");
                self.set_state(LifecycleState::Searching);
            }
        } else {
            info!(
                "Not registered yet ({} checks left)",
                self.registration_checks
            );
        }

        self.sync();
    }

    fn search(&mut self) {
        info!("Searching for operators...");

        match self.scan() {
            Ok(()) => {
                self.try_candidates(0);
            }
            Err(e) => warn!("Operator scan failed: {}", e),
        }

        self.sync();
    }

    fn acquire_fix(&mut self) {
        self.sync();

        let elapsed = self.platform.now_ms().saturating_sub(self.gps_started_at);
        if self.gps_state == GpsFixState::Synced {
            self.set_state(LifecycleState::Connecting);
        } else if elapsed >= u64::from(self.config.gps_timeout_secs) * 1000 {
            error!("GPS Sync timeout after {} ms!", elapsed);
            self.gps_state = GpsFixState::Timeout;
            self.set_state(LifecycleState::Connecting);
        } else {
            self.last_gps_poll = Some(self.platform.now_ms());
        }
    }

    fn connect(&mut self) {
        if self.activate_data() {
            self.sync();
            self.activate_gps();
            self.set_state(LifecycleState::Ready);
        } else {
            error!("Failed to activate data!");
            self.set_state(LifecycleState::Starting);
        }
    }

    // ------------------------------------------------------------------
    // Operator discovery
    // ------------------------------------------------------------------

    /// Deregister, clear the forbidden-network list and scan for operators.
    ///
    /// Blocks for as long as the modem takes to answer, at most about 70
    /// seconds before the first byte.
    fn scan(&mut self) -> Result<(), ScanError> {
        if self.driver.command(format_args!("+COPS=2"), DEFAULT_RESPONSE_TIMEOUT_MS) != AtReply::Ok {
            debug!("Deregistration not acknowledged");
        }
        self.info.operator.clear();

        // Some networks put us in the SIM's FPLMN list after a failed attach
        if self.driver.command(
            format_args!("+CRSM=214,28539,0,0,12,\"FFFFFFFFFFFFFFFFFFFFFFFF\""),
            FPLMN_CLEAR_TIMEOUT_MS,
        ) != AtReply::Ok
        {
            debug!("FPLMN clear not acknowledged");
        }

        self.config
            .profile
            .apply_access_technology(&mut self.driver, self.config.preferred_mode.act());

        self.operators.clear();
        self.candidate = None;

        self.driver.send_at("+COPS=?").map_err(|_| ScanError::Transport)?;
        let result = operator::parse_scan(
            &mut TimedReader::new(self.driver.tap(), &mut self.platform),
            &mut self.operators,
        );
        let dropped = self.driver.tap().drain();
        trace!("Dropped {} bytes after scan", dropped);

        result
    }

    /// Try candidates from `from` on until one accepts. Ends in
    /// `WaitRegistration` on success and `Searching` otherwise.
    fn try_candidates(&mut self, from: usize) -> bool {
        for index in from..self.operators.len() {
            if self.try_associate(index) {
                self.set_state(LifecycleState::WaitRegistration);
                return true;
            }
        }
        warn!("No more operator to try");
        self.candidate = None;
        self.set_state(LifecycleState::Searching);
        false
    }

    fn try_associate(&mut self, index: usize) -> bool {
        let Some(candidate) = self.operators.get(index) else {
            return false;
        };

        self.registration_checks = REGISTRATION_CHECKS;
        self.candidate = Some(index);

        info!(
            "Try associate with {} ({})...",
            candidate.name.as_str(),
            candidate.access_technology
        );
        if operator::associate(&mut self.driver, self.config.profile, candidate) {
            info!(
                "Associated with {} ({})",
                candidate.name.as_str(),
                candidate.access_technology
            );
            true
        } else {
            warn!(
                "Failed to associate with {} ({})",
                candidate.name.as_str(),
                candidate.access_technology
            );
            false
        }
    }

    // ------------------------------------------------------------------
    // GPS, time and cached attributes
    // ------------------------------------------------------------------

    /// Switch the GPS receiver on and arm acquisition if it is not armed.
    pub fn activate_gps(&mut self) {
        self.gps.enable(&mut self.driver);
        if self.gps_state == GpsFixState::Off {
            self.gps_state = GpsFixState::Syncing;
        }
    }

    fn sync(&mut self) {
        if self.state < LifecycleState::Starting {
            return;
        }

        self.refresh_info();

        let mut fresh = None;
        if matches!(self.gps_state, GpsFixState::Syncing | GpsFixState::Synced) {
            if let Some(fix) = self.gps.poll_fix(&mut self.driver) {
                if self.gps_state != GpsFixState::Synced {
                    info!("GPS Synced!");
                }
                self.fix = fix;
                self.gps_state = GpsFixState::Synced;
                fresh = Some(fix);
            }
        }

        if self.time_state != TimeSyncState::Synced {
            self.time_state = if self.sync_time(fresh) {
                TimeSyncState::Synced
            } else {
                TimeSyncState::Syncing
            };
        }
    }

    fn refresh_info(&mut self) {
        self.info.signal = signal_percent(self.driver.signal_quality());
        self.info.iccid = self.driver.sim_ccid();
        self.info.imei = self.driver.imei();
        self.info.imsi = self.driver.imsi();
        self.info.local_ip = self.driver.local_ip();
        self.info.model = self.driver.modem_name();
        self.info.operator = self.driver.operator();
    }

    /// Set the clock from `fix`, read during this pass, or else from the
    /// network. A held fix is never reused: its time is stale.
    fn sync_time(&mut self, fix: Option<GpsFix>) -> bool {
        if let Some(local) = fix
            .and_then(|fix| fix.time.to_unix())
            .and_then(|unix| self.apply_time(unix))
        {
            info!("Time synced from GPS: {}", local.as_str());
            return true;
        }

        // Network time is often wrong or missing, GPS is preferred above
        if self.driver.gsm_date_time().starts_with(time::NETWORK_TIME_SENTINEL) {
            debug!("Network time not available yet");
            return false;
        }
        let Some(unix) = self.driver.network_time().and_then(|t| t.to_unix()) else {
            return false;
        };
        match self.apply_time(unix) {
            Some(local) => {
                info!("Time synced from cellular network: {}", local.as_str());
                true
            }
            None => false,
        }
    }

    fn apply_time(&mut self, unix: i64) -> Option<LocalTime> {
        self.platform.set_system_time(unix);
        self.clock = Some(WallClock::new(unix, self.platform.now_ms()));
        let local = time::localize(unix, &self.tz);
        (!local.is_empty()).then_some(local)
    }

    // ------------------------------------------------------------------
    // Data path
    // ------------------------------------------------------------------

    /// Bring up the packet-data bearer and wait for the network.
    ///
    /// The GPS receiver is suspended first; it is switched back on by the
    /// state machine once the bearer is up.
    pub fn activate_data(&mut self) -> bool {
        self.gps.suspend(&mut self.driver);
        info!("Activate Data...");
        self.config.profile.activate_bearer(&mut self.driver, &self.config.apn);
        self.driver
            .wait_for_network(u32::from(self.config.connect_timeout_secs) * 1000)
    }

    /// Open a plain TCP connection, write `payload` and close it.
    pub fn send_tcp(
        &mut self,
        host: &str,
        port: u16,
        payload: &[u8],
        timeout_secs: u16,
    ) -> Result<(), DataError> {
        let mut socket = self
            .driver
            .connect(host, port, false, timeout_secs)
            .map_err(|e| {
                warn!("TCP connect to {}:{} failed: {}", host, port, e);
                DataError::Timeout
            })?;

        let written = socket
            .write_all(payload)
            .and_then(|()| socket.flush().map_err(Into::<TransportError>::into));
        if socket.close().is_err() {
            debug!("Socket close failed");
        }

        written.map_err(|e| {
            warn!("TCP send to {}:{} failed: {}", host, port, e);
            DataError::Timeout
        })
    }

    /// POST `payload` as JSON to `url`, returning the HTTP status.
    ///
    /// The URL is checked before anything is sent: only `http` and `https`
    /// with a non-empty host are accepted, and the payload must not be empty.
    pub fn http_post(
        &mut self,
        url: &str,
        payload: &[u8],
        timeout_secs: u16,
    ) -> Result<u16, DataError> {
        if payload.is_empty() {
            return Err(DataError::InvalidArgument);
        }
        let parsed = Url::parse(url).map_err(|e| {
            warn!("Rejected URL {}: {:?}", url, e);
            DataError::InvalidArgument
        })?;

        self.http.post(
            &mut self.driver,
            &parsed,
            url,
            payload,
            &self.info.model,
            timeout_secs,
        )
    }

    // ------------------------------------------------------------------
    // AT injection and transcripts
    // ------------------------------------------------------------------

    /// Queue a raw AT command to be sent on a later step.
    pub fn enqueue_at(&mut self, command: &str) -> Result<(), Error> {
        let command = AtCommand::try_from(command.trim()).map_err(|_| Error::CommandTooLong)?;
        self.commands
            .push_back(command)
            .map_err(|_| Error::QueueFull)
    }

    /// Number of queued AT commands.
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Send the oldest queued command. Commands stay queued while the modem
    /// is unpowered.
    fn dequeue_command(&mut self) {
        if self.state <= LifecycleState::Off {
            return;
        }
        let Some(command) = self.commands.pop_front() else {
            return;
        };

        info!("Execute command: {}", command.as_str());
        let body = match command.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("AT") => &command[2..],
            _ => command.as_str(),
        };
        if let Err(e) = self.driver.send_at(body) {
            warn!("Failed to send {}: {}", command.as_str(), e);
            return;
        }

        self.platform.delay_ms(AT_SETTLE_MS);
        let mut waited = 0;
        while !self.driver.tap().available() && waited < AT_ACTIVITY_WAIT_MS {
            self.platform.delay_ms(AT_ACTIVITY_POLL_MS);
            waited += AT_ACTIVITY_POLL_MS;
        }
        let dropped = self.driver.tap().drain();
        debug!("Dropped {} response bytes", dropped);
    }

    /// Log every line exchanged with the modem.
    pub fn set_debug(&mut self, debug: bool) {
        self.driver.tap().set_debug(debug);
    }

    /// Also hand transcript lines to `sink`.
    pub fn set_transcript_sink(&mut self, sink: Option<TranscriptFn>) {
        self.driver.tap().set_transcript_sink(sink);
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Current settings.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// SIM PIN used at the next SIM init.
    pub fn set_pin(&mut self, pin: &str) -> Result<(), Error> {
        self.config.pin = String::try_from(pin).map_err(|_| Error::ValueTooLong)?;
        Ok(())
    }

    /// APN used at the next SIM init.
    pub fn set_apn(&mut self, apn: &str) -> Result<(), Error> {
        self.config.apn = String::try_from(apn).map_err(|_| Error::ValueTooLong)?;
        Ok(())
    }

    /// POSIX timezone rule used to render local time.
    pub fn set_timezone(&mut self, rule: &str) -> Result<(), Error> {
        let tz = TzRule::parse(rule)?;
        self.config.timezone = String::try_from(rule).map_err(|_| Error::ValueTooLong)?;
        self.tz = tz;
        Ok(())
    }

    /// Access technology used at the next SIM init or scan.
    pub fn set_preferred_mode(&mut self, mode: PreferredMode) {
        self.config.preferred_mode = mode;
    }

    /// Band list for `mode`; empty for `Auto`.
    pub fn bands(&self, mode: PreferredMode) -> &str {
        self.config.bands(mode)
    }

    /// Band list applied at the next SIM init.
    pub fn set_bands(&mut self, mode: PreferredMode, bands: &str) -> Result<(), Error> {
        self.config.set_bands(mode, bands)
    }

    /// How long to wait for a GPS fix before connecting without one.
    pub fn set_gps_timeout(&mut self, secs: u32) {
        self.config.gps_timeout_secs = secs;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Whether packet data is up.
    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    /// Wall-clock synchronization state.
    pub fn time_state(&self) -> TimeSyncState {
        self.time_state
    }

    /// GPS acquisition state.
    pub fn gps_state(&self) -> GpsFixState {
        self.gps_state
    }

    /// Last accepted GPS fix, once acquisition has succeeded.
    pub fn gps_fix(&self) -> Option<&GpsFix> {
        (self.gps_state == GpsFixState::Synced).then_some(&self.fix)
    }

    /// Operator an association is outstanding with.
    pub fn candidate(&self) -> Option<&OperatorCandidate> {
        self.candidate.and_then(|i| self.operators.get(i))
    }

    /// Operators found by the last scan.
    pub fn operators(&self) -> &[OperatorCandidate] {
        &self.operators
    }

    /// Registration checks left for the current attempt.
    pub fn registration_checks_left(&self) -> i8 {
        self.registration_checks
    }

    /// Why the SIM could not be initialized, until it can.
    pub fn sim_fault(&self) -> Option<SimFault> {
        self.sim_fault
    }

    /// Modem model.
    pub fn model(&self) -> &str {
        &self.info.model
    }

    /// SIM ICCID.
    pub fn iccid(&self) -> &str {
        &self.info.iccid
    }

    /// Modem IMEI.
    pub fn imei(&self) -> &str {
        &self.info.imei
    }

    /// SIM IMSI.
    pub fn imsi(&self) -> &str {
        &self.info.imsi
    }

    /// Bearer address.
    pub fn local_ip(&self) -> &str {
        &self.info.local_ip
    }

    /// Registered operator name.
    pub fn operator(&self) -> &str {
        &self.info.operator
    }

    /// Signal quality, 0 to 100.
    pub fn signal_quality(&self) -> u8 {
        self.info.signal
    }

    /// Current local time, empty until the clock has been synchronized.
    pub fn local_time(&self) -> LocalTime {
        match &self.clock {
            Some(clock) => time::localize(clock.now(self.platform.now_ms()), &self.tz),
            None => LocalTime::new(),
        }
    }

    /// Snapshot for the dashboard.
    pub fn status(&self) -> ModemStatus<'_> {
        ModemStatus {
            state: self.state,
            time_state: self.time_state,
            gps_state: self.gps_state,
            gps: self.gps_fix(),
            local_time: self.local_time(),
            model: &self.info.model,
            iccid: &self.info.iccid,
            imei: &self.info.imei,
            imsi: &self.info.imsi,
            local_ip: &self.info.local_ip,
            operator: &self.info.operator,
            signal: self.info.signal,
            candidate: self.candidate(),
            sim_fault: self.sim_fault,
            preferred_mode: self.config.preferred_mode,
            apn: &self.config.apn,
        }
    }

    /// [`status`](Self::status) as JSON in `buf`, returning the length used.
    pub fn status_json(&self, buf: &mut [u8]) -> Result<usize, Error> {
        serde_json_core::to_slice(&self.status(), buf).map_err(|_| Error::ValueTooLong)
    }

    /// The AT driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The AT driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Board services.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The GPS backend.
    pub fn gps(&self) -> &G {
        &self.gps
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn set_state(&mut self, state: LifecycleState) {
        if self.state == state {
            return;
        }

        info!("State: {} -> {}", self.state.as_str(), state.as_str());
        self.state = state;
        self.last_refresh = None;

        // A new bring-up re-arms GPS unless a fix is already held.
        if state == LifecycleState::Starting && self.gps_state != GpsFixState::Synced {
            self.gps_state = GpsFixState::Off;
        }

        self.observer.on_state_change(state);
    }

    fn due(&self, last: Option<u64>, interval_ms: u64) -> bool {
        match last {
            Some(at) => self.platform.now_ms().saturating_sub(at) >= interval_ms,
            None => true,
        }
    }

    fn pulse_power(&mut self) {
        self.set_power(false);
        self.platform.delay_ms(100);
        self.set_power(true);
        self.platform.delay_ms(1000);
        self.set_power(false);
    }

    fn set_power(&mut self, high: bool) {
        let pin = self.platform.power_pin();
        let ok = if high { pin.set_high().is_ok() } else { pin.set_low().is_ok() };
        if !ok {
            warn!("Failed to drive power line");
        }
    }

    /// Drive the reset line; `false` when the board has none.
    fn set_reset(&mut self, high: bool) -> bool {
        match self.platform.reset_pin() {
            Some(pin) => {
                let ok = if high { pin.set_high().is_ok() } else { pin.set_low().is_ok() };
                if !ok {
                    warn!("Failed to drive reset line");
                }
                true
            }
            None => false,
        }
    }
}

impl<D, P, G, H, O> core::fmt::Debug for Modem<D, P, G, H, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Modem")
            .field("state", &self.state)
            .field("time_state", &self.time_state)
            .field("gps_state", &self.gps_state)
            .field("candidate", &self.candidate)
            .field("operators", &self.operators.len())
            .field("sim_fault", &self.sim_fault)
            .finish_non_exhaustive()
    }
}

fn parse_timezone(rule: &str) -> TzRule {
    TzRule::parse(rule).unwrap_or_else(|e| {
        warn!("Invalid timezone rule {}: {}, using UTC", rule, e);
        TzRule::utc()
    })
}
