//! State enums shared by the connectivity state machine and its observers.

use serde::{Deserialize, Deserializer, Serialize};

/// Where the modem is in its bring-up.
///
/// The order is meaningful: everything above [`Off`](Self::Off) has power and
/// everything from [`Connecting`](Self::Connecting) on has settled its GPS
/// outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleState {
    /// Unrecoverable fault; needs `power_off()` and `begin()`.
    Error,
    /// Not powered.
    Off,
    /// Powered, waiting for the SIM.
    Starting,
    /// Waiting for the network to accept us.
    WaitRegistration,
    /// Scanning for operators to register with manually.
    Searching,
    /// Registered, waiting for a GPS fix.
    AcquiringFix,
    /// Bringing up packet data.
    Connecting,
    /// Packet data up.
    Ready,
}

impl LifecycleState {
    /// Short name for logs and the dashboard.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Error => "error",
            LifecycleState::Off => "off",
            LifecycleState::Starting => "starting",
            LifecycleState::WaitRegistration => "waiting registration",
            LifecycleState::Searching => "searching operators",
            LifecycleState::AcquiringFix => "acquiring GPS fix",
            LifecycleState::Connecting => "connecting",
            LifecycleState::Ready => "ready",
        }
    }
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Radio access technology preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreferredMode {
    /// Let the modem choose.
    #[default]
    Auto,
    /// LTE Cat-M1.
    #[serde(rename = "LTE-M")]
    LteM,
    /// NB-IoT.
    #[serde(rename = "NB-IoT")]
    NbIot,
}

impl PreferredMode {
    /// 3GPP access technology code used in `+COPS`.
    pub fn act(self) -> u8 {
        match self {
            PreferredMode::Auto => 0,
            PreferredMode::LteM => 7,
            PreferredMode::NbIot => 9,
        }
    }

    /// Inverse of [`act`](Self::act); unknown codes mean `Auto`.
    pub fn from_act(act: u8) -> Self {
        match act {
            7 => PreferredMode::LteM,
            9 => PreferredMode::NbIot,
            _ => PreferredMode::Auto,
        }
    }

    /// Configuration store name. Anything unrecognised means `Auto`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "LTE-M" => PreferredMode::LteM,
            "NB-IoT" => PreferredMode::NbIot,
            _ => PreferredMode::Auto,
        }
    }
}

impl<'de> Deserialize<'de> for PreferredMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = <&str>::deserialize(deserializer)?;
        Ok(Self::from_name(name))
    }
}

/// SIM state as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimStatus {
    /// Unlocked and usable.
    Ready,
    /// Not inserted or not responding.
    Absent,
    /// Waiting for a PIN.
    PinRequired,
    /// PIN attempts exhausted, PUK needed.
    PukLocked,
    /// Locked by the carrier's antitheft mechanism.
    AntitheftLocked,
    /// Anything else.
    Unknown,
}

/// Why SIM initialization failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimFault {
    /// SIM not detected.
    NoSim,
    /// SIM needs a PIN and the configured one was missing or wrong.
    PinRequired,
    /// SIM locked.
    Locked,
    /// SIM antitheft-locked.
    Antitheft,
    /// Unclassified SIM error.
    Unknown,
}

impl SimFault {
    /// Classify a status. `None` when the SIM is actually ready.
    pub fn from_status(status: SimStatus) -> Option<Self> {
        match status {
            SimStatus::Ready => None,
            SimStatus::Absent => Some(SimFault::NoSim),
            SimStatus::PinRequired => Some(SimFault::PinRequired),
            SimStatus::PukLocked => Some(SimFault::Locked),
            SimStatus::AntitheftLocked => Some(SimFault::Antitheft),
            SimStatus::Unknown => Some(SimFault::Unknown),
        }
    }
}

impl core::fmt::Display for SimFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SimFault::NoSim => write!(f, "SIM not detected"),
            SimFault::PinRequired => write!(f, "SIM PIN required"),
            SimFault::Locked => write!(f, "SIM locked"),
            SimFault::Antitheft => write!(f, "SIM antitheft locked"),
            SimFault::Unknown => write!(f, "SIM error"),
        }
    }
}

/// What to do when the SIM cannot be initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimFailurePolicy {
    /// Pulse the power line and try again on the next step.
    #[default]
    Repower,
    /// Stop in [`LifecycleState::Error`].
    Halt,
}

/// Receives lifecycle transitions.
///
/// Called synchronously from inside `step()`, once per actual change. Closures
/// taking a [`LifecycleState`] implement it, and `()` ignores everything.
pub trait StateObserver {
    /// The modem moved to `state`.
    fn on_state_change(&mut self, state: LifecycleState);
}

impl StateObserver for () {
    fn on_state_change(&mut self, _state: LifecycleState) {}
}

impl<F: FnMut(LifecycleState)> StateObserver for F {
    fn on_state_change(&mut self, state: LifecycleState) {
        self(state)
    }
}
