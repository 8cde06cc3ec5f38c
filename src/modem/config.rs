//! Modem settings, as kept by the configuration store.
//!
//! Field names on the wire match the store's keys, so a settings document can
//! be handed straight to [`Config::from_json`]:
//!
//! ```rust
//! use libmodem::modem::{Config, PreferredMode};
//!
//! let json = br#"{"modem_apn":"iot.1nce.net","modem_mode":"NB-IoT","tz_info":"CET-1CEST,M3.5.0,M10.5.0/3"}"#;
//! let config = Config::from_json(json).unwrap();
//! assert_eq!(config.preferred_mode, PreferredMode::NbIot);
//! assert_eq!(config.gps_timeout_secs, 90);
//! ```

use super::error::Error;
use super::profile::ModemProfile;
use super::state::{PreferredMode, SimFailurePolicy};
use heapless::String;
use serde::Deserialize;

/// Capacity of the SIM PIN.
pub const PIN_LEN: usize = 8;
/// Capacity of the APN.
pub const APN_LEN: usize = 64;
/// Capacity of the POSIX timezone rule.
pub const TZ_LEN: usize = 64;
/// Capacity of a comma separated band list.
pub const BANDS_LEN: usize = 96;

/// GPS fix timeout when none is configured, seconds.
pub const DEFAULT_GPS_TIMEOUT_SECS: u32 = 90;
/// Data connection timeout when none is configured, seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u16 = 20;

const DEFAULT_TIMEZONE: &str = "UTC0";
const DEFAULT_BANDS_LTE_M: &str = "1,2,3,4,5,8,12,13,14,18,19,20,25,26,27,28,66,85";
const DEFAULT_BANDS_NB_IOT: &str = "1,2,3,4,5,8,12,13,18,19,20,25,26,28,66,71,85";

/// Modem settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SIM PIN; empty when the SIM has none.
    #[serde(rename = "modem_pin")]
    pub pin: String<PIN_LEN>,
    /// Access point name.
    #[serde(rename = "modem_apn")]
    pub apn: String<APN_LEN>,
    /// POSIX timezone rule used to render local time.
    #[serde(rename = "tz_info")]
    pub timezone: String<TZ_LEN>,
    /// Radio access technology preference.
    #[serde(rename = "modem_mode")]
    pub preferred_mode: PreferredMode,
    /// Bands allowed for LTE-M.
    #[serde(rename = "bands_ltem")]
    pub bands_lte_m: String<BANDS_LEN>,
    /// Bands allowed for NB-IoT.
    #[serde(rename = "bands_nbiot")]
    pub bands_nb_iot: String<BANDS_LEN>,
    /// How long to wait for a GPS fix before connecting anyway.
    #[serde(rename = "gps_timeout")]
    pub gps_timeout_secs: u32,
    /// Timeout for bearer activation and outbound connections.
    #[serde(rename = "connect_timeout")]
    pub connect_timeout_secs: u16,
    /// Modem model.
    #[serde(rename = "modem_model")]
    pub profile: ModemProfile,
    /// Reaction to a SIM that cannot be initialized.
    #[serde(rename = "sim_failure")]
    pub sim_failure: SimFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pin: String::new(),
            apn: String::new(),
            timezone: fixed(DEFAULT_TIMEZONE),
            preferred_mode: PreferredMode::Auto,
            bands_lte_m: fixed(DEFAULT_BANDS_LTE_M),
            bands_nb_iot: fixed(DEFAULT_BANDS_NB_IOT),
            gps_timeout_secs: DEFAULT_GPS_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            profile: ModemProfile::default(),
            sim_failure: SimFailurePolicy::default(),
        }
    }
}

impl Config {
    /// Decode a settings document. Missing keys keep their defaults.
    pub fn from_json(json: &[u8]) -> Result<Self, Error> {
        serde_json_core::from_slice::<Self>(json)
            .map(|(config, _)| config)
            .map_err(|_| Error::InvalidConfig)
    }

    /// Band list for `mode`; `Auto` has none.
    pub fn bands(&self, mode: PreferredMode) -> &str {
        match mode {
            PreferredMode::Auto => "",
            PreferredMode::LteM => &self.bands_lte_m,
            PreferredMode::NbIot => &self.bands_nb_iot,
        }
    }

    /// Replace the band list for `mode`. Setting bands for `Auto` is ignored.
    pub fn set_bands(&mut self, mode: PreferredMode, bands: &str) -> Result<(), Error> {
        let slot = match mode {
            PreferredMode::Auto => return Ok(()),
            PreferredMode::LteM => &mut self.bands_lte_m,
            PreferredMode::NbIot => &mut self.bands_nb_iot,
        };
        *slot = String::try_from(bands).map_err(|_| Error::ValueTooLong)?;
        Ok(())
    }
}

/// Copy a constant into a fixed-capacity string; constants are sized to fit.
fn fixed<const N: usize>(s: &str) -> String<N> {
    String::try_from(s).unwrap_or_default()
}
