//! Per-model command sequences.
//!
//! The two supported modems share the standard 3GPP command set but differ in
//! how the radio is configured and how the packet-data bearer comes up.

use super::config::Config;
use super::driver::{AtDriver, AtReply, DEFAULT_RESPONSE_TIMEOUT_MS};
use serde::{Deserialize, Serialize};

/// Modem model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemProfile {
    /// SIMCom SIM7080G: LTE-M/NB-IoT, GNSS shares the radio with data.
    #[default]
    #[serde(rename = "SIM7080")]
    Sim7080,
    /// SIMCom A7670: LTE Cat-1, usually paired with a discrete GPS receiver.
    #[serde(rename = "A7670")]
    A7670,
}

impl ModemProfile {
    /// Model-specific radio setup, run once the SIM is ready.
    pub fn configure_radio<D: AtDriver>(self, driver: &mut D, config: &Config) {
        match self {
            ModemProfile::Sim7080 => {
                // Automatic network mode
                expect_ok(driver.command(format_args!("+CNMP=2"), DEFAULT_RESPONSE_TIMEOUT_MS), "+CNMP");
                expect_ok(
                    driver.command(
                        format_args!("+CBANDCFG=\"NB-IOT\",{}", config.bands_nb_iot.as_str()),
                        DEFAULT_RESPONSE_TIMEOUT_MS,
                    ),
                    "+CBANDCFG NB-IOT",
                );
                expect_ok(
                    driver.command(
                        format_args!("+CBANDCFG=\"CAT-M\",{}", config.bands_lte_m.as_str()),
                        DEFAULT_RESPONSE_TIMEOUT_MS,
                    ),
                    "+CBANDCFG CAT-M",
                );
                expect_ok(
                    driver.command(
                        format_args!("+CNCFG=0,1,\"{}\"", config.apn.as_str()),
                        DEFAULT_RESPONSE_TIMEOUT_MS,
                    ),
                    "+CNCFG",
                );
            }
            ModemProfile::A7670 => {}
        }
    }

    /// Restrict the radio to the technology named by a `+COPS` AcT code.
    pub fn apply_access_technology<D: AtDriver>(self, driver: &mut D, act: u8) {
        match self {
            ModemProfile::Sim7080 => {
                let preferred = match act {
                    7 => 1,
                    9 => 2,
                    _ => 3,
                };
                expect_ok(
                    driver.command(format_args!("+CMNB={}", preferred), DEFAULT_RESPONSE_TIMEOUT_MS),
                    "+CMNB",
                );
            }
            ModemProfile::A7670 => {}
        }
    }

    /// Start bringing up packet data. Completion is awaited by the caller.
    pub fn activate_bearer<D: AtDriver>(self, driver: &mut D, apn: &str) {
        match self {
            ModemProfile::Sim7080 => {
                expect_ok(
                    driver.command(format_args!("+CNACT=0,1"), DEFAULT_RESPONSE_TIMEOUT_MS),
                    "+CNACT",
                );
            }
            ModemProfile::A7670 => {
                if !driver.gprs_connect(apn) {
                    warn!("GPRS attach on {} failed", apn);
                }
            }
        }
    }
}

fn expect_ok(reply: AtReply, what: &str) {
    if reply != AtReply::Ok {
        warn!("{} not acknowledged: {:?}", what, reply);
    }
}
