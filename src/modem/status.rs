//! Serializable status snapshot.

use super::operator::OperatorCandidate;
use super::state::{LifecycleState, PreferredMode, SimFault};
use crate::gps::{GpsFix, GpsFixState};
use crate::time::{LocalTime, TimeSyncState};
use serde::Serialize;

/// Snapshot of everything the dashboard shows about the modem.
#[derive(Debug, Clone, Serialize)]
pub struct ModemStatus<'a> {
    /// Lifecycle state.
    pub state: LifecycleState,
    /// Wall-clock synchronization state.
    pub time_state: TimeSyncState,
    /// GPS acquisition state.
    pub gps_state: GpsFixState,
    /// Last accepted fix, once there is one.
    pub gps: Option<&'a GpsFix>,
    /// Local time, empty until synchronized.
    pub local_time: LocalTime,
    /// Modem model.
    pub model: &'a str,
    /// SIM ICCID.
    pub iccid: &'a str,
    /// Modem IMEI.
    pub imei: &'a str,
    /// SIM IMSI.
    pub imsi: &'a str,
    /// Bearer address.
    pub local_ip: &'a str,
    /// Registered operator.
    pub operator: &'a str,
    /// Signal quality, 0 to 100.
    pub signal: u8,
    /// Operator an association is outstanding with.
    pub candidate: Option<&'a OperatorCandidate>,
    /// Why the SIM could not be initialized, if it could not.
    pub sim_fault: Option<SimFault>,
    /// Configured access technology.
    pub preferred_mode: PreferredMode,
    /// Configured APN.
    pub apn: &'a str,
}
