//! GPS fix acquisition.
//!
//! Two receivers are supported, each behind [`GpsBackend`]:
//!
//! - [`DiscreteGps`]: a separate receiver on its own UART, streaming NMEA.
//! - [`IntegratedGps`]: the modem's built-in GNSS engine, queried with AT
//!   commands through the driver.
//!
//! The backend is chosen once when the [`Modem`](crate::modem::Modem) is built.
//! Both hand back the same [`GpsFix`].

use crate::modem::driver::AtDriver;
use crate::network::error::Error;
use crate::time::CalendarTime;
use serde::Serialize;

pub mod discrete;
pub mod integrated;
pub mod nmea;

pub use discrete::DiscreteGps;
pub use integrated::IntegratedGps;

/// Progress of fix acquisition for the current bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsFixState {
    /// Not armed.
    Off,
    /// Armed, waiting for a usable fix.
    Syncing,
    /// A fix was accepted. Later reads keep refreshing it.
    Synced,
    /// Gave up for this bring-up.
    Timeout,
}

/// A position and UTC time reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GpsFix {
    /// Degrees, north positive.
    pub latitude: f32,
    /// Degrees, east positive.
    pub longitude: f32,
    /// Metres above mean sea level.
    pub altitude: f32,
    /// Horizontal dilution of precision.
    pub accuracy: f32,
    /// UTC time of the fix.
    pub time: CalendarTime,
}

impl GpsFix {
    /// Receivers report negative altitude before they have a real solution.
    pub fn is_plausible(&self) -> bool {
        self.altitude >= 0.0
    }
}

/// A source of GPS fixes.
pub trait GpsBackend<D: AtDriver> {
    /// Bring up the backend's own transport, if it has one.
    fn start(&mut self) -> Result<(), Error>;

    /// Release the backend's own transport.
    fn stop(&mut self);

    /// Turn the receiver on. Called when acquisition is armed and again once
    /// packet data is up.
    fn enable(&mut self, driver: &mut D);

    /// Turn the receiver off ahead of packet-data activation.
    fn suspend(&mut self, driver: &mut D);

    /// Return a fix if one is available now. Never blocks.
    fn poll_fix(&mut self, driver: &mut D) -> Option<GpsFix>;
}
