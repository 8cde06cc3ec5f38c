//! GNSS engine built into the modem.

use super::{GpsBackend, GpsFix};
use crate::modem::driver::AtDriver;
use crate::network::error::Error;

/// The modem's own GNSS engine, read through the AT driver.
///
/// On modems where GNSS and packet data share the radio, the engine is
/// switched off while the bearer comes up and switched back on afterwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntegratedGps;

impl IntegratedGps {
    /// New backend. The engine stays off until enabled.
    pub fn new() -> Self {
        Self
    }
}

impl<D: AtDriver> GpsBackend<D> for IntegratedGps {
    fn start(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn enable(&mut self, driver: &mut D) {
        info!("Enable GPS...");
        if !driver.enable_gps() {
            warn!("GPS engine did not acknowledge enable");
        }
    }

    fn suspend(&mut self, driver: &mut D) {
        info!("Disable GPS...");
        if !driver.disable_gps() {
            warn!("GPS engine did not acknowledge disable");
        }
    }

    fn poll_fix(&mut self, driver: &mut D) -> Option<GpsFix> {
        driver.query_gps().filter(GpsFix::is_plausible)
    }
}
