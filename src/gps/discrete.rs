//! Stand-alone NMEA receiver on its own UART.

use super::nmea::{NmeaDate, NmeaDecoder, NmeaTime, Position, Sentence};
use super::{GpsBackend, GpsFix};
use crate::modem::driver::AtDriver;
use crate::network::SerialPort;
use crate::network::error::Error;
use crate::time::CalendarTime;

/// Baud rate NMEA receivers ship with.
pub const GPS_BAUD_RATE: u32 = 9600;

/// Fields collected from the sentence stream.
///
/// GGA supplies location, altitude, HDOP and time; RMC supplies the date and,
/// when active, location and time. A GGA without a fix clears what it owns.
#[derive(Debug, Default, Clone, Copy)]
struct Assembler {
    location: Option<(f64, f64)>,
    altitude: Option<f32>,
    hdop: Option<f32>,
    date: Option<NmeaDate>,
    time: Option<NmeaTime>,
}

impl Assembler {
    fn location(lat: Option<Position>, lon: Option<Position>) -> Option<(f64, f64)> {
        Some((lat?.to_decimal_degrees(), lon?.to_decimal_degrees()))
    }

    fn update(&mut self, sentence: &Sentence) {
        match sentence {
            Sentence::Gga(gga) => {
                if gga.time.is_some() {
                    self.time = gga.time;
                }
                if gga.fix_quality == 0 {
                    self.location = None;
                    self.altitude = None;
                    self.hdop = None;
                } else {
                    self.location = Self::location(gga.latitude, gga.longitude);
                    self.altitude = gga.altitude;
                    self.hdop = gga.hdop;
                }
            }
            Sentence::Rmc(rmc) => {
                if rmc.date.is_some() {
                    self.date = rmc.date;
                }
                if rmc.time.is_some() {
                    self.time = rmc.time;
                }
                if rmc.active {
                    if let Some(location) = Self::location(rmc.latitude, rmc.longitude) {
                        self.location = Some(location);
                    }
                }
            }
        }
    }

    fn fix(&self) -> Option<GpsFix> {
        let (latitude, longitude) = self.location?;
        let date = self.date?;
        let time = self.time?;
        let fix = GpsFix {
            latitude: latitude as f32,
            longitude: longitude as f32,
            altitude: self.altitude?,
            accuracy: self.hdop?,
            time: CalendarTime {
                year: date.year,
                month: date.month,
                day: date.day,
                hour: time.hour,
                minute: time.minute,
                second: time.second,
            },
        };
        fix.is_plausible().then_some(fix)
    }
}

/// Receiver on its own UART, streaming NMEA.
#[derive(Debug)]
pub struct DiscreteGps<S> {
    port: S,
    decoder: NmeaDecoder,
    assembler: Assembler,
}

impl<S: SerialPort> DiscreteGps<S> {
    /// Wrap the receiver's port. It is opened by [`GpsBackend::start`].
    pub fn new(port: S) -> Self {
        Self {
            port,
            decoder: NmeaDecoder::new(),
            assembler: Assembler::default(),
        }
    }

    /// The receiver's port.
    pub fn port(&self) -> &S {
        &self.port
    }

    /// The receiver's port, mutably.
    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }
}

impl<S: SerialPort, D: AtDriver> GpsBackend<D> for DiscreteGps<S> {
    fn start(&mut self) -> Result<(), Error> {
        info!("Starting GPS...");
        self.decoder = NmeaDecoder::new();
        self.assembler = Assembler::default();
        self.port.open(GPS_BAUD_RATE)
    }

    fn stop(&mut self) {
        self.port.close();
    }

    // The receiver runs on its own supply; nothing to switch.
    fn enable(&mut self, _driver: &mut D) {}

    fn suspend(&mut self, _driver: &mut D) {}

    /// Decode whatever is buffered, stopping at the first acceptable fix so
    /// that later bytes stay queued for the next poll.
    fn poll_fix(&mut self, _driver: &mut D) -> Option<GpsFix> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(1) => {}
                _ => return None,
            }
            match self.decoder.push(byte[0]) {
                Some(Ok(sentence)) => {
                    self.assembler.update(&sentence);
                    if let Some(fix) = self.assembler.fix() {
                        return Some(fix);
                    }
                }
                Some(Err(e)) => trace!("Dropped NMEA sentence: {:?}", e),
                None => {}
            }
        }
    }
}
