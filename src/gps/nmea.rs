//! NMEA 0183 sentence parsing for discrete GPS receivers.
//!
//! Only the two sentences needed to build a time-stamped fix are decoded:
//! GGA (position, altitude, HDOP, time) and RMC (date, time, status). Any
//! talker ID is accepted, so `$GPGGA`, `$GNGGA` and `$GLGGA` all parse.

use heapless::{String, Vec};

/// Maximum length of an NMEA sentence including \r\n
pub const NMEA_MAX_LENGTH: usize = 82;

/// NMEA sentence ending characters
pub const NMEA_END_CHAR_1: u8 = b'\r';
/// NMEA sentence ending characters
pub const NMEA_END_CHAR_2: u8 = b'\n';

/// Maximum number of comma separated fields kept from one sentence
const MAX_FIELDS: usize = 24;

/// Sentence types this parser knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmeaType {
    /// Anything else, including GSA/GSV/VTG/TXT
    Unknown,
    /// GGA - Global Positioning System Fix Data
    Gga,
    /// RMC - Recommended Minimum Course
    Rmc,
}

/// Cardinal direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalDirection {
    /// North
    North,
    /// East
    East,
    /// South
    South,
    /// West
    West,
    /// Unknown direction
    Unknown,
}

impl CardinalDirection {
    /// Parse cardinal direction from a field
    pub fn from_field(field: &str) -> Self {
        match field {
            "N" => CardinalDirection::North,
            "E" => CardinalDirection::East,
            "S" => CardinalDirection::South,
            "W" => CardinalDirection::West,
            _ => CardinalDirection::Unknown,
        }
    }
}

/// GPS position (latitude or longitude) as transmitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Degrees component of the position
    pub degrees: i32,
    /// Minutes component of the position (decimal)
    pub minutes: f64,
    /// Cardinal direction (N/S for latitude, E/W for longitude)
    pub cardinal: CardinalDirection,
}

impl Position {
    /// Create a new position
    pub fn new(degrees: i32, minutes: f64, cardinal: CardinalDirection) -> Self {
        Self {
            degrees,
            minutes,
            cardinal,
        }
    }

    /// Convert to signed decimal degrees
    pub fn to_decimal_degrees(&self) -> f64 {
        let decimal = self.degrees as f64 + self.minutes / 60.0;
        match self.cardinal {
            CardinalDirection::South | CardinalDirection::West => -decimal,
            _ => decimal,
        }
    }
}

/// UTC time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NmeaTime {
    /// Hour (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
}

/// UTC date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NmeaDate {
    /// Day of month (1-31)
    pub day: u8,
    /// Month (1-12)
    pub month: u8,
    /// Year (4-digit)
    pub year: u16,
}

/// GGA sentence. Fields the receiver left empty are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Gga {
    /// UTC time of position fix
    pub time: Option<NmeaTime>,
    /// Latitude
    pub latitude: Option<Position>,
    /// Longitude
    pub longitude: Option<Position>,
    /// Fix quality (0 = invalid, 1 = GPS, 2 = DGPS, ...)
    pub fix_quality: u8,
    /// Satellites used in the solution
    pub satellites_used: u8,
    /// Horizontal dilution of precision
    pub hdop: Option<f32>,
    /// Antenna altitude above mean sea level, metres
    pub altitude: Option<f32>,
}

/// RMC sentence. Fields the receiver left empty are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rmc {
    /// UTC time of position fix
    pub time: Option<NmeaTime>,
    /// Date of position fix
    pub date: Option<NmeaDate>,
    /// Status `A` (active) rather than `V` (void)
    pub active: bool,
    /// Latitude
    pub latitude: Option<Position>,
    /// Longitude
    pub longitude: Option<Position>,
}

/// Parsed NMEA sentence
#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    /// GGA sentence
    Gga(Gga),
    /// RMC sentence
    Rmc(Rmc),
}

/// NMEA parsing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NmeaError {
    /// Sentence length is invalid (too short or too long)
    InvalidLength,
    /// Sentence doesn't start with '$'
    InvalidStart,
    /// Sentence doesn't end with '\r\n'
    InvalidEnd,
    /// Invalid sentence prefix (not 5 uppercase letters followed by comma)
    InvalidPrefix,
    /// Checksum validation failed
    InvalidChecksum,
    /// Error parsing field data
    ParseError,
    /// Sentence type is not supported
    UnsupportedSentence,
    /// Sentence contains non-ASCII bytes
    InvalidCharacter,
}

/// NMEA parser utilities
#[derive(Debug)]
pub struct NmeaParser;

impl NmeaParser {
    /// Get sentence type from NMEA string, ignoring the talker ID
    pub fn get_sentence_type(sentence: &str) -> NmeaType {
        match sentence.get(3..6) {
            Some("GGA") => NmeaType::Gga,
            Some("RMC") => NmeaType::Rmc,
            _ => NmeaType::Unknown,
        }
    }

    /// Calculate NMEA checksum
    pub fn calculate_checksum(sentence: &str) -> u8 {
        let bytes = sentence.as_bytes();
        let start = usize::from(bytes.first() == Some(&b'$'));

        bytes[start..]
            .iter()
            .take_while(|&&b| b != b'*' && b != NMEA_END_CHAR_1)
            .fold(0u8, |acc, &b| acc ^ b)
    }

    /// Check if sentence has a checksum
    pub fn has_checksum(sentence: &str) -> bool {
        sentence.len() >= 5 && sentence.as_bytes()[sentence.len() - 5] == b'*'
    }

    /// Validate NMEA sentence framing and, optionally, its checksum
    pub fn validate(sentence: &str, check_checksum: bool) -> Result<(), NmeaError> {
        let len = sentence.len();
        if !(9..=NMEA_MAX_LENGTH).contains(&len) {
            return Err(NmeaError::InvalidLength);
        }
        if !sentence.is_ascii() {
            return Err(NmeaError::InvalidCharacter);
        }

        let bytes = sentence.as_bytes();
        if bytes[0] != b'$' {
            return Err(NmeaError::InvalidStart);
        }
        if bytes[len - 2] != NMEA_END_CHAR_1 || bytes[len - 1] != NMEA_END_CHAR_2 {
            return Err(NmeaError::InvalidEnd);
        }
        if !bytes[1..6].iter().all(u8::is_ascii_uppercase) || bytes[6] != b',' {
            return Err(NmeaError::InvalidPrefix);
        }

        if check_checksum && Self::has_checksum(sentence) {
            let expected = Self::calculate_checksum(sentence);
            let actual = u8::from_str_radix(&sentence[len - 4..len - 2], 16)
                .map_err(|_| NmeaError::InvalidChecksum)?;
            if expected != actual {
                return Err(NmeaError::InvalidChecksum);
            }
        }

        Ok(())
    }

    /// Parse position from NMEA format (e.g., "4916.45")
    pub fn parse_position(value: &str) -> Result<(i32, f64), NmeaError> {
        let dot_pos = value.find('.').ok_or(NmeaError::ParseError)?;
        if dot_pos < 2 || !value.is_ascii() {
            return Err(NmeaError::ParseError);
        }

        // Minutes start 2 digits before the decimal point
        let (degrees_str, minutes_str) = value.split_at(dot_pos - 2);
        let degrees = if degrees_str.is_empty() {
            0
        } else {
            degrees_str.parse::<i32>().map_err(|_| NmeaError::ParseError)?
        };
        let minutes = minutes_str
            .parse::<f64>()
            .map_err(|_| NmeaError::ParseError)?;

        Ok((degrees, minutes))
    }

    /// Parse time from NMEA format (e.g., "225444" or "225444.123")
    pub fn parse_time(value: &str) -> Result<NmeaTime, NmeaError> {
        let time_str = value.split('.').next().unwrap_or(value);
        if time_str.len() != 6 {
            return Err(NmeaError::ParseError);
        }

        let time_num = time_str.parse::<u32>().map_err(|_| NmeaError::ParseError)?;
        let hour = (time_num / 10000) as u8;
        let minute = ((time_num % 10000) / 100) as u8;
        let second = (time_num % 100) as u8;

        if hour > 23 || minute > 59 || second > 60 {
            return Err(NmeaError::ParseError);
        }

        Ok(NmeaTime {
            hour,
            minute,
            second,
        })
    }

    /// Parse date from NMEA format (e.g., "230394" for 23/03/1994)
    pub fn parse_date(value: &str) -> Result<NmeaDate, NmeaError> {
        if value.len() != 6 {
            return Err(NmeaError::ParseError);
        }

        let date_num = value.parse::<u32>().map_err(|_| NmeaError::ParseError)?;
        let day = (date_num / 10000) as u8;
        let month = ((date_num % 10000) / 100) as u8;
        let year_short = (date_num % 100) as u16;

        // Two-digit years from 80 on are 1980s receivers reporting their epoch.
        let year = if year_short >= 80 {
            1900 + year_short
        } else {
            2000 + year_short
        };

        if day == 0 || day > 31 || month == 0 || month > 12 {
            return Err(NmeaError::ParseError);
        }

        Ok(NmeaDate { day, month, year })
    }

    /// Split sentence into data fields (talker/type and checksum removed)
    pub fn split_fields(sentence: &str) -> Result<Vec<&str, MAX_FIELDS>, NmeaError> {
        let start = sentence.find(',').ok_or(NmeaError::ParseError)? + 1;
        let end = if Self::has_checksum(sentence) {
            sentence.len() - 5
        } else {
            sentence.len() - 2
        };

        let mut fields = Vec::new();
        if start >= end {
            return Ok(fields);
        }
        for field in sentence[start..end].split(',') {
            fields.push(field).map_err(|_| NmeaError::ParseError)?;
        }
        Ok(fields)
    }

    /// Parse a complete sentence, `\r\n` included
    pub fn parse(sentence: &str, check_checksum: bool) -> Result<Sentence, NmeaError> {
        Self::validate(sentence, check_checksum)?;
        let fields = Self::split_fields(sentence)?;

        match Self::get_sentence_type(sentence) {
            NmeaType::Gga => Ok(Sentence::Gga(Self::parse_gga(&fields))),
            NmeaType::Rmc => Ok(Sentence::Rmc(Self::parse_rmc(&fields))),
            NmeaType::Unknown => Err(NmeaError::UnsupportedSentence),
        }
    }

    fn field<'a>(fields: &[&'a str], i: usize) -> Option<&'a str> {
        fields.get(i).copied().filter(|f| !f.is_empty())
    }

    fn position(fields: &[&str], value: usize, hemisphere: usize) -> Option<Position> {
        let (degrees, minutes) = Self::parse_position(Self::field(fields, value)?).ok()?;
        let cardinal = CardinalDirection::from_field(Self::field(fields, hemisphere)?);
        if cardinal == CardinalDirection::Unknown {
            return None;
        }
        Some(Position::new(degrees, minutes, cardinal))
    }

    fn parse_gga(fields: &[&str]) -> Gga {
        Gga {
            time: Self::field(fields, 0).and_then(|f| Self::parse_time(f).ok()),
            latitude: Self::position(fields, 1, 2),
            longitude: Self::position(fields, 3, 4),
            fix_quality: Self::field(fields, 5)
                .and_then(|f| f.parse().ok())
                .unwrap_or(0),
            satellites_used: Self::field(fields, 6)
                .and_then(|f| f.parse().ok())
                .unwrap_or(0),
            hdop: Self::field(fields, 7).and_then(|f| f.parse().ok()),
            altitude: Self::field(fields, 8).and_then(|f| f.parse().ok()),
        }
    }

    fn parse_rmc(fields: &[&str]) -> Rmc {
        Rmc {
            time: Self::field(fields, 0).and_then(|f| Self::parse_time(f).ok()),
            active: Self::field(fields, 1) == Some("A"),
            latitude: Self::position(fields, 2, 3),
            longitude: Self::position(fields, 4, 5),
            date: Self::field(fields, 8).and_then(|f| Self::parse_date(f).ok()),
        }
    }
}

/// Byte-at-a-time sentence framer.
///
/// Bytes before a `$` are ignored. A line longer than [`NMEA_MAX_LENGTH`] is
/// dropped.
#[derive(Debug, Default)]
pub struct NmeaDecoder {
    line: String<NMEA_MAX_LENGTH>,
    overflow: bool,
}

impl NmeaDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns the outcome once a full line has been framed.
    pub fn push(&mut self, byte: u8) -> Option<Result<Sentence, NmeaError>> {
        if byte == b'$' {
            self.line.clear();
            self.overflow = false;
        } else if self.line.is_empty() {
            return None;
        }

        if !byte.is_ascii() || self.line.push(byte as char).is_err() {
            self.overflow = true;
        }

        if byte != NMEA_END_CHAR_2 {
            return None;
        }

        let result = if self.overflow {
            Err(NmeaError::InvalidLength)
        } else {
            NmeaParser::parse(&self.line, true)
        };
        self.line.clear();
        self.overflow = false;
        Some(result)
    }
}
