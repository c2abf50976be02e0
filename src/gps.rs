//! GPS fix tracking on top of a byte oriented NMEA decoder.

use core::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use heapless::Vec;
use nmea::sentences::{gsa::GsaMode2, FixType};
use nmea::{Nmea, ParseResult};

use crate::error::Error;
use crate::traits::GpsChannel;

const READ_CHUNK: usize = 64;

/// Longest sentence kept by [`NmeaDecoder`]. NMEA 0183 allows 82 characters;
/// some receivers exceed that slightly.
const MAX_SENTENCE_LEN: usize = 100;

/// Position solution quality, ordered from worst to best.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixQuality {
    #[default]
    NoFix,
    Fix2D,
    Fix3D,
}

impl FixQuality {
    pub fn is_fix(self) -> bool {
        self >= Self::Fix2D
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    /// Shift by `minutes`, wrapping around midnight.
    pub fn shifted(self, minutes: i32) -> Self {
        let total = (i32::from(self.hour) * 60 + i32::from(self.minute) + minutes)
            .rem_euclid(24 * 60);
        Self {
            hour: (total / 60) as u8,
            minute: (total % 60) as u8,
            second: self.second,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

/// Stateful, sentence oriented decoder fed one byte at a time.
///
/// Coordinates are decimal degrees, negative for south and west. `None`
/// means the receiver did not report the field.
pub trait FixSource {
    fn feed(&mut self, byte: u8);
    fn fix_quality(&self) -> FixQuality;
    fn latitude(&self) -> Option<f64>;
    fn longitude(&self) -> Option<f64>;
    fn satellites_in_use(&self) -> Option<u32>;
    fn time(&self) -> Option<TimeOfDay>;
    fn date(&self) -> Option<Date>;
}

/// [`FixSource`] backed by the `nmea` crate.
///
/// Bytes are collected into CR/LF terminated sentences and merged into an
/// [`Nmea`] state. A GGA reporting an invalid fix means no fix. Otherwise fix
/// quality follows the most recent GSA mode; until a GSA sentence has been
/// seen, a valid GGA fix counts as 3D when it reports an altitude and 2D
/// otherwise.
pub struct NmeaDecoder {
    line: Vec<u8, MAX_SENTENCE_LEN>,
    overflowed: bool,
    nmea: Nmea,
    gsa_mode: Option<FixQuality>,
}

impl Default for NmeaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl NmeaDecoder {
    pub fn new() -> Self {
        Self {
            line: Vec::new(),
            overflowed: false,
            nmea: Nmea::default(),
            gsa_mode: None,
        }
    }

    pub fn nmea(&self) -> &Nmea {
        &self.nmea
    }

    fn finish_sentence(&mut self) {
        let overflowed = core::mem::replace(&mut self.overflowed, false);
        if self.line.is_empty() || overflowed {
            self.line.clear();
            return;
        }

        let line = core::mem::take(&mut self.line);
        let Ok(sentence) = core::str::from_utf8(&line) else {
            trace!("Dropping undecodable NMEA sentence");
            return;
        };

        // GSA only contributes its fix mode; everything else is merged
        if sentence.get(3..6) == Some("GSA") {
            match nmea::parse_str(sentence) {
                Ok(ParseResult::GSA(gsa)) => {
                    self.gsa_mode = Some(match gsa.mode2 {
                        GsaMode2::NoFix => FixQuality::NoFix,
                        GsaMode2::Fix2D => FixQuality::Fix2D,
                        GsaMode2::Fix3D => FixQuality::Fix3D,
                    });
                }
                _ => trace!("Dropping unparsable NMEA sentence: {}", sentence),
            }
        } else if self.nmea.parse(sentence).is_err() {
            trace!("Sentence not merged: {}", sentence);
        }
    }
}

impl FixSource for NmeaDecoder {
    fn feed(&mut self, byte: u8) {
        match byte {
            b'\r' | b'\n' => self.finish_sentence(),
            b'$' => {
                self.line.clear();
                self.overflowed = false;
                // Cannot fail on an empty buffer
                let _ = self.line.push(byte);
            }
            _ => {
                if self.line.push(byte).is_err() {
                    self.overflowed = true;
                }
            }
        }
    }

    fn fix_quality(&self) -> FixQuality {
        match (self.nmea.fix_type, self.gsa_mode) {
            (Some(FixType::Invalid), _) => FixQuality::NoFix,
            (_, Some(mode)) => mode,
            (Some(_), None) if self.nmea.altitude.is_some() => FixQuality::Fix3D,
            (Some(_), None) => FixQuality::Fix2D,
            (None, None) => FixQuality::NoFix,
        }
    }

    fn latitude(&self) -> Option<f64> {
        self.nmea.latitude
    }

    fn longitude(&self) -> Option<f64> {
        self.nmea.longitude
    }

    fn satellites_in_use(&self) -> Option<u32> {
        self.nmea.num_of_fix_satellites
    }

    fn time(&self) -> Option<TimeOfDay> {
        self.nmea.fix_time.map(|t| TimeOfDay {
            hour: t.hour() as u8,
            minute: t.minute() as u8,
            second: t.second() as u8,
        })
    }

    fn date(&self) -> Option<Date> {
        let d = self.nmea.fix_date?;
        Some(Date {
            day: d.day() as u8,
            month: d.month() as u8,
            year: u16::try_from(d.year()).ok()?,
        })
    }
}

/// Date and time of a fix, only constructed from in-range fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    pub date: Date,
    pub time: TimeOfDay,
}

impl Timestamp {
    pub fn new(date: Date, time: TimeOfDay) -> Option<Self> {
        let valid = (1..=31).contains(&date.day)
            && (1..=12).contains(&date.month)
            && date.year <= 9999
            && time.hour < 24
            && time.minute < 60
            && time.second < 61;
        valid.then_some(Self { date, time })
    }

    /// Shift by `minutes`, carrying over into the date. `None` if the
    /// result is not a real calendar date.
    pub fn shifted(self, minutes: i32) -> Option<Self> {
        if minutes == 0 {
            return Some(self);
        }
        let date = NaiveDate::from_ymd_opt(
            i32::from(self.date.year),
            u32::from(self.date.month),
            u32::from(self.date.day),
        )?;
        let (h, m, s) = (
            u32::from(self.time.hour),
            u32::from(self.time.minute),
            u32::from(self.time.second),
        );
        // A leap second is 59 plus a full second of nanos
        let time = match s {
            60 => NaiveTime::from_hms_milli_opt(h, m, 59, 1_000)?,
            _ => NaiveTime::from_hms_opt(h, m, s)?,
        };
        let shifted = NaiveDateTime::new(date, time)
            .checked_add_signed(TimeDelta::try_minutes(i64::from(minutes))?)?;

        Self::new(
            Date {
                day: shifted.day() as u8,
                month: shifted.month() as u8,
                year: u16::try_from(shifted.year()).ok()?,
            },
            TimeOfDay {
                hour: shifted.hour() as u8,
                minute: shifted.minute() as u8,
                second: shifted.second() as u8,
            },
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}/{:04} {:02}:{:02}:{:02}",
            self.date.day,
            self.date.month,
            self.date.year,
            self.time.hour,
            self.time.minute,
            self.time.second
        )
    }
}

/// Latitude with hemisphere, e.g. `28.610000° N`.
pub struct Latitude(pub f64);

/// Longitude with hemisphere, e.g. `77.200000° E`.
pub struct Longitude(pub f64);

impl fmt::Display for Latitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, hemisphere) = if self.0 < 0.0 {
            (-self.0, 'S')
        } else {
            (self.0, 'N')
        };
        write!(f, "{:.6}° {}", value, hemisphere)
    }
}

impl fmt::Display for Longitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, hemisphere) = if self.0 < 0.0 {
            (-self.0, 'W')
        } else {
            (self.0, 'E')
        };
        write!(f, "{:.6}° {}", value, hemisphere)
    }
}

/// Current position, derived from the decoder on demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    /// `None` when the decoder has no usable date/time.
    pub timestamp: Option<Timestamp>,
}

impl LocationSnapshot {
    pub const UNAVAILABLE: &'static str = "GPS signal not available. Please wait.";

    /// Report the timestamp `minutes` away from the receiver's UTC.
    pub fn with_local_offset(self, minutes: i32) -> Self {
        Self {
            timestamp: self.timestamp.and_then(|ts| ts.shifted(minutes)),
            ..self
        }
    }
}

impl fmt::Display for LocationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Location: {}, {}\nTime: ",
            Latitude(self.latitude),
            Longitude(self.longitude)
        )?;
        match &self.timestamp {
            Some(ts) => write!(f, "{}", ts)?,
            None => f.write_str("N/A")?,
        }
        write!(
            f,
            "\nMap: http://maps.google.com/maps?q={:.6},{:.6}",
            self.latitude, self.longitude
        )
    }
}

/// Owns the GPS channel and feeds its bytes to a [`FixSource`].
pub struct GpsTracker<CH, D> {
    channel: CH,
    decoder: D,
}

impl<CH: GpsChannel, D: FixSource> GpsTracker<CH, D> {
    pub fn new(channel: CH, decoder: D) -> Self {
        Self { channel, decoder }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Feed every byte currently buffered on the channel to the decoder, in
    /// arrival order. Returns the number of bytes consumed.
    pub fn ingest(&mut self) -> Result<usize, Error> {
        let mut total = 0;
        let mut chunk = [0u8; READ_CHUNK];
        while self.channel.read_ready().map_err(Error::io)? {
            let n = self.channel.read(&mut chunk).map_err(Error::io)?;
            if n == 0 {
                break;
            }
            for &byte in &chunk[..n] {
                self.decoder.feed(byte);
            }
            total += n;
        }
        Ok(total)
    }

    pub fn fix_quality(&self) -> FixQuality {
        self.decoder.fix_quality()
    }

    /// Fix of at least 2D quality with both coordinates present and non-zero.
    pub fn has_valid_fix(&self) -> bool {
        self.decoder.fix_quality().is_fix()
            && self.decoder.latitude().is_some_and(|v| v != 0.0)
            && self.decoder.longitude().is_some_and(|v| v != 0.0)
    }

    pub fn snapshot(&self) -> Option<LocationSnapshot> {
        if !self.has_valid_fix() {
            return None;
        }
        let timestamp = match (self.decoder.date(), self.decoder.time()) {
            (Some(date), Some(time)) => Timestamp::new(date, time),
            _ => None,
        };
        Some(LocationSnapshot {
            latitude: self.decoder.latitude()?,
            longitude: self.decoder.longitude()?,
            timestamp,
        })
    }
}
