//! Operator console: single letter commands read from a byte stream and a
//! printable status report.

use core::fmt;

use heapless::String;

use crate::gps::{Latitude, Longitude, TimeOfDay};
use crate::state::{ModemState, NetworkState};

/// Longest command line kept; extra characters are dropped.
pub const MAX_LINE_LEN: usize = 32;

/// Bidirectional text console, polled without blocking.
pub trait Console: fmt::Write {
    fn read_byte(&mut self) -> Option<u8>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `x`
    Status,
    /// `t`
    TestSms,
    /// `l`
    Location,
    Unknown(String<MAX_LINE_LEN>),
}

impl Command {
    pub const HELP: &'static str = "Valid commands: x (debug), t (test SMS), l (location)";

    /// Parse a completed line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let mut cmd = String::new();
        for c in line.chars() {
            if cmd.push(c.to_ascii_lowercase()).is_err() {
                break;
            }
        }

        Some(match cmd.as_str() {
            "x" => Self::Status,
            "t" => Self::TestSms,
            "l" => Self::Location,
            _ => Self::Unknown(cmd),
        })
    }
}

/// Accumulates console bytes until CR or LF.
#[derive(Debug, Default)]
pub struct LineBuffer {
    line: String<MAX_LINE_LEN>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the command once a line has been completed.
    pub fn push(&mut self, byte: u8) -> Option<Command> {
        match byte {
            b'\r' | b'\n' => {
                let cmd = Command::parse(&self.line);
                self.line.clear();
                cmd
            }
            b if b.is_ascii() => {
                let _ = self.line.push(b as char);
                None
            }
            _ => None,
        }
    }
}

/// GPS section of the status report, present only with a valid fix.
pub struct GpsDetails {
    pub latitude: f64,
    pub longitude: f64,
    pub satellites: Option<u32>,
    pub time: Option<TimeOfDay>,
}

pub struct StatusReport<'a> {
    pub modem: ModemState,
    pub network: NetworkState,
    pub fix_acquired: bool,
    pub gps: Option<GpsDetails>,
    pub report_interval_secs: u32,
    pub last_sent_secs_ago: u32,
    pub next_send_secs: u32,
    pub admin_number: &'a str,
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "Yes"
    } else {
        "No"
    }
}

const RULE: &str = "==================================================";
const SUB_RULE: &str = "--------------------------------------------------";

impl fmt::Display for StatusReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "          SYSTEM STATUS REPORT")?;
        writeln!(f, "{}", RULE)?;

        writeln!(f, "\n[ System Status ]\n{}", SUB_RULE)?;
        writeln!(
            f,
            "GSM Module Initialized: {}",
            yes_no(self.modem == ModemState::Responding)
        )?;
        writeln!(
            f,
            "GSM Network Connected: {}",
            yes_no(self.network == NetworkState::Registered)
        )?;
        writeln!(f, "GPS Fix Acquired: {}", yes_no(self.fix_acquired))?;

        writeln!(f, "\n[ GPS Information ]\n{}", SUB_RULE)?;
        match &self.gps {
            Some(gps) => {
                writeln!(f, "Latitude: {}", Latitude(gps.latitude))?;
                writeln!(f, "Longitude: {}", Longitude(gps.longitude))?;
                match gps.satellites {
                    Some(n) => writeln!(f, "Satellites in use: {}", n)?,
                    None => writeln!(f, "Satellites in use: N/A")?,
                }
                if let Some(t) = gps.time {
                    writeln!(f, "Time: {:02}:{:02}:{:02}", t.hour, t.minute, t.second)?;
                }
            }
            None => writeln!(f, "No GPS fix - waiting for satellites...")?,
        }

        writeln!(f, "\n[ Location Tracking ]\n{}", SUB_RULE)?;
        writeln!(f, "Interval: {} second(s)", self.report_interval_secs)?;
        writeln!(f, "Last sent: {} seconds ago", self.last_sent_secs_ago)?;
        writeln!(f, "Next send: {} seconds", self.next_send_secs)?;
        writeln!(f, "Admin Number: {}", self.admin_number)?;

        writeln!(f, "{}", RULE)
    }
}
