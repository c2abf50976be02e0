use embedded_hal::delay::DelayNs;
use embedded_io::{Read, ReadReady, Write};

/// Monotonic millisecond tick source that can also block the caller.
///
/// Ticks wrap around at `u32::MAX`; compare them with [`ticks_since`] only.
pub trait Clock: DelayNs {
    fn ticks_ms(&self) -> u32;

    /// Milliseconds elapsed since `earlier`, wraparound safe.
    fn elapsed_since(&self, earlier: u32) -> u32 {
        ticks_since(self.ticks_ms(), earlier)
    }
}

pub fn ticks_since(now: u32, earlier: u32) -> u32 {
    now.wrapping_sub(earlier)
}

/// Blocking delays and ticks from the embassy time driver.
impl Clock for embassy_time::Delay {
    fn ticks_ms(&self) -> u32 {
        // Truncation is the intended wraparound
        embassy_time::Instant::now().as_millis() as u32
    }
}

/// Full duplex byte channel to the modem.
pub trait ModemChannel: Read + Write + ReadReady {}

impl<T: Read + Write + ReadReady> ModemChannel for T {}

/// Receive only byte channel from the GPS receiver.
pub trait GpsChannel: Read + ReadReady {}

impl<T: Read + ReadReady> GpsChannel for T {}
