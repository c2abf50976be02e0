//! Test doubles sharing one simulated timeline.
//!
//! `MockClock` only advances when something delays on it. `MockChannel`
//! delivers scripted bytes once the clock has reached their due tick, so
//! response timing is fully deterministic.

use core::convert::Infallible;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::sync::Once;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_io::ErrorKind;
use env_logger::Env;

use crate::config::TrackerConfig;
use crate::console::Console;
use crate::gps::{Date, FixQuality, FixSource, TimeOfDay};
use crate::traits::{ticks_since, Clock};

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .is_test(true)
            .init();
    });
}

#[derive(Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<u32>>,
    nanos: Rc<Cell<u32>>,
}

impl MockClock {
    pub fn new() -> Self {
        init_logger();
        Self::default()
    }

    pub fn now(&self) -> u32 {
        self.now.get()
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl DelayNs for MockClock {
    fn delay_ns(&mut self, ns: u32) {
        let total = u64::from(self.nanos.get()) + u64::from(ns);
        self.advance((total / 1_000_000) as u32);
        self.nanos.set((total % 1_000_000) as u32);
    }

    fn delay_us(&mut self, us: u32) {
        self.advance(us / 1000);
        self.delay_ns((us % 1000) * 1000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

impl Clock for MockClock {
    fn ticks_ms(&self) -> u32 {
        self.now.get()
    }
}

struct Reply {
    trigger: String,
    delay_ms: u32,
    bytes: Vec<u8>,
}

struct Pending {
    due: u32,
    bytes: VecDeque<u8>,
}

#[derive(Default)]
struct ChannelInner {
    written: Vec<u8>,
    replies: Vec<Reply>,
    pending: VecDeque<Pending>,
    fail_writes: bool,
}

/// Scripted serial channel.
///
/// Every write containing a reply's trigger schedules that reply
/// `delay_ms` after the write. Replies stay armed for the whole test.
#[derive(Clone)]
pub struct MockChannel {
    clock: MockClock,
    inner: Rc<RefCell<ChannelInner>>,
}

impl MockChannel {
    pub fn new(clock: &MockClock) -> Self {
        Self {
            clock: clock.clone(),
            inner: Rc::default(),
        }
    }

    pub fn reply_to(&self, trigger: &str, delay_ms: u32, bytes: &[u8]) {
        self.inner.borrow_mut().replies.push(Reply {
            trigger: trigger.into(),
            delay_ms,
            bytes: bytes.to_vec(),
        });
    }

    /// Make `bytes` readable right away.
    pub fn push_incoming(&self, bytes: &[u8]) {
        self.schedule(0, bytes);
    }

    /// Make `bytes` readable `delay_ms` from now.
    pub fn schedule_in(&self, delay_ms: u32, bytes: &[u8]) {
        self.schedule(delay_ms, bytes);
    }

    pub fn fail_writes(&self) {
        self.inner.borrow_mut().fail_writes = true;
    }

    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.inner.borrow().written).into_owned()
    }

    pub fn count(&self, token: &str) -> usize {
        self.written_str().matches(token).count()
    }

    pub fn clear_written(&self) {
        self.inner.borrow_mut().written.clear();
    }

    fn schedule(&self, delay_ms: u32, bytes: &[u8]) {
        let now = self.clock.now();
        let due = now.wrapping_add(delay_ms);
        let mut inner = self.inner.borrow_mut();
        let at = inner
            .pending
            .iter()
            .position(|p| !self.is_due(p) && ticks_since(p.due, now) > delay_ms)
            .unwrap_or(inner.pending.len());
        inner.pending.insert(
            at,
            Pending {
                due,
                bytes: bytes.iter().copied().collect(),
            },
        );
    }

    fn is_due(&self, p: &Pending) -> bool {
        ticks_since(self.clock.now(), p.due) < u32::MAX / 2
    }
}

impl embedded_io::ErrorType for MockChannel {
    type Error = ErrorKind;
}

impl embedded_io::Read for MockChannel {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        while n < buf.len() {
            let mut inner = self.inner.borrow_mut();
            let Some(front) = inner.pending.front_mut() else {
                break;
            };
            if !self.is_due(front) {
                break;
            }
            while n < buf.len() {
                match front.bytes.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            if front.bytes.is_empty() {
                inner.pending.pop_front();
            }
        }
        Ok(n)
    }
}

impl embedded_io::ReadReady for MockChannel {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        let inner = self.inner.borrow();
        Ok(inner.pending.front().is_some_and(|p| self.is_due(p)))
    }
}

impl embedded_io::Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let scheduled: Vec<(u32, Vec<u8>)> = {
            let mut inner = self.inner.borrow_mut();
            if inner.fail_writes {
                return Err(ErrorKind::BrokenPipe);
            }
            inner.written.extend_from_slice(buf);
            let text = String::from_utf8_lossy(buf);
            inner
                .replies
                .iter()
                .filter(|r| text.contains(r.trigger.as_str()))
                .map(|r| (r.delay_ms, r.bytes.clone()))
                .collect()
        };
        for (delay_ms, bytes) in scheduled {
            self.schedule(delay_ms, &bytes);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Decoder double: records fed bytes and reports fixed values.
#[derive(Debug, Default)]
pub struct MockFix {
    pub fed: Vec<u8>,
    pub quality: FixQuality,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub satellites: Option<u32>,
    pub time: Option<TimeOfDay>,
    pub date: Option<Date>,
}

impl FixSource for MockFix {
    fn feed(&mut self, byte: u8) {
        self.fed.push(byte);
    }

    fn fix_quality(&self) -> FixQuality {
        self.quality
    }

    fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    fn satellites_in_use(&self) -> Option<u32> {
        self.satellites
    }

    fn time(&self) -> Option<TimeOfDay> {
        self.time
    }

    fn date(&self) -> Option<Date> {
        self.date
    }
}

#[derive(Default)]
struct ConsoleInner {
    input: VecDeque<u8>,
    output: String,
}

#[derive(Clone, Default)]
pub struct MockConsole {
    inner: Rc<RefCell<ConsoleInner>>,
}

impl MockConsole {
    pub fn type_line(&self, line: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.input.extend(line.bytes());
        inner.input.extend(b"\r\n");
    }

    pub fn output(&self) -> String {
        self.inner.borrow().output.clone()
    }

    pub fn clear_output(&self) {
        self.inner.borrow_mut().output.clear();
    }
}

impl core::fmt::Write for MockConsole {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.inner.borrow_mut().output.push_str(s);
        Ok(())
    }
}

impl Console for MockConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.inner.borrow_mut().input.pop_front()
    }
}

#[derive(Clone, Default)]
pub struct MockLed(Rc<Cell<bool>>);

impl MockLed {
    pub fn is_on(&self) -> bool {
        self.0.get()
    }
}

impl ErrorType for MockLed {
    type Error = Infallible;
}

impl OutputPin for MockLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct TestConfig {
    pub power: MockLed,
    pub gsm: MockLed,
    pub gps: MockLed,
}

impl TrackerConfig for TestConfig {
    type PowerLedPin = MockLed;
    type GsmLedPin = MockLed;
    type GpsLedPin = MockLed;

    const ADMIN_NUMBER: &'static str = "+15550100";

    fn power_led(&mut self) -> Option<&mut Self::PowerLedPin> {
        Some(&mut self.power)
    }

    fn gsm_led(&mut self) -> Option<&mut Self::GsmLedPin> {
        Some(&mut self.gsm)
    }

    fn gps_led(&mut self) -> Option<&mut Self::GpsLedPin> {
        Some(&mut self.gps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_channel_delivers_in_due_order() {
        use embedded_io::{Read, ReadReady, Write};

        let clock = MockClock::new();
        let mut channel = MockChannel::new(&clock);
        channel.reply_to("PING", 300, b"late");
        channel.reply_to("PING", 100, b"early");

        channel.write_all(b"PING\r\n").unwrap();
        assert!(!channel.read_ready().unwrap());

        clock.advance(100);
        let mut buf = [0u8; 16];
        let n = channel.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"early");

        clock.advance(200);
        let n = channel.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"late");
        assert!(!channel.read_ready().unwrap());
    }
}
