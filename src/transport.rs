//! Blocking request/response exchange with the modem over a byte channel.

use atat::AtatCmd;
use embassy_time::Duration;
use heapless::String;

use crate::error::Error;
use crate::module_timing::{as_ms, response_poll_interval};
use crate::traits::{Clock, ModemChannel};

/// Capacity of a collected response; further bytes are dropped.
pub const MAX_RESPONSE_LEN: usize = 256;

const MAX_COMMAND_LEN: usize = 64;
const READ_CHUNK: usize = 64;

/// Text collected from the modem during one exchange.
///
/// Decoding is best effort: invalid UTF-8 sequences and bytes beyond
/// [`MAX_RESPONSE_LEN`] are dropped. An empty response means nothing arrived
/// within the wait bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtResponse {
    text: String<MAX_RESPONSE_LEN>,
}

impl AtResponse {
    pub const fn new() -> Self {
        Self { text: String::new() }
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// No room left for another character.
    pub fn is_full(&self) -> bool {
        self.text.capacity() - self.text.len() < 4
    }

    pub fn contains(&self, token: &str) -> bool {
        self.text.contains(token)
    }

    /// The line (up to CR or LF) that starts at the first occurrence of `token`.
    pub fn line_from(&self, token: &str) -> Option<&str> {
        let text = self.as_str();
        let start = text.find(token)?;
        let rest = &text[start..];
        let end = rest.find(|c: char| c == '\r' || c == '\n').unwrap_or(rest.len());
        Some(&rest[..end])
    }

    pub(crate) fn push_lossy(&mut self, mut bytes: &[u8]) {
        loop {
            match core::str::from_utf8(bytes) {
                Ok(s) => {
                    self.push_str_truncating(s);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = bytes.split_at(e.valid_up_to());
                    if let Ok(s) = core::str::from_utf8(valid) {
                        self.push_str_truncating(s);
                    }
                    match e.error_len() {
                        Some(n) => bytes = &rest[n..],
                        // Truncated sequence at the end of the chunk
                        None => return,
                    }
                }
            }
        }
    }

    fn push_str_truncating(&mut self, s: &str) {
        for c in s.chars() {
            if self.text.push(c).is_err() {
                trace!("Response buffer full, dropping remaining bytes");
                return;
            }
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AtResponse {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// Sends textual AT commands and collects whatever the modem answers within
/// a bounded wait. Owns the modem channel; holds no other state.
pub struct AtTransport<CH> {
    channel: CH,
}

impl<CH: ModemChannel> AtTransport<CH> {
    pub fn new(channel: CH) -> Self {
        Self { channel }
    }

    pub fn release(self) -> CH {
        self.channel
    }

    /// Send `cmd` and collect its response.
    ///
    /// Stale bytes are discarded before writing. The channel is then polled
    /// for up to `Cmd::MAX_TIMEOUT_MS`; once anything arrives the transport
    /// waits `settle` and reads exactly once more to pick up trailing bytes.
    /// No bytes at all yields an empty response, which is not an error.
    pub fn send_command<Cmd: AtatCmd, C: Clock>(
        &mut self,
        clock: &mut C,
        cmd: &Cmd,
        settle: Duration,
    ) -> Result<AtResponse, Error> {
        self.discard_pending()?;

        let mut buf = [0u8; MAX_COMMAND_LEN];
        debug_assert!(Cmd::MAX_LEN <= MAX_COMMAND_LEN);
        let len = cmd.write(&mut buf);
        debug!(
            "Sending: {}",
            core::str::from_utf8(&buf[..len]).unwrap_or("<binary>").trim()
        );
        self.write_raw(&buf[..len])?;

        let mut response = AtResponse::new();
        let start = clock.ticks_ms();
        while clock.elapsed_since(start) < Cmd::MAX_TIMEOUT_MS {
            if self.read_into(&mut response)? {
                clock.delay_ms(as_ms(settle));
                self.read_into(&mut response)?;
                break;
            }
            clock.delay_ms(as_ms(response_poll_interval()));
        }

        if response.is_empty() {
            debug!("No response received");
        } else {
            debug!("Response: {}", response.as_str().trim());
        }

        Ok(response)
    }

    /// Write `cmd` without discarding pending input or waiting for a reply.
    pub(crate) fn write_command<Cmd: AtatCmd>(&mut self, cmd: &Cmd) -> Result<(), Error> {
        let mut buf = [0u8; MAX_COMMAND_LEN];
        let len = cmd.write(&mut buf);
        debug!(
            "Sending: {}",
            core::str::from_utf8(&buf[..len]).unwrap_or("<binary>").trim()
        );
        self.write_raw(&buf[..len])
    }

    pub(crate) fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.channel.write_all(bytes).map_err(Error::io)?;
        self.channel.flush().map_err(Error::io)
    }

    /// Append everything currently buffered on the channel to `response`.
    ///
    /// Returns whether any byte was read.
    pub(crate) fn read_into(&mut self, response: &mut AtResponse) -> Result<bool, Error> {
        let mut any = false;
        let mut chunk = [0u8; READ_CHUNK];
        while self.channel.read_ready().map_err(Error::io)? {
            let n = self.channel.read(&mut chunk).map_err(Error::io)?;
            if n == 0 {
                break;
            }
            response.push_lossy(&chunk[..n]);
            any = true;
        }
        Ok(any)
    }

    /// Poll the channel every `step` until `done` accepts the accumulated
    /// response or `bound` elapses. Returns whether `done` was satisfied.
    pub(crate) fn poll_until<C: Clock>(
        &mut self,
        clock: &mut C,
        response: &mut AtResponse,
        bound: Duration,
        step: Duration,
        mut done: impl FnMut(&AtResponse) -> bool,
    ) -> Result<bool, Error> {
        let start = clock.ticks_ms();
        while clock.elapsed_since(start) < as_ms(bound) {
            if self.read_into(response)? && done(response) {
                return Ok(true);
            }
            clock.delay_ms(as_ms(step));
        }
        Ok(false)
    }

    fn discard_pending(&mut self) -> Result<(), Error> {
        let mut stale = AtResponse::new();
        if self.read_into(&mut stale)? {
            trace!("Discarding stale input: {}", stale.as_str().trim());
        }
        Ok(())
    }
}
