use core::fmt::{self, Write as _};

use embedded_hal::digital::OutputPin;

use crate::command::sms::types::{SmsBody, SmsStatus};
use crate::config::TrackerConfig;
use crate::console::{Command, Console, GpsDetails, LineBuffer, StatusReport};
use crate::error::Error;
use crate::gps::{FixSource, GpsTracker, LocationSnapshot};
use crate::modem::Modem;
use crate::module_timing::{as_ms, fault_backoff, tick_interval};
use crate::registration::RegistrationResult;
use crate::state::{ModemState, TrackerState};
use crate::traits::{ticks_since, Clock, GpsChannel, ModemChannel};

const ONLINE_MESSAGE: &str = "Vehicle Tracking System is online.";
const FIX_ACQUIRED_MESSAGE: &str = "GPS fix acquired. Tracking active.";
const TEST_MESSAGE: &str = "Test message from Vehicle Tracker";

fn light<P: OutputPin>(pin: Option<&mut P>) -> Result<(), Error> {
    if let Some(pin) = pin {
        pin.set_high().map_err(|_| Error::IoPin)?;
    }
    Ok(())
}

fn compose(args: fmt::Arguments<'_>) -> Result<SmsBody, Error> {
    let mut body = SmsBody::new();
    body.write_fmt(args).map_err(|_| Error::Overflow)?;
    Ok(body)
}

/// Tracking control loop.
///
/// Owns both drivers, the clock and the console. Call [`Runner::init`] once,
/// then [`Runner::run`] (or [`Runner::step`] from an outer loop).
pub struct Runner<C, MCH, GCH, D, CON, CFG> {
    modem: Modem<MCH>,
    gps: GpsTracker<GCH, D>,
    clock: C,
    console: CON,
    config: CFG,
    state: TrackerState,
    line: LineBuffer,
}

impl<C, MCH, GCH, D, CON, CFG> Runner<C, MCH, GCH, D, CON, CFG>
where
    C: Clock,
    MCH: ModemChannel,
    GCH: GpsChannel,
    D: FixSource,
    CON: Console,
    CFG: TrackerConfig,
{
    pub fn new(
        modem: Modem<MCH>,
        gps: GpsTracker<GCH, D>,
        clock: C,
        console: CON,
        config: CFG,
    ) -> Self {
        Self {
            modem,
            gps,
            clock,
            console,
            config,
            state: TrackerState::new(),
            line: LineBuffer::new(),
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn gps(&self) -> &GpsTracker<GCH, D> {
        &self.gps
    }

    /// Probe the modem and configure it for text mode SMS if it answers.
    pub fn init(&mut self) -> Result<ModemState, Error> {
        info!("Initializing...");
        light(self.config.power_led())?;

        let responding = self.modem.probe_connectivity(&mut self.clock)?;
        let modem = self.state.set_modem_responding(responding);
        if responding {
            self.modem.configure(&mut self.clock)?;
        } else {
            warn!("GSM module not detected, SMS features won't work");
        }

        writeln!(
            self.console,
            "System is running...\nCommands:\n  - Type 'x' for status report\n  - Type 't' to test SMS\n  - Type 'l' to get location"
        )
        .map_err(|_| Error::Console)?;

        Ok(modem)
    }

    /// Run forever; tick failures are logged and backed off, never fatal.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// One tick followed by the tick sleep, or by the fault backoff if the
    /// tick failed.
    pub fn step(&mut self) {
        match self.tick() {
            Ok(()) => self.clock.delay_ms(as_ms(tick_interval())),
            Err(e) => {
                error!("Error in main loop: {:?}", e);
                self.clock.delay_ms(as_ms(fault_backoff()));
            }
        }
    }

    pub fn tick(&mut self) -> Result<(), Error> {
        let now = self.clock.ticks_ms();

        self.gps.ingest()?;

        if !self.state.fix().is_fix() && self.gps.has_valid_fix() {
            let quality = self.gps.fix_quality();
            if self.state.acquire_fix(quality) {
                info!("GPS fix acquired: {:?}", quality);
                light(self.config.gps_led())?;
            }
        }
        if self.state.take_fix_announcement() {
            self.announce_fix()?;
        }

        if self
            .state
            .registration_check_due(now, as_ms(CFG::REGISTRATION_CHECK_INTERVAL))
        {
            match self.modem.check_registration(&mut self.clock)? {
                RegistrationResult::Registered => {
                    self.state.register(now);
                    info!("GSM network connected");
                    light(self.config.gsm_led())?;
                    self.send_to_admin(ONLINE_MESSAGE)?;
                    if self.state.take_fix_announcement() {
                        self.announce_fix()?;
                    }
                }
                RegistrationResult::Unregistered => {
                    info!("GSM not registered yet, will retry...")
                }
                RegistrationResult::Unknown => debug!("No registration status received"),
            }
            self.state.registration_checked(now);
        }

        if self.state.report_due(now, as_ms(CFG::REPORT_INTERVAL)) && self.gps.has_valid_fix() {
            self.state.report_attempted(now);
            info!("Sending periodic location report");
            let body = self.location_text()?;
            self.send_to_admin(&body)?;
        }

        if let Some(sms) = self.modem.poll_inbound(&mut self.clock)? {
            if sms.mentions(CFG::LOCATION_KEYWORD) {
                info!("Location request via SMS");
                let body = self.location_text()?;
                self.send_to_admin(&body)?;
            }
        }

        while let Some(byte) = self.console.read_byte() {
            if let Some(cmd) = self.line.push(byte) {
                self.dispatch(cmd)?;
            }
        }

        Ok(())
    }

    pub fn status_report(&self) -> StatusReport<'static> {
        let now = self.clock.ticks_ms();
        let interval = as_ms(CFG::REPORT_INTERVAL);
        let decoder = self.gps.decoder();

        let gps = match (self.state.fix().is_fix(), self.gps.snapshot()) {
            (true, Some(snapshot)) => Some(GpsDetails {
                latitude: snapshot.latitude,
                longitude: snapshot.longitude,
                satellites: decoder.satellites_in_use(),
                time: decoder
                    .time()
                    .map(|t| t.shifted(CFG::LOCAL_OFFSET_MINUTES)),
            }),
            _ => None,
        };

        StatusReport {
            modem: self.state.modem(),
            network: self.state.network(),
            fix_acquired: self.state.fix().is_fix(),
            gps,
            report_interval_secs: interval / 1000,
            last_sent_secs_ago: ticks_since(now, self.state.tracking().last_location_sent_at)
                / 1000,
            next_send_secs: self.state.next_report_in(now, interval) / 1000,
            admin_number: CFG::ADMIN_NUMBER,
        }
    }

    fn dispatch(&mut self, cmd: Command) -> Result<(), Error> {
        match cmd {
            Command::Status => {
                let report = self.status_report();
                write!(self.console, "\n{}", report).map_err(|_| Error::Console)?;
            }
            Command::TestSms => {
                writeln!(self.console, "\nTesting SMS...").map_err(|_| Error::Console)?;
                let outcome = match self.send_to_admin(TEST_MESSAGE)? {
                    Some(SmsStatus::Sent) => "Test SMS sent",
                    Some(SmsStatus::PromptTimeout) => "Test SMS failed: no prompt from modem",
                    Some(SmsStatus::ConfirmationTimeout) => "Test SMS failed: no confirmation",
                    Some(SmsStatus::Rejected) => "Test SMS failed: rejected by modem",
                    None => "Cannot send SMS. GSM not connected.",
                };
                writeln!(self.console, "{}", outcome).map_err(|_| Error::Console)?;
            }
            Command::Location => {
                let text = self.location_text()?;
                writeln!(self.console, "\nCurrent Location:\n{}", text)
                    .map_err(|_| Error::Console)?;
            }
            Command::Unknown(cmd) => {
                warn!("Unknown console command: {}", cmd.as_str());
                writeln!(
                    self.console,
                    "\nUnknown command: '{}'\n{}",
                    cmd.as_str(),
                    Command::HELP
                )
                .map_err(|_| Error::Console)?;
            }
        }
        Ok(())
    }

    /// Current position with its timestamp in local time.
    fn snapshot(&self) -> Option<LocationSnapshot> {
        self.gps
            .snapshot()
            .map(|s| s.with_local_offset(CFG::LOCAL_OFFSET_MINUTES))
    }

    fn location_text(&self) -> Result<SmsBody, Error> {
        match self.snapshot() {
            Some(snapshot) => compose(format_args!("{}", snapshot)),
            None => compose(format_args!("{}", LocationSnapshot::UNAVAILABLE)),
        }
    }

    fn announce_fix(&mut self) -> Result<(), Error> {
        let body = match self.snapshot() {
            Some(snapshot) => compose(format_args!("{}\n{}", FIX_ACQUIRED_MESSAGE, snapshot))?,
            None => compose(format_args!("{}", FIX_ACQUIRED_MESSAGE))?,
        };
        self.send_to_admin(&body)?;
        Ok(())
    }

    /// Send `body` to the administrator. Nothing is attempted while the
    /// network is not registered.
    fn send_to_admin(&mut self, body: &str) -> Result<Option<SmsStatus>, Error> {
        if !self.state.is_registered() {
            warn!("Cannot send SMS, GSM not connected");
            return Ok(None);
        }
        self.modem
            .send_sms(&mut self.clock, CFG::ADMIN_NUMBER, body)
            .map(Some)
    }
}
