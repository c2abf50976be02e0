//! Modem driver: connectivity probe, one-shot configuration, registration
//! probe and the prompt driven SMS protocol, on top of [`AtTransport`].

use atat::AtatCmd;
use embassy_time::Duration;

use crate::command::control::{types::Echo, SetEcho};
use crate::command::network_service::GetNetworkRegistrationStatus;
use crate::command::sms::types::{
    InboundSms, MessageFormat, MessageRouting, NewMessageIndicationMode, SmsStatus, CTRL_Z, ESC,
    PROMPT,
};
use crate::command::sms::{SendMessage, SetMessageFormat, SetNewMessageIndication};
use crate::command::AT;
use crate::error::Error;
use crate::module_timing::{
    as_ms, body_settle_time, config_settle_time, confirmation_poll_interval,
    delivery_poll_interval, delivery_settle_time, probe_settle_time, prompt_poll_interval,
    registration_settle_time, sms_confirmation_time,
};
use crate::registration::RegistrationResult;
use crate::traits::{Clock, ModemChannel};
use crate::transport::{AtResponse, AtTransport};

/// Whether a `+CMT:` header and the body line after it have both arrived.
fn delivery_complete(response: &AtResponse) -> bool {
    let text = response.as_str();
    let Some(start) = text.find("+CMT:") else {
        return false;
    };
    let rest = &text[start..];
    match rest.find('\n') {
        Some(header_end) => rest[header_end + 1..].contains('\n'),
        None => false,
    }
}

pub struct Modem<CH> {
    at: AtTransport<CH>,
    /// `+CMT:` delivery whose body has not fully arrived yet.
    delivery: AtResponse,
}

impl<CH: ModemChannel> Modem<CH> {
    pub fn new(channel: CH) -> Self {
        Self {
            at: AtTransport::new(channel),
            delivery: AtResponse::new(),
        }
    }

    /// Command exchange that does not lose the rest of a partial delivery
    /// to the transport's stale input discard.
    fn exchange<Cmd: AtatCmd, C: Clock>(
        &mut self,
        clock: &mut C,
        cmd: &Cmd,
        settle: Duration,
    ) -> Result<AtResponse, Error> {
        if !self.delivery.is_empty() {
            self.at.read_into(&mut self.delivery)?;
        }
        self.at.send_command(clock, cmd, settle)
    }

    /// Whether the modem answers a plain `AT` with `OK`.
    pub fn probe_connectivity<C: Clock>(&mut self, clock: &mut C) -> Result<bool, Error> {
        info!("Checking GSM module connection...");
        let response = self.exchange(clock, &AT, probe_settle_time())?;
        if response.contains("OK") {
            info!("GSM module is responding");
            Ok(true)
        } else {
            warn!("GSM module not responding, check power supply, TX/RX and ground");
            Ok(false)
        }
    }

    /// Disable echo, select text mode and route new messages to the TE.
    ///
    /// Fire and forget: responses are not checked.
    pub fn configure<C: Clock>(&mut self, clock: &mut C) -> Result<(), Error> {
        info!("Configuring GSM module for SMS...");
        self.exchange(
            clock,
            &SetEcho {
                enabled: Echo::Disable,
            },
            config_settle_time(),
        )?;
        self.set_text_mode(clock)?;
        self.exchange(
            clock,
            &SetNewMessageIndication {
                mode: NewMessageIndicationMode::BufferWhenReserved,
                mt: MessageRouting::DirectToTe,
                bm: 0,
                ds: 0,
                bfr: 0,
            },
            config_settle_time(),
        )?;
        info!("GSM configuration complete");
        Ok(())
    }

    pub fn check_registration<C: Clock>(
        &mut self,
        clock: &mut C,
    ) -> Result<RegistrationResult, Error> {
        let response = self.exchange(
            clock,
            &GetNetworkRegistrationStatus,
            registration_settle_time(),
        )?;
        Ok(RegistrationResult::from(&response))
    }

    /// Compose and submit a text message.
    ///
    /// The body is never written before the `>` prompt has been seen. If the
    /// prompt does not arrive within the `+CMGS` timeout, composition is
    /// aborted with ESC.
    pub fn send_sms<C: Clock>(
        &mut self,
        clock: &mut C,
        number: &str,
        body: &str,
    ) -> Result<SmsStatus, Error> {
        info!("Sending SMS to {}", number);
        debug!("Message: {}", body);

        self.set_text_mode(clock)?;

        let cmd = SendMessage { da: number };
        self.at.write_command(&cmd)?;

        let mut response = AtResponse::new();
        let prompted = self.at.poll_until(
            clock,
            &mut response,
            Duration::from_millis(SendMessage::MAX_TIMEOUT_MS as u64),
            prompt_poll_interval(),
            |r| r.as_str().as_bytes().contains(&PROMPT),
        )?;
        if !prompted {
            error!("Failed to get SMS prompt '>'");
            self.at.write_raw(&[ESC])?;
            return Ok(SmsStatus::PromptTimeout);
        }

        debug!("Got prompt, sending message...");
        self.at.write_raw(body.as_bytes())?;
        clock.delay_ms(as_ms(body_settle_time()));
        self.at.write_raw(&[CTRL_Z])?;

        let mut confirmation = AtResponse::new();
        self.at.poll_until(
            clock,
            &mut confirmation,
            sms_confirmation_time(),
            confirmation_poll_interval(),
            |r| r.contains("+CMGS:") || r.contains("OK") || r.contains("ERROR"),
        )?;

        let status = if confirmation.contains("+CMGS:") || confirmation.contains("OK") {
            SmsStatus::Sent
        } else if confirmation.contains("ERROR") {
            SmsStatus::Rejected
        } else {
            SmsStatus::ConfirmationTimeout
        };

        match status {
            SmsStatus::Sent => info!("SMS sent successfully"),
            SmsStatus::Rejected => error!("SMS error: {}", confirmation.as_str().trim()),
            _ => warn!("SMS timeout, message may not have been sent"),
        }

        Ok(status)
    }

    /// Collect whatever the modem sent outside of a command exchange and
    /// return it once it carries a complete `+CMT:` delivery.
    ///
    /// A delivery that is still missing its body line is given
    /// [`delivery_settle_time`] to finish, then carried over to the next
    /// call. Any other unsolicited input is dropped.
    pub fn poll_inbound<C: Clock>(
        &mut self,
        clock: &mut C,
    ) -> Result<Option<InboundSms>, Error> {
        let received = self.at.read_into(&mut self.delivery)?;

        if !self.delivery.contains("+CMT:") {
            if received {
                trace!("Ignoring unsolicited input: {}", self.delivery.as_str().trim());
            }
            self.delivery = AtResponse::new();
            return Ok(None);
        }

        if received && !delivery_complete(&self.delivery) {
            self.at.poll_until(
                clock,
                &mut self.delivery,
                delivery_settle_time(),
                delivery_poll_interval(),
                delivery_complete,
            )?;
        }

        if delivery_complete(&self.delivery) || self.delivery.is_full() {
            let delivery = core::mem::take(&mut self.delivery);
            info!("Incoming SMS: {}", delivery.as_str().trim());
            Ok(Some(InboundSms::new(delivery)))
        } else {
            debug!("Partial SMS delivery, waiting for the body");
            Ok(None)
        }
    }

    fn set_text_mode<C: Clock>(&mut self, clock: &mut C) -> Result<(), Error> {
        self.exchange(
            clock,
            &SetMessageFormat {
                mode: MessageFormat::Text,
            },
            config_settle_time(),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockChannel, MockClock};

    const NUMBER: &str = "+15550100";

    fn modem_with(clock: &MockClock) -> (Modem<MockChannel>, MockChannel) {
        let channel = MockChannel::new(clock);
        channel.reply_to("AT+CMGF=1\r\n", 20, b"\r\nOK\r\n");
        (Modem::new(channel.clone()), channel)
    }

    #[test]
    fn probe_fails_on_silent_modem() {
        let clock = MockClock::new();
        let (mut modem, _) = modem_with(&clock);
        let mut c = clock.clone();

        assert_eq!(modem.probe_connectivity(&mut c), Ok(false));
    }

    #[test]
    fn probe_succeeds_on_ok() {
        let clock = MockClock::new();
        let (mut modem, channel) = modem_with(&clock);
        channel.reply_to("AT\r\n", 30, b"AT\r\r\nOK\r\n");
        let mut c = clock.clone();

        assert_eq!(modem.probe_connectivity(&mut c), Ok(true));
    }

    #[test]
    fn configure_sends_echo_text_mode_and_indication() {
        let clock = MockClock::new();
        let (mut modem, channel) = modem_with(&clock);
        let mut c = clock.clone();

        modem.configure(&mut c).unwrap();

        let written = channel.written_str();
        let echo = written.find("ATE0\r\n").unwrap();
        let cmgf = written.find("AT+CMGF=1\r\n").unwrap();
        let cnmi = written.find("AT+CNMI=2,2,0,0,0\r\n").unwrap();
        assert!(echo < cmgf && cmgf < cnmi);
    }

    #[test]
    fn registration_probe() {
        let clock = MockClock::new();
        let (mut modem, channel) = modem_with(&clock);
        channel.reply_to("AT+CREG?\r\n", 40, b"\r\n+CREG: 0,5\r\n\r\nOK\r\n");
        let mut c = clock.clone();

        assert_eq!(
            modem.check_registration(&mut c),
            Ok(RegistrationResult::Registered)
        );
        assert!(channel.written_str().contains("AT+CREG?\r\n"));
    }

    #[test]
    fn registration_probe_without_answer_is_unknown() {
        let clock = MockClock::new();
        let (mut modem, _) = modem_with(&clock);
        let mut c = clock.clone();

        assert_eq!(
            modem.check_registration(&mut c),
            Ok(RegistrationResult::Unknown)
        );
    }

    #[test]
    fn sms_is_sent_after_prompt() {
        let clock = MockClock::new();
        let (mut modem, channel) = modem_with(&clock);
        channel.reply_to("AT+CMGS=", 200, b"\r\n> ");
        channel.reply_to("\x1a", 1500, b"\r\n+CMGS: 12\r\n\r\nOK\r\n");
        let mut c = clock.clone();

        assert_eq!(
            modem.send_sms(&mut c, NUMBER, "Hello"),
            Ok(SmsStatus::Sent)
        );

        let written = channel.written_str();
        let cmgs = written.find("AT+CMGS=\"+15550100\"\r\n").unwrap();
        let body = written.find("Hello").unwrap();
        assert!(cmgs < body);
        assert!(written.ends_with("Hello\x1a"));
    }

    #[test]
    fn body_is_never_written_without_prompt() {
        let clock = MockClock::new();
        let (mut modem, channel) = modem_with(&clock);
        let mut c = clock.clone();
        let before = clock.now();

        assert_eq!(
            modem.send_sms(&mut c, NUMBER, "Hello"),
            Ok(SmsStatus::PromptTimeout)
        );

        let written = channel.written_str();
        assert!(!written.contains("Hello"));
        assert!(!written.contains('\x1a'));
        assert!(written.ends_with('\x1b'));
        // CMGF exchange, then the five second prompt bound
        assert!(clock.now() - before >= 5000);
    }

    #[test]
    fn error_after_submit_is_rejected() {
        let clock = MockClock::new();
        let (mut modem, channel) = modem_with(&clock);
        channel.reply_to("AT+CMGS=", 0, b"> ");
        channel.reply_to("\x1a", 300, b"\r\n+CMS ERROR: 500\r\n");
        let mut c = clock.clone();

        assert_eq!(
            modem.send_sms(&mut c, NUMBER, "Hello"),
            Ok(SmsStatus::Rejected)
        );
    }

    #[test]
    fn silence_after_submit_is_confirmation_timeout() {
        let clock = MockClock::new();
        let (mut modem, channel) = modem_with(&clock);
        channel.reply_to("AT+CMGS=", 0, b"> ");
        let mut c = clock.clone();
        let before = clock.now();

        assert_eq!(
            modem.send_sms(&mut c, NUMBER, "Hello"),
            Ok(SmsStatus::ConfirmationTimeout)
        );
        assert!(clock.now() - before >= 10_000);
    }

    #[test]
    fn inbound_delivery_is_recognised() {
        let clock = MockClock::new();
        let (mut modem, channel) = modem_with(&clock);
        let mut c = clock.clone();

        assert!(modem.poll_inbound(&mut c).unwrap().is_none());

        channel.push_incoming(b"\r\nRING\r\n");
        assert!(modem.poll_inbound(&mut c).unwrap().is_none());

        channel.push_incoming(
            b"\r\n+CMT: \"+447700900123\",\"\",\"24/05/01,10:15:00+04\"\r\nWhere? Send LOCATION\r\n",
        );
        let before = clock.now();
        let sms = modem.poll_inbound(&mut c).unwrap().unwrap();
        assert!(sms.mentions("location"));
        assert!(!sms.mentions("status"));
        assert_eq!(clock.now(), before);
    }

    #[test]
    fn slow_delivery_body_is_awaited() {
        let clock = MockClock::new();
        let channel = MockChannel::new(&clock);
        let mut modem = Modem::new(channel.clone());
        let mut c = clock.clone();

        channel.push_incoming(b"\r\n+CMT: \"+447700900123\",\"\",\"24/05/01,10:15:00+04\"\r\n");
        // Body trickles in shortly after the header
        channel.schedule_in(120, b"location\r\n");

        let sms = modem.poll_inbound(&mut c).unwrap().unwrap();
        assert!(sms.mentions("location"));
        assert!(clock.now() < as_ms(delivery_settle_time()));
    }

    #[test]
    fn delivery_split_across_polls_is_carried_over() {
        let clock = MockClock::new();
        let (mut modem, channel) = modem_with(&clock);
        channel.reply_to("AT+CREG?\r\n", 40, b"\r\n+CREG: 0,1\r\n\r\nOK\r\n");
        let mut c = clock.clone();

        channel.push_incoming(b"\r\n+CMT: \"+447700900123\",\"\",\"24/05/01,10:15:00+04\"\r\n");
        assert!(modem.poll_inbound(&mut c).unwrap().is_none());

        // Body arrives late, then a command exchange runs before the next poll
        channel.push_incoming(b"LOCATION\r\n");
        assert_eq!(
            modem.check_registration(&mut c),
            Ok(RegistrationResult::Registered)
        );

        let sms = modem.poll_inbound(&mut c).unwrap().unwrap();
        assert!(sms.mentions("location"));
        assert!(sms.raw().contains("+CMT:"));
        assert!(modem.poll_inbound(&mut c).unwrap().is_none());
    }
}
