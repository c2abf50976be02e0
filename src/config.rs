use embassy_time::Duration;
use embedded_hal::digital::{ErrorType, OutputPin};

/// Placeholder for a status LED that is not wired up.
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub trait TrackerConfig {
    type PowerLedPin: OutputPin;
    type GsmLedPin: OutputPin;
    type GpsLedPin: OutputPin;

    /// Recipient of every outbound message.
    const ADMIN_NUMBER: &'static str;

    const REPORT_INTERVAL: Duration = Duration::from_secs(60);
    const REGISTRATION_CHECK_INTERVAL: Duration = Duration::from_secs(10);

    /// Matched case-insensitively anywhere in an incoming message.
    const LOCATION_KEYWORD: &'static str = "location";

    /// Offset of local time from UTC, applied to reported fix times
    /// (330 for UTC+05:30).
    const LOCAL_OFFSET_MINUTES: i32 = 0;

    fn power_led(&mut self) -> Option<&mut Self::PowerLedPin>;
    fn gsm_led(&mut self) -> Option<&mut Self::GsmLedPin>;
    fn gps_led(&mut self) -> Option<&mut Self::GpsLedPin>;
}
