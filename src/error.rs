use embedded_io::ErrorKind;

/// Faults that escape a tracking tick.
///
/// Protocol level outcomes (no response, SMS prompt or confirmation timeouts,
/// rejected messages) are values, not errors; see
/// [`AtResponse`](crate::transport::AtResponse),
/// [`RegistrationResult`](crate::registration::RegistrationResult) and
/// [`SmsStatus`](crate::command::sms::types::SmsStatus).
#[derive(Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // Serial channel errors
    Io(ErrorKind),

    // Outbound text did not fit its buffer
    Overflow,

    // Operator console refused output
    Console,

    IoPin,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::Io(e) => defmt::write!(f, "Io({:?})", e),
            Self::Overflow => defmt::write!(f, "Overflow"),
            Self::Console => defmt::write!(f, "Console"),
            Self::IoPin => defmt::write!(f, "IoPin"),
        }
    }
}

impl Error {
    pub(crate) fn io<E: embedded_io::Error>(e: E) -> Self {
        Self::Io(e.kind())
    }
}
