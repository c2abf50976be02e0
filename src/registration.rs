use atat::AtatCmd;

use crate::command::network_service::GetNetworkRegistrationStatus;
use crate::transport::AtResponse;

/// 3GPP circuit switched registration status, `<stat>` of `+CREG`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    #[default]
    None,
    NotRegistering,
    Home,
    Searching,
    Denied,
    OutOfCoverage,
    Roaming,
}

impl From<u8> for Status {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::NotRegistering,
            1 => Self::Home,
            2 => Self::Searching,
            3 => Self::Denied,
            4 => Self::OutOfCoverage,
            5 => Self::Roaming,
            _ => Self::None,
        }
    }
}

impl Status {
    pub fn registered(self) -> bool {
        matches!(self, Self::Home | Self::Roaming)
    }
}

/// Interpretation of one `AT+CREG?` exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistrationResult {
    Registered,
    Unregistered,
    /// Nothing recognisable came back; ask again later.
    Unknown,
}

impl From<&AtResponse> for RegistrationResult {
    fn from(response: &AtResponse) -> Self {
        let Some(line) = response.line_from("+CREG:") else {
            return Self::Unknown;
        };

        match GetNetworkRegistrationStatus.parse(Ok(line.as_bytes())) {
            Ok(status) if Status::from(status.stat).registered() => Self::Registered,
            Ok(status) => {
                debug!("Not registered: {:?}", Status::from(status.stat));
                Self::Unregistered
            }
            Err(_) => {
                warn!("Unparsable registration status: {}", line);
                Self::Unregistered
            }
        }
    }
}
