//! Responses for Network service Commands
use atat::atat_derive::AtatResp;

/// Network registration status +CREG
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct NetworkRegistrationStatus {
    /// URC configuration, 0 unless changed with the set command
    #[at_arg(position = 0)]
    pub n: u8,
    #[at_arg(position = 1)]
    pub stat: u8,
}
