//! ### Network service

pub mod responses;

use atat::atat_derive::AtatCmd;
use responses::NetworkRegistrationStatus;

/// Network registration status +CREG
///
/// The read command returns `+CREG: <n>,<stat>[,<lac>,<ci>]`. Only `<stat>`
/// is interpreted, see [`crate::registration::Status`].
#[derive(Clone, AtatCmd)]
#[at_cmd("+CREG?", NetworkRegistrationStatus, timeout_ms = 2000)]
pub struct GetNetworkRegistrationStatus;
