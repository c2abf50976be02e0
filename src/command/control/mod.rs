//! ### V.25ter control
pub mod types;

use super::NoResponse;
use atat::atat_derive::AtatCmd;
use types::Echo;

/// Command echo E
///
/// Controls whether or not the MT echoes characters received from the DTE
/// during command state. Echo must be off for the response matching done by
/// the transport to be reliable.
#[derive(Clone, AtatCmd)]
#[at_cmd("E", NoResponse, value_sep = false, timeout_ms = 3000)]
pub struct SetEcho {
    #[at_arg(position = 0)]
    pub enabled: Echo,
}
