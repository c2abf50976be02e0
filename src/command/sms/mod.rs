//! ### Short Messages Service (3GPP TS 27.005)

pub mod types;

use super::NoResponse;
use atat::atat_derive::AtatCmd;
use types::*;

/// Message format +CMGF
///
/// Selects the input and output format of messages. The tracker only ever
/// uses text mode.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMGF", NoResponse, timeout_ms = 3000)]
pub struct SetMessageFormat {
    #[at_arg(position = 0)]
    pub mode: MessageFormat,
}

/// New message indication +CNMI
///
/// Selects how new messages received from the network are indicated to the
/// DTE. With `mt` = [`MessageRouting::DirectToTe`] the message is forwarded
/// as a `+CMT:` URC followed by the message text.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CNMI", NoResponse, timeout_ms = 3000)]
pub struct SetNewMessageIndication {
    #[at_arg(position = 0)]
    pub mode: NewMessageIndicationMode,
    #[at_arg(position = 1)]
    pub mt: MessageRouting,
    #[at_arg(position = 2)]
    pub bm: u8,
    #[at_arg(position = 3)]
    pub ds: u8,
    #[at_arg(position = 4)]
    pub bfr: u8,
}

/// Send message +CMGS
///
/// In text mode the MT answers with the `>` prompt, after which the message
/// text is written and terminated with Ctrl-Z ([`CTRL_Z`]), or aborted with
/// ESC ([`ESC`]). The timeout is the bound for the prompt to appear.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMGS", NoResponse, timeout_ms = 5000)]
pub struct SendMessage<'a> {
    /// Destination address, international format with a leading `+`
    #[at_arg(position = 0, len = 20)]
    pub da: &'a str,
}
