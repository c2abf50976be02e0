//! Argument and parameter types used by Short Messages Service Commands
use atat::atat_derive::AtatEnum;
use heapless::String;

/// Compose prompt sent by the MT after `+CMGS`
pub const PROMPT: u8 = b'>';
/// Terminates the message text and submits it
pub const CTRL_Z: u8 = 0x1A;
/// Aborts message composition
pub const ESC: u8 = 0x1B;

/// Longest text-mode message body the tracker composes
pub const MAX_SMS_LEN: usize = 160;

/// Outbound message body
pub type SmsBody = String<MAX_SMS_LEN>;

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum MessageFormat {
    /// 0 (default): PDU mode
    Pdu = 0,
    /// 1: text mode
    Text = 1,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum NewMessageIndicationMode {
    /// 0: buffer URCs in the MT
    Buffer = 0,
    /// 1: discard URCs when the link is reserved, otherwise forward
    DiscardWhenReserved = 1,
    /// 2: buffer URCs while the link is reserved, flush afterwards
    BufferWhenReserved = 2,
}

#[derive(Clone, PartialEq, Eq, AtatEnum)]
pub enum MessageRouting {
    /// 0: no indication
    None = 0,
    /// 1: store and indicate the storage location with `+CMTI`
    StoreAndIndicate = 1,
    /// 2: route the message directly to the TE with `+CMT`
    DirectToTe = 2,
}

/// Outcome of the prompt driven `+CMGS` exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SmsStatus {
    /// `+CMGS:` (or a bare `OK`) was seen
    Sent,
    /// No `>` within the prompt bound; composition was aborted with ESC
    PromptTimeout,
    /// Message submitted but nothing conclusive within the confirmation bound
    ConfirmationTimeout,
    /// The MT answered `ERROR`
    Rejected,
}

impl SmsStatus {
    pub fn is_sent(self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Unsolicited `+CMT:` delivery, kept as the raw text the MT sent.
///
/// The originating address is not parsed; replies always go to the
/// configured administrator number.
#[derive(Debug, Clone)]
pub struct InboundSms {
    raw: crate::transport::AtResponse,
}

impl InboundSms {
    pub(crate) fn new(raw: crate::transport::AtResponse) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &str {
        self.raw.as_str()
    }

    /// ASCII case-insensitive search for `keyword` anywhere in the delivery.
    pub fn mentions(&self, keyword: &str) -> bool {
        let haystack = self.raw.as_str().as_bytes();
        let needle = keyword.as_bytes();
        if needle.is_empty() {
            return true;
        }
        haystack
            .windows(needle.len())
            .any(|w| w.eq_ignore_ascii_case(needle))
    }
}
