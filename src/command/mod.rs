//! AT Commands for GSM modems (3GPP TS 27.005 / 27.007 subset)
//! Only the commands the tracker issues are modelled here.

pub mod control;
pub mod network_service;
pub mod sms;

use atat::atat_derive::{AtatCmd, AtatResp};

#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Attention, used as a connectivity probe
#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse, timeout_ms = 2000)]
pub struct AT;
