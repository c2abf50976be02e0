#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod gps;
pub mod modem;
mod module_timing;
pub mod registration;
pub mod runner;
pub mod state;
pub mod traits;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use config::TrackerConfig;
pub use error::Error;
pub use gps::{GpsTracker, NmeaDecoder};
pub use modem::Modem;
pub use runner::Runner;
