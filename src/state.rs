//! Tracker state: modem, network and fix flags plus the report schedule.
//!
//! Every flag moves forward at most once. Nothing here talks to hardware;
//! the [`Runner`](crate::runner::Runner) decides when to call the
//! transitions.

use crate::gps::FixQuality;
use crate::traits::ticks_since;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModemState {
    #[default]
    Unknown,
    Responding,
    NotResponding,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NetworkState {
    #[default]
    Unregistered,
    Registered,
}

/// Millisecond tick anchors of the two periodic activities.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackingClock {
    pub last_location_sent_at: u32,
    /// `None` until the first registration check, which is due immediately.
    pub last_network_check_at: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackerState {
    modem: ModemState,
    network: NetworkState,
    fix: FixQuality,
    fix_announced: bool,
    clock: TrackingClock,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modem(&self) -> ModemState {
        self.modem
    }

    pub fn network(&self) -> NetworkState {
        self.network
    }

    pub fn fix(&self) -> FixQuality {
        self.fix
    }

    pub fn tracking(&self) -> &TrackingClock {
        &self.clock
    }

    pub fn is_registered(&self) -> bool {
        self.network == NetworkState::Registered
    }

    /// Record the outcome of the startup probe. Only the first call counts.
    pub fn set_modem_responding(&mut self, responding: bool) -> ModemState {
        if self.modem == ModemState::Unknown {
            self.modem = if responding {
                ModemState::Responding
            } else {
                ModemState::NotResponding
            };
        }
        self.modem
    }

    /// `NoFix` to `quality` if `quality` is at least 2D. Returns whether the
    /// state changed.
    pub fn acquire_fix(&mut self, quality: FixQuality) -> bool {
        if self.fix.is_fix() || !quality.is_fix() {
            return false;
        }
        self.fix = quality;
        true
    }

    /// `Unregistered` to `Registered`, anchoring the report schedule at
    /// `now`. Returns whether the state changed.
    pub fn register(&mut self, now: u32) -> bool {
        if self.is_registered() {
            return false;
        }
        self.network = NetworkState::Registered;
        self.clock.last_location_sent_at = now;
        true
    }

    /// True exactly once: the first time it is asked while both registered
    /// and holding a fix.
    pub fn take_fix_announcement(&mut self) -> bool {
        if self.fix_announced || !self.is_registered() || !self.fix.is_fix() {
            return false;
        }
        self.fix_announced = true;
        true
    }

    pub fn registration_check_due(&self, now: u32, interval_ms: u32) -> bool {
        self.modem == ModemState::Responding
            && !self.is_registered()
            && self
                .clock
                .last_network_check_at
                .map_or(true, |at| ticks_since(now, at) >= interval_ms)
    }

    pub fn registration_checked(&mut self, now: u32) {
        self.clock.last_network_check_at = Some(now);
    }

    pub fn report_due(&self, now: u32, interval_ms: u32) -> bool {
        self.is_registered()
            && self.fix.is_fix()
            && ticks_since(now, self.clock.last_location_sent_at) >= interval_ms
    }

    pub fn report_attempted(&mut self, now: u32) {
        self.clock.last_location_sent_at = now;
    }

    /// Milliseconds until the next periodic report, zero when overdue.
    pub fn next_report_in(&self, now: u32, interval_ms: u32) -> u32 {
        interval_ms.saturating_sub(ticks_since(now, self.clock.last_location_sent_at))
    }
}
