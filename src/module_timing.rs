use embassy_time::Duration;

/// Interval between polls of the modem channel while waiting for a response
pub fn response_poll_interval() -> Duration {
    Duration::from_millis(100)
}

/// Settle time after the first bytes of the `AT` probe response
pub fn probe_settle_time() -> Duration {
    Duration::from_millis(1000)
}

/// Settle time for configuration commands (`ATE0`, `+CMGF`, `+CNMI`)
pub fn config_settle_time() -> Duration {
    Duration::from_millis(500)
}

/// Settle time after the first bytes of a `+CREG?` response
pub fn registration_settle_time() -> Duration {
    Duration::from_millis(500)
}

/// Interval between polls for the `>` compose prompt
pub fn prompt_poll_interval() -> Duration {
    Duration::from_millis(50)
}

/// Pause between the message body and the Ctrl-Z terminator
pub fn body_settle_time() -> Duration {
    Duration::from_millis(100)
}

/// Upper bound for the network to confirm a submitted message
pub fn sms_confirmation_time() -> Duration {
    Duration::from_secs(10)
}

/// Interval between polls for the `+CMGS` confirmation
pub fn confirmation_poll_interval() -> Duration {
    Duration::from_millis(100)
}

/// Longest wait for the body line of a `+CMT:` delivery within one tick
pub fn delivery_settle_time() -> Duration {
    Duration::from_millis(500)
}

/// Interval between polls for the rest of a `+CMT:` delivery
pub fn delivery_poll_interval() -> Duration {
    Duration::from_millis(50)
}

/// Sleep between two tracking ticks
pub fn tick_interval() -> Duration {
    Duration::from_millis(50)
}

/// Sleep after a tick failed, before the next one
pub fn fault_backoff() -> Duration {
    Duration::from_millis(500)
}

pub(crate) fn as_ms(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}
