/// Connection state for the telemetry link with a fixed-interval retry
/// gate: while disconnected, a new connect attempt is allowed only once
/// `retry_interval_ms` has elapsed since the previous one. The backoff is
/// deliberately flat, not exponential.
#[derive(Debug, Clone)]
pub struct ReconnectGate {
    retry_interval_ms: u64,
    connected: bool,
    last_attempt_ms: Option<u64>,
}

impl ReconnectGate {
    pub fn new(retry_interval_ms: u64) -> Self {
        Self {
            retry_interval_ms,
            connected: false,
            last_attempt_ms: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn mark_connected(&mut self) {
        self.connected = true;
    }

    pub fn mark_disconnected(&mut self) {
        self.connected = false;
    }

    /// Whether a connect attempt may start now.
    pub fn should_attempt(&self, now_ms: u64) -> bool {
        if self.connected {
            return false;
        }
        self.last_attempt_ms
            .map(|last| now_ms.saturating_sub(last) >= self.retry_interval_ms)
            .unwrap_or(true)
    }

    /// Milliseconds until the next attempt is allowed, 0 when it may start
    /// immediately.
    pub fn retry_delay_ms(&self, now_ms: u64) -> u64 {
        match self.last_attempt_ms {
            Some(last) => self
                .retry_interval_ms
                .saturating_sub(now_ms.saturating_sub(last)),
            None => 0,
        }
    }

    pub fn record_attempt(&mut self, now_ms: u64) {
        self.last_attempt_ms = Some(now_ms);
    }
}
