pub const TOPIC_READING: &str = "relaystat/reading";
pub const TOPIC_STATUS: &str = "relaystat/status";
