use std::num::{ParseFloatError, ParseIntError};

use serde::Serialize;
use thiserror::Error;

/// Record-count cap: a trim fires once the retained count reaches this.
pub const MAX_RECORDS: usize = 100;

/// Records kept after a trim, always the most recent ones.
pub const TRIM_KEEP: usize = 50;

/// Byte ceiling the stored log is expected to stay under. The count-based
/// trim keeps the log well below this; exceeding it means the store was
/// written by something else and is worth a warning at startup.
pub const HISTORY_MAX_BYTES: u64 = 5_000;

/// One temperature reading, immutable once written.
///
/// Serialized on the wire as `{ "timestampMs": .., "temperature": .. }`
/// and persisted as a `timestamp,temperature` line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    #[serde(rename = "timestampMs")]
    pub timestamp_ms: u64,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum SampleParseError {
    #[error("record is not a timestamp,temperature pair")]
    Malformed,
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] ParseIntError),
    #[error("invalid temperature: {0}")]
    Temperature(#[from] ParseFloatError),
}

impl Sample {
    pub fn encode_line(&self) -> String {
        format!("{},{}\n", self.timestamp_ms, self.temperature)
    }

    pub fn parse_line(line: &str) -> Result<Self, SampleParseError> {
        let (timestamp, temperature) = line
            .trim()
            .split_once(',')
            .ok_or(SampleParseError::Malformed)?;

        Ok(Self {
            timestamp_ms: timestamp.trim().parse()?,
            temperature: temperature.trim().parse()?,
        })
    }
}

/// Decode a stored log, oldest first. Unparsable lines are dropped so a
/// partially corrupt store degrades to the readable remainder.
pub fn decode(raw: &[u8]) -> Vec<Sample> {
    let text = String::from_utf8_lossy(raw);
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| Sample::parse_line(line).ok())
        .collect()
}

pub fn encode(samples: &[Sample]) -> Vec<u8> {
    let mut out = String::new();
    for sample in samples {
        out.push_str(&sample.encode_line());
    }
    out.into_bytes()
}

/// The retained tail after a count-based trim, or `None` when the log is
/// still under [`MAX_RECORDS`] and no rewrite is needed.
pub fn trim_tail(samples: &[Sample]) -> Option<&[Sample]> {
    if samples.len() < MAX_RECORDS {
        return None;
    }
    Some(&samples[samples.len() - TRIM_KEEP..])
}
