//! HEC envelope encoding — wraps transformed records for an HTTP event
//! collector and renders a newline-delimited JSON payload.

use crate::types::Transformed;
use chrono::DateTime;
use serde::Serialize;

/// Default `sourcetype` prefix; the record's `LogType` is appended.
pub const DEFAULT_SOURCETYPE_PREFIX: &str = "cisco:umbrella";

/// How events are wrapped for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeOptions {
    pub sourcetype_prefix: String,
    /// Attach a `time` field (epoch seconds) parsed from the event's `Timestamp`.
    pub include_time: bool,
}

impl Default for EnvelopeOptions {
    fn default() -> Self {
        Self {
            sourcetype_prefix: DEFAULT_SOURCETYPE_PREFIX.to_string(),
            include_time: true,
        }
    }
}

/// One collector event: `{"event": …, "sourcetype": …, "time": …}`.
#[derive(Debug, Serialize)]
pub struct HecEvent<'a> {
    pub event: &'a Transformed,
    pub sourcetype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl<'a> HecEvent<'a> {
    pub fn wrap(event: &'a Transformed, options: &EnvelopeOptions) -> Self {
        let time = if options.include_time {
            event.timestamp().and_then(epoch_seconds)
        } else {
            None
        };
        Self {
            event,
            sourcetype: format!("{}:{}", options.sourcetype_prefix, event.reported_log_type()),
            time,
        }
    }
}

/// Encode `events` as newline-terminated JSON lines, in order.
pub fn encode_batch(
    events: &[Transformed],
    options: &EnvelopeOptions,
) -> Result<String, serde_json::Error> {
    let mut payload = String::new();
    for event in events {
        payload.push_str(&serde_json::to_string(&HecEvent::wrap(event, options))?);
        payload.push('\n');
    }
    Ok(payload)
}

fn epoch_seconds(timestamp: &str) -> Option<f64> {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(instant) => {
            Some(instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_micros()) / 1e6)
        }
        Err(err) => {
            tracing::debug!(timestamp, %err, "could not parse Timestamp, omitting time");
            None
        }
    }
}
