//! Core types for ubridge-core.
//!
//! This module defines the data shapes shared across the pipeline: the open
//! [`RawRecord`] delivered by the reporting API, the [`LogType`] produced by
//! classification, the flat [`NormalizedEvent`], and the [`Transformed`]
//! result of one transform call.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// One activity record exactly as the reporting API returned it.
///
/// There is no fixed schema: DNS, proxy, and firewall records carry
/// different keys, and any value may be missing or of an unexpected type.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Literal written to the `Source` field of every normalized event.
pub const SOURCE_VENDOR: &str = "Cisco Umbrella";

/// Which shape a raw record was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Dns,
    Proxy,
    Firewall,
    Unknown,
}

impl LogType {
    pub fn as_str(self) -> &'static str {
        match self {
            LogType::Dns => "dns",
            LogType::Proxy => "proxy",
            LogType::Firewall => "firewall",
            LogType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for LogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flat, indexer-friendly event built from a DNS or proxy record.
///
/// Serializes to a single JSON object. The core keys are always present;
/// `<Type>Categories` keys appear once per category type found on the
/// record, and `Applications` only when at least one application was named.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NormalizedEvent {
    /// ISO-8601 UTC instant, e.g. `2023-11-14T22:13:20+00:00`.
    pub timestamp: String,
    pub log_type: LogType,
    pub identity_label: String,
    pub identity_type: String,
    #[serde(rename = "InternalIP")]
    pub internal_ip: String,
    #[serde(rename = "ExternalIP")]
    pub external_ip: String,
    /// Queried domain for DNS, requested URL for proxy.
    pub destination: String,
    #[serde(flatten)]
    pub shape: ShapeFields,
    pub verdict: String,
    pub threats: String,
    pub rule_label: String,
    pub source: String,
    /// `<Type>Categories` → comma-joined labels. Keys always end in
    /// `Categories`, so they cannot shadow a core key.
    #[serde(flatten)]
    pub categories: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applications: Option<String>,
}

/// Fields that only one record shape carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShapeFields {
    Dns {
        #[serde(rename = "QueryType")]
        query_type: String,
    },
    Proxy {
        #[serde(rename = "RequestMethod")]
        request_method: String,
        /// Forwarded exactly as the record carried it; `0` when absent.
        #[serde(rename = "StatusCode")]
        status_code: serde_json::Value,
    },
}

/// Result of transforming one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    /// A DNS or proxy record reshaped into the flat schema.
    Event(NormalizedEvent),
    /// A firewall or unrecognised record, returned untouched.
    Passthrough { kind: LogType, record: RawRecord },
}

impl Transformed {
    /// Classification that produced this result.
    pub fn log_type(&self) -> LogType {
        match self {
            Transformed::Event(event) => event.log_type,
            Transformed::Passthrough { kind, .. } => *kind,
        }
    }

    /// The `LogType` as the delivered event reports it.
    ///
    /// Passthrough records carry no `LogType` of their own unless they were
    /// already normalized upstream, so they fall back to `unknown`.
    pub fn reported_log_type(&self) -> &str {
        match self {
            Transformed::Event(event) => event.log_type.as_str(),
            Transformed::Passthrough { record, .. } => record
                .get("LogType")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(LogType::Unknown.as_str()),
        }
    }

    /// The `Timestamp` string of the delivered event, if it has one.
    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Transformed::Event(event) => Some(event.timestamp.as_str()),
            Transformed::Passthrough { record, .. } => {
                record.get("Timestamp").and_then(serde_json::Value::as_str)
            }
        }
    }

    pub fn is_normalized(&self) -> bool {
        matches!(self, Transformed::Event(_))
    }
}

impl Serialize for Transformed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Transformed::Event(event) => event.serialize(serializer),
            Transformed::Passthrough { record, .. } => record.serialize(serializer),
        }
    }
}
