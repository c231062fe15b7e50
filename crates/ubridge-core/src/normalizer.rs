//! Normalizer — classifies raw activity records and reshapes them into
//! [`NormalizedEvent`] values.
//!
//! Classification is attempted in order: DNS → proxy → firewall → unknown.
//! The first matching rule wins, so a record that looks like both DNS and
//! proxy is shaped as DNS. Firewall and unknown records pass through
//! unchanged.
//!
//! Missing or mistyped fields never fail a record; they fall back to `""`,
//! `"N/A"`, or `0`.

use crate::categories::group_categories;
use crate::identity::{identity_key, IdentityResolver};
use crate::labels::{bool_text, extract_labels, join_labels, DEFAULT_LABEL_KEY};
use crate::types::{LogType, NormalizedEvent, RawRecord, ShapeFields, Transformed, SOURCE_VENDOR};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder for identity and rule fields the record does not carry.
pub const NOT_AVAILABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Decide which shape `record` has.
pub fn classify(record: &RawRecord) -> LogType {
    if record.contains_key("domain") && record.contains_key("querytype") {
        LogType::Dns
    } else if record.get("type").and_then(Value::as_str) == Some("proxy")
        && record.contains_key("url")
    {
        LogType::Proxy
    } else if record.contains_key("protocol") {
        LogType::Firewall
    } else {
        LogType::Unknown
    }
}

// ---------------------------------------------------------------------------
// Transform entry points
// ---------------------------------------------------------------------------

/// Transform one record.
///
/// `identities` supplies display names for identity IDs; when it knows the
/// ID of a DNS record's first identity, that name wins over the labels
/// carried on the record itself.
pub fn transform(record: RawRecord, identities: Option<&dyn IdentityResolver>) -> Transformed {
    match classify(&record) {
        LogType::Dns => Transformed::Event(shape_dns(&record, identities)),
        LogType::Proxy => Transformed::Event(shape_proxy(&record)),
        LogType::Firewall => {
            tracing::debug!("firewall log transformation not implemented, passing record through");
            Transformed::Passthrough {
                kind: LogType::Firewall,
                record,
            }
        }
        LogType::Unknown => {
            tracing::debug!(
                keys = ?record.keys().collect::<Vec<_>>(),
                "unknown log shape, passing record through"
            );
            Transformed::Passthrough {
                kind: LogType::Unknown,
                record,
            }
        }
    }
}

/// Transform a batch, preserving input order.
pub fn transform_batch(
    records: impl IntoIterator<Item = RawRecord>,
    identities: Option<&dyn IdentityResolver>,
) -> Vec<Transformed> {
    records
        .into_iter()
        .map(|record| transform(record, identities))
        .collect()
}

// ---------------------------------------------------------------------------
// Per-shape rules
// ---------------------------------------------------------------------------

fn shape_dns(record: &RawRecord, identities: Option<&dyn IdentityResolver>) -> NormalizedEvent {
    let first = record
        .get("identities")
        .and_then(Value::as_array)
        .and_then(|ids| ids.first());

    let resolved = first
        .and_then(|identity| identity.get("id"))
        .and_then(identity_key)
        .and_then(|id| identities.and_then(|r| r.resolve(&id)).map(str::to_owned));

    let identity_label = resolved
        .or_else(|| first.and_then(|i| i.get("labelResolved")).and_then(text_value))
        .or_else(|| first.and_then(|i| i.get("label")).and_then(text_value))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let identity_type = first
        .and_then(|i| i.get("type"))
        .and_then(|t| t.get("label"))
        .and_then(text_value)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let shared = SharedFields::read(record);
    NormalizedEvent {
        timestamp: iso_timestamp(record.get("timestamp")),
        log_type: LogType::Dns,
        identity_label,
        identity_type,
        internal_ip: text_field(record, "internalip"),
        external_ip: text_field(record, "externalip"),
        destination: text_field(record, "domain"),
        shape: ShapeFields::Dns {
            query_type: text_field(record, "querytype"),
        },
        verdict: text_field(record, "verdict"),
        threats: shared.threats,
        rule_label: shared.rule_label,
        source: SOURCE_VENDOR.to_string(),
        categories: shared.categories,
        applications: shared.applications,
    }
}

fn shape_proxy(record: &RawRecord) -> NormalizedEvent {
    let identities = record.get("identities").unwrap_or(&Value::Null);
    let identity_types = identities
        .as_array()
        .map(|ids| {
            join_labels(
                ids.iter().map(|i| i.get("type").unwrap_or(&Value::Null)),
                DEFAULT_LABEL_KEY,
            )
        })
        .unwrap_or_default();

    let shared = SharedFields::read(record);
    NormalizedEvent {
        timestamp: iso_timestamp(record.get("timestamp")),
        log_type: LogType::Proxy,
        identity_label: extract_labels(identities, DEFAULT_LABEL_KEY),
        identity_type: identity_types,
        internal_ip: text_field(record, "internalip"),
        external_ip: text_field(record, "externalip"),
        destination: text_field(record, "url"),
        shape: ShapeFields::Proxy {
            request_method: text_field(record, "requestmethod"),
            status_code: record
                .get("statuscode")
                .cloned()
                .unwrap_or_else(|| Value::from(0)),
        },
        verdict: text_field(record, "verdict"),
        threats: shared.threats,
        rule_label: shared.rule_label,
        source: SOURCE_VENDOR.to_string(),
        categories: shared.categories,
        applications: shared.applications,
    }
}

/// Fields shaped identically for DNS and proxy records.
struct SharedFields {
    threats: String,
    rule_label: String,
    categories: BTreeMap<String, String>,
    applications: Option<String>,
}

impl SharedFields {
    fn read(record: &RawRecord) -> Self {
        let threats = record
            .get("threats")
            .map(|t| extract_labels(t, DEFAULT_LABEL_KEY))
            .unwrap_or_default();
        let rule_label = record
            .get("rule")
            .and_then(|rule| rule.get("label"))
            .and_then(text_value)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let categories = record
            .get("categories")
            .map(group_categories)
            .unwrap_or_default();
        let applications = record
            .get("allapplications")
            .map(|apps| extract_labels(apps, DEFAULT_LABEL_KEY))
            .filter(|apps| !apps.is_empty());

        Self {
            threats,
            rule_label,
            categories,
            applications,
        }
    }
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Render a millisecond epoch as an ISO-8601 UTC instant.
///
/// Missing or unreadable values are treated as epoch 0. Fractional seconds
/// are printed (as microseconds) only when non-zero:
/// `1700000000000` → `2023-11-14T22:13:20+00:00`.
pub fn iso_timestamp(millis: Option<&Value>) -> String {
    let micros = match millis {
        None => 0,
        Some(value) => millis_to_micros(value).unwrap_or_else(|| {
            tracing::debug!(%value, "unreadable timestamp, using epoch 0");
            0
        }),
    };
    let instant = DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or_default();
    let precision = if instant.timestamp_subsec_micros() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    instant.to_rfc3339_opts(precision, false)
}

fn millis_to_micros(value: &Value) -> Option<i64> {
    if let Some(ms) = value.as_i64() {
        return ms.checked_mul(1000);
    }
    let micros = (value.as_f64()? * 1000.0).round();
    (micros.is_finite() && micros.abs() < i64::MAX as f64).then_some(micros as i64)
}

/// Scalar value as display text; `None` for null, arrays, and objects.
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(bool_text(*b).to_string()),
        _ => None,
    }
}

/// Top-level scalar field as text, `""` when absent or not a scalar.
fn text_field(record: &RawRecord, key: &str) -> String {
    record.get(key).and_then(text_value).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
