//! Domain-specific assertion macros for ubridge harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! make it clear *which* field of a transformed record was wrong.

use super::fixtures::CORE_FIELDS;
use ubridge_core::Transformed;

// ---------------------------------------------------------------------------
// Field assertions
// ---------------------------------------------------------------------------

/// Assert that a `Transformed` serializes with a specific field value.
///
/// ```rust
/// assert_has_field!(event, "Destination", "example.com");
/// ```
#[macro_export]
macro_rules! assert_has_field {
    ($event:expr, $key:expr, $value:expr) => {{
        let value = serde_json::to_value(&$event).expect("event must serialize");
        let key: &str = $key;
        let expected = serde_json::json!($value);
        match value.get(key) {
            Some(actual) if *actual == expected => {}
            Some(actual) => panic!(
                "assert_has_field! failed:\n  event[{:?}]\n  expected: {}\n  actual:   {}",
                key, expected, actual
            ),
            None => panic!(
                "assert_has_field! failed: field {:?} not found in event.\n  event: {}",
                key, value
            ),
        }
    }};
}

/// Assert that a `Transformed` does not serialize a field at all.
#[macro_export]
macro_rules! assert_field_absent {
    ($event:expr, $key:expr) => {{
        let value = serde_json::to_value(&$event).expect("event must serialize");
        let key: &str = $key;
        if let Some(actual) = value.get(key) {
            panic!(
                "assert_field_absent! failed: field {:?} present with {}",
                key, actual
            );
        }
    }};
}

/// Assert the classification of a `Transformed`.
#[macro_export]
macro_rules! assert_log_type {
    ($event:expr, $kind:expr) => {{
        let event: &ubridge_core::Transformed = &$event;
        let expected: ubridge_core::LogType = $kind;
        if event.log_type() != expected {
            panic!(
                "assert_log_type! failed:\n  expected: {:?}\n  actual:   {:?}\n  event: {:?}",
                expected,
                event.log_type(),
                event
            );
        }
    }};
}

// ---------------------------------------------------------------------------
// Schema invariant helpers
// ---------------------------------------------------------------------------

/// Assert that a normalized event carries every core field and nothing but
/// core fields, shape fields, `<Type>Categories`, and `Applications`.
pub fn assert_core_fields(event: &Transformed) {
    assert!(event.is_normalized(), "expected a normalized event: {event:?}");
    let value = serde_json::to_value(event).expect("event must serialize");
    let object = value.as_object().expect("event must serialize to an object");

    for key in CORE_FIELDS {
        assert!(object.contains_key(*key), "missing core field {key:?} in {value}");
    }
    for key in object.keys() {
        let known = CORE_FIELDS.contains(&key.as_str())
            || matches!(key.as_str(), "QueryType" | "RequestMethod" | "StatusCode" | "Applications")
            || key.ends_with("Categories");
        assert!(known, "unexpected field {key:?} in {value}");
    }
}
