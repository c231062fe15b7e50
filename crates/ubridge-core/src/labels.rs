//! Label extraction — turns a list of tagged objects (threats, applications,
//! identities, …) into one display string.

use serde_json::Value;

/// Key read from each tagged object when the caller does not name one.
pub const DEFAULT_LABEL_KEY: &str = "label";

/// Separator placed between joined labels.
pub const LABEL_SEPARATOR: &str = ", ";

/// Join the `key` value of every object in `items`.
///
/// Non-array input yields `""`. Items that are not objects, lack `key`, or
/// hold an empty value are skipped without a placeholder. Input order is kept.
///
/// ```
/// use serde_json::json;
/// use ubridge_core::labels::extract_labels;
///
/// let threats = json!([{"label": "Malware"}, {"label": "Phishing"}, {}]);
/// assert_eq!(extract_labels(&threats, "label"), "Malware, Phishing");
/// ```
pub fn extract_labels(items: &Value, key: &str) -> String {
    match items.as_array() {
        Some(items) => join_labels(items.iter(), key),
        None => String::new(),
    }
}

/// Join the `key` value of every object yielded by `items`.
pub fn join_labels<'a>(items: impl IntoIterator<Item = &'a Value>, key: &str) -> String {
    items
        .into_iter()
        .filter_map(|item| item.get(key).and_then(label_text))
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR)
}

/// Display text for a label value, or `None` when it is empty.
///
/// Strings are used as-is, numbers in decimal form. `null`, `false`, zero,
/// and the empty string count as empty; nested structures are never labels.
pub fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some(bool_text(true).to_string()),
        _ => None,
    }
}

/// Display text for a boolean: `True` / `False`.
pub fn bool_text(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
