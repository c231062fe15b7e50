//! Category grouping — partitions a record's category tags by their declared
//! type and joins the labels of each group.

use crate::labels::LABEL_SEPARATOR;
use serde_json::Value;
use std::collections::BTreeMap;

/// Group `categories` into `<Type>Categories` → joined labels.
///
/// Tags without a string `type` and a non-empty string `label` are skipped.
/// Non-array input yields an empty map. Labels keep their input order within
/// a group.
pub fn group_categories(categories: &Value) -> BTreeMap<String, String> {
    let Some(tags) = categories.as_array() else {
        return BTreeMap::new();
    };

    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for tag in tags {
        let kind = tag.get("type").and_then(Value::as_str).filter(|s| !s.is_empty());
        let label = tag.get("label").and_then(Value::as_str).filter(|s| !s.is_empty());
        if let (Some(kind), Some(label)) = (kind, label) {
            groups.entry(group_key(kind)).or_default().push(label);
        }
    }

    groups
        .into_iter()
        .map(|(key, labels)| (key, labels.join(LABEL_SEPARATOR)))
        .collect()
}

/// Derive the output key for a category type: `content` → `ContentCategories`.
///
/// The first character is upper-cased and the rest lower-cased, so types that
/// differ only in case share a group. Multi-word types are not split.
pub fn group_key(kind: &str) -> String {
    let mut chars = kind.chars();
    let mut key = String::with_capacity(kind.len() + "Categories".len());
    if let Some(first) = chars.next() {
        key.extend(first.to_uppercase());
        key.extend(chars.flat_map(char::to_lowercase));
    }
    key.push_str("Categories");
    key
}
