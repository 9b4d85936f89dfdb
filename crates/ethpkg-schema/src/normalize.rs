use crate::manifest::Meta;
use serde_json::{Map, Value};

const LIST_KEYS: [&str; 2] = ["authors", "keywords"];
const LINKS_KEY: &str = "links";

/// Clean raw package metadata for inclusion in a manifest.
///
/// Null values are dropped. `authors` and `keywords` lose their null elements
/// (order preserved) and `links` loses its null entries; any of the three is
/// dropped entirely when nothing remains. Every other key passes through.
pub fn normalize_meta(raw: &Map<String, Value>) -> Meta {
    let mut meta = Meta::new();
    for (key, value) in raw {
        if value.is_null() {
            continue;
        }
        let cleaned = if LIST_KEYS.contains(&key.as_str()) {
            normalize_list(value)
        } else if key == LINKS_KEY {
            normalize_links(value)
        } else {
            Some(value.clone())
        };
        if let Some(v) = cleaned {
            meta.insert(key.clone(), v);
        }
    }
    meta
}

fn normalize_list(value: &Value) -> Option<Value> {
    let Value::Array(items) = value else {
        return Some(value.clone());
    };
    let kept: Vec<Value> = items.iter().filter(|v| !v.is_null()).cloned().collect();
    (!kept.is_empty()).then_some(Value::Array(kept))
}

fn normalize_links(value: &Value) -> Option<Value> {
    let Value::Object(entries) = value else {
        return Some(value.clone());
    };
    let kept: Map<String, Value> = entries
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    (!kept.is_empty()).then_some(Value::Object(kept))
}
