//! Key-case translation for JSON payloads.
//!
//! The backend speaks `snake_case`; the client models use `camelCase`.
//! Translation walks nested objects and arrays and leaves every other
//! value (including `null`) untouched.

use serde_json::Value;

/// Recursively rename object keys to `camelCase`.
///
/// # Example
/// ```
/// use caradoc::case::to_camel_case;
/// use serde_json::json;
///
/// let value = to_camel_case(json!({"file": {"page_number": 3}}));
/// assert_eq!(value, json!({"file": {"pageNumber": 3}}));
/// ```
pub fn to_camel_case(value: Value) -> Value {
    translate_keys(value, camel_case)
}

/// Recursively rename object keys to `snake_case`.
pub fn to_snake_case(value: Value) -> Value {
    translate_keys(value, snake_case)
}

fn translate_keys(value: Value, convert: fn(&str) -> String) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| translate_keys(item, convert))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (convert(&key), translate_keys(item, convert)))
                .collect(),
        ),
        other => other,
    }
}

/// Convert a single identifier to `camelCase`.
pub fn camel_case(key: &str) -> String {
    words(key)
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if i == 0 {
                word.to_lowercase()
            } else {
                capitalize(word)
            }
        })
        .collect()
}

/// Convert a single identifier to `snake_case`.
pub fn snake_case(key: &str) -> String {
    words(key)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Split an identifier into words.
///
/// Words break on any non-alphanumeric character, on a lower-to-upper
/// transition, between letters and digits, and before the last capital of
/// an acronym followed by a lowercase letter (`XMLHttp` -> `XML`, `Http`).
fn words(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_numeric() != c.is_numeric())
                || (prev.is_uppercase()
                    && c.is_uppercase()
                    && next.is_some_and(char::is_lowercase));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}
