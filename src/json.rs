use serde_json::{Map, Number, Value};

/// Classified view of one JSON value
///
/// Every recursive walk in the crate matches on this instead of probing
/// `serde_json::Value` variants ad hoc. Only finite numbers count as
/// numbers; arrays fall under `Other`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    /// A finite numeric leaf
    Number(f64),

    /// A plain JSON object
    Object(&'a Map<String, Value>),

    /// Strings, booleans, null, arrays
    Other,
}

impl<'a> Node<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => Node::Number(f),
                _ => Node::Other,
            },
            Value::Object(map) => Node::Object(map),
            _ => Node::Other,
        }
    }
}

/// Walks `path` from `root` through nested objects
///
/// Returns `None` as soon as a segment is missing, an intermediate is not an
/// object, or the value found is null.
///
/// # Examples
/// ```
/// use mahiti_dashboard::json::deep_get;
/// use serde_json::json;
///
/// let stats = json!({"region": {"male": {"mean": 4.5}}});
/// assert_eq!(deep_get(&stats, &["region", "male", "mean"]), Some(&json!(4.5)));
/// assert_eq!(deep_get(&stats, &["region", "female"]), None);
/// ```
pub fn deep_get<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        current = match current {
            Value::Object(map) => map.get(segment.as_ref())?,
            _ => return None,
        };
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}

/// `deep_get` over a dot-joined path such as `"region.male"`
pub fn get_dotted<'a>(root: &'a Value, dotted: &str) -> Option<&'a Value> {
    let segments: Vec<&str> = dotted.split('.').collect();
    deep_get(root, &segments)
}

/// Stores a raw form value at a dot-joined path, creating objects on the way
///
/// Non-object intermediates are replaced with empty objects. The leaf becomes
/// a number when `raw` parses as one, stays an empty string when `raw` is
/// empty, and is otherwise kept verbatim as a string.
pub fn set_dotted(root: &mut Value, dotted: &str, raw: &str) {
    let segments: Vec<&str> = dotted.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        let map = object_mut(current);
        let entry = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry;
    }

    object_mut(current).insert(leaf.to_string(), coerce_form_value(raw));
}

fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// Converts the text of a numeric form input into the JSON stored for it
pub fn coerce_form_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::String(String::new());
    }
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => number_value(n),
        _ => Value::String(raw.to_string()),
    }
}

/// Integral floats are stored as integers so they serialize without `.0`
pub(crate) fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}
