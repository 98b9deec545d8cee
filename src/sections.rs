use crate::json::Node;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Title used for the root section when nothing better is available
pub const ROOT_TITLE: &str = "Overview";

/// One bar/slice in a section chart
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: f64,
}

/// Sibling numeric values from one nesting level of a summary snapshot
///
/// `path_map` maps every displayed name back to its location in the source
/// object so a click on a bar can be resolved to a drill-down lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSection {
    pub title: String,
    pub data: Vec<NamedValue>,
    pub keys: Vec<String>,
    pub pie_data: Vec<NamedValue>,
    pub path_map: IndexMap<String, Vec<String>>,
    pub parent_path: Vec<String>,
}

impl ChartSection {
    /// Full source path of a displayed leaf
    pub fn resolve(&self, name: &str) -> Option<&[String]> {
        self.path_map.get(name).map(Vec::as_slice)
    }

    pub fn total(&self) -> f64 {
        self.data.iter().map(|d| d.value).sum()
    }
}

/// Splits a nested snapshot into chartable sections, depth first
///
/// A level produces a section only if it owns at least one finite numeric
/// value; its nested objects each recurse into their own sections, listed
/// after the parent's. Arrays and other scalars are ignored.
///
/// # Examples
/// ```
/// use mahiti_dashboard::sections::extract_sections;
/// use serde_json::json;
///
/// let sections = extract_sections(&json!({"region": {"male": 10, "female": 8}, "total": 18}));
/// assert_eq!(sections.len(), 2);
/// assert_eq!(sections[0].title, "Overview");
/// assert_eq!(sections[1].title, "region");
/// ```
pub fn extract_sections(node: &Value) -> Vec<ChartSection> {
    extract_sections_at::<&str>(node, &[], "")
}

/// Same as [`extract_sections`] for a subtree found at `path`
///
/// `path` prefixes every `pathMap` entry and `parentPath`, and `title` is the
/// breadcrumb already built for the subtree, so drilling into `region` gives
/// the same sections a full walk lists under it.
pub fn extract_sections_at<S: AsRef<str>>(node: &Value, path: &[S], title: &str) -> Vec<ChartSection> {
    let mut sections = Vec::new();
    if let Node::Object(map) = Node::classify(node) {
        let mut path: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
        collect(map, &mut path, title, &mut sections);
    }
    sections
}

fn collect(
    map: &Map<String, Value>,
    path: &mut Vec<String>,
    title_so_far: &str,
    sections: &mut Vec<ChartSection>,
) {
    let mut data = Vec::new();
    let mut path_map = IndexMap::new();
    let mut nested = Vec::new();

    for (key, value) in map {
        match Node::classify(value) {
            Node::Number(n) => {
                data.push(NamedValue {
                    name: key.clone(),
                    value: n,
                });
                let mut leaf_path = path.clone();
                leaf_path.push(key.clone());
                path_map.insert(key.clone(), leaf_path);
            }
            Node::Object(child) => nested.push((key, child)),
            Node::Other => {}
        }
    }

    if !data.is_empty() {
        let title = if !title_so_far.is_empty() {
            title_so_far.to_string()
        } else {
            path.last().cloned().unwrap_or_else(|| ROOT_TITLE.to_string())
        };
        sections.push(ChartSection {
            title,
            pie_data: data.clone(),
            data,
            keys: vec!["value".to_string()],
            path_map,
            parent_path: path.clone(),
        });
    }

    for (key, child) in nested {
        let child_title = if title_so_far.is_empty() {
            key.clone()
        } else {
            format!("{} > {}", title_so_far, key)
        };
        path.push(key.clone());
        collect(child, path, &child_title, sections);
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::deep_get;
    use serde_json::json;

    #[test]
    fn subtree_walk_matches_the_full_walk() {
        let source = json!({
            "total": 18,
            "region": {"male": 10, "female": 8, "age": {"child": 4, "adult": 14}}
        });
        let full = extract_sections(&source);
        let drilled = extract_sections_at(&source["region"], &["region"], "region");

        assert_eq!(drilled.len(), 2);
        assert_eq!(drilled[..], full[1..]);
        assert_eq!(drilled[1].title, "region > age");
        assert_eq!(
            drilled[1].resolve("adult"),
            Some(&["region".to_string(), "age".to_string(), "adult".to_string()][..])
        );
    }

    #[test]
    fn root_and_nested_sections() {
        let sections = extract_sections(&json!({"region": {"male": 10, "female": 8}, "total": 18}));
        assert_eq!(sections.len(), 2);

        let root = &sections[0];
        assert_eq!(root.title, "Overview");
        assert_eq!(
            root.data,
            vec![NamedValue {
                name: "total".into(),
                value: 18.0
            }]
        );
        assert!(root.parent_path.is_empty());

        let region = &sections[1];
        assert_eq!(region.title, "region");
        assert_eq!(region.data.len(), 2);
        assert_eq!(region.data[0].name, "male");
        assert_eq!(region.data[1].name, "female");
        assert_eq!(region.resolve("male"), Some(&["region".to_string(), "male".to_string()][..]));
        assert_eq!(region.parent_path, vec!["region"]);
        assert_eq!(region.keys, vec!["value"]);
        assert_eq!(region.pie_data, region.data);
    }

    #[test]
    fn empty_and_non_object_inputs() {
        assert!(extract_sections(&json!({})).is_empty());
        assert!(extract_sections(&json!(null)).is_empty());
        assert!(extract_sections(&json!([{"a": 1}])).is_empty());
        assert!(extract_sections(&json!(42)).is_empty());
    }

    #[test]
    fn levels_without_numbers_only_pass_titles_down() {
        let sections = extract_sections(&json!({
            "state": {
                "district": {"urban": 3, "rural": 4},
                "label": "ignored"
            }
        }));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "state > district");
        assert_eq!(sections[0].parent_path, vec!["state", "district"]);
        assert_eq!(
            sections[0].resolve("rural"),
            Some(&["state".to_string(), "district".to_string(), "rural".to_string()][..])
        );
    }

    #[test]
    fn pre_order_sections() {
        let sections = extract_sections(&json!({
            "a": {"x": 1, "b": {"y": 2}, "c": {"z": 3}},
            "d": {"w": 4},
            "n": 0
        }));
        let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Overview", "a", "a > b", "a > c", "d"]);
    }

    #[test]
    fn arrays_are_neither_leaves_nor_subtrees() {
        let sections = extract_sections(&json!({"list": [1, 2, {"a": 3}], "k": 1}));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].data.len(), 1);
    }

    #[test]
    fn path_map_round_trips_to_source() {
        let source = json!({
            "beneficiaries": {"sc": 4, "st": {"male": 1, "female": 2}},
            "amount": 12.5,
            "meta": {"note": "x"}
        });
        for section in extract_sections(&source) {
            for item in &section.data {
                let path = section.resolve(&item.name).unwrap();
                assert_eq!(deep_get(&source, path).and_then(Value::as_f64), Some(item.value));
            }
        }
    }

    #[test]
    fn serializes_camel_case() {
        let sections = extract_sections(&json!({"a": 1}));
        let value = serde_json::to_value(&sections[0]).unwrap();
        assert!(value.get("pathMap").is_some());
        assert!(value.get("parentPath").is_some());
        assert!(value.get("pieData").is_some());
    }
}
