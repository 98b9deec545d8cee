use crate::json::number_value;
use crate::sections::ChartSection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Name of the per-row sum added by [`rank_rows`]
pub const TOTAL_KEY: &str = "_total";

/// How many rows a ranked chart keeps
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopN {
    #[default]
    All,
    Top(usize),
}

impl TopN {
    fn limit(&self, len: usize) -> usize {
        match self {
            TopN::All => len,
            TopN::Top(n) => (*n).min(len),
        }
    }
}

impl FromStr for TopN {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(TopN::All);
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(TopN::Top(n)),
            _ => Err(format!("invalid row limit: {}", s)),
        }
    }
}

/// Rows of a chart after ranking, plus the keys that were summed
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedRows {
    pub category: String,
    pub keys: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

/// Picks the field that labels each row on the category axis
///
/// Prefers `name`, then `label`, then the first string-valued field, then
/// the first field of all.
pub fn category_key(rows: &[Map<String, Value>]) -> String {
    let Some(first) = rows.first() else {
        return "name".to_string();
    };
    if first.contains_key("name") {
        return "name".to_string();
    }
    if first.contains_key("label") {
        return "label".to_string();
    }
    first
        .iter()
        .find(|(_, v)| v.is_string())
        .or_else(|| first.iter().next())
        .map(|(k, _)| k.clone())
        .unwrap_or_else(|| "name".to_string())
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Sorts chart rows by the sum of their metric values, largest first
///
/// The rows are copied before `_total` is added, so callers keep their
/// originals untouched. With no `keys` given, every numeric field of the
/// first row other than the category is summed.
pub fn rank_rows(rows: &[Map<String, Value>], keys: &[String], top: TopN) -> RankedRows {
    let category = category_key(rows);
    let keys: Vec<String> = if !keys.is_empty() {
        keys.to_vec()
    } else {
        rows.first()
            .map(|first| {
                first
                    .iter()
                    .filter(|(k, v)| **k != category && v.is_number())
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut ranked: Vec<(f64, Map<String, Value>)> = rows
        .iter()
        .map(|row| {
            let total: f64 = keys.iter().filter_map(|k| numeric(row.get(k))).sum();
            let mut row = row.clone();
            row.insert(TOTAL_KEY.to_string(), number_value(total));
            (total, row)
        })
        .collect();

    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    let limit = top.limit(ranked.len());

    RankedRows {
        category,
        keys,
        rows: ranked.into_iter().take(limit).map(|(_, row)| row).collect(),
    }
}

/// Ranks the `{name, value}` pairs of a summary section
pub fn rank_section(section: &ChartSection, top: TopN) -> RankedRows {
    let rows: Vec<Map<String, Value>> = section
        .data
        .iter()
        .map(|item| {
            let mut row = Map::new();
            row.insert("name".to_string(), Value::String(item.name.clone()));
            row.insert("value".to_string(), number_value(item.value));
            row
        })
        .collect();
    rank_rows(&rows, &section.keys, top)
}
