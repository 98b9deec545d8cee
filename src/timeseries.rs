use crate::json::Node;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;

/// One nested snapshot returned by the time-series endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// Period identifier, e.g. `"2024-03"` or `"week_2024-03-04"`
    #[serde(default)]
    pub period: String,

    /// Ordering timestamp; missing sorts as zero. Kept as the original
    /// JSON number so integer epochs are echoed back unchanged.
    #[serde(default)]
    pub ts: Option<Number>,

    /// Arbitrarily nested metrics for this period
    #[serde(default)]
    pub data: Value,
}

impl PeriodRecord {
    /// Reads a record out of loosely shaped JSON
    ///
    /// Numeric periods are stringified and a non-numeric `ts` is dropped.
    /// Returns `None` when `value` is not an object at all.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let period = match obj.get("period") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Some(Self {
            period,
            ts: match obj.get("ts") {
                Some(Value::Number(n)) => Some(n.clone()),
                _ => None,
            },
            data: obj.get("data").cloned().unwrap_or(Value::Null),
        })
    }
}

/// One chart-ready row: period, timestamp and every flattened metric
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub period: String,
    pub ts: Option<Number>,
    #[serde(flatten)]
    pub values: IndexMap<String, f64>,
}

impl ChartRow {
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }

    /// `ts` as a float for ordering, missing counts as zero
    pub fn sort_key(&self) -> f64 {
        self.ts.as_ref().and_then(Number::as_f64).unwrap_or(0.0)
    }
}

/// How a metric group is drawn on the time-series dashboard
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesChartType {
    #[default]
    Line,
    Bar,
    Area,
}

/// Metrics compared on one time-series card
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSelection {
    pub metrics: Vec<String>,
    pub chart_type: SeriesChartType,
}

/// Output of [`transform`]: rows sorted by `ts` and the sorted union of metric keys
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    #[serde(alias = "data")]
    pub rows: Vec<ChartRow>,
    pub keys: Vec<String>,
}

impl TimeSeries {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One card per metric, each starting out as a line chart of that metric alone
    pub fn default_selections(&self) -> IndexMap<String, SeriesSelection> {
        self.keys
            .iter()
            .map(|key| {
                (
                    key.clone(),
                    SeriesSelection {
                        metrics: vec![key.clone()],
                        chart_type: SeriesChartType::Line,
                    },
                )
            })
            .collect()
    }

    /// Values of one metric across all rows, labelled by period
    pub fn series(&self, metric: &str) -> Vec<(String, Option<f64>)> {
        self.rows
            .iter()
            .map(|row| (row.period.clone(), row.get(metric)))
            .collect()
    }
}

/// Flattens nested objects into dot-joined metric paths
///
/// Only finite numbers survive; strings, booleans, null and arrays are
/// dropped. Keys keep the order in which they are discovered.
///
/// # Examples
/// ```
/// use mahiti_dashboard::timeseries::flatten;
/// use serde_json::json;
///
/// let flat = flatten(&json!({"beneficiaries": {"male": 3, "female": 4}, "note": "x"}));
/// assert_eq!(flat.get("beneficiaries.male"), Some(&3.0));
/// assert_eq!(flat.len(), 2);
/// ```
pub fn flatten(data: &Value) -> IndexMap<String, f64> {
    let mut out = IndexMap::new();
    if let Node::Object(map) = Node::classify(data) {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut IndexMap<String, f64>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match Node::classify(value) {
            Node::Object(child) => flatten_into(child, &path, out),
            Node::Number(n) => {
                out.insert(path, n);
            }
            Node::Other => {}
        }
    }
}

/// Turns per-period snapshots into chart rows
///
/// Records without `data` are skipped. Rows are ordered by `ts` ascending
/// (missing = 0, ties keep input order). Inputs are never modified.
pub fn transform(records: &[PeriodRecord]) -> TimeSeries {
    let mut rows = Vec::with_capacity(records.len());
    let mut keys = BTreeSet::new();

    for record in records {
        if record.data.is_null() {
            debug!("skipping period {:?} without data", record.period);
            continue;
        }
        let values = flatten(&record.data);
        keys.extend(values.keys().cloned());
        rows.push(ChartRow {
            period: record.period.clone(),
            ts: record.ts.clone(),
            values,
        });
    }

    rows.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));

    TimeSeries {
        rows,
        keys: keys.into_iter().collect(),
    }
}

/// Transforms a raw time-series response body
///
/// Accepts either a bare array of records or an object carrying the array
/// under `timeSeries`. Any other shape is treated as "no data".
pub fn transform_value(body: &Value) -> TimeSeries {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("timeSeries") {
            Some(Value::Array(items)) => items,
            _ => return TimeSeries::default(),
        },
        _ => return TimeSeries::default(),
    };

    let records: Vec<PeriodRecord> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let record = PeriodRecord::from_json(item);
            if record.is_none() {
                warn!("time-series entry {} is not an object, ignoring it", i);
            }
            record
        })
        .collect();

    transform(&records)
}
