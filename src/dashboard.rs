use crate::error::QueryError;
use crate::json::deep_get;
use crate::period::{Frequency, PeriodBounds, compute_periods, optional_frequency};
use crate::sections::{ChartSection, extract_sections};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filters sent to the dashboard and time-series endpoints
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardQuery {
    pub scheme_code: String,
    pub state_code: String,
    pub division_code: String,
    pub district_code: String,
    pub taluka_code: String,
    pub year: String,
    pub month: String,
    #[serde(deserialize_with = "optional_frequency")]
    pub frequency: Option<Frequency>,
    pub periods: Vec<String>,
}

impl DashboardQuery {
    /// Choosing a scheme drops any periods picked for the previous one
    pub fn select_scheme(&mut self, scheme_code: &str, frequency: Option<Frequency>) {
        self.scheme_code = scheme_code.to_string();
        self.frequency = frequency;
        self.periods.clear();
    }

    pub fn select_state(&mut self, state_code: &str) {
        self.state_code = state_code.to_string();
        self.division_code.clear();
        self.district_code.clear();
        self.taluka_code.clear();
    }

    pub fn select_division(&mut self, division_code: &str) {
        self.division_code = division_code.to_string();
        self.district_code.clear();
        self.taluka_code.clear();
    }

    pub fn select_district(&mut self, district_code: &str) {
        self.district_code = district_code.to_string();
        self.taluka_code.clear();
    }

    pub fn select_taluka(&mut self, taluka_code: &str) {
        self.taluka_code = taluka_code.to_string();
    }

    /// Recomputes `periods` from the period pickers for the current frequency
    pub fn apply_bounds(&mut self, bounds: &PeriodBounds) {
        self.periods = match self.frequency {
            Some(frequency) => compute_periods(frequency, bounds),
            None => Vec::new(),
        };
    }

    /// Checks that the query can be submitted
    ///
    /// Scheme and state are mandatory. Once a frequency is known at least one
    /// period must be selected.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.scheme_code.trim().is_empty() {
            return Err(QueryError::MissingSelector("Scheme"));
        }
        if self.state_code.trim().is_empty() {
            return Err(QueryError::MissingSelector("State"));
        }
        if let Some(frequency) = self.frequency {
            if self.periods.is_empty() {
                return Err(QueryError::NoPeriods(frequency.to_string()));
            }
        }
        Ok(())
    }
}

/// Normalized body of the merged-dashboard endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub merged: Value,
    pub stats: Option<Value>,
    pub explanations: Option<Value>,
}

impl Default for DashboardData {
    fn default() -> Self {
        Self {
            merged: Value::Object(Map::new()),
            stats: None,
            explanations: None,
        }
    }
}

fn present(obj: &Map<String, Value>, key: &str) -> Option<Value> {
    obj.get(key).filter(|v| !v.is_null()).cloned()
}

impl DashboardData {
    /// Accepts both the `{merged, stats, explanations}` envelope and a bare merged object
    pub fn from_response(body: &Value) -> Self {
        let Some(obj) = body.as_object() else {
            return Self::default();
        };
        let merged = present(obj, "merged");
        let stats = present(obj, "stats");
        let explanations = present(obj, "explanations");

        if merged.is_none() && stats.is_none() && explanations.is_none() {
            debug!("dashboard response has no envelope, treating it as merged data");
            return Self {
                merged: body.clone(),
                ..Self::default()
            };
        }

        Self {
            merged: merged.unwrap_or_else(|| Value::Object(Map::new())),
            stats,
            explanations,
        }
    }

    pub fn has_content(&self) -> bool {
        self.merged.as_object().is_some_and(|m| !m.is_empty())
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string_pretty(value).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// Everything the summary dashboard renders for one response
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryView {
    pub sections: Vec<ChartSection>,
    pub explanations: Vec<String>,
}

impl SummaryView {
    pub fn build(data: &DashboardData) -> Self {
        let explanations = match &data.explanations {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, display(v)))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            sections: extract_sections(&data.merged),
            explanations,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightRow {
    pub key: String,
    pub value: String,
}

/// Drill-down detail for one clicked chart item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub path: Vec<String>,
    pub breadcrumb: String,
    pub rows: Vec<InsightRow>,
}

impl Insight {
    /// Looks up the stats recorded at a section's `pathMap` entry
    pub fn lookup<S: AsRef<str>>(stats: &Value, path: &[S]) -> Option<Self> {
        let detail = deep_get(stats, path)?;
        let rows = match detail {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| InsightRow {
                    key: k.clone(),
                    value: display(v),
                })
                .collect(),
            other => vec![InsightRow {
                key: "value".to_string(),
                value: display(other),
            }],
        };
        let path: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
        Some(Self {
            breadcrumb: path.join(" › "),
            path,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ready_query() -> DashboardQuery {
        DashboardQuery {
            scheme_code: "SCH01".into(),
            state_code: "27".into(),
            ..Default::default()
        }
    }

    #[test]
    fn validate_requires_scheme_then_state() {
        let mut q = DashboardQuery::default();
        assert_eq!(q.validate(), Err(QueryError::MissingSelector("Scheme")));
        q.scheme_code = "SCH01".into();
        assert_eq!(q.validate(), Err(QueryError::MissingSelector("State")));
        q.state_code = "27".into();
        assert_eq!(q.validate(), Ok(()));
    }

    #[test]
    fn validate_requires_periods_once_frequency_is_known() {
        let mut q = ready_query();
        q.frequency = Some(Frequency::Monthly);
        assert_eq!(q.validate(), Err(QueryError::NoPeriods("Monthly".into())));

        q.apply_bounds(&PeriodBounds {
            year: Some("2024".into()),
            month: Some("04".into()),
            ..Default::default()
        });
        assert_eq!(q.periods, vec!["2024-04"]);
        assert_eq!(q.validate(), Ok(()));
    }

    #[test]
    fn location_selection_cascades() {
        let mut q = ready_query();
        q.select_division("D1");
        q.select_district("DS1");
        q.select_taluka("T1");

        q.select_division("D2");
        assert_eq!(q.division_code, "D2");
        assert!(q.district_code.is_empty());
        assert!(q.taluka_code.is_empty());

        q.select_district("DS2");
        q.select_taluka("T2");
        q.select_state("28");
        assert!(q.division_code.is_empty());
        assert!(q.district_code.is_empty());
        assert!(q.taluka_code.is_empty());
    }

    #[test]
    fn scheme_change_resets_periods() {
        let mut q = ready_query();
        q.periods = vec!["2024".into()];
        q.select_scheme("SCH02", Some(Frequency::Daily));
        assert!(q.periods.is_empty());
        assert_eq!(q.frequency, Some(Frequency::Daily));
    }

    #[test]
    fn query_deserializes_from_partial_json() {
        let q: DashboardQuery = serde_json::from_value(json!({
            "scheme_code": "S",
            "state_code": "27",
            "frequency": "weekly",
            "periods": ["week_2024-03-04"]
        }))
        .unwrap();
        assert_eq!(q.frequency, Some(Frequency::Weekly));
        assert!(q.division_code.is_empty());
        assert_eq!(q.validate(), Ok(()));
    }

    #[test]
    fn blank_frequency_means_not_yet_known() {
        let q: DashboardQuery = serde_json::from_value(json!({
            "scheme_code": "S",
            "state_code": "27",
            "frequency": ""
        }))
        .unwrap();
        assert_eq!(q.frequency, None);
        assert_eq!(q.validate(), Ok(()));
    }

    #[test]
    fn response_envelope_and_bare_shapes() {
        let wrapped = DashboardData::from_response(&json!({
            "merged": {"total": 3},
            "stats": {"total": {"mean": 1}},
            "explanations": null
        }));
        assert_eq!(wrapped.merged, json!({"total": 3}));
        assert!(wrapped.stats.is_some());
        assert!(wrapped.explanations.is_none());
        assert!(wrapped.has_content());

        let only_stats = DashboardData::from_response(&json!({"stats": {"a": 1}}));
        assert_eq!(only_stats.merged, json!({}));
        assert!(!only_stats.has_content());

        let bare = DashboardData::from_response(&json!({"total": 3}));
        assert_eq!(bare.merged, json!({"total": 3}));
        assert!(bare.stats.is_none());

        assert!(!DashboardData::from_response(&json!([1, 2])).has_content());
    }

    #[test]
    fn summary_view_lists_explanations() {
        let data = DashboardData::from_response(&json!({
            "merged": {"total": 3, "region": {"a": 1}},
            "explanations": {"total": "All beneficiaries", "weight": 2}
        }));
        let view = SummaryView::build(&data);
        assert_eq!(view.sections.len(), 2);
        assert_eq!(
            view.explanations,
            vec!["total: All beneficiaries".to_string(), "weight: 2".to_string()]
        );
    }

    #[test]
    fn insight_rows_render_nested_values() {
        let stats = json!({"region": {"male": {
            "mean": 4.5,
            "districts": ["Pune", "Nashik"],
            "source": "survey"
        }}});
        let insight = Insight::lookup(&stats, &["region", "male"]).unwrap();
        assert_eq!(insight.breadcrumb, "region › male");
        assert_eq!(
            insight.rows,
            vec![
                InsightRow { key: "mean".into(), value: "4.5".into() },
                InsightRow { key: "districts".into(), value: "Pune, Nashik".into() },
                InsightRow { key: "source".into(), value: "survey".into() },
            ]
        );
        assert!(Insight::lookup(&stats, &["region", "female"]).is_none());
    }
}
