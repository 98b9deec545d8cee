use crate::error::{SchemeError, UploadError};
use crate::json::{get_dotted, set_dotted};
use crate::period::{Frequency, optional_frequency};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One node of a scheme's category tree; leaves are numeric inputs
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_name: String,
    /// Name in the local language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name_ll: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Value>,
    #[serde(default)]
    pub children: Vec<Category>,
}

impl Category {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Key under which this category's value is stored in uploaded data
    ///
    /// Only a non-empty string or a non-zero number counts as an id; `0`,
    /// `""`, booleans and null fall back to the sibling index.
    pub fn data_key(&self, index: usize) -> String {
        match &self.category_id {
            Some(Value::String(id)) if !id.is_empty() => format!("{}_{}", self.category_name, id),
            Some(Value::Number(id)) if id.as_f64() != Some(0.0) => {
                format!("{}_{}", self.category_name, id)
            }
            _ => format!("{}_{}", self.category_name, index),
        }
    }

    /// Number of leaf inputs under this category, itself included if it is one
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(Category::leaf_count).sum()
        }
    }
}

/// Response of the scheme categories endpoint
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeStructure {
    #[serde(deserialize_with = "optional_frequency")]
    pub frequency: Option<Frequency>,
    pub data: Vec<Category>,
}

/// Dotted data paths of every leaf input, optionally under a period key
pub fn leaf_paths(categories: &[Category], period: Option<&str>) -> Vec<String> {
    let mut out = Vec::new();
    walk(categories, period.unwrap_or(""), &mut out);
    out
}

fn walk(categories: &[Category], parent: &str, out: &mut Vec<String>) {
    for (index, category) in categories.iter().enumerate() {
        let key = category.data_key(index);
        let path = if parent.is_empty() {
            key
        } else {
            format!("{}.{}", parent, key)
        };
        if category.is_leaf() {
            out.push(path);
        } else {
            walk(&category.children, &path, out);
        }
    }
}

/// Number of header rows needed to draw a category tree, 0 when empty
pub fn max_depth(categories: &[Category]) -> usize {
    categories
        .iter()
        .map(|c| 1 + max_depth(&c.children))
        .max()
        .unwrap_or(0)
}

/// One cell of the category header table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCell {
    pub name: String,
    pub name_ll: Option<String>,
    pub col_span: usize,
    pub row_span: usize,
}

/// Lays a category tree out as table header rows
///
/// A category spans one column per leaf beneath it. Leaves stretch down to
/// the last header row so every input column ends on the same line.
pub fn header_rows(categories: &[Category]) -> Vec<Vec<HeaderCell>> {
    let depth = max_depth(categories);
    let mut rows = vec![Vec::new(); depth];
    lay_out(categories, 0, depth, &mut rows);
    rows
}

fn lay_out(categories: &[Category], level: usize, depth: usize, rows: &mut [Vec<HeaderCell>]) {
    for category in categories {
        rows[level].push(HeaderCell {
            name: category.category_name.clone(),
            name_ll: category.category_name_ll.clone(),
            col_span: category.leaf_count(),
            row_span: if category.is_leaf() { depth - level } else { 1 },
        });
        lay_out(&category.children, level + 1, depth, rows);
    }
}

/// One row of the flat category editor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCategory {
    pub id: u64,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_ll: String,
}

/// A scheme being created or edited, with its categories kept flat
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeDraft {
    pub scheme_name: String,
    pub scheme_name_ll: String,
    #[serde(deserialize_with = "optional_frequency")]
    pub frequency: Option<Frequency>,
    pub state_code: String,
    pub division_code: String,
    pub district_code: String,
    pub taluka_code: String,
    pub categories: Vec<DraftCategory>,
}

/// Body sent to create a scheme
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemePayload {
    pub scheme_name: String,
    pub scheme_name_ll: String,
    pub frequency: Frequency,
    pub state_code: String,
    pub division_code: Option<String>,
    pub district_code: Option<String>,
    pub taluka_code: Option<String>,
    pub categories: Vec<Category>,
}

fn non_empty(code: &str) -> Option<String> {
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_string())
}

/// Flattens a category tree into editor rows, numbering ids in pre-order from 1
pub fn flatten_tree(categories: &[Category]) -> Vec<DraftCategory> {
    let mut out = Vec::new();
    flatten_into(categories, None, &mut out);
    out
}

fn flatten_into(categories: &[Category], parent_id: Option<u64>, out: &mut Vec<DraftCategory>) {
    for category in categories {
        let id = out.len() as u64 + 1;
        out.push(DraftCategory {
            id,
            parent_id,
            name: category.category_name.clone(),
            name_ll: category.category_name_ll.clone().unwrap_or_default(),
        });
        flatten_into(&category.children, Some(id), out);
    }
}

impl SchemeDraft {
    /// Starts editing an existing scheme's category tree
    pub fn load_tree(&mut self, categories: &[Category]) {
        self.categories = flatten_tree(categories);
    }

    fn contains(&self, id: u64) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }

    /// Appends an empty category under `parent_id` (or at the top) and returns its id
    pub fn add_category(&mut self, parent_id: Option<u64>) -> Result<u64, SchemeError> {
        if let Some(parent) = parent_id {
            if !self.contains(parent) {
                return Err(SchemeError::UnknownCategory(parent));
            }
        }
        let id = self.categories.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        self.categories.push(DraftCategory {
            id,
            parent_id,
            name: String::new(),
            name_ll: String::new(),
        });
        Ok(id)
    }

    pub fn rename_category(&mut self, id: u64, name: &str, name_ll: &str) -> Result<(), SchemeError> {
        let category = self
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(SchemeError::UnknownCategory(id))?;
        category.name = name.to_string();
        category.name_ll = name_ll.to_string();
        Ok(())
    }

    /// Removes a category together with everything beneath it
    ///
    /// Returns how many rows were dropped.
    pub fn remove_category(&mut self, id: u64) -> usize {
        let mut doomed = vec![id];
        let mut next = 0;
        while next < doomed.len() {
            let parent = doomed[next];
            for child in self.categories.iter().filter(|c| c.parent_id == Some(parent)) {
                if !doomed.contains(&child.id) {
                    doomed.push(child.id);
                }
            }
            next += 1;
        }
        let before = self.categories.len();
        self.categories.retain(|c| !doomed.contains(&c.id));
        before - self.categories.len()
    }

    /// Nested categories in editor order
    pub fn build_tree(&self) -> Vec<Category> {
        let mut visited = vec![false; self.categories.len()];
        self.children_of(None, &mut visited)
    }

    fn children_of(&self, parent_id: Option<u64>, visited: &mut [bool]) -> Vec<Category> {
        let mut out = Vec::new();
        for (index, row) in self.categories.iter().enumerate() {
            if row.parent_id != parent_id || visited[index] {
                continue;
            }
            visited[index] = true;
            out.push(Category {
                category_name: row.name.clone(),
                category_name_ll: Some(row.name_ll.clone()),
                category_id: None,
                children: self.children_of(Some(row.id), visited),
            });
        }
        out
    }

    /// Scheme name, then frequency, then state must be filled in
    pub fn validate(&self) -> Result<(), SchemeError> {
        if self.scheme_name.trim().is_empty() {
            return Err(SchemeError::Required("Scheme name"));
        }
        if self.frequency.is_none() {
            return Err(SchemeError::Required("Frequency"));
        }
        if self.state_code.trim().is_empty() {
            return Err(SchemeError::Required("State"));
        }
        Ok(())
    }

    /// Validates the draft and builds the creation body
    pub fn payload(&self) -> Result<SchemePayload, SchemeError> {
        self.validate()?;
        let frequency = self.frequency.ok_or(SchemeError::Required("Frequency"))?;
        Ok(SchemePayload {
            scheme_name: self.scheme_name.clone(),
            scheme_name_ll: self.scheme_name_ll.clone(),
            frequency,
            state_code: self.state_code.trim().to_string(),
            division_code: non_empty(&self.division_code),
            district_code: non_empty(&self.district_code),
            taluka_code: non_empty(&self.taluka_code),
            categories: self.build_tree(),
        })
    }
}

/// Outcome of reviewing one uploaded record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject { remark: String },
}

impl ReviewDecision {
    /// A rejection; the remark is trimmed and must not be empty
    pub fn reject(remark: &str) -> Result<Self, SchemeError> {
        let decision = ReviewDecision::Reject {
            remark: remark.trim().to_string(),
        };
        decision.validate()?;
        Ok(decision)
    }

    pub fn validate(&self) -> Result<(), SchemeError> {
        match self {
            ReviewDecision::Reject { remark } if remark.trim().is_empty() => {
                Err(SchemeError::RemarkRequired)
            }
            _ => Ok(()),
        }
    }
}

/// A decision on the record with the given id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    #[serde(flatten)]
    pub decision: ReviewDecision,
}

/// Data entry state for one upload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadForm {
    pub scheme_code: String,
    pub state_code: String,
    pub division_code: String,
    pub district_code: String,
    pub taluka_code: String,
    pub year: String,
    pub month: String,
    pub data: Value,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self {
            scheme_code: String::new(),
            state_code: String::new(),
            division_code: String::new(),
            district_code: String::new(),
            taluka_code: String::new(),
            year: String::new(),
            month: String::new(),
            data: Value::Object(Map::new()),
        }
    }
}

impl UploadForm {
    /// Stores one input, accepting only an empty string or a non-negative number
    pub fn set_entry(&mut self, path: &str, raw: &str) -> Result<(), UploadError> {
        if !raw.is_empty() {
            match raw.trim().parse::<f64>() {
                Ok(n) if n.is_finite() && n >= 0.0 => {}
                Ok(n) if n.is_finite() => {
                    return Err(UploadError::Negative {
                        path: path.to_string(),
                    });
                }
                _ => {
                    return Err(UploadError::NotNumeric {
                        path: path.to_string(),
                        raw: raw.to_string(),
                    });
                }
            }
        }
        set_dotted(&mut self.data, path, raw);
        Ok(())
    }

    pub fn entry(&self, path: &str) -> Option<&Value> {
        get_dotted(&self.data, path)
    }

    /// Checks the form is ready to submit for the given frequency and periods
    pub fn validate(&self, frequency: Option<Frequency>, periods: &[String]) -> Result<(), UploadError> {
        if self.scheme_code.trim().is_empty() || self.state_code.trim().is_empty() {
            return Err(UploadError::Incomplete("select a scheme and state"));
        }
        if frequency.is_none() {
            return Err(UploadError::Incomplete("scheme frequency is unknown"));
        }
        if periods.is_empty() {
            return Err(UploadError::Incomplete("select valid period(s)"));
        }
        Ok(())
    }
}
