use thiserror::Error;

/// Reasons a dashboard query cannot be submitted yet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Please select at least {0}")]
    MissingSelector(&'static str),

    #[error("Please select valid period(s) for the {0} frequency")]
    NoPeriods(String),
}

/// Rejections for a single upload form entry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("Value for {path} must not be negative")]
    Negative { path: String },

    #[error("Value for {path} is not a number: {raw}")]
    NotNumeric { path: String, raw: String },

    #[error("Upload form is incomplete: {0}")]
    Incomplete(&'static str),
}

/// Problems with a scheme draft or a review decision
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemeError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Category {0} does not exist")]
    UnknownCategory(u64),

    #[error("Please enter rejection remark")]
    RemarkRequired,
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("Invalid upload: {0}")]
    Upload(#[from] UploadError),

    #[error("Invalid scheme: {0}")]
    Scheme(#[from] SchemeError),

    /// A request body the API could not read
    #[error("Invalid request: {message}")]
    Request { status: u16, message: String },
}

impl From<toml::de::Error> for DashboardError {
    fn from(err: toml::de::Error) -> Self {
        DashboardError::Config(err.to_string())
    }
}

impl serde::Serialize for DashboardError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
