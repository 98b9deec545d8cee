/*!
# Mahiti Dashboard

Data shaping behind a scheme monitoring dashboard, built in Rust.

## Overview

Field offices upload numeric figures for government schemes, organised in a
category tree and reported per period (daily, weekly, monthly or yearly).
The backend returns nested JSON. This crate turns those responses into
something a chart can draw, and turns the user's period pickers into the
list of period identifiers the backend expects.

## Architecture

### Period Layer
- Frequency parsing and the period pickers (year, month, date range)
- Day, week and year enumeration with inclusive bounds
- Weekly identifiers of the form `week_<monday>`

### Shaping Layer
- Time-series flattening into one chronological row per period
- Recursive extraction of chart sections from nested merged data
- Top-N ranking of category rows by their summed total
- Human friendly number, delta and percent formatting

### Dashboard Layer
- Location cascade and query validation
- Normalisation of the merged/stats/explanations envelope
- Drill-down insights resolved through a section's path map
- Upload form entry with non-negative validation
- Scheme drafts: flat category editing, tree building, header layout
- Review decisions, where a rejection needs a remark

### Export and Serving
- CSV export, and XLSX export with the `web` feature
- An axum JSON API (feature `web`) and an interactive shell

## Modules

- **json**: Node classification and path lookup into `serde_json` values
- **period**: Period identifier generation
- **timeseries**: Time-series transformation
- **sections**: Chart section extraction
- **ranking**: Top-N ranking of section rows
- **format**: Display formatting
- **dashboard**: Query state, response normalisation, insights
- **scheme**: Category trees, scheme drafts, reviews and the upload form
- **downloader**: Export functionality (CSV, XLSX)
- **config**: TOML and environment configuration, logging setup
- **error**: Error types
- **app**: Routing and middleware

## REST API Endpoints

- `GET /api/health` - Liveness probe
- `POST /api/periods` - Period identifiers for a frequency and bounds
- `POST /api/timeseries` - Chart rows and metric keys
- `POST /api/timeseries/csv`, `/api/timeseries/xlsx` - Exports
- `POST /api/summary` - Chart sections and explanations
- `POST /api/summary/insight` - Stats for one clicked item
- `POST /api/dashboard/validate` - Query validation
- `POST /api/schemes/payload` - Scheme creation body from a draft
- `POST /api/reviews/validate` - Approve/reject decision check
*/

pub mod config;
pub mod dashboard;
pub mod downloader;
pub mod error;
pub mod format;
pub mod json;
pub mod period;
pub mod ranking;
pub mod scheme;
pub mod sections;
pub mod timeseries;

#[cfg(feature = "web")]
pub mod app;

pub use error::{DashboardError, Result};
pub use period::{Frequency, PeriodBounds, compute_periods};
pub use sections::{ChartSection, extract_sections, extract_sections_at};
pub use timeseries::{ChartRow, PeriodRecord, TimeSeries, transform};
