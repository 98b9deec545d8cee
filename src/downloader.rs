use crate::error::Result;
use crate::timeseries::TimeSeries;

/// Quotes a CSV field when it contains a comma, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert a time series to CSV format
///
/// Produces one header line `period,ts,<metric keys...>` followed by one line
/// per chart row in chronological order. Metrics a row does not carry are
/// left empty rather than written as zero.
///
/// # Arguments
/// * `series` - Transformed time series to export
///
/// # Returns
/// * `Result<String>` - CSV content as a string or an error
///
/// # Examples
/// ```
/// use mahiti_dashboard::downloader::to_csv;
/// use mahiti_dashboard::timeseries::transform_value;
/// use serde_json::json;
///
/// let series = transform_value(&json!([{"period": "2024", "ts": 1, "data": {"a": 2}}]));
/// assert_eq!(to_csv(&series).unwrap(), "period,ts,a\n2024,1,2\n");
/// ```
pub fn to_csv(series: &TimeSeries) -> Result<String> {
    let mut csv_content = String::new();

    // Header row
    csv_content.push_str("period,ts");
    for key in &series.keys {
        csv_content.push(',');
        csv_content.push_str(&csv_field(key));
    }
    csv_content.push('\n');

    // Data rows
    for row in &series.rows {
        csv_content.push_str(&csv_field(&row.period));
        csv_content.push(',');
        if let Some(ts) = &row.ts {
            csv_content.push_str(&ts.to_string());
        }
        for key in &series.keys {
            csv_content.push(',');
            if let Some(value) = row.get(key) {
                csv_content.push_str(&value.to_string());
            }
        }
        csv_content.push('\n');
    }

    Ok(csv_content)
}

/// Convert a time series to XLSX format
///
/// Same layout as [`to_csv`], written as a single worksheet with numeric
/// cells for timestamps and metrics.
///
/// # Arguments
/// * `series` - Transformed time series to export
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn to_xlsx(series: &TimeSeries) -> Result<Vec<u8>> {
    use crate::error::DashboardError;
    use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

    fn export_err(e: XlsxError) -> DashboardError {
        DashboardError::Export(e.to_string())
    }

    // Metric columns start after period and ts
    fn metric_column(index: usize) -> Result<u16> {
        index
            .checked_add(2)
            .and_then(|c| u16::try_from(c).ok())
            .ok_or_else(|| DashboardError::Export(format!("too many metric columns: {}", index + 1)))
    }

    fn sheet_row(index: usize) -> Result<u32> {
        u32::try_from(index + 1)
            .map_err(|_| DashboardError::Export(format!("too many rows: {}", index + 1)))
    }

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    worksheet.write_string(0, 0, "period").map_err(export_err)?;
    worksheet.write_string(0, 1, "ts").map_err(export_err)?;
    for (c, key) in series.keys.iter().enumerate() {
        worksheet
            .write_string(0, metric_column(c)?, key.as_str())
            .map_err(export_err)?;
    }

    for (r, row) in series.rows.iter().enumerate() {
        let line = sheet_row(r)?;
        worksheet
            .write_string(line, 0, row.period.as_str())
            .map_err(export_err)?;
        if let Some(ts) = row.ts.as_ref().and_then(|n| n.as_f64()) {
            worksheet.write_number(line, 1, ts).map_err(export_err)?;
        }
        for (c, key) in series.keys.iter().enumerate() {
            if let Some(value) = row.get(key) {
                worksheet
                    .write_number(line, metric_column(c)?, value)
                    .map_err(export_err)?;
            }
        }
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer().map_err(export_err)?;

    Ok(buffer)
}
