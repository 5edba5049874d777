//! JSON serialization for estimation results.

use crate::result::EstimateReport;

/// Serialize a report to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails (non-finite floats serialize as `null`).
pub fn to_json(report: &EstimateReport) -> Result<String, serde_json::Error> {
    serde_json::to_string(report)
}

/// Serialize a report to a pretty-printed JSON string.
pub fn to_json_pretty(report: &EstimateReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
