use serde::{Deserialize, Serialize};

/// Per-column statistics for the reports view.
///
/// Numeric fields are only filled when every non-null value of the column is
/// a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub distinct: usize,
    pub sum: Option<f64>,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}
