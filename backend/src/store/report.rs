use common::model::record::RecordSet;
use common::model::report::{ColumnSummary, Report};
use std::collections::HashSet;

/// Per-column totals and statistics over a record set.
pub fn summarize(records: &RecordSet) -> Report {
    let columns = records
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| summarize_column(name, records, idx))
        .collect();
    Report {
        rows: records.len(),
        columns,
    }
}

fn summarize_column(name: &str, records: &RecordSet, idx: usize) -> ColumnSummary {
    let present: Vec<_> = records.column_values(idx).filter(|c| !c.is_null()).collect();
    let distinct: HashSet<String> = present
        .iter()
        .map(|c| format!("{}:{}", c.kind(), c))
        .collect();
    let numbers: Option<Vec<f64>> = present.iter().map(|c| c.as_f64()).collect();

    let mut summary = ColumnSummary {
        column: name.to_string(),
        count: present.len(),
        distinct: distinct.len(),
        sum: None,
        mean: None,
        min: None,
        max: None,
    };
    if let Some(numbers) = numbers.filter(|n| !n.is_empty()) {
        let sum: f64 = numbers.iter().sum();
        summary.sum = Some(sum);
        summary.mean = Some(sum / numbers.len() as f64);
        summary.min = numbers.iter().copied().reduce(f64::min);
        summary.max = numbers.iter().copied().reduce(f64::max);
    }
    summary
}
