//! DataFrame form of the metrics table.

use crate::export::{ExportError, MetricsTable};
use polars::prelude::*;

/// Build a DataFrame with one row per `(series_id, period)`.
///
/// The `date` column holds the first day of each period as a `Date`.
/// Undefined metrics become nulls.
pub fn to_dataframe(table: &MetricsTable) -> Result<DataFrame, ExportError> {
    let n = table.rows.len();
    let mut ids = Vec::with_capacity(n);
    let mut dates = Vec::with_capacity(n);
    let mut values = Vec::with_capacity(n);
    let mut mom = Vec::with_capacity(n);
    let mut yoy = Vec::with_capacity(n);
    let mut rolling: Vec<Vec<Option<f64>>> = vec![Vec::with_capacity(n); table.windows.len()];

    for row in &table.rows {
        ids.push(row.series_id.as_str());
        dates.push(row.period.first_day().format("%Y-%m-%d").to_string());
        values.push(row.value);
        mom.push(row.mom_change);
        yoy.push(row.yoy_change);
        for (slot, avg) in rolling.iter_mut().zip(&row.rolling_mom) {
            slot.push(*avg);
        }
    }

    let mut columns: Vec<Column> = vec![
        Series::new("series_id".into(), ids).into(),
        Series::new("date".into(), dates).into(),
        Series::new("value".into(), values).into(),
        Series::new("mom_change".into(), mom).into(),
        Series::new("yoy_change".into(), yoy).into(),
    ];
    for (window, avgs) in table.windows.iter().zip(rolling) {
        columns.push(Series::new(window.label().into(), avgs).into());
    }

    let df = DataFrame::new(columns)?
        .lazy()
        .with_column(col("date").cast(DataType::Date))
        .collect()?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macrotrend_metrics::{ChangeUnit, MetricsEngine, Period, SeriesMetrics};

    fn metrics() -> Vec<SeriesMetrics> {
        let start = Period::new(2023, 11).unwrap();
        let s = macrotrend_metrics::Series::from_points(
            "RSAFS",
            ChangeUnit::Relative,
            [(start, 100.0), (start.next(), 110.0), (start.offset(2), 111.0)],
        )
        .unwrap();
        MetricsEngine::default().compute_all(&[s])
    }

    #[test]
    fn test_to_dataframe_shape() {
        let table = MetricsTable::from_metrics(&metrics()).unwrap();
        let df = to_dataframe(&table).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 7);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("mom_change").unwrap().null_count(), 1);
        assert_eq!(df.column("yoy_change").unwrap().null_count(), 3);
    }

    #[test]
    fn test_empty_table() {
        let table = MetricsTable::from_metrics(&[]).unwrap();
        let df = to_dataframe(&table).unwrap();
        assert_eq!(df.height(), 0);
    }
}
