//! Integration tests for exporting, viewing and serving metrics.

use approx::assert_relative_eq;
use macrotrend_metrics::{
    ChangeUnit, EngineConfig, MetricsEngine, Period, Series, SeriesCatalog, SeriesMetrics,
    SeriesSpec, SourceKind,
};
use macrotrend_output::{
    ExportFormat, Exporter, MetricsIndex, MetricsTable, MoversReport, NestedMetrics, ViewBuilder,
    generate_summaries, to_dataframe,
};
use serde_json::Value;
use std::fs;

fn catalog() -> SeriesCatalog {
    SeriesCatalog::new(vec![
        SeriesSpec::new("WPU081", "Lumber and Wood Products", ChangeUnit::Relative, SourceKind::Bls),
        SeriesSpec::new("UNRATE", "Unemployment Rate", ChangeUnit::Absolute, SourceKind::Fred),
    ])
}

fn series() -> Vec<Series> {
    let start = Period::new(2022, 1).unwrap();
    let lumber = Series::from_points(
        "WPU081",
        ChangeUnit::Relative,
        (0..26).map(|i| (start.offset(i), 250.0 + (i as f64) * 2.5 + ((i % 4) as f64) * 3.0)),
    )
    .unwrap();
    let unrate = Series::from_points(
        "UNRATE",
        ChangeUnit::Absolute,
        (0..26).map(|i| (start.offset(i), 3.5 + ((i % 6) as f64) * 0.1)),
    )
    .unwrap();
    vec![lumber, unrate]
}

fn compute(engine: &MetricsEngine) -> Vec<SeriesMetrics> {
    engine.compute_all(&series())
}

#[test]
fn test_full_export_workflow() {
    let engine = MetricsEngine::default();
    let metrics = compute(&engine);
    let table = MetricsTable::from_metrics(&metrics).unwrap();
    assert_eq!(table.len(), 52);

    let csv = table.export_to_string(ExportFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 53);
    assert!(csv.lines().next().unwrap().ends_with("mom_12mo_avg,mom_36mo_avg"));

    // nested JSON survives a round trip through serde
    let nested = table.to_nested();
    let json = serde_json::to_string(&nested).unwrap();
    let back: NestedMetrics = serde_json::from_str(&json).unwrap();
    let restored = back.to_table();
    assert_eq!(restored.windows, table.windows);
    assert_eq!(restored.len(), table.len());
    for (a, b) in restored.rows.iter().zip(&table.rows) {
        assert_eq!((&a.series_id, a.period), (&b.series_id, b.period));
        assert_eq!(a.mom_change.is_some(), b.mom_change.is_some());
        if let (Some(x), Some(y)) = (a.yoy_change, b.yoy_change) {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
    }

    let df = to_dataframe(&table).unwrap();
    assert_eq!(df.height(), 52);
}

#[test]
fn test_views_written_to_disk() {
    let engine = MetricsEngine::new(EngineConfig::default().with_windows(&[12]).unwrap()).unwrap();
    let metrics = compute(&engine);
    let dir = std::env::temp_dir().join(format!("macrotrend-views-{}", std::process::id()));

    let written = ViewBuilder::new(&engine, &metrics).write_all(&dir).unwrap();
    let names: Vec<_> = written
        .iter()
        .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
        .collect();
    assert_eq!(
        names,
        vec![
            "trends.json",
            "trendlines.json",
            "spikes.json",
            "rolling.json",
            "rolling_12mo.json",
            "correlations.json"
        ]
    );

    let trends: Value = serde_json::from_str(&fs::read_to_string(dir.join("trends.json")).unwrap()).unwrap();
    assert!(trends["2023-01"]["WPU081"]["YoY"].is_number());
    assert!(trends["2022-01"].as_object().unwrap().is_empty());

    let corr: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("correlations.json")).unwrap()).unwrap();
    assert!(corr["UNRATE"]["WPU081"]["lag_0"].is_number());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_serving_and_summaries() {
    let engine = MetricsEngine::default();
    let metrics = compute(&engine);
    let correlations = engine.correlations(&metrics);

    let docs = generate_summaries(&metrics, &catalog(), 2);
    assert_eq!(docs.len(), 2);
    let unrate = docs.iter().find(|d| d.series_id == "UNRATE").unwrap();
    assert_eq!(unrate.date, Period::new(2024, 2).unwrap());
    assert_relative_eq!(unrate.value, 3.6, epsilon = 1e-12);

    let report = MoversReport::new(&metrics, &catalog(), None).unwrap();
    assert_eq!(report.movers.len(), 2);
    assert!(report.to_markdown().contains("Lumber and Wood Products"));

    let index = MetricsIndex::new(metrics, correlations);
    let latest = index.by_series("WPU081", true).unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].period, Period::new(2024, 2).unwrap());
    let feb = index.by_period(Period::new(2024, 2).unwrap(), None).unwrap();
    assert_eq!(feb.len(), 2);
}
