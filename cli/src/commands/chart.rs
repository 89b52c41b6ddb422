use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::bench_chart::{build_charts, BenchData, ChartOutcome, ChartSpec};

pub fn load_bench_data(path: &Path) -> Result<BenchData> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid samples in {}", path.display()))
}

/// Built charts and the reports for titles that were skipped.
pub fn collect(data: &BenchData, baseline: Option<&BenchData>) -> (Vec<ChartSpec>, Vec<String>) {
    let mut charts = Vec::new();
    let mut reports = Vec::new();
    for outcome in build_charts(data, baseline) {
        match outcome {
            ChartOutcome::Chart(spec) => charts.push(spec),
            ChartOutcome::Skipped { report, .. } => reports.push(report),
        }
    }
    (charts, reports)
}

pub fn chart_command(path: &str, baseline: Option<&str>, output: Option<&str>) -> Result<()> {
    let data = load_bench_data(Path::new(path))?;
    let baseline = baseline
        .map(|b| load_bench_data(Path::new(b)))
        .transpose()?;

    let (charts, reports) = collect(&data, baseline.as_ref());
    for report in &reports {
        eprintln!("{report}");
    }

    let json = serde_json::to_string_pretty(&charts)?;
    match output {
        Some(out_path) => {
            fs::write(out_path, json).context("Failed to write chart file")?;
            println!("Wrote {} charts to {}", charts.len(), out_path);
        }
        None => println!("{json}"),
    }
    Ok(())
}
