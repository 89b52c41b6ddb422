//! Benchmark samples to chart series.
//!
//! A chart is a box plot only when every case has at least
//! [`BOXPLOT_MIN_SAMPLES`] samples; otherwise every case is drawn as a
//! `[min, max]` error bar. A baseline must cover exactly the same cases.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const BOXPLOT_MIN_SAMPLES: usize = 5;

/// case -> samples (seconds)
pub type Samples = BTreeMap<String, Vec<f64>>;
/// title -> case -> samples
pub type BenchData = BTreeMap<String, Samples>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Boxplot,
    Errorbar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SeriesKind,
    /// Per case: `[low, q1, median, q3, high]` or `[min, max]`.
    pub data: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Chart(ChartSpec),
    /// No chart was built for `title`; `report` says why.
    Skipped { title: String, report: String },
}

pub fn chart_kind<'a>(cases: impl IntoIterator<Item = &'a Vec<f64>>) -> SeriesKind {
    if cases
        .into_iter()
        .all(|samples| samples.len() >= BOXPLOT_MIN_SAMPLES)
    {
        SeriesKind::Boxplot
    } else {
        SeriesKind::Errorbar
    }
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// `[low, q1, median, q3, high]` with linear interpolation. `samples` must
/// not be empty.
pub fn five_number_summary(samples: &[f64]) -> [f64; 5] {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    [
        sorted[0],
        quantile(&sorted, 0.25),
        quantile(&sorted, 0.5),
        quantile(&sorted, 0.75),
        sorted[sorted.len() - 1],
    ]
}

fn min_max(samples: &[f64]) -> [f64; 2] {
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    [min, max]
}

fn series(name: &str, kind: SeriesKind, cases: &Samples) -> Series {
    let data = cases
        .values()
        .map(|samples| match kind {
            SeriesKind::Boxplot => five_number_summary(samples).to_vec(),
            SeriesKind::Errorbar => min_max(samples).to_vec(),
        })
        .collect();
    Series {
        name: name.to_string(),
        kind,
        data,
    }
}

/// Describe how two case sets differ, or `None` when they match.
pub fn key_mismatch(title: &str, current: &Samples, baseline: &Samples) -> Option<String> {
    let ours: BTreeSet<&String> = current.keys().collect();
    let theirs: BTreeSet<&String> = baseline.keys().collect();
    if ours == theirs {
        return None;
    }
    let list = |set: Vec<&&String>| {
        set.iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let missing = list(ours.difference(&theirs).collect());
    let extra = list(theirs.difference(&ours).collect());
    Some(format!(
        "{title}: case keys differ (missing from baseline: [{missing}]; only in baseline: [{extra}])"
    ))
}

pub fn build_chart(title: &str, current: &Samples, baseline: Option<&Samples>) -> ChartOutcome {
    let skipped = |report: String| ChartOutcome::Skipped {
        title: title.to_string(),
        report,
    };

    if let Some(baseline) = baseline {
        if let Some(report) = key_mismatch(title, current, baseline) {
            return skipped(report);
        }
    }
    let all_cases = current.iter().chain(baseline.into_iter().flatten());
    for (case, samples) in all_cases {
        if samples.is_empty() {
            return skipped(format!("{title}: case `{case}` has no samples"));
        }
    }

    let kind = chart_kind(current.values().chain(baseline.into_iter().flat_map(|b| b.values())));
    let mut spec = ChartSpec {
        title: title.to_string(),
        categories: current.keys().cloned().collect(),
        series: vec![series("current", kind, current)],
    };
    if let Some(baseline) = baseline {
        spec.series.push(series("baseline", kind, baseline));
    }
    ChartOutcome::Chart(spec)
}

/// One outcome per title. A title absent from a given baseline is a mismatch.
pub fn build_charts(data: &BenchData, baseline: Option<&BenchData>) -> Vec<ChartOutcome> {
    let empty = Samples::new();
    data.iter()
        .map(|(title, current)| {
            let base = baseline.map(|b| b.get(title).unwrap_or(&empty));
            build_chart(title, current, base)
        })
        .collect()
}
