//! Per-panel loading: the series document (required) and, once drawn, the
//! DiD summary (best effort).

use shared::{
    error::FetchError,
    protocol::{SeriesDocument, SummaryDocument},
};
use tracing::{debug, warn};

use crate::{
    gateway::{fetch_document, FetchGateway},
    resolver::StudyPaths,
};

/// Column-oriented series aligned to the `k` labels. `None` entries are gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub labels: Vec<i64>,
    pub estimate: Vec<Option<f64>>,
    pub ci_low: Vec<Option<f64>>,
    pub ci_high: Vec<Option<f64>>,
    pub reference_period: i64,
    pub unit: String,
}

impl ChartData {
    pub fn from_series(doc: &SeriesDocument, fallback_unit: &str) -> Self {
        let mut points: Vec<_> = doc.series.iter().collect();
        points.sort_by_key(|point| point.k);

        let unit = doc
            .time_unit
            .as_deref()
            .filter(|unit| !unit.is_empty())
            .unwrap_or(fallback_unit)
            .to_string();

        Self {
            labels: points.iter().map(|p| p.k).collect(),
            estimate: points.iter().map(|p| finite(p.estimate)).collect(),
            ci_low: points.iter().map(|p| finite(p.ci_low)).collect(),
            ci_high: points.iter().map(|p| finite(p.ci_high)).collect(),
            reference_period: doc.reference_period(),
            unit,
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Present(SummaryDocument),
    Absent,
}

impl SummaryOutcome {
    pub fn document(&self) -> Option<&SummaryDocument> {
        match self {
            Self::Present(doc) => Some(doc),
            Self::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBundle {
    pub slug: String,
    pub series: SeriesDocument,
    pub chart: ChartData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelResult {
    /// The selection maps to no published study.
    Missing,
    Loaded(SeriesBundle),
    /// A slug was known but its series document could not be fetched.
    LoadFailed(FetchError),
}

/// Everything one panel needs to load, resolved ahead of any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRequest {
    pub slug: Option<String>,
    pub paths: StudyPaths,
}

/// Fetches the series document only; the chart can be drawn as soon as this
/// resolves.
pub async fn load_series<G>(
    gateway: &G,
    request: &PanelRequest,
    fallback_unit: &str,
) -> PanelResult
where
    G: FetchGateway + ?Sized,
{
    let Some(slug) = request.slug.as_deref() else {
        return PanelResult::Missing;
    };

    let location = request.paths.series(slug);
    match fetch_document::<SeriesDocument, _>(gateway, &location).await {
        Ok(series) => PanelResult::Loaded(SeriesBundle {
            slug: slug.to_string(),
            chart: ChartData::from_series(&series, fallback_unit),
            series,
        }),
        Err(err) => {
            warn!(slug, error = %err, "series document unavailable");
            PanelResult::LoadFailed(err)
        }
    }
}

/// Best-effort DiD summary for a slug whose series already loaded.
pub async fn load_summary<G>(gateway: &G, paths: &StudyPaths, slug: &str) -> SummaryOutcome
where
    G: FetchGateway + ?Sized,
{
    match fetch_document::<SummaryDocument, _>(gateway, &paths.summary(slug)).await {
        Ok(doc) => SummaryOutcome::Present(doc),
        Err(err) => {
            debug!(slug, error = %err, "summary document unavailable; showing placeholders");
            SummaryOutcome::Absent
        }
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
