//! Documents published by the upstream event-study pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub studies: Vec<StudyEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyEntry {
    pub storm_type: String,
    pub outcome: String,
    #[serde(default)]
    pub method: Option<String>,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub k: i64,
    #[serde(default)]
    pub estimate: Option<f64>,
    #[serde(default)]
    pub ci_low: Option<f64>,
    #[serde(default)]
    pub ci_high: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDocument {
    #[serde(default)]
    pub series: Vec<SeriesPoint>,
    #[serde(default)]
    pub reference_period: Option<i64>,
    #[serde(default)]
    pub time_unit: Option<String>,
}

impl SeriesDocument {
    pub const DEFAULT_REFERENCE_PERIOD: i64 = -1;

    pub fn reference_period(&self) -> i64 {
        self.reference_period
            .unwrap_or(Self::DEFAULT_REFERENCE_PERIOD)
    }
}

/// Difference-in-differences companion record. Every field is optional and
/// the metadata values are kept raw since the pipeline emits both numbers
/// and strings there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryDocument {
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default)]
    pub estimate: Option<f64>,
    #[serde(default)]
    pub se: Option<f64>,
    #[serde(default)]
    pub t: Option<f64>,
    #[serde(default)]
    pub p: Option<f64>,
    #[serde(default)]
    pub ci_low: Option<f64>,
    #[serde(default)]
    pub ci_high: Option<f64>,
    #[serde(default)]
    pub meta: Option<SummaryMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryMeta {
    #[serde(default)]
    pub dep_var: Option<Value>,
    #[serde(default)]
    pub fixed_effects: Option<Value>,
    #[serde(default)]
    pub observations: Option<Value>,
    #[serde(default)]
    pub rmse: Option<Value>,
    #[serde(default)]
    pub r2: Option<Value>,
}
