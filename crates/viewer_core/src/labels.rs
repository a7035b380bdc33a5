//! Selection-derived text: chart titles, captions, headings and the DiD
//! summary fields.

use serde_json::Value;
use shared::{
    domain::{Cohort, Dataset, PanelId, PanelPair, Side},
    protocol::SummaryDocument,
};

use crate::{chart::ChartSlots, page::LabelSink};

pub const REFERENCE_NOTE: &str = "Ref line drawn midway between k = −2 and k = 0";
pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetLabels {
    pub left: &'static str,
    pub right: &'static str,
    pub unit: &'static str,
}

impl DatasetLabels {
    pub fn for_dataset(dataset: Dataset) -> Self {
        match dataset {
            Dataset::Evictions => Self {
                left: "Evictions",
                right: "Filings",
                unit: "months",
            },
            Dataset::Payday => Self {
                left: "Transaction Volume",
                right: "Default",
                unit: "weeks",
            },
        }
    }

    pub fn for_side(&self, side: Side) -> &'static str {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Page element ids bound to one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelBinding {
    pub canvas_id: &'static str,
    pub caption_id: &'static str,
    pub missing_id: &'static str,
    pub summary_prefix: &'static str,
    pub title_ids: &'static [&'static str],
}

pub fn binding(panel: PanelId) -> PanelBinding {
    match panel {
        PanelId::PrimaryLeft => PanelBinding {
            canvas_id: "esChartEvict",
            caption_id: "chart-caption-evict",
            missing_id: "missing-evict",
            summary_prefix: "did-e",
            title_ids: &["title-evict", "heading-evict", "card-title-evict"],
        },
        PanelId::PrimaryRight => PanelBinding {
            canvas_id: "esChartFiling",
            caption_id: "chart-caption-filing",
            missing_id: "missing-filing",
            summary_prefix: "did-f",
            title_ids: &["title-filing", "heading-filing", "card-title-filing"],
        },
        PanelId::ComparisonLeft => PanelBinding {
            canvas_id: "esFemaEvict",
            caption_id: "fema-caption-evict",
            missing_id: "fema-missing-evict",
            summary_prefix: "fema-e",
            title_ids: &[],
        },
        PanelId::ComparisonRight => PanelBinding {
            canvas_id: "esFemaFiling",
            caption_id: "fema-caption-filing",
            missing_id: "fema-missing-filing",
            summary_prefix: "fema-f",
            title_ids: &[],
        },
    }
}

fn with_cohort_prefix(panel: PanelId, cohort: Cohort, text: &str) -> String {
    match panel.pair() {
        PanelPair::Primary => text.to_string(),
        PanelPair::Comparison => format!("{} — {text}", cohort.display_name()),
    }
}

/// Chart-native title; also used for the heading above the panel.
pub fn chart_title(panel: PanelId, dataset: Dataset, cohort: Cohort) -> String {
    let label = DatasetLabels::for_dataset(dataset).for_side(panel.side());
    with_cohort_prefix(panel, cohort, label)
}

pub fn caption(panel: PanelId, dataset: Dataset, cohort: Cohort) -> String {
    let label = DatasetLabels::for_dataset(dataset).for_side(panel.side());
    with_cohort_prefix(panel, cohort, &format!("{label} — {REFERENCE_NOTE}"))
}

pub fn export_file_name(panel: PanelId, dataset: Dataset) -> String {
    let stem = match (dataset, panel.side()) {
        (Dataset::Evictions, Side::Left) => "evictions",
        (Dataset::Evictions, Side::Right) => "filings",
        (Dataset::Payday, Side::Left) => "txvolume",
        (Dataset::Payday, Side::Right) => "default",
    };
    match panel.pair() {
        PanelPair::Primary => format!("event-study_{stem}.png"),
        PanelPair::Comparison => format!("event-study_FEMA_{stem}.png"),
    }
}

fn fixed3(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.3}"),
        _ => PLACEHOLDER.to_string(),
    }
}

fn raw(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => PLACEHOLDER.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Formatted DiD fields keyed by element-id suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryView {
    pub fields: Vec<(&'static str, String)>,
}

impl SummaryView {
    pub fn new(summary: Option<&SummaryDocument>) -> Self {
        let empty = SummaryDocument::default();
        let doc = summary.unwrap_or(&empty);
        let meta = doc.meta.clone().unwrap_or_default();

        let ci = match (doc.ci_low, doc.ci_high) {
            (Some(lo), Some(hi)) if lo.is_finite() && hi.is_finite() => {
                format!("[{lo:.3}, {hi:.3}]")
            }
            _ => PLACEHOLDER.to_string(),
        };

        Self {
            fields: vec![
                (
                    "term",
                    doc.term.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                ),
                ("est", fixed3(doc.estimate)),
                ("se", fixed3(doc.se)),
                ("t", fixed3(doc.t)),
                ("p", fixed3(doc.p)),
                ("ci", ci),
                ("dep", raw(meta.dep_var.as_ref())),
                ("fe", raw(meta.fixed_effects.as_ref())),
                ("obs", raw(meta.observations.as_ref())),
                ("rmse", raw(meta.rmse.as_ref())),
                ("r2", raw(meta.r2.as_ref())),
            ],
        }
    }

    pub fn placeholder() -> Self {
        Self::new(None)
    }

    pub fn get(&self, suffix: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == suffix)
            .map(|(_, value)| value.as_str())
    }

    pub fn write_to(&self, sink: &mut dyn LabelSink, prefix: &str) {
        for (suffix, value) in &self.fields {
            sink.set_text(&format!("{prefix}-{suffix}"), value);
        }
    }
}

/// Brings every selection-derived label of the given pairs in line with the
/// dataset and cohort. Writing the same selection twice produces the same
/// text.
pub fn refresh_labels(
    sink: &mut dyn LabelSink,
    charts: &mut ChartSlots,
    pairs: &[PanelPair],
    dataset: Dataset,
    cohort: Cohort,
) {
    for &pair in pairs {
        for panel in PanelId::of_pair(pair) {
            refresh_panel_labels(sink, charts, panel, dataset, cohort);
        }
    }
}

pub fn refresh_panel_labels(
    sink: &mut dyn LabelSink,
    charts: &mut ChartSlots,
    panel: PanelId,
    dataset: Dataset,
    cohort: Cohort,
) {
    let bound = binding(panel);
    let title = chart_title(panel, dataset, cohort);

    charts.retitle(panel, &title);
    for id in bound.title_ids {
        sink.set_text(id, &title);
    }
    sink.set_text(bound.caption_id, &caption(panel, dataset, cohort));
    sink.set_heading(bound.canvas_id, &title);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingBackend, RecordingSink};
    use serde_json::json;

    #[test]
    fn dataset_labels_follow_outcomes() {
        let payday = DatasetLabels::for_dataset(Dataset::Payday);
        assert_eq!(payday.for_side(Side::Left), "Transaction Volume");
        assert_eq!(payday.unit, "weeks");
        assert_eq!(DatasetLabels::for_dataset(Dataset::Evictions).right, "Filings");
    }

    #[test]
    fn comparison_text_is_prefixed_with_cohort() {
        assert_eq!(
            chart_title(PanelId::ComparisonLeft, Dataset::Evictions, Cohort::NoFema),
            "No-FEMA — Evictions"
        );
        assert_eq!(
            chart_title(PanelId::PrimaryLeft, Dataset::Evictions, Cohort::NoFema),
            "Evictions"
        );
        assert_eq!(
            caption(PanelId::ComparisonRight, Dataset::Payday, Cohort::Fema),
            format!("FEMA — Default — {REFERENCE_NOTE}")
        );
        assert_eq!(
            caption(PanelId::PrimaryRight, Dataset::Payday, Cohort::Fema),
            format!("Default — {REFERENCE_NOTE}")
        );
    }

    #[test]
    fn export_names_depend_on_dataset_and_pair() {
        assert_eq!(
            export_file_name(PanelId::PrimaryLeft, Dataset::Payday),
            "event-study_txvolume.png"
        );
        assert_eq!(
            export_file_name(PanelId::ComparisonRight, Dataset::Evictions),
            "event-study_FEMA_filings.png"
        );
    }

    #[test]
    fn summary_view_formats_numbers_and_raw_metadata() {
        let doc: SummaryDocument = serde_json::from_value(json!({
            "term": "post_x_treated",
            "estimate": -0.12345,
            "se": 0.05,
            "t": -2.469,
            "p": 0.0136,
            "ci_low": -0.22,
            "ci_high": -0.0261,
            "meta": {
                "dep_var": "evict_rate",
                "fixed_effects": "zip + month",
                "observations": 48213,
                "rmse": 0.7123,
                "r2": null
            }
        }))
        .expect("summary");

        let view = SummaryView::new(Some(&doc));

        assert_eq!(view.get("term"), Some("post_x_treated"));
        assert_eq!(view.get("est"), Some("-0.123"));
        assert_eq!(view.get("p"), Some("0.014"));
        assert_eq!(view.get("ci"), Some("[-0.220, -0.026]"));
        assert_eq!(view.get("dep"), Some("evict_rate"));
        assert_eq!(view.get("obs"), Some("48213"));
        assert_eq!(view.get("rmse"), Some("0.7123"));
        assert_eq!(view.get("r2"), Some(PLACEHOLDER));
    }

    #[test]
    fn placeholder_view_is_all_dashes() {
        let view = SummaryView::placeholder();
        assert_eq!(view.fields.len(), 11);
        assert!(view.fields.iter().all(|(_, v)| v == PLACEHOLDER));
    }

    #[test]
    fn summary_view_writes_prefixed_ids() {
        let mut sink = RecordingSink::default();
        SummaryView::placeholder().write_to(&mut sink, "fema-e");
        assert_eq!(sink.text("fema-e-rmse").as_deref(), Some(PLACEHOLDER));
        assert_eq!(sink.text("fema-e-term").as_deref(), Some(PLACEHOLDER));
    }

    #[test]
    fn refresh_is_idempotent() {
        let mut sink = RecordingSink::with_canvases(&["esChartEvict", "esFemaFiling"]);
        let mut charts = ChartSlots::new(Box::new(RecordingBackend::default()));
        let pairs = [PanelPair::Primary, PanelPair::Comparison];

        refresh_labels(&mut sink, &mut charts, &pairs, Dataset::Payday, Cohort::NoFema);
        let first = sink.snapshot();
        refresh_labels(&mut sink, &mut charts, &pairs, Dataset::Payday, Cohort::NoFema);
        let second = sink.snapshot();

        assert_eq!(first.text, second.text);
        assert_eq!(first.headings, second.headings);
        assert_eq!(
            second.headings.get("esFemaFiling").map(String::as_str),
            Some("No-FEMA — Default")
        );
        assert_eq!(
            second.text.get("title-evict").map(String::as_str),
            Some("Transaction Volume")
        );
        assert!(!second.headings.contains_key("esChartFiling"));
    }
}
