//! Chart slots over an external charting backend.

use anyhow::Result;
use shared::domain::PanelId;

use crate::loader::ChartData;

pub const Y_AXIS_TITLE: &str = "Coefficient";

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    pub point_radius: f32,
    pub dash: Option<[f32; 2]>,
    pub tension: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<Option<f64>>,
    pub style: LineStyle,
}

/// Everything a backend needs to draw one event-study chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub labels: Vec<i64>,
    pub series: Vec<ChartSeries>,
    pub x_axis_title: String,
    pub y_axis_title: String,
}

impl ChartSpec {
    pub fn event_study(data: &ChartData, title: &str) -> Self {
        let bound = |label: &str, values: &[Option<f64>]| ChartSeries {
            label: label.to_string(),
            values: values.to_vec(),
            style: LineStyle {
                width: 1.0,
                point_radius: 0.0,
                dash: Some([4.0, 3.0]),
                tension: 0.0,
            },
        };

        Self {
            title: title.to_string(),
            labels: data.labels.clone(),
            series: vec![
                ChartSeries {
                    label: "Estimate".into(),
                    values: data.estimate.clone(),
                    style: LineStyle {
                        width: 2.0,
                        point_radius: 2.0,
                        dash: None,
                        tension: 0.2,
                    },
                },
                bound("CI low", &data.ci_low),
                bound("CI high", &data.ci_high),
            ],
            x_axis_title: format!("Event time ({})", data.unit),
            y_axis_title: Y_AXIS_TITLE.to_string(),
        }
    }

    /// Position of the vertical reference line, recomputed from the labels
    /// currently held by this `ChartSpec`.
    pub fn reference_position(&self) -> Option<f64> {
        reference_midpoint(&self.labels)
    }
}

/// Midpoint, in category-index space, between the last negative label and
/// the first non-negative one. `None` if either side is absent.
pub fn reference_midpoint(labels: &[i64]) -> Option<f64> {
    let last_negative = labels.iter().rposition(|k| *k < 0)?;
    let first_non_negative = labels.iter().position(|k| *k >= 0)?;
    Some((last_negative as f64 + first_non_negative as f64) / 2.0)
}

/// A chart drawn by the backend. Instances are never redrawn with new data;
/// only the title may change in place.
pub trait ChartInstance: Send {
    fn set_title(&mut self, title: &str);
    fn update(&mut self);
    fn destroy(&mut self);
    fn export_png(&self) -> Result<Vec<u8>>;
}

pub trait ChartBackend: Send {
    fn create(&mut self, panel: PanelId, spec: &ChartSpec) -> Box<dyn ChartInstance>;
}

pub struct ChartHandle {
    id: u64,
    title: String,
    chart: Box<dyn ChartInstance>,
}

impl ChartHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedChart {
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Four fixed chart slots. A slot's previous chart is always destroyed
/// before a new one is bound to it.
pub struct ChartSlots {
    backend: Box<dyn ChartBackend>,
    slots: [Option<ChartHandle>; 4],
    next_id: u64,
}

impl ChartSlots {
    pub fn new(backend: Box<dyn ChartBackend>) -> Self {
        Self {
            backend,
            slots: [None, None, None, None],
            next_id: 1,
        }
    }

    pub fn render(&mut self, panel: PanelId, data: &ChartData, title: &str) -> u64 {
        self.clear(panel);

        let spec = ChartSpec::event_study(data, title);
        let chart = self.backend.create(panel, &spec);
        let id = self.next_id;
        self.next_id += 1;
        self.slots[panel.index()] = Some(ChartHandle {
            id,
            title: title.to_string(),
            chart,
        });
        id
    }

    /// Re-titles the bound chart without recreating it. Returns `false` when
    /// the slot is empty.
    pub fn retitle(&mut self, panel: PanelId, title: &str) -> bool {
        let Some(handle) = self.slots[panel.index()].as_mut() else {
            return false;
        };
        if handle.title != title {
            handle.title = title.to_string();
            handle.chart.set_title(title);
            handle.chart.update();
        }
        true
    }

    pub fn clear(&mut self, panel: PanelId) {
        if let Some(mut handle) = self.slots[panel.index()].take() {
            handle.chart.destroy();
        }
    }

    pub fn handle(&self, panel: PanelId) -> Option<&ChartHandle> {
        self.slots[panel.index()].as_ref()
    }

    pub fn handle_id(&self, panel: PanelId) -> Option<u64> {
        self.handle(panel).map(ChartHandle::id)
    }

    /// Snapshot of the bound chart, or `None` when nothing is rendered.
    pub fn export(&self, panel: PanelId, file_name: &str) -> Result<Option<ExportedChart>> {
        let Some(handle) = self.handle(panel) else {
            return Ok(None);
        };
        let png = handle.chart.export_png()?;
        Ok(Some(ExportedChart {
            file_name: file_name.to_string(),
            png,
        }))
    }
}

impl Drop for ChartSlots {
    fn drop(&mut self) {
        for panel in PanelId::ALL {
            self.clear(panel);
        }
    }
}
