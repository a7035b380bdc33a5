//! In-memory collaborators shared by the engine's test suites.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::Value;
use shared::{domain::PanelId, error::FetchError};
use url::Url;

use crate::{
    chart::{ChartBackend, ChartInstance, ChartSpec},
    gateway::FetchGateway,
    page::LabelSink,
};

pub const ROOT: &str = "https://viewer.test/";

pub fn root() -> Url {
    Url::parse(ROOT).expect("root url")
}

/// Serves documents keyed by absolute URL; anything unknown is a 404.
/// Stalled locations never answer.
#[derive(Default)]
pub struct MemoryGateway {
    docs: Mutex<HashMap<String, Value>>,
    stalled: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, value: Value) {
        self.docs
            .lock()
            .expect("docs")
            .insert(format!("{ROOT}{path}"), value);
    }

    pub fn remove(&self, path: &str) {
        self.docs
            .lock()
            .expect("docs")
            .remove(&format!("{ROOT}{path}"));
    }

    pub fn stall(&self, path: &str) {
        self.stalled
            .lock()
            .expect("stalled")
            .insert(format!("{ROOT}{path}"));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests").clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().expect("requests").clear();
    }
}

#[async_trait]
impl FetchGateway for MemoryGateway {
    async fn fetch_json(&self, location: &Url) -> Result<Value, FetchError> {
        self.requests
            .lock()
            .expect("requests")
            .push(location.to_string());
        let stalled = self
            .stalled
            .lock()
            .expect("stalled")
            .contains(location.as_str());
        if stalled {
            futures::future::pending::<()>().await;
        }
        self.docs
            .lock()
            .expect("docs")
            .get(location.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                location: location.to_string(),
                status: 404,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartRecord {
    pub panel: PanelId,
    pub spec: ChartSpec,
    pub title: String,
    pub updates: u32,
    pub destroyed: bool,
}

/// Chart backend that records every chart it was asked to create.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub charts: Arc<Mutex<Vec<ChartRecord>>>,
}

impl RecordingBackend {
    pub fn records(&self) -> Vec<ChartRecord> {
        self.charts.lock().expect("charts").clone()
    }

    pub fn live(&self) -> Vec<ChartRecord> {
        self.records().into_iter().filter(|r| !r.destroyed).collect()
    }

    pub fn live_for(&self, panel: PanelId) -> Option<ChartRecord> {
        self.live().into_iter().find(|r| r.panel == panel)
    }
}

struct RecordedChart {
    charts: Arc<Mutex<Vec<ChartRecord>>>,
    slot: usize,
}

impl RecordedChart {
    fn with_record(&self, f: impl FnOnce(&mut ChartRecord)) {
        if let Some(record) = self.charts.lock().expect("charts").get_mut(self.slot) {
            f(record);
        }
    }
}

impl ChartInstance for RecordedChart {
    fn set_title(&mut self, title: &str) {
        self.with_record(|r| r.title = title.to_string());
    }

    fn update(&mut self) {
        self.with_record(|r| r.updates += 1);
    }

    fn destroy(&mut self) {
        self.with_record(|r| r.destroyed = true);
    }

    fn export_png(&self) -> anyhow::Result<Vec<u8>> {
        Ok(format!("png:{}", self.slot).into_bytes())
    }
}

impl ChartBackend for RecordingBackend {
    fn create(&mut self, panel: PanelId, spec: &ChartSpec) -> Box<dyn ChartInstance> {
        let mut charts = self.charts.lock().expect("charts");
        charts.push(ChartRecord {
            panel,
            spec: spec.clone(),
            title: spec.title.clone(),
            updates: 0,
            destroyed: false,
        });
        Box::new(RecordedChart {
            charts: Arc::clone(&self.charts),
            slot: charts.len() - 1,
        })
    }
}

/// Label sink backed by plain maps. Headings are only "found" for canvases
/// listed in `known_canvases`.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub state: Arc<Mutex<SinkState>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SinkState {
    pub text: HashMap<String, String>,
    pub hidden: HashMap<String, bool>,
    pub headings: HashMap<String, String>,
    pub known_canvases: Vec<String>,
    pub writes: usize,
}

impl RecordingSink {
    pub fn with_canvases(canvases: &[&str]) -> Self {
        let sink = Self::default();
        sink.state.lock().expect("sink").known_canvases =
            canvases.iter().map(|c| c.to_string()).collect();
        sink
    }

    pub fn snapshot(&self) -> SinkState {
        self.state.lock().expect("sink").clone()
    }

    pub fn text(&self, id: &str) -> Option<String> {
        self.snapshot().text.get(id).cloned()
    }

    pub fn heading(&self, canvas_id: &str) -> Option<String> {
        self.snapshot().headings.get(canvas_id).cloned()
    }

    pub fn is_hidden(&self, id: &str) -> Option<bool> {
        self.snapshot().hidden.get(id).copied()
    }
}

impl LabelSink for RecordingSink {
    fn set_text(&mut self, element_id: &str, text: &str) -> bool {
        let mut state = self.state.lock().expect("sink");
        state.writes += 1;
        state.text.insert(element_id.to_string(), text.to_string());
        true
    }

    fn set_hidden(&mut self, element_id: &str, hidden: bool) -> bool {
        let mut state = self.state.lock().expect("sink");
        state.hidden.insert(element_id.to_string(), hidden);
        true
    }

    fn set_heading(&mut self, canvas_id: &str, text: &str) -> bool {
        let mut state = self.state.lock().expect("sink");
        if !state.known_canvases.iter().any(|c| c == canvas_id) {
            return false;
        }
        state.headings.insert(canvas_id.to_string(), text.to_string());
        true
    }
}
