//! Panel synchronizer: owns the selection and keeps the four panels and
//! their labels consistent with it.
//!
//! Work is split in three steps so that stale results can be recognised:
//! [`PanelSynchronizer::dispatch`] mutates the selection and returns
//! self-contained [`Load`] plans, [`Load::run`] performs the I/O without
//! touching the synchronizer, and [`PanelSynchronizer::apply`] installs an
//! outcome only if its pair has not been re-triggered since.
//!
//! Every panel is its own unit of work. A manifest load is followed by one
//! series load per primary panel, and a drawn series by its summary load, so
//! a slow fetch only ever holds back the panel that issued it.

use std::sync::Arc;

use anyhow::Result;
use futures::{stream::FuturesUnordered, StreamExt};
use shared::{
    domain::{Cohort, CorpusVariant, Dataset, Method, PanelId, PanelPair},
    error::{FetchError, ViewerError},
    protocol::{ManifestDocument, SeriesDocument, SummaryDocument},
};
use tracing::{debug, info, warn};

use crate::{
    chart::{ChartBackend, ChartSlots, ExportedChart},
    gateway::{fetch_document, FetchGateway},
    labels::{
        binding, chart_title, export_file_name, refresh_panel_labels, DatasetLabels, SummaryView,
    },
    loader::{load_series, load_summary, PanelRequest, PanelResult, SummaryOutcome},
    manifest::ManifestIndex,
    page::LabelSink,
    resolver::{comparison_slug, ResourceResolver, StudyPaths},
};

pub const DEFAULT_COMPARISON_CATEGORY: &str = "hurricane";

/// Values read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchParams {
    pub dataset: Dataset,
    pub corpus: CorpusVariant,
    /// Filters the primary manifest when reading the extended corpus.
    pub manifest_method: Option<Method>,
    pub preferred_storm: Option<String>,
    pub method: Method,
    pub cohort: Cohort,
    pub comparison_category: String,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            dataset: Dataset::default(),
            corpus: CorpusVariant::default(),
            manifest_method: None,
            preferred_storm: None,
            method: Method::default(),
            cohort: Cohort::default(),
            comparison_category: DEFAULT_COMPARISON_CATEGORY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub dataset: Dataset,
    pub corpus: CorpusVariant,
    /// Always a key of the current manifest index, or `None` when it is empty.
    pub storm_type: Option<String>,
    pub method: Method,
    pub cohort: Cohort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Dataset(Dataset),
    StormType(String),
    Method(Method),
    Cohort(Cohort),
    /// Reloads the primary manifest and pair.
    Refresh,
    RefreshComparison,
}

impl SelectionChange {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dataset(_) => "dataset",
            Self::StormType(_) => "storm_type",
            Self::Method(_) => "method",
            Self::Cohort(_) => "cohort",
            Self::Refresh => "refresh",
            Self::RefreshComparison => "refresh_comparison",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelPhase {
    #[default]
    Idle,
    Resolving,
    Rendered,
    MissingDisplayed,
    ErrorDisplayed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    pub phase: PanelPhase,
    pub missing: bool,
    pub slug: Option<String>,
    pub series: Option<SeriesDocument>,
    pub summary: Option<SummaryDocument>,
}

/// Selection fields a pair's content depends on, captured at dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairSnapshot {
    Primary {
        dataset: Dataset,
        corpus: CorpusVariant,
        storm_type: Option<String>,
    },
    Comparison {
        dataset: Dataset,
        method: Method,
        cohort: Cohort,
    },
}

impl PairSnapshot {
    fn capture(pair: PanelPair, selection: &Selection) -> Self {
        match pair {
            PanelPair::Primary => Self::Primary {
                dataset: selection.dataset,
                corpus: selection.corpus,
                storm_type: selection.storm_type.clone(),
            },
            PanelPair::Comparison => Self::Comparison {
                dataset: selection.dataset,
                method: selection.method,
                cohort: selection.cohort,
            },
        }
    }

    fn dataset(&self) -> Dataset {
        match self {
            Self::Primary { dataset, .. } | Self::Comparison { dataset, .. } => *dataset,
        }
    }
}

#[derive(Debug, Clone)]
enum LoadWork {
    Manifest {
        paths: StudyPaths,
        method_filter: Option<Method>,
        current: Option<String>,
        preferred: Option<String>,
    },
    Series {
        panel: PanelId,
        request: PanelRequest,
    },
    Summary {
        panel: PanelId,
        paths: StudyPaths,
        slug: String,
    },
}

/// One unit of pending I/O, detached from the synchronizer.
#[derive(Debug, Clone)]
pub struct Load {
    pub pair: PanelPair,
    pub generation: u64,
    pub snapshot: PairSnapshot,
    work: LoadWork,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManifestUpdate {
    Loaded {
        index: ManifestIndex,
        storm_type: Option<String>,
    },
    Failed(FetchError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    Manifest(ManifestUpdate),
    Series {
        panel: PanelId,
        result: PanelResult,
    },
    Summary {
        panel: PanelId,
        slug: String,
        summary: SummaryOutcome,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub pair: PanelPair,
    pub generation: u64,
    pub snapshot: PairSnapshot,
    pub result: LoadResult,
}

impl LoadOutcome {
    fn manifest_error(&self) -> Option<&FetchError> {
        match &self.result {
            LoadResult::Manifest(ManifestUpdate::Failed(err)) => Some(err),
            _ => None,
        }
    }

    fn is_manifest(&self) -> bool {
        matches!(self.result, LoadResult::Manifest(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    Applied,
    Discarded,
}

/// Result of applying one outcome: its status and any loads it unlocked.
#[derive(Debug)]
pub struct ApplyReport {
    pub status: ApplyStatus,
    pub follow_ups: Vec<Load>,
}

impl ApplyReport {
    fn applied(follow_ups: Vec<Load>) -> Self {
        Self {
            status: ApplyStatus::Applied,
            follow_ups,
        }
    }

    fn discarded() -> Self {
        Self {
            status: ApplyStatus::Discarded,
            follow_ups: Vec::new(),
        }
    }
}

fn choose_storm_type(
    index: &ManifestIndex,
    current: Option<&str>,
    preferred: Option<&str>,
) -> Option<String> {
    match current {
        Some(_) => index.reconcile(current),
        None => index.default_storm_type(preferred),
    }
}

fn primary_requests(
    index: &ManifestIndex,
    storm_type: Option<&str>,
    dataset: Dataset,
    paths: &StudyPaths,
) -> [PanelRequest; 2] {
    dataset.outcome_keys().map(|outcome| PanelRequest {
        slug: storm_type
            .and_then(|storm| index.lookup(storm, outcome))
            .map(str::to_string),
        paths: paths.clone(),
    })
}

impl Load {
    /// Panel this load feeds, or `None` for a manifest load.
    pub fn panel(&self) -> Option<PanelId> {
        match &self.work {
            LoadWork::Manifest { .. } => None,
            LoadWork::Series { panel, .. } | LoadWork::Summary { panel, .. } => Some(*panel),
        }
    }

    pub async fn run(self, gateway: &dyn FetchGateway) -> LoadOutcome {
        let result = match self.work {
            LoadWork::Manifest {
                paths,
                method_filter,
                current,
                preferred,
            } => {
                let location = paths.manifest();
                match fetch_document::<ManifestDocument, _>(gateway, &location).await {
                    Ok(doc) => {
                        let index = ManifestIndex::build(&doc, method_filter);
                        let storm_type =
                            choose_storm_type(&index, current.as_deref(), preferred.as_deref());
                        LoadResult::Manifest(ManifestUpdate::Loaded { index, storm_type })
                    }
                    Err(err) => {
                        warn!(location = %location, error = %err, "manifest unavailable");
                        LoadResult::Manifest(ManifestUpdate::Failed(err))
                    }
                }
            }
            LoadWork::Series { panel, request } => {
                let fallback_unit = DatasetLabels::for_dataset(self.snapshot.dataset()).unit;
                LoadResult::Series {
                    panel,
                    result: load_series(gateway, &request, fallback_unit).await,
                }
            }
            LoadWork::Summary { panel, paths, slug } => {
                let summary = load_summary(gateway, &paths, &slug).await;
                LoadResult::Summary {
                    panel,
                    slug,
                    summary,
                }
            }
        };

        LoadOutcome {
            pair: self.pair,
            generation: self.generation,
            snapshot: self.snapshot,
            result,
        }
    }
}

fn pair_slot(pair: PanelPair) -> usize {
    match pair {
        PanelPair::Primary => 0,
        PanelPair::Comparison => 1,
    }
}

pub struct PanelSynchronizer<S: LabelSink> {
    selection: Selection,
    launch: LaunchParams,
    resolver: ResourceResolver,
    gateway: Arc<dyn FetchGateway>,
    index: ManifestIndex,
    index_for: Option<(Dataset, CorpusVariant)>,
    generations: [u64; 2],
    panels: [PanelState; 4],
    charts: ChartSlots,
    sink: S,
}

impl<S: LabelSink> PanelSynchronizer<S> {
    pub fn new(
        launch: LaunchParams,
        resolver: ResourceResolver,
        gateway: Arc<dyn FetchGateway>,
        backend: Box<dyn ChartBackend>,
        sink: S,
    ) -> Self {
        let selection = Selection {
            dataset: launch.dataset,
            corpus: launch.corpus,
            storm_type: None,
            method: launch.method,
            cohort: launch.cohort,
        };
        Self {
            selection,
            launch,
            resolver,
            gateway,
            index: ManifestIndex::default(),
            index_for: None,
            generations: [0; 2],
            panels: Default::default(),
            charts: ChartSlots::new(backend),
            sink,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn index(&self) -> &ManifestIndex {
        &self.index
    }

    pub fn panel(&self, panel: PanelId) -> &PanelState {
        &self.panels[panel.index()]
    }

    pub fn chart_id(&self, panel: PanelId) -> Option<u64> {
        self.charts.handle_id(panel)
    }

    pub fn chart_title(&self, panel: PanelId) -> Option<&str> {
        self.charts.handle(panel).map(|handle| handle.title())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn generation(&self, pair: PanelPair) -> u64 {
        self.generations[pair_slot(pair)]
    }

    /// Initial load of both pairs. Failing to read the very first manifest
    /// is the only fatal condition: nothing useful can be shown without at
    /// least one storm type. Comparison results that arrive before the
    /// manifest are held back until it has loaded.
    pub async fn boot(&mut self) -> Result<(), ViewerError> {
        let mut loads = vec![self.plan_primary_manifest(None)];
        loads.extend(self.plan_pair(PanelPair::Comparison));
        self.drive(loads, true).await.map(|_| ())
    }

    /// Dispatches a change and applies each panel as soon as its own load
    /// finishes.
    pub async fn handle(&mut self, change: SelectionChange) -> Vec<ApplyStatus> {
        let loads = self.dispatch(change);
        // Only boot gates on the manifest, so this cannot fail.
        self.drive(loads, false).await.unwrap_or_default()
    }

    /// Applies `change` to the selection and returns the loads it requires.
    /// Any earlier, still-running load of an affected pair becomes stale.
    pub fn dispatch(&mut self, change: SelectionChange) -> Vec<Load> {
        debug!(change = change.name(), "dispatching selection change");
        match change {
            SelectionChange::Dataset(dataset) => {
                self.selection.dataset = dataset;
                let mut loads =
                    vec![self.plan_primary_manifest(self.selection.storm_type.clone())];
                loads.extend(self.plan_pair(PanelPair::Comparison));
                loads
            }
            SelectionChange::StormType(storm_type) => {
                let storm_type = storm_type.trim().to_ascii_lowercase();
                if self.index_is_current() && !self.index.contains(&storm_type) {
                    warn!(storm_type = %storm_type, "ignoring storm type absent from manifest");
                    return Vec::new();
                }
                self.selection.storm_type = Some(storm_type);
                self.plan_pair(PanelPair::Primary)
            }
            SelectionChange::Method(method) => {
                self.selection.method = method;
                self.plan_pair(PanelPair::Comparison)
            }
            SelectionChange::Cohort(cohort) => {
                self.selection.cohort = cohort;
                self.plan_pair(PanelPair::Comparison)
            }
            SelectionChange::Refresh => {
                vec![self.plan_primary_manifest(self.selection.storm_type.clone())]
            }
            SelectionChange::RefreshComparison => self.plan_pair(PanelPair::Comparison),
        }
    }

    /// Installs one outcome unless its pair was re-triggered or the selection
    /// it was planned for has changed since.
    pub fn apply(&mut self, outcome: LoadOutcome) -> ApplyReport {
        let pair = outcome.pair;
        let current = PairSnapshot::capture(pair, &self.selection);
        if outcome.generation != self.generation(pair) || outcome.snapshot != current {
            warn!(
                ?pair,
                generation = outcome.generation,
                latest = self.generation(pair),
                "discarding stale outcome"
            );
            return ApplyReport::discarded();
        }

        let generation = outcome.generation;
        match outcome.result {
            LoadResult::Manifest(update) => {
                ApplyReport::applied(self.apply_manifest(generation, update))
            }
            LoadResult::Series { panel, result } => {
                ApplyReport::applied(self.apply_series(generation, outcome.snapshot, panel, result))
            }
            LoadResult::Summary {
                panel,
                slug,
                summary,
            } => {
                if self.apply_summary(panel, &slug, summary) {
                    ApplyReport::applied(Vec::new())
                } else {
                    debug!(?panel, slug = %slug, "summary no longer matches the drawn chart");
                    ApplyReport::discarded()
                }
            }
        }
    }

    /// Image of the chart currently bound to `panel`, if any.
    pub fn export(&self, panel: PanelId) -> Result<Option<ExportedChart>> {
        self.charts
            .export(panel, &export_file_name(panel, self.selection.dataset))
    }

    async fn drive(
        &mut self,
        loads: Vec<Load>,
        gate_on_manifest: bool,
    ) -> Result<Vec<ApplyStatus>, ViewerError> {
        let gateway = Arc::clone(&self.gateway);
        let run = |load: Load| {
            let gateway = Arc::clone(&gateway);
            async move { load.run(gateway.as_ref()).await }
        };
        let mut pending: FuturesUnordered<_> = loads.into_iter().map(&run).collect();

        let mut gated = gate_on_manifest;
        let mut held = Vec::new();
        let mut statuses = Vec::new();
        while let Some(outcome) = pending.next().await {
            if gated {
                if let Some(err) = outcome.manifest_error() {
                    return Err(ViewerError::InitialManifest(err.clone()));
                }
                if !outcome.is_manifest() {
                    held.push(outcome);
                    continue;
                }
                gated = false;
            }

            let ready: Vec<LoadOutcome> = std::iter::once(outcome).chain(held.drain(..)).collect();
            for outcome in ready {
                let report = self.apply(outcome);
                statuses.push(report.status);
                pending.extend(report.follow_ups.into_iter().map(&run));
            }
        }
        Ok(statuses)
    }

    fn apply_manifest(&mut self, generation: u64, update: ManifestUpdate) -> Vec<Load> {
        self.index_for = Some((self.selection.dataset, self.selection.corpus));
        match update {
            ManifestUpdate::Loaded { index, storm_type } => {
                self.index = index;
                self.selection.storm_type = storm_type;
                info!(
                    dataset = %self.selection.dataset,
                    storm_type = self.selection.storm_type.as_deref().unwrap_or("-"),
                    storm_types = self.index.storm_types().len(),
                    "manifest installed"
                );

                let snapshot = PairSnapshot::capture(PanelPair::Primary, &self.selection);
                let requests = primary_requests(
                    &self.index,
                    self.selection.storm_type.as_deref(),
                    self.selection.dataset,
                    &self.pair_paths(PanelPair::Primary),
                );
                series_loads(PanelPair::Primary, generation, snapshot, requests)
            }
            ManifestUpdate::Failed(err) => {
                self.index = ManifestIndex::default();
                self.selection.storm_type = None;
                for panel in PanelId::of_pair(PanelPair::Primary) {
                    self.apply_panel(panel, PanelResult::LoadFailed(err.clone()));
                    self.refresh_panel(panel);
                }
                Vec::new()
            }
        }
    }

    fn apply_series(
        &mut self,
        generation: u64,
        snapshot: PairSnapshot,
        panel: PanelId,
        result: PanelResult,
    ) -> Vec<Load> {
        let slug = match &result {
            PanelResult::Loaded(bundle) => Some(bundle.slug.clone()),
            _ => None,
        };
        self.apply_panel(panel, result);
        self.refresh_panel(panel);
        info!(
            ?panel,
            generation,
            phase = ?self.panels[panel.index()].phase,
            "panel updated"
        );

        let pair = panel.pair();
        slug.map(|slug| Load {
            pair,
            generation,
            snapshot,
            work: LoadWork::Summary {
                panel,
                paths: self.pair_paths(pair),
                slug,
            },
        })
        .into_iter()
        .collect()
    }

    /// Writes the DiD fields if the panel still shows the chart the summary
    /// belongs to.
    fn apply_summary(&mut self, panel: PanelId, slug: &str, summary: SummaryOutcome) -> bool {
        let state = &mut self.panels[panel.index()];
        if state.phase != PanelPhase::Rendered || state.slug.as_deref() != Some(slug) {
            return false;
        }
        SummaryView::new(summary.document()).write_to(&mut self.sink, binding(panel).summary_prefix);
        state.summary = match summary {
            SummaryOutcome::Present(doc) => Some(doc),
            SummaryOutcome::Absent => None,
        };
        true
    }

    fn apply_panel(&mut self, panel: PanelId, result: PanelResult) {
        let bound = binding(panel);
        let state = &mut self.panels[panel.index()];

        match result {
            PanelResult::Loaded(bundle) => {
                let title = chart_title(panel, self.selection.dataset, self.selection.cohort);
                self.charts.render(panel, &bundle.chart, &title);
                self.sink.set_hidden(bound.missing_id, true);
                SummaryView::placeholder().write_to(&mut self.sink, bound.summary_prefix);

                *state = PanelState {
                    phase: PanelPhase::Rendered,
                    missing: false,
                    slug: Some(bundle.slug),
                    series: Some(bundle.series),
                    summary: None,
                };
            }
            PanelResult::Missing | PanelResult::LoadFailed(_) => {
                let phase = match &result {
                    PanelResult::LoadFailed(err) => {
                        warn!(?panel, error = %err, "panel failed to load; showing missing indicator");
                        PanelPhase::ErrorDisplayed
                    }
                    _ => PanelPhase::MissingDisplayed,
                };
                self.charts.clear(panel);
                self.sink.set_hidden(bound.missing_id, false);
                SummaryView::placeholder().write_to(&mut self.sink, bound.summary_prefix);

                *state = PanelState {
                    phase,
                    missing: true,
                    ..PanelState::default()
                };
            }
        }
    }

    fn refresh_panel(&mut self, panel: PanelId) {
        refresh_panel_labels(
            &mut self.sink,
            &mut self.charts,
            panel,
            self.selection.dataset,
            self.selection.cohort,
        );
    }

    fn index_is_current(&self) -> bool {
        self.index_for == Some((self.selection.dataset, self.selection.corpus))
    }

    fn pair_paths(&self, pair: PanelPair) -> StudyPaths {
        match pair {
            PanelPair::Primary => self
                .resolver
                .primary(self.selection.dataset, self.selection.corpus),
            PanelPair::Comparison => self.resolver.comparison(self.selection.dataset),
        }
    }

    fn begin(&mut self, pair: PanelPair) -> (u64, PairSnapshot) {
        let slot = pair_slot(pair);
        self.generations[slot] += 1;
        for panel in PanelId::of_pair(pair) {
            self.panels[panel.index()].phase = PanelPhase::Resolving;
        }
        (
            self.generations[slot],
            PairSnapshot::capture(pair, &self.selection),
        )
    }

    fn manifest_filter(&self) -> Option<Method> {
        match self.selection.corpus {
            CorpusVariant::Core => None,
            CorpusVariant::Fema => self.launch.manifest_method,
        }
    }

    fn plan_primary_manifest(&mut self, current: Option<String>) -> Load {
        let (generation, snapshot) = self.begin(PanelPair::Primary);
        Load {
            pair: PanelPair::Primary,
            generation,
            snapshot,
            work: LoadWork::Manifest {
                paths: self.pair_paths(PanelPair::Primary),
                method_filter: self.manifest_filter(),
                current,
                preferred: self.launch.preferred_storm.clone(),
            },
        }
    }

    fn plan_pair(&mut self, pair: PanelPair) -> Vec<Load> {
        if pair == PanelPair::Primary && !self.index_is_current() {
            return vec![self.plan_primary_manifest(self.selection.storm_type.clone())];
        }

        let (generation, snapshot) = self.begin(pair);
        let dataset = self.selection.dataset;
        let paths = self.pair_paths(pair);
        let requests = match pair {
            PanelPair::Primary => primary_requests(
                &self.index,
                self.selection.storm_type.as_deref(),
                dataset,
                &paths,
            ),
            PanelPair::Comparison => dataset.outcome_keys().map(|outcome| PanelRequest {
                slug: Some(comparison_slug(
                    self.selection.method,
                    self.selection.cohort,
                    &self.launch.comparison_category,
                    outcome,
                )),
                paths: paths.clone(),
            }),
        };

        series_loads(pair, generation, snapshot, requests)
    }
}

fn series_loads(
    pair: PanelPair,
    generation: u64,
    snapshot: PairSnapshot,
    requests: [PanelRequest; 2],
) -> Vec<Load> {
    PanelId::of_pair(pair)
        .into_iter()
        .zip(requests)
        .map(|(panel, request)| Load {
            pair,
            generation,
            snapshot: snapshot.clone(),
            work: LoadWork::Series { panel, request },
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
