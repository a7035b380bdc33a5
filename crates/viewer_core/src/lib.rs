//! Selection-to-resource resolution and four-panel synchronization for the
//! event-study viewer.

pub mod chart;
pub mod gateway;
pub mod labels;
pub mod loader;
pub mod manifest;
pub mod page;
pub mod resolver;
pub mod sync;

pub use chart::{ChartBackend, ChartInstance, ChartSlots, ChartSpec, ExportedChart};
pub use gateway::{FetchGateway, HttpGateway};
pub use loader::{PanelResult, SeriesBundle, SummaryOutcome};
pub use manifest::ManifestIndex;
pub use page::{Element, LabelSink, PageOutline};
pub use resolver::ResourceResolver;
pub use sync::{
    ApplyReport, ApplyStatus, LaunchParams, Load, LoadOutcome, PanelPhase, PanelState,
    PanelSynchronizer, Selection, SelectionChange,
};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
