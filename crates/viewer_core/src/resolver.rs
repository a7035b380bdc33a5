//! Maps selections to published document locations. No I/O happens here.

use std::path::Path;

use shared::{
    domain::{Cohort, CorpusVariant, Dataset, Method},
    error::ViewerError,
};
use url::Url;

const PROCESSED_DIR: &str = "processed";
const MANIFEST_FILE: &str = "index.json";
const SERIES_DIR: &str = "event_studies";
const SUMMARY_DIR: &str = "did";
const COMPARISON_SLUG_PREFIX: &str = "fema";

fn corpus_dir(dataset: Dataset, corpus: CorpusVariant) -> &'static str {
    match (dataset, corpus) {
        (Dataset::Evictions, CorpusVariant::Core) => "data",
        (Dataset::Payday, CorpusVariant::Core) => "data_payday",
        (Dataset::Evictions, CorpusVariant::Fema) => "data_fema",
        (Dataset::Payday, CorpusVariant::Fema) => "data_payday_fema",
    }
}

/// Location builder for one corpus directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyPaths {
    processed: Url,
}

impl StudyPaths {
    pub fn manifest(&self) -> Url {
        self.child(&[MANIFEST_FILE])
    }

    pub fn series(&self, slug: &str) -> Url {
        self.child(&[SERIES_DIR, &format!("{slug}.json")])
    }

    pub fn summary(&self, slug: &str) -> Url {
        self.child(&[SUMMARY_DIR, &format!("{slug}.json")])
    }

    fn child(&self, segments: &[&str]) -> Url {
        let mut url = self.processed.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResolver {
    root: Url,
}

impl ResourceResolver {
    pub fn new(root: Url) -> Result<Self, ViewerError> {
        if root.cannot_be_a_base() {
            return Err(ViewerError::InvalidDataRoot {
                root: root.to_string(),
                message: "location cannot hold child paths".into(),
            });
        }
        Ok(Self { root })
    }

    /// Accepts either a URL (`https://…`, `file://…`) or a filesystem directory.
    pub fn from_root(raw: &str) -> Result<Self, ViewerError> {
        let raw = raw.trim();
        if let Ok(url) = Url::parse(raw) {
            if url.scheme().len() > 1 {
                return Self::new(url);
            }
        }

        let path = Path::new(raw);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| ViewerError::InvalidDataRoot {
                    root: raw.to_string(),
                    message: e.to_string(),
                })?
                .join(path)
        };
        let url = Url::from_directory_path(&absolute).map_err(|()| ViewerError::InvalidDataRoot {
            root: raw.to_string(),
            message: "not an absolute directory path".into(),
        })?;
        Self::new(url)
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Paths used by the primary pair, including its manifest.
    pub fn primary(&self, dataset: Dataset, corpus: CorpusVariant) -> StudyPaths {
        self.paths_for(corpus_dir(dataset, corpus))
    }

    /// The comparison pair always reads from the extended corpus.
    pub fn comparison(&self, dataset: Dataset) -> StudyPaths {
        self.paths_for(corpus_dir(dataset, CorpusVariant::Fema))
    }

    fn paths_for(&self, dir: &str) -> StudyPaths {
        let mut processed = self.root.clone();
        if let Ok(mut path) = processed.path_segments_mut() {
            path.pop_if_empty().extend([dir, PROCESSED_DIR]);
        }
        StudyPaths { processed }
    }
}

/// Comparison studies are not listed in a manifest; their slug is composed
/// from the selection.
pub fn comparison_slug(method: Method, cohort: Cohort, category: &str, outcome: &str) -> String {
    let cohort_suffix = match cohort {
        Cohort::Fema => "",
        Cohort::NoFema => "nofema_",
    };
    format!("{COMPARISON_SLUG_PREFIX}_{method}_{cohort_suffix}{category}_{outcome}")
}
