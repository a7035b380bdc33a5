//! `--switch` arguments parsed into selection changes.

use anyhow::{anyhow, bail, Result};
use viewer_core::SelectionChange;

/// Parses `key=value` (or a bare `refresh` / `refresh-comparison`).
pub fn parse_change(raw: &str) -> Result<SelectionChange> {
    let raw = raw.trim();
    let (key, value) = match raw.split_once('=') {
        Some((key, value)) => (key.trim(), Some(value.trim())),
        None => (raw, None),
    };

    let required = || {
        value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("`{key}` needs a value"))
    };

    let change = match key.to_ascii_lowercase().as_str() {
        "dataset" => SelectionChange::Dataset(required()?.parse()?),
        "storm" | "storm_type" | "storm-type" => {
            SelectionChange::StormType(required()?.to_string())
        }
        "method" => SelectionChange::Method(required()?.parse()?),
        "cohort" => SelectionChange::Cohort(required()?.parse()?),
        "refresh" if value.is_none() => SelectionChange::Refresh,
        "refresh-comparison" | "refresh_comparison" if value.is_none() => {
            SelectionChange::RefreshComparison
        }
        _ => bail!("unrecognized switch `{raw}`"),
    };
    Ok(change)
}
