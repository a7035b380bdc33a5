use std::{fs, path::Path, path::PathBuf};

use serde::Deserialize;
use shared::domain::{Cohort, CorpusVariant, Dataset, Method};
use tracing::warn;
use viewer_core::{sync::DEFAULT_COMPARISON_CATEGORY, LaunchParams};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_root: String,
    pub set: CorpusVariant,
    pub manifest_method: Option<Method>,
    pub storm: Option<String>,
    pub dataset: Dataset,
    pub comparison_method: Method,
    pub cohort: Cohort,
    pub comparison_category: String,
    pub export_dir: Option<PathBuf>,
    pub chart_width: u32,
    pub chart_height: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_root: ".".into(),
            set: CorpusVariant::default(),
            manifest_method: None,
            storm: None,
            dataset: Dataset::default(),
            comparison_method: Method::default(),
            cohort: Cohort::default(),
            comparison_category: DEFAULT_COMPARISON_CATEGORY.into(),
            export_dir: None,
            chart_width: 800,
            chart_height: 450,
        }
    }
}

impl Settings {
    pub fn launch_params(&self) -> LaunchParams {
        LaunchParams {
            dataset: self.dataset,
            corpus: self.set,
            manifest_method: self.manifest_method,
            preferred_storm: self.storm.clone(),
            method: self.comparison_method,
            cohort: self.cohort,
            comparison_category: self.comparison_category.clone(),
        }
    }
}

/// Keys accepted in `viewer.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    data_root: Option<String>,
    set: Option<CorpusVariant>,
    method: Option<Method>,
    storm: Option<String>,
    dataset: Option<Dataset>,
    comparison_method: Option<Method>,
    cohort: Option<Cohort>,
    comparison_category: Option<String>,
    export_dir: Option<PathBuf>,
    chart_width: Option<u32>,
    chart_height: Option<u32>,
}

/// Defaults, then the optional config file, then `APP__*` environment
/// variables. Values that fail to parse are skipped.
pub fn load_settings(config_path: &Path) -> Settings {
    load_with(config_path, |key| std::env::var(key).ok())
}

fn load_with(config_path: &Path, var: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(err) => warn!(path = %config_path.display(), error = %err, "ignoring unreadable config file"),
        }
    }

    apply_env(&mut settings, var);
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.data_root {
        settings.data_root = v;
    }
    if let Some(v) = file_cfg.set {
        settings.set = v;
    }
    if file_cfg.method.is_some() {
        settings.manifest_method = file_cfg.method;
    }
    if file_cfg.storm.is_some() {
        settings.storm = file_cfg.storm;
    }
    if let Some(v) = file_cfg.dataset {
        settings.dataset = v;
    }
    if let Some(v) = file_cfg.comparison_method {
        settings.comparison_method = v;
    }
    if let Some(v) = file_cfg.cohort {
        settings.cohort = v;
    }
    if let Some(v) = file_cfg.comparison_category {
        settings.comparison_category = v;
    }
    if file_cfg.export_dir.is_some() {
        settings.export_dir = file_cfg.export_dir;
    }
    if let Some(v) = file_cfg.chart_width {
        settings.chart_width = v;
    }
    if let Some(v) = file_cfg.chart_height {
        settings.chart_height = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("VIEWER_DATA_ROOT") {
        settings.data_root = v;
    }
    if let Some(v) = var("APP__DATA_ROOT") {
        settings.data_root = v;
    }

    if let Some(Ok(v)) = var("APP__SET").map(|v| v.parse()) {
        settings.set = v;
    }
    if let Some(Ok(v)) = var("APP__METHOD").map(|v| v.parse()) {
        settings.manifest_method = Some(v);
    }
    if let Some(v) = var("APP__STORM") {
        settings.storm = Some(v);
    }
    if let Some(Ok(v)) = var("APP__DATASET").map(|v| v.parse()) {
        settings.dataset = v;
    }
    if let Some(Ok(v)) = var("APP__COMPARISON_METHOD").map(|v| v.parse()) {
        settings.comparison_method = v;
    }
    if let Some(Ok(v)) = var("APP__COHORT").map(|v| v.parse()) {
        settings.cohort = v;
    }
    if let Some(v) = var("APP__COMPARISON_CATEGORY") {
        let v = v.trim().to_ascii_lowercase();
        if !v.is_empty() {
            settings.comparison_category = v;
        }
    }
    if let Some(v) = var("APP__EXPORT_DIR") {
        settings.export_dir = Some(PathBuf::from(v));
    }
    if let Some(Ok(v)) = var("APP__CHART_WIDTH").map(|v| v.parse()) {
        settings.chart_width = v;
    }
    if let Some(Ok(v)) = var("APP__CHART_HEIGHT").map(|v| v.parse()) {
        settings.chart_height = v;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let file_cfg: FileSettings = toml::from_str(
            r#"
            data_root = "https://example.org/viewer/"
            set = "fema"
            method = "psm"
            cohort = "nofema"
            chart_width = 1024
            "#,
        )
        .expect("toml");

        let mut settings = Settings::default();
        apply_file(&mut settings, file_cfg);

        assert_eq!(settings.data_root, "https://example.org/viewer/");
        assert_eq!(settings.set, CorpusVariant::Fema);
        assert_eq!(settings.manifest_method, Some(Method::Psm));
        assert_eq!(settings.cohort, Cohort::NoFema);
        assert_eq!(settings.chart_width, 1024);
        assert_eq!(settings.chart_height, 450);
    }

    #[test]
    fn env_overrides_and_skips_invalid_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("VIEWER_DATA_ROOT", "/legacy"),
            ("APP__DATA_ROOT", "/srv/viewer"),
            ("APP__DATASET", "payday"),
            ("APP__COHORT", "somewhere"),
            ("APP__CHART_HEIGHT", "tall"),
        ]);

        let mut settings = Settings::default();
        apply_env(&mut settings, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.data_root, "/srv/viewer");
        assert_eq!(settings.dataset, Dataset::Payday);
        assert_eq!(settings.cohort, Cohort::Fema);
        assert_eq!(settings.chart_height, 450);
    }

    #[test]
    fn env_overrides_comparison_category() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("APP__COMPARISON_CATEGORY", " Tropical ")]);

        let mut settings = Settings::default();
        apply_env(&mut settings, |key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(settings.comparison_category, "tropical");
        assert_eq!(settings.launch_params().comparison_category, "tropical");

        let blank: HashMap<&str, &str> = HashMap::from([("APP__COMPARISON_CATEGORY", "  ")]);
        let mut settings = Settings::default();
        apply_env(&mut settings, |key| blank.get(key).map(|v| v.to_string()));
        assert_eq!(settings.comparison_category, "hurricane");
    }

    #[test]
    fn unreadable_config_file_falls_back_to_defaults() {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("viewer_config_test_{suffix}.toml"));
        fs::write(&path, "chart_width = \"wide\"").expect("write");

        let settings = load_with(&path, |_| None);
        assert_eq!(settings, Settings::default());

        let missing = load_with(&path.with_extension("absent"), |_| None);
        assert_eq!(missing, Settings::default());
        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn launch_params_mirror_settings() {
        let settings = Settings {
            storm: Some("tropical".into()),
            comparison_method: Method::Psm,
            ..Settings::default()
        };
        let launch = settings.launch_params();
        assert_eq!(launch.preferred_storm.as_deref(), Some("tropical"));
        assert_eq!(launch.method, Method::Psm);
        assert_eq!(launch.comparison_category, "hurricane");
    }
}
