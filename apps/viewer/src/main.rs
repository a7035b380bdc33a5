mod commands;
mod config;
mod raster;

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use shared::domain::{Cohort, CorpusVariant, Dataset, Method, PanelId};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use viewer_core::{HttpGateway, PageOutline, PanelSynchronizer, ResourceResolver};

use crate::{commands::parse_change, config::load_settings, raster::RasterBackend};

#[derive(Parser, Debug)]
#[command(about = "Headless event-study viewer")]
struct Args {
    /// Site root holding the `data*` corpus directories (URL or path).
    #[arg(long)]
    data_root: Option<String>,
    #[arg(long, default_value = "viewer.toml")]
    config: PathBuf,
    /// Primary corpus: `core` or `fema`.
    #[arg(long)]
    set: Option<CorpusVariant>,
    /// Manifest method filter for the extended corpus.
    #[arg(long)]
    method: Option<Method>,
    #[arg(long)]
    storm: Option<String>,
    #[arg(long)]
    dataset: Option<Dataset>,
    #[arg(long)]
    comparison_method: Option<Method>,
    #[arg(long)]
    cohort: Option<Cohort>,
    /// Writes a PNG per rendered chart into this directory.
    #[arg(long)]
    export_dir: Option<PathBuf>,
    /// Selection changes applied in order, e.g. `dataset=payday` or `refresh`.
    #[arg(long = "switch")]
    switches: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(root) = args.data_root {
        settings.data_root = root;
    }
    if let Some(set) = args.set {
        settings.set = set;
    }
    if args.method.is_some() {
        settings.manifest_method = args.method;
    }
    if args.storm.is_some() {
        settings.storm = args.storm;
    }
    if let Some(dataset) = args.dataset {
        settings.dataset = dataset;
    }
    if let Some(method) = args.comparison_method {
        settings.comparison_method = method;
    }
    if let Some(cohort) = args.cohort {
        settings.cohort = cohort;
    }
    if args.export_dir.is_some() {
        settings.export_dir = args.export_dir;
    }

    let changes = args
        .switches
        .iter()
        .map(|raw| parse_change(raw))
        .collect::<Result<Vec<_>>>()?;

    let resolver = ResourceResolver::from_root(&settings.data_root)?;
    info!(root = %resolver.root(), "starting viewer");

    let mut sync = PanelSynchronizer::new(
        settings.launch_params(),
        resolver,
        Arc::new(HttpGateway::new()),
        Box::new(RasterBackend::new(settings.chart_width, settings.chart_height)),
        PageOutline::viewer_layout(),
    );

    if let Err(err) = sync.boot().await {
        error!(error = %err, "viewer failed to start");
        return Err(err.into());
    }
    print_page(&sync, "initial");

    for change in changes {
        let name = change.name();
        sync.handle(change).await;
        print_page(&sync, name);
    }

    if let Some(dir) = &settings.export_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating export directory {}", dir.display()))?;
        for panel in PanelId::ALL {
            if let Some(exported) = sync.export(panel)? {
                let path = dir.join(&exported.file_name);
                fs::write(&path, &exported.png)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("exported {}", path.display());
            }
        }
    }

    Ok(())
}

fn print_page(sync: &PanelSynchronizer<PageOutline>, step: &str) {
    let selection = sync.selection();
    println!("== {step} ==");
    println!(
        "dataset={} storm={} method={} cohort={}",
        selection.dataset,
        selection.storm_type.as_deref().unwrap_or("(none)"),
        selection.method,
        selection.cohort
    );
    let options: Vec<String> = sync
        .index()
        .storm_options()
        .into_iter()
        .map(|(key, label)| format!("{key} ({label})"))
        .collect();
    println!("storm types: {}", options.join(", "));
    print!("{}", sync.sink().render_text());
}
