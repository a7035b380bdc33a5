//! Offscreen chart backend: plotters draws each chart into an RGB buffer and
//! `image` encodes it as PNG.

use std::io::Cursor;

use anyhow::{bail, Context, Result};
use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::{coord::Shift, prelude::*, series::DashedLineSeries};
use shared::domain::PanelId;
use tracing::{trace, warn};
use viewer_core::{ChartBackend, ChartInstance, ChartSpec};

const ESTIMATE: RGBColor = RGBColor(31, 90, 168);
const BOUND: RGBColor = RGBColor(130, 170, 220);
const ZERO_LINE: RGBColor = RGBColor(150, 150, 150);
const REFERENCE_LINE: RGBColor = RGBColor(200, 60, 60);

const MIN_WIDTH: u32 = 160;
const MIN_HEIGHT: u32 = 120;

pub struct RasterBackend {
    width: u32,
    height: u32,
}

impl RasterBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(MIN_WIDTH),
            height: height.max(MIN_HEIGHT),
        }
    }
}

impl ChartBackend for RasterBackend {
    fn create(&mut self, panel: PanelId, spec: &ChartSpec) -> Box<dyn ChartInstance> {
        trace!(?panel, title = %spec.title, points = spec.labels.len(), "creating raster chart");
        Box::new(RasterChart {
            spec: spec.clone(),
            width: self.width,
            height: self.height,
            destroyed: false,
        })
    }
}

pub struct RasterChart {
    spec: ChartSpec,
    width: u32,
    height: u32,
    destroyed: bool,
}

/// A drawn chart. `labelled` is false when no font could be loaded and the
/// caption, axis text and legend were left out.
struct Rendered {
    image: RgbImage,
    labelled: bool,
}

impl ChartInstance for RasterChart {
    fn set_title(&mut self, title: &str) {
        self.spec.title = title.to_string();
    }

    fn update(&mut self) {
        trace!(title = %self.spec.title, "raster chart updated");
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }

    fn export_png(&self) -> Result<Vec<u8>> {
        if self.destroyed {
            bail!("chart `{}` was destroyed", self.spec.title);
        }
        let rendered = self.render()?;
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rendered.image)
            .write_to(&mut out, ImageFormat::Png)
            .context("encoding chart as PNG")?;
        Ok(out.into_inner())
    }
}

impl RasterChart {
    fn render(&self) -> Result<Rendered> {
        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
        let labelled = match self.paint(&mut buffer, true) {
            Ok(()) => true,
            Err(err) => {
                warn!(title = %self.spec.title, error = %err, "drawing chart without text");
                self.paint(&mut buffer, false)?;
                false
            }
        };
        let image = RgbImage::from_raw(self.width, self.height, buffer)
            .context("chart buffer does not match its dimensions")?;
        Ok(Rendered { image, labelled })
    }

    fn paint(&self, buffer: &mut [u8], labelled: bool) -> Result<()> {
        let root = BitMapBackend::with_buffer(buffer, (self.width, self.height)).into_drawing_area();
        draw_chart(root, &self.spec, labelled)
    }
}

fn draw_chart<DB>(root: DrawingArea<DB, Shift>, spec: &ChartSpec, labelled: bool) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let (y_min, y_max) = value_range(spec);
    let x_min = -0.5;
    let x_max = spec.labels.len().max(1) as f64 - 0.5;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(12);
    if labelled {
        builder
            .caption(spec.title.as_str(), ("sans-serif", 18))
            .x_label_area_size(40)
            .y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    if labelled {
        let labels = &spec.labels;
        let tick = |x: &f64| {
            let index = x.round();
            if (x - index).abs() > 1e-6 || index < 0.0 {
                return String::new();
            }
            labels
                .get(index as usize)
                .map(ToString::to_string)
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .bold_line_style(BLACK.mix(0.08))
            .x_labels(labels.len().clamp(2, 12))
            .x_label_formatter(&tick)
            .x_desc(spec.x_axis_title.as_str())
            .y_desc(spec.y_axis_title.as_str())
            .draw()?;
    }

    chart.draw_series(DashedLineSeries::new(
        vec![(x_min, 0.0), (x_max, 0.0)],
        4,
        3,
        ZERO_LINE.stroke_width(1),
    ))?;

    if let Some(position) = spec.reference_position() {
        chart.draw_series(DashedLineSeries::new(
            vec![(position, y_min), (position, y_max)],
            4,
            3,
            REFERENCE_LINE.stroke_width(1),
        ))?;
    }

    // Bounds first so the estimate sits on top.
    for (index, series) in spec.series.iter().enumerate().rev() {
        let color = if index == 0 { ESTIMATE } else { BOUND };
        let style = color.stroke_width(series.style.width.round().max(1.0) as u32);

        for (run, points) in runs(&series.values).into_iter().enumerate() {
            let drawn = match series.style.dash {
                Some([on, off]) => chart.draw_series(DashedLineSeries::new(
                    points,
                    on.round().max(1.0) as u32,
                    off.round().max(1.0) as u32,
                    style,
                ))?,
                None => chart.draw_series(
                    LineSeries::new(points, style)
                        .point_size(series.style.point_radius.round() as u32),
                )?,
            };
            if labelled && run == 0 {
                drawn
                    .label(series.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
            }
        }
    }

    if labelled {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Value range over every series and zero, padded by a tenth.
fn value_range(spec: &ChartSpec) -> (f64, f64) {
    let (mut lo, mut hi) = spec
        .series
        .iter()
        .flat_map(|series| series.values.iter().flatten().copied())
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.1;
    (lo - pad, hi + pad)
}

/// Splits a series at its gaps into runs of `(category index, value)`.
fn runs(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (index, value) in values.iter().enumerate() {
        match value {
            Some(v) => current.push((index as f64, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}
