use anesplot_lib::plot::{Color as SeriesColor, Figure, Panel, PlotBackend, Series};
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

/// Renders figures to PNG, one stacked chart per panel.
pub struct PngBackend {
    path: PathBuf,
    size: (u32, u32),
}

impl PngBackend {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            size: (1200, 800),
        }
    }
}

impl PlotBackend for PngBackend {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let area = match &fig.title {
            Some(title) => root.titled(title, ("sans-serif", 22))?,
            None => root.clone(),
        };
        if fig.is_empty() {
            let (w, h) = area.dim_in_pixel();
            area.draw(&Text::new(
                "no data",
                (w as i32 / 2 - 40, h as i32 / 2),
                ("sans-serif", 28).into_font(),
            ))?;
        } else {
            let cells = area.split_evenly((fig.panels.len(), 1));
            for (panel, cell) in fig.panels.iter().zip(cells.iter()) {
                draw_panel(cell, panel)?;
            }
        }
        root.present()?;
        Ok(())
    }
}

fn rgb(color: SeriesColor) -> RGBColor {
    RGBColor(
        ((color.0 >> 16) & 0xFF) as u8,
        ((color.0 >> 8) & 0xFF) as u8,
        (color.0 & 0xFF) as u8,
    )
}

fn finite(points: &[[f64; 2]]) -> impl Iterator<Item = (f64, f64)> + '_ {
    points
        .iter()
        .filter(|p| p[0].is_finite() && p[1].is_finite())
        .map(|p| (p[0], p[1]))
}

/// Min/max of the values, widened when flat.
fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        None
    } else if hi > lo {
        Some((lo, hi))
    } else {
        let pad = lo.abs().max(1.0) * 0.5;
        Some((lo - pad, hi + pad))
    }
}

fn draw_panel(area: &DrawingArea<BitMapBackend<'_>, Shift>, panel: &Panel) -> Result<()> {
    let x = panel.x.range.or_else(|| {
        bounds(
            panel
                .series
                .iter()
                .flat_map(|s| finite(s.points()).map(|p| p.0)),
        )
    });
    let y = panel.y.range.or_else(|| {
        bounds(
            panel
                .series
                .iter()
                .filter(|s| !s.is_secondary())
                .flat_map(|s| finite(s.points()).map(|p| p.1)),
        )
    });
    let (x0, x1) = x.unwrap_or((0.0, 1.0));
    let (y0, y1) = y.unwrap_or((0.0, 1.0));
    let (s0, s1) = panel
        .y2
        .as_ref()
        .and_then(|axis| axis.range)
        .or_else(|| {
            bounds(
                panel
                    .series
                    .iter()
                    .filter(|s| s.is_secondary())
                    .flat_map(|s| finite(s.points()).map(|p| p.1)),
            )
        })
        .unwrap_or((y0, y1));

    let mut builder = ChartBuilder::on(area);
    builder.margin(10).x_label_area_size(35).y_label_area_size(55);
    if panel.y2.is_some() {
        builder.right_y_label_area_size(55);
    }
    if let Some(title) = &panel.title {
        builder.caption(title, ("sans-serif", 18));
    }
    let mut chart = builder
        .build_cartesian_2d(x0..x1, y0..y1)?
        .set_secondary_coord(x0..x1, s0..s1);

    {
        let mut mesh = chart.configure_mesh();
        if let Some(label) = &panel.x.label {
            mesh.x_desc(label);
        }
        if let Some(label) = &panel.y.label {
            mesh.y_desc(label);
        }
        mesh.draw()?;
    }
    if let Some(axis) = &panel.y2 {
        let mut secondary = chart.configure_secondary_axes();
        if let Some(label) = &axis.label {
            secondary.y_desc(label);
        }
        secondary.draw()?;
    }

    for series in &panel.series {
        match series {
            Series::Line(line) => {
                let style = ShapeStyle::from(&rgb(line.style.color))
                    .stroke_width(line.style.width.round().max(1.0) as u32);
                let points = finite(&line.points);
                if line.secondary {
                    chart.draw_secondary_series(LineSeries::new(points, style))?;
                } else {
                    chart.draw_series(LineSeries::new(points, style))?;
                }
            }
            Series::Markers(markers) => {
                let style = rgb(markers.color).filled();
                let radius = markers.radius.round().max(1.0) as u32;
                chart.draw_series(
                    finite(&markers.points).map(|p| Circle::new(p, radius, style)),
                )?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_values_get_padded() {
        assert_eq!(bounds([2.0, 2.0].into_iter()), Some((1.0, 3.0)));
        assert_eq!(bounds([1.0, 4.0, -1.0].into_iter()), Some((-1.0, 4.0)));
        assert_eq!(bounds(std::iter::empty()), None);
    }

    #[test]
    fn colors_split_into_channels() {
        let c = rgb(SeriesColor(0x1F77B4));
        assert_eq!((c.0, c.1, c.2), (0x1F, 0x77, 0xB4));
    }
}
