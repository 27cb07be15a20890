//! SVG figures rendered with Plotters.
//!
//! Figures are drawn from already-computed diagnostics; a rendering failure is
//! reported to the caller and has no effect on any computed pressure.
//!
//! In troubleshoot mode a second panel below the construction shows the slope,
//! second derivative and curvature of the fitted curve, with the first inflection
//! as a vertical line.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::{ConsolidationTest, MethodDiagnostics};
use crate::error::AppError;
use crate::math::log_space;
use crate::plot::difference_caption;

/// Pixel size of every figure.
pub const FIGURE_SIZE: (u32, u32) = (900, 600);
/// Construction plus derivative panel.
pub const TROUBLESHOOT_SIZE: (u32, u32) = (900, 1200);

const STRESS_LABEL: &str = "Effective Stress, σ' [kPa]";

/// Render one method's construction to `path`.
pub fn write_method_svg(path: &Path, diag: &MethodDiagnostics, title: &str, troubleshoot: bool) -> Result<(), AppError> {
    draw_method(path, diag, title, troubleshoot)
        .map_err(|e| AppError::new(2, format!("Failed to render '{}': {e}", path.display())))
}

/// Render the raw `e`–`log σ` path of a test (all increments, chronological).
pub fn write_raw_svg(path: &Path, test: &ConsolidationTest) -> Result<(), AppError> {
    draw_raw(path, test).map_err(|e| AppError::new(2, format!("Failed to render '{}': {e}", path.display())))
}

fn draw_method(path: &Path, diag: &MethodDiagnostics, title: &str, troubleshoot: bool) -> Result<(), Box<dyn Error>> {
    let stresses = diag.grid_stress.iter().copied().chain(diag.observed.iter().map(|&(s, _)| s));
    let x_range = finite_bounds(stresses.filter(|&s| s > 0.0)).ok_or("no positive stress to plot")?;

    if troubleshoot {
        let root = SVGBackend::new(path, TROUBLESHOOT_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let panels = root.split_evenly((2, 1));
        draw_construction(&panels[0], diag, title, x_range)?;
        draw_derivatives(&panels[1], diag, x_range)?;
        root.present()?;
    } else {
        let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        draw_construction(&root, diag, title, x_range)?;
        root.present()?;
    }
    Ok(())
}

fn draw_construction(
    area: &DrawingArea<SVGBackend, Shift>,
    diag: &MethodDiagnostics,
    title: &str,
    (s_min, s_max): (f64, f64),
) -> Result<(), Box<dyn Error>> {
    let ys = diag.fitted.iter().copied().chain(diag.observed.iter().map(|&(_, y)| y));
    let (y_min, y_max) = finite_bounds(ys).ok_or("no finite ordinate to plot")?;
    let (y_min, y_max) = pad(y_min, y_max);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d((s_min..s_max).log_scale(), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(STRESS_LABEL)
        .y_desc(diag.y_space.axis_label())
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.3}"))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            diag.grid_stress.iter().copied().zip(diag.fitted.iter().copied()),
            &BLUE,
        ))?
        .label("fitted curve")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    let palette = [RED, GREEN, MAGENTA, CYAN];
    for (k, dl) in diag.lines.iter().enumerate() {
        let lo = dl.stress_min.max(s_min);
        let hi = dl.stress_max.min(s_max);
        if !(lo < hi) {
            continue;
        }
        let color = palette[k % palette.len()];
        let xs = log_space(lo, hi, 50)?;
        chart
            .draw_series(LineSeries::new(xs.into_iter().map(|s| (s, dl.line.y_at_stress(s))), &color))?
            .label(dl.label.replace('_', " "))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    for m in &diag.markers {
        if !(m.stress >= s_min && m.stress <= s_max) {
            continue;
        }
        let vertical = match m.label.as_str() {
            "calculated_pc" => Some(BLACK),
            "recorded_pc" => Some(RGBColor(255, 140, 0)),
            _ => None,
        };
        if let Some(color) = vertical {
            chart
                .draw_series(LineSeries::new([(m.stress, y_min), (m.stress, y_max)], &color))?
                .label(format!("{} = {:.1} kPa", m.label.replace('_', " "), m.stress))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        } else if let Some(y) = m.y {
            chart
                .draw_series(std::iter::once(Circle::new((m.stress, y), 5, RED.filled())))?
                .label(m.label.as_str())
                .legend(|(x, y)| Circle::new((x + 10, y), 4, RED.filled()));
        }
    }

    chart.draw_series(
        diag.observed
            .iter()
            .filter(|&&(s, y)| s > 0.0 && s.is_finite() && y.is_finite())
            .map(|&p| Circle::new(p, 3, BLACK.filled())),
    )?;

    if let Some(diff) = diag.percent_difference() {
        chart.draw_series(std::iter::once(Text::new(
            difference_caption(diff),
            (s_min * (s_max / s_min).powf(0.02), y_min + 0.04 * (y_max - y_min)),
            ("sans-serif", 16).into_font().color(&BLACK),
        )))?;
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

fn draw_derivatives(
    area: &DrawingArea<SVGBackend, Shift>,
    diag: &MethodDiagnostics,
    (s_min, s_max): (f64, f64),
) -> Result<(), Box<dyn Error>> {
    let series = [
        ("d²y/dx²", &diag.d2, RED),
        ("dy/dx", &diag.d1, BLUE),
        ("curvature", &diag.curvature, GREEN),
    ];
    let values = series.iter().flat_map(|(_, v, _)| v.iter().copied()).chain([0.0]);
    let (y_min, y_max) = finite_bounds(values).ok_or("no finite derivative to plot")?;
    let (y_min, y_max) = pad(y_min, y_max);

    let mut chart = ChartBuilder::on(area)
        .caption("Troubleshoot: derivatives of the fitted curve", ("sans-serif", 18))
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d((s_min..s_max).log_scale(), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(STRESS_LABEL)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()?;

    chart.draw_series(LineSeries::new([(s_min, 0.0), (s_max, 0.0)], &BLACK.mix(0.4)))?;
    for (label, values, color) in series {
        if values.len() != diag.grid_stress.len() {
            continue;
        }
        chart
            .draw_series(LineSeries::new(
                diag.grid_stress.iter().copied().zip(values.iter().copied()),
                &color,
            ))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }
    if let Some(s) = diag.inflection_stress.filter(|s| (s_min..=s_max).contains(s)) {
        chart
            .draw_series(LineSeries::new([(s, y_min), (s, y_max)], &MAGENTA))?
            .label(format!("inflection = {s:.1} kPa"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &MAGENTA));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

fn draw_raw(path: &Path, test: &ConsolidationTest) -> Result<(), Box<dyn Error>> {
    let points: Vec<(f64, f64)> = test
        .increments
        .iter()
        .filter(|inc| inc.stress > 0.0 && inc.stress.is_finite() && inc.void_ratio.is_finite())
        .map(|inc| (inc.stress, inc.void_ratio))
        .collect();
    let (s_min, s_max) = finite_bounds(points.iter().map(|p| p.0)).ok_or("no positive stress to plot")?;
    let (e_min, e_max) = finite_bounds(points.iter().map(|p| p.1)).ok_or("no finite void ratio to plot")?;
    let (e_min, e_max) = pad(e_min, e_max);

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} e-log p", test.label()), ("sans-serif", 22))
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 45)
        .build_cartesian_2d((s_min..s_max).log_scale(), e_min..e_max)?;

    chart
        .configure_mesh()
        .x_desc(STRESS_LABEL)
        .y_desc("Void Ratio, e [-]")
        .x_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))?;
    root.present()?;
    Ok(())
}

fn finite_bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (lo.is_finite() && hi > lo).then_some((lo, hi))
}

fn pad(lo: f64, hi: f64) -> (f64, f64) {
    let p = (hi - lo) * 0.05;
    (lo - p, hi + p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_skip_non_finite_values() {
        let b = finite_bounds([3.0, f64::NAN, 1.0, f64::INFINITY, 2.0].into_iter());
        assert_eq!(b, Some((1.0, 3.0)));
        assert_eq!(finite_bounds([1.0, 1.0].into_iter()), None);
        assert_eq!(finite_bounds(std::iter::empty()), None);
    }

    #[test]
    fn renders_a_method_figure() {
        use crate::methods::{casagrande, fixtures::synthetic_test, PreparedTest};

        let test = synthetic_test();
        let prepared = PreparedTest::prepare(&test).unwrap();
        let diag = casagrande(&prepared, 200, true).unwrap().diagnostics.unwrap();

        let dir = std::env::temp_dir().join(format!("oedpc-svg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let method_path = dir.join("0_SYN-1 Casagrande Method.svg");
        let troubleshoot_path = dir.join("0_SYN-1 Casagrande Method troubleshoot.svg");
        let raw_path = dir.join("0_SYN-1 plot.svg");

        write_method_svg(&method_path, &diag, "0_SYN-1 Casagrande Method", false).unwrap();
        write_method_svg(&troubleshoot_path, &diag, "0_SYN-1 Casagrande Method", true).unwrap();
        write_raw_svg(&raw_path, &test).unwrap();

        let svg = std::fs::read_to_string(&method_path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("% difference from calculated value"));
        assert!(!svg.contains("Troubleshoot"));

        let svg = std::fs::read_to_string(&troubleshoot_path).unwrap();
        assert!(svg.contains("Troubleshoot"));
        assert!(svg.contains("curvature"));
        assert!(std::fs::metadata(&raw_path).unwrap().len() > 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
