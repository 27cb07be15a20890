//! ASCII plotting of a method's diagnostics for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! The x axis is `log10(stress)`. Plot elements:
//! - observed increments: `o`
//! - fitted curve: `-`
//! - construction lines: `.`
//! - calculated / recorded pressure: `|` / `:` columns
//! - maximum-curvature point: `*`, inflection: `i`

use crate::domain::MethodDiagnostics;

const LEGEND: &str = "o observed  - fitted  . construction  | calculated pc  : recorded pc  * mcp  i inflection";

/// Render one method's diagnostics.
pub fn render_ascii_plot(diag: &MethodDiagnostics, title: &str, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (s_min, s_max) = stress_range(diag).unwrap_or((1.0, 10.0));
    let (x_min, x_max) = (s_min.log10(), s_max.log10());
    let (y_min, y_max) = y_range(diag).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let frame = Frame {
        x_min,
        x_max,
        y_min,
        y_max,
        width,
        height,
    };
    let mut grid = vec![vec![' '; width]; height];

    let fitted: Vec<(f64, f64)> = diag
        .grid_stress
        .iter()
        .zip(diag.fitted.iter())
        .map(|(&s, &y)| (s.log10(), y))
        .collect();
    draw_polyline(&mut grid, &fitted, &frame, '-');

    for dl in &diag.lines {
        let lo = dl.stress_min.max(s_min);
        let hi = dl.stress_max.min(s_max);
        if !(lo < hi) {
            continue;
        }
        let (a, b) = (lo.log10(), hi.log10());
        draw_polyline(&mut grid, &[(a, dl.line.y_at(a)), (b, dl.line.y_at(b))], &frame, '.');
    }

    for m in &diag.markers {
        let ch = match m.label.as_str() {
            "calculated_pc" => '|',
            "recorded_pc" => ':',
            _ => continue,
        };
        if m.stress < s_min || m.stress > s_max {
            continue;
        }
        let x = frame.map_x(m.stress.log10());
        for row in grid.iter_mut() {
            if row[x] == ' ' {
                row[x] = ch;
            }
        }
    }

    for &(s, y) in &diag.observed {
        if s.is_finite() && s > 0.0 && y.is_finite() {
            grid[frame.map_y(y)][frame.map_x(s.log10())] = 'o';
        }
    }

    for m in &diag.markers {
        let ch = match m.label.as_str() {
            "mcp" => '*',
            "inflection" => 'i',
            _ => continue,
        };
        if let Some(y) = m.y {
            if m.stress >= s_min && m.stress <= s_max {
                grid[frame.map_y(y)][frame.map_x(m.stress.log10())] = ch;
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {title} | stress=[{s_min:.1}, {s_max:.1}] kPa (log) | y=[{y_min:.3}, {y_max:.3}]\n"
    ));
    if let Some(diff) = diag.percent_difference() {
        out.push_str(&crate::plot::difference_caption(diff));
        out.push('\n');
    }
    out.push_str(LEGEND);
    out.push('\n');

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

struct Frame {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
}

impl Frame {
    fn map_x(&self, x: f64) -> usize {
        let u = ((x - self.x_min) / (self.x_max - self.x_min)).clamp(0.0, 1.0);
        (u * (self.width as f64 - 1.0)).round() as usize
    }

    fn map_y(&self, y: f64) -> usize {
        let u = ((y - self.y_min) / (self.y_max - self.y_min)).clamp(0.0, 1.0);
        // y=top is max -> row 0
        (self.height as f64 - 1.0 - (u * (self.height as f64 - 1.0))).round() as usize
    }
}

fn stress_range(diag: &MethodDiagnostics) -> Option<(f64, f64)> {
    let mut min_s = f64::INFINITY;
    let mut max_s = f64::NEG_INFINITY;
    let observed = diag.observed.iter().map(|&(s, _)| s);
    for s in diag.grid_stress.iter().copied().chain(observed) {
        if s.is_finite() && s > 0.0 {
            min_s = min_s.min(s);
            max_s = max_s.max(s);
        }
    }
    if min_s.is_finite() && max_s.is_finite() && max_s > min_s {
        Some((min_s, max_s))
    } else {
        None
    }
}

fn y_range(diag: &MethodDiagnostics) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let observed = diag.observed.iter().map(|&(_, y)| y);
    for y in diag.fitted.iter().copied().chain(observed) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn draw_polyline(grid: &mut [Vec<char>], points: &[(f64, f64)], frame: &Frame, ch: char) {
    let mut prev = None;
    for &(x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let (col, row) = (frame.map_x(x), frame.map_y(y));
        match prev {
            Some((c0, r0)) => draw_line(grid, c0, r0, col, row, ch),
            None if grid[row][col] == ' ' => grid[row][col] = ch,
            None => {}
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish). Only fills empty cells.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
