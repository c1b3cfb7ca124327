// src/charts.rs

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::correlation::CorrelationMatrix;
use crate::models::{AnalysisError, Symbol};
use crate::pipeline::AnalysisReport;

const WIDTH: i32 = 720;
const HEIGHT: i32 = 400;
const PADDING: f64 = 40.0;
const LABEL_WIDTH: f64 = 90.0;
const TITLE_HEIGHT: f64 = 28.0;
const PALETTE: [&str; 8] = [
    "#348dc1", "#ff9933", "#4fa487", "#af4b64", "#8c6bb1", "#e3b505", "#5c5c5c", "#2ec4b6",
];

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn svg_header(width: i32, height: i32, title: &str) -> String {
    format!(
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#444}}</style><rect width="100%" height="100%" fill="#ffffff" /><text x="{cx:.2}" y="20" text-anchor="middle" font-size="14" fill="#222">{title}</text>"##,
        w = width,
        h = height,
        cx = width as f64 / 2.0,
        title = escape(title)
    )
}

fn svg_footer() -> &'static str {
    "</svg>\n"
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut min_v, mut max_v) = (0.0_f64, 0.0_f64);
    for v in values.filter(|v| v.is_finite()) {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        max_v = min_v + 1.0;
    }
    (min_v, max_v)
}

// One bar per asset, smallest at the bottom; zero sits on its own axis line
pub fn horizontal_bar_chart(title: &str, axis_label: &str, rows: &[(Symbol, f64)], color: &str) -> String {
    let width = WIDTH as f64;
    let height = HEIGHT as f64;

    let mut sorted: Vec<&(Symbol, f64)> = rows.iter().filter(|(_, v)| v.is_finite()).collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut svg = svg_header(WIDTH, HEIGHT, title);
    if sorted.is_empty() {
        svg.push_str(svg_footer());
        return svg;
    }

    let (min_v, max_v) = extent(sorted.iter().map(|(_, v)| *v));
    let left = PADDING + LABEL_WIDTH;
    let right = width - PADDING;
    let top = PADDING + TITLE_HEIGHT / 2.0;
    let bottom = height - PADDING;
    let scale_x = |v: f64| left + (v - min_v) / (max_v - min_v) * (right - left);
    let zero_x = scale_x(0.0);

    let slot = (bottom - top) / sorted.len() as f64;
    let bar_height = slot * 0.7;

    // Vertical grid at five evenly spaced values
    for i in 0..=4 {
        let value = min_v + (max_v - min_v) * i as f64 / 4.0;
        let x = scale_x(value);
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#dddddd" stroke-width="0.5" /><text x="{x:.2}" y="{ty:.2}" text-anchor="middle">{value:.2}</text>"##,
            x = x,
            y1 = top,
            y2 = bottom,
            ty = bottom + 14.0,
            value = value
        ));
    }

    for (i, (symbol, value)) in sorted.iter().enumerate() {
        let y = top + i as f64 * slot + (slot - bar_height) / 2.0;
        let x_value = scale_x(*value);
        let (x, w) = if x_value < zero_x {
            (x_value, zero_x - x_value)
        } else {
            (zero_x, x_value - zero_x)
        };
        svg.push_str(&format!(
            r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{color}" />"#,
            x = x,
            y = y,
            w = w,
            h = bar_height,
            color = color
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end">{label}</text>"#,
            x = left - 6.0,
            y = y + bar_height / 2.0 + 4.0,
            label = escape(symbol)
        ));
    }

    svg.push_str(&format!(
        r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#000" stroke-width="1" />"##,
        x = zero_x,
        y1 = top,
        y2 = bottom
    ));
    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
        x = (left + right) / 2.0,
        y = height - 8.0,
        label = escape(axis_label)
    ));

    svg.push_str(svg_footer());
    svg
}

// One polyline per asset over the shared return dates, labelled by month
pub fn cumulative_line_chart(title: &str, dates: &[NaiveDate], paths: &BTreeMap<Symbol, Vec<f64>>) -> String {
    let width = WIDTH as f64;
    let height = HEIGHT as f64;

    let mut svg = svg_header(WIDTH, HEIGHT, title);
    if dates.is_empty() || paths.is_empty() {
        svg.push_str(svg_footer());
        return svg;
    }

    let (min_v, max_v) = extent(paths.values().flat_map(|p| p.iter().copied()));
    let left = PADDING;
    let right = width - PADDING - LABEL_WIDTH;
    let top = PADDING;
    let bottom = height - PADDING;
    let scale_y = |v: f64| top + (1.0 - (v - min_v) / (max_v - min_v)) * (bottom - top);
    let step = if dates.len() > 1 {
        (right - left) / (dates.len() - 1) as f64
    } else {
        0.0
    };

    // Month boundaries
    let mut last_month = None;
    for (idx, date) in dates.iter().enumerate() {
        let key = (date.year(), date.month());
        if last_month == Some(key) {
            continue;
        }
        last_month = Some(key);
        let x = left + idx as f64 * step;
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#eeeeee" stroke-width="0.5" />"##,
            x = x,
            y1 = top,
            y2 = bottom
        ));
        if date.month() % 3 == 1 {
            svg.push_str(&format!(
                r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
                x = x,
                y = bottom + 14.0,
                label = date.format("%Y-%m")
            ));
        }
    }

    svg.push_str(&format!(
        r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#000" stroke-width="1" /><text x="{tx:.2}" y="{ty:.2}" text-anchor="end">0%</text>"##,
        x1 = left,
        x2 = right,
        y = scale_y(0.0),
        tx = left - 4.0,
        ty = scale_y(0.0) + 4.0
    ));

    for (i, (symbol, path)) in paths.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let coords: Vec<String> = path
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(idx, v)| format!("{:.2},{:.2}", left + idx as f64 * step, scale_y(*v)))
            .collect();
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{points}" />"#,
            color = color,
            points = coords.join(" ")
        ));

        // Legend on the right
        let ly = top + 14.0 * i as f64;
        svg.push_str(&format!(
            r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="2" /><text x="{tx:.2}" y="{ty:.2}">{label}</text>"#,
            x1 = right + 8.0,
            x2 = right + 24.0,
            y = ly,
            color = color,
            tx = right + 28.0,
            ty = ly + 4.0,
            label = escape(symbol)
        ));
    }

    svg.push_str(svg_footer());
    svg
}

// Blue for -1 through white at 0 to red for +1
fn diverging_color(value: f64) -> (f64, f64, f64) {
    let t = value.clamp(-1.0, 1.0).abs();
    let (br, bg, bb) = if value >= 0.0 {
        (180.0, 4.0, 38.0)
    } else {
        (59.0, 76.0, 192.0)
    };
    (
        255.0 * (1.0 - t) + br * t,
        255.0 * (1.0 - t) + bg * t,
        255.0 * (1.0 - t) + bb * t,
    )
}

pub fn correlation_heatmap(title: &str, matrix: &CorrelationMatrix) -> String {
    let width = WIDTH as f64;
    let height = HEIGHT as f64;
    let n = matrix.symbols.len();

    let mut svg = svg_header(WIDTH, HEIGHT, title);
    if n == 0 {
        svg.push_str(svg_footer());
        return svg;
    }

    let left = PADDING + LABEL_WIDTH;
    let top = PADDING;
    let bottom_pad = PADDING + 10.0;
    let cell_w = (width - left - PADDING) / n as f64;
    let cell_h = (height - top - bottom_pad) / n as f64;

    for (row, row_symbol) in matrix.symbols.iter().enumerate() {
        let y_top = top + row as f64 * cell_h;
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end">{label}</text>"#,
            x = left - 6.0,
            y = y_top + cell_h / 2.0 + 4.0,
            label = escape(row_symbol)
        ));

        for col in 0..n {
            let value = matrix.values[[row, col]];
            let (r, g, b) = diverging_color(value);
            let x_left = left + col as f64 * cell_w;
            let text_color = if value.abs() > 0.6 { "#ffffff" } else { "#262626" };
            svg.push_str(&format!(
                r##"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="rgb({r:.0},{g:.0},{b:.0})" stroke="#ffffff" /><text x="{tx:.2}" y="{ty:.2}" text-anchor="middle" fill="{color}">{value:.2}</text>"##,
                x = x_left,
                y = y_top,
                w = cell_w,
                h = cell_h,
                r = r,
                g = g,
                b = b,
                tx = x_left + cell_w / 2.0,
                ty = y_top + cell_h / 2.0 + 4.0,
                color = text_color,
                value = value
            ));
        }
    }

    for (col, symbol) in matrix.symbols.iter().enumerate() {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            x = left + (col as f64 + 0.5) * cell_w,
            y = height - bottom_pad + 16.0,
            label = escape(symbol)
        ));
    }

    svg.push_str(svg_footer());
    svg
}

fn write_chart(dir: &Path, name: &str, svg: String) -> Result<PathBuf, AnalysisError> {
    let path = dir.join(name);
    fs::write(&path, svg)?;
    info!(path = %path.display(), "Wrote chart");
    Ok(path)
}

// Renders every chart of the report into `dir`, creating it when missing
pub fn write_charts(report: &AnalysisReport, dir: &Path) -> Result<Vec<PathBuf>, AnalysisError> {
    fs::create_dir_all(dir)?;

    let total_return: Vec<(Symbol, f64)> = report
        .config
        .tickers
        .iter()
        .filter_map(|s| report.cumulative.total_return.get(s).map(|v| (s.clone(), *v)))
        .collect();
    let sharpe_like: Vec<(Symbol, f64)> = report
        .risk_adjusted
        .iter()
        .filter_map(|(s, r)| r.sharpe_like.map(|v| (s.clone(), v)))
        .collect();
    let capm_score: Vec<(Symbol, f64)> = report
        .capm
        .iter()
        .map(|(s, fit)| (s.clone(), fit.score))
        .collect();

    let window = format!("{} to {}", report.cumulative.start, report.cumulative.end);

    let mut written = Vec::with_capacity(5);
    written.push(write_chart(
        dir,
        "total_return.svg",
        horizontal_bar_chart(
            &format!("Cumulative return (%), {}", window),
            "Return (%)",
            &total_return,
            "#87ceeb",
        ),
    )?);
    written.push(write_chart(
        dir,
        "sharpe_like.svg",
        horizontal_bar_chart(
            "Sharpe-like score (annualized)",
            "Sharpe-like",
            &sharpe_like,
            "#2e8b57",
        ),
    )?);
    written.push(write_chart(
        dir,
        "capm_score.svg",
        horizontal_bar_chart("Alpha / Beta score (CAPM)", "Alpha / Beta", &capm_score, "#ff7f50"),
    )?);
    written.push(write_chart(
        dir,
        "cumulative_returns.svg",
        cumulative_line_chart(
            "Daily cumulative return",
            &report.returns.dates,
            &report.cumulative_paths,
        ),
    )?);
    written.push(write_chart(
        dir,
        "correlation.svg",
        correlation_heatmap("Correlation between assets", &report.correlation),
    )?);

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_bar_chart_orders_and_skips_non_finite() {
        let rows = vec![
            ("LOW".to_string(), -5.0),
            ("HIGH".to_string(), 20.0),
            ("NAN".to_string(), f64::NAN),
        ];
        let svg = horizontal_bar_chart("Returns", "Return (%)", &rows, "#87ceeb");

        assert!(svg.starts_with("<?xml"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<rect x=").count(), 2);
        assert!(!svg.contains(">NAN<"));
        // Highest value is drawn first, at the top
        let high = svg.find(">HIGH<").unwrap();
        let low = svg.find(">LOW<").unwrap();
        assert!(high < low);
    }

    #[test]
    fn test_line_chart_has_one_polyline_per_path() {
        let dates: Vec<NaiveDate> = (2..=4)
            .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).expect("valid date"))
            .collect();
        let paths = BTreeMap::from([
            ("A".to_string(), vec![0.01, 0.02, 0.015]),
            ("B".to_string(), vec![-0.01, 0.0, 0.03]),
        ]);

        let svg = cumulative_line_chart("Paths", &dates, &paths);
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains(">2024-01<"));
    }

    #[test]
    fn test_heatmap_has_a_cell_per_pair() {
        let matrix = CorrelationMatrix {
            symbols: vec!["A".to_string(), "B".to_string()],
            values: Array2::from_shape_vec((2, 2), vec![1.0, -0.5, -0.5, 1.0]).unwrap(),
        };

        let svg = correlation_heatmap("Correlation", &matrix);
        assert_eq!(svg.matches("fill=\"rgb(").count(), 4);
        assert!(svg.contains(">-0.50<"));
    }

    #[test]
    fn test_diverging_color_extremes() {
        assert_eq!(diverging_color(0.0), (255.0, 255.0, 255.0));
        assert_eq!(diverging_color(1.0), (180.0, 4.0, 38.0));
        assert_eq!(diverging_color(-1.0), (59.0, 76.0, 192.0));
    }

    #[test]
    fn test_titles_are_escaped() {
        let svg = horizontal_bar_chart("P&L <daily>", "x", &[], "#000");
        assert!(svg.contains("P&amp;L &lt;daily&gt;"));
    }
}
