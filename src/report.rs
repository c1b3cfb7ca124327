// src/report.rs

use std::cmp::Ordering;

use crate::models::Symbol;
use crate::pipeline::AnalysisReport;

fn format_optional(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "undefined".to_string(),
    }
}

// Highest first; undefined values go last; equal values by symbol
fn descending(a: (&Symbol, Option<f64>), b: (&Symbol, Option<f64>)) -> Ordering {
    match (a.1, b.1) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.0.cmp(b.0))
}

fn section(out: &mut String, title: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(title);
    out.push('\n');
}

fn total_return_section(out: &mut String, report: &AnalysisReport) {
    section(
        out,
        &format!(
            "Total return (%), {} to {}:",
            report.cumulative.start, report.cumulative.end
        ),
    );

    let mut rows: Vec<(&Symbol, f64)> = report
        .config
        .tickers
        .iter()
        .filter_map(|s| report.cumulative.total_return.get(s).map(|v| (s, *v)))
        .collect();
    rows.sort_by(|a, b| descending((a.0, Some(a.1)), (b.0, Some(b.1))));

    for (symbol, value) in rows {
        out.push_str(&format!("  {:<12}{:>10.2}\n", symbol, value));
    }
    out.push_str(&format!(
        "Benchmark {} total return (%): {}\n",
        report.config.benchmark,
        format_optional(report.benchmark_return(), 2)
    ));
}

fn sharpe_section(out: &mut String, report: &AnalysisReport) {
    section(out, "Sharpe-like score (annual return / annual volatility):");

    let mut rows: Vec<(&Symbol, Option<f64>)> = report
        .risk_adjusted
        .iter()
        .map(|(s, r)| (s, r.sharpe_like))
        .collect();
    rows.sort_by(|a, b| descending(*a, *b));

    for (symbol, value) in rows {
        out.push_str(&format!("  {:<12}{:>10}\n", symbol, format_optional(value, 4)));
    }

    section(
        out,
        &format!(
            "Best return/volatility asset: {}",
            report.best_asset.as_deref().unwrap_or("none")
        ),
    );
}

fn capm_section(out: &mut String, report: &AnalysisReport) {
    section(out, "Alpha / Beta score (CAPM):");
    out.push_str(&format!(
        "  {:<12}{:>12}{:>10}{:>12}{:>8}\n",
        "Asset", "Alpha", "Beta", "Score", "R²"
    ));

    let mut rows: Vec<_> = report.capm.iter().collect();
    rows.sort_by(|a, b| descending((a.0, Some(a.1.score)), (b.0, Some(b.1.score))));

    for (symbol, fit) in rows {
        out.push_str(&format!(
            "  {:<12}{:>12.6}{:>10.4}{:>12.6}{:>8.4}\n",
            symbol, fit.alpha, fit.beta, fit.score, fit.r_squared
        ));
    }
}

fn ranking_section(out: &mut String, report: &AnalysisReport) {
    section(out, "Composite ranking:");
    out.push_str(&format!(
        "  {:<12}{:>12}{:>12}{:>12}{:>8}{:>8}{:>8}{:>8}{:>8}\n",
        "Asset", "Return %", "Sharpe", "Score", "R²", "Ret#", "Shp#", "CAPM#", "Mean"
    ));

    // Already ordered by mean rank
    for row in &report.ranking {
        out.push_str(&format!(
            "  {:<12}{:>12.2}{:>12}{:>12.6}{:>8.4}{:>8.1}{:>8.1}{:>8.1}{:>8.3}\n",
            row.symbol,
            row.total_return,
            format_optional(row.sharpe_like, 4),
            row.capm_score,
            row.r_squared,
            row.return_rank,
            row.sharpe_rank,
            row.capm_rank,
            row.mean_rank
        ));
    }
}

fn excluded_section(out: &mut String, report: &AnalysisReport) {
    if report.excluded.is_empty() {
        section(out, "Excluded assets: none");
        return;
    }
    section(out, "Excluded assets:");
    for (symbol, reason) in &report.excluded {
        out.push_str(&format!("  {}: {}\n", symbol, reason));
    }
}

// Plain-text report; the same analysis always renders the same text
pub fn render(report: &AnalysisReport) -> String {
    let mut out = String::new();
    total_return_section(&mut out, report);
    sharpe_section(&mut out, report);
    capm_section(&mut out, report);
    ranking_section(&mut out, report);
    excluded_section(&mut out, report);
    out
}
