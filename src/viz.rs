//! Console tables and PNG charts for a report, drawn with Plotters

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::{info, warn};

use crate::category::CategoryRankRow;
use crate::report::Report;
use crate::revenue::MonthlyRevenueRow;
use crate::rfm::{BestCustomerRow, RfmDistributions};
use crate::stats::HistogramBin;

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const DARK_BLUE: RGBColor = RGBColor(0, 95, 163);
const LIGHT_GREEN: RGBColor = RGBColor(144, 238, 144);
const SALMON: RGBColor = RGBColor(250, 128, 114);

/// Bars at or above this share of the panel maximum are highlighted
const HIGHLIGHT_SHARE: f64 = 0.75;

/// Line chart of revenue per month
pub fn plot_monthly_revenue(rows: &[MonthlyRevenueRow], output_path: &Path) -> crate::Result<()> {
    let labels: Vec<String> = rows.iter().map(|r| r.month_label.clone()).collect();
    let max_revenue = rows.iter().map(|r| r.revenue).fold(0.0, f64::max);

    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Monthly Revenue", ("sans-serif", 30))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d((0..rows.len()).into_segmented(), 0f64..upper_bound(max_revenue))?;

    chart
        .configure_mesh()
        .x_desc("Month")
        .y_desc("Revenue")
        .axis_desc_style(("sans-serif", 15))
        .x_label_formatter(&|v| segment_label(v, &labels))
        .draw()?;

    let points: Vec<(SegmentValue<usize>, f64)> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (SegmentValue::CenterOf(i), r.revenue))
        .collect();

    chart.draw_series(LineSeries::new(points.clone(), BLUE.stroke_width(2)))?;
    chart.draw_series(
        points
            .into_iter()
            .map(|point| Circle::new(point, 5, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Recency, frequency and monetary histograms side by side
pub fn plot_rfm_distributions(distributions: &RfmDistributions, output_path: &Path) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, (1500, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((1, 3));
    let panels_data = [
        (&distributions.recency, "Recency", "Days since last purchase", SKY_BLUE),
        (&distributions.frequency, "Frequency", "Items purchased", LIGHT_GREEN),
        (&distributions.monetary, "Monetary", "Total spend", SALMON),
    ];

    for (panel, (bins, title, x_desc, color)) in panels.iter().zip(panels_data) {
        draw_histogram_panel(panel, bins, title, x_desc, color)?;
    }

    root.present()?;
    Ok(())
}

fn draw_histogram_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    bins: &[HistogramBin],
    title: &str,
    x_desc: &str,
    color: RGBColor,
) -> crate::Result<()> {
    if bins.is_empty() {
        return Ok(());
    }
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0);
    let labels: Vec<String> = bins.iter().map(|b| format!("{:.0}", b.lower)).collect();

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d((0..bins.len()).into_segmented(), 0usize..max_count + 1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("Customers")
        .x_labels(6)
        .x_label_formatter(&|v| segment_label(v, &labels))
        .draw()?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(color.filled())
                .margin(1)
                .data(bins.iter().enumerate().map(|(i, b)| (i, b.count))),
        )?;

    Ok(())
}

/// Horizontal bars of the ranked categories, best at the top
pub fn plot_top_categories(rows: &[CategoryRankRow], output_path: &Path) -> crate::Result<()> {
    // the y axis grows upwards, so the best category takes the last segment
    let labels: Vec<String> = rows.iter().rev().map(|r| r.category.clone()).collect();

    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Top Product Categories by Average Review Score", ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(220)
        .build_cartesian_2d(0f64..5.5f64, (0..rows.len()).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc("Average review score")
        .y_desc("Category")
        .axis_desc_style(("sans-serif", 15))
        .y_labels(rows.len().max(1))
        .y_label_formatter(&|v| segment_label(v, &labels))
        .draw()?;

    chart.draw_series(
        Histogram::horizontal(&chart)
            .style(SKY_BLUE.filled())
            .margin(4)
            .data(
                rows.iter()
                    .rev()
                    .enumerate()
                    .map(|(i, r)| (i, r.average_review_score)),
            ),
    )?;

    root.present()?;
    Ok(())
}

/// Three stacked bar panels (recency, frequency, monetary) for the leaderboard
pub fn plot_best_customers(rows: &[BestCustomerRow], output_path: &Path) -> crate::Result<()> {
    let labels: Vec<String> = rows.iter().map(|r| short_id(&r.customer_id)).collect();

    let root = BitMapBackend::new(output_path, (1000, 1500)).into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((3, 1));
    let series: [(&str, Vec<f64>); 3] = [
        ("Top Customers - Recency (days)", rows.iter().map(|r| r.recency as f64).collect()),
        ("Top Customers - Frequency (items)", rows.iter().map(|r| r.frequency as f64).collect()),
        ("Top Customers - Monetary (total spend)", rows.iter().map(|r| r.monetary).collect()),
    ];

    for (panel, (title, values)) in panels.iter().zip(series.iter()) {
        draw_highlighted_bars(panel, title, &labels, values)?;
    }

    root.present()?;
    Ok(())
}

fn draw_highlighted_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    title: &str,
    labels: &[String],
    values: &[f64],
) -> crate::Result<()> {
    let max_value = values.iter().copied().fold(0.0, f64::max);
    let cutoff = max_value * HIGHLIGHT_SHARE;

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..values.len()).into_segmented(), 0f64..upper_bound(max_value))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Customer")
        .x_label_formatter(&|v| segment_label(v, labels))
        .draw()?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style_func(move |_, &value| bar_color(value, cutoff).filled())
                .margin(8)
                .data(values.iter().copied().enumerate()),
        )?;

    Ok(())
}

/// Render every chart of the report into `output_dir`, skipping empty views.
///
/// # Arguments
/// * `report` - Report to draw
/// * `output_dir` - Directory for the PNG files; created when missing
///
/// # Returns
/// Paths of the files written
pub fn render_charts(report: &Report, output_dir: &Path) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    let monthly = output_dir.join("monthly_revenue.png");
    if report.monthly_revenue.is_empty() {
        warn!(chart = %monthly.display(), "no monthly revenue, skipping chart");
    } else {
        plot_monthly_revenue(&report.monthly_revenue, &monthly)?;
        written.push(monthly);
    }

    let distribution = output_dir.join("rfm_distribution.png");
    if report.rfm.is_empty() {
        warn!(chart = %distribution.display(), "no rfm rows, skipping chart");
    } else {
        plot_rfm_distributions(&report.distributions, &distribution)?;
        written.push(distribution);
    }

    let categories = output_dir.join("top_categories.png");
    if report.top_categories.is_empty() {
        warn!(chart = %categories.display(), "no categories, skipping chart");
    } else {
        plot_top_categories(&report.top_categories, &categories)?;
        written.push(categories);
    }

    let best = output_dir.join("best_customers.png");
    if report.best_customers.is_empty() {
        warn!(chart = %best.display(), "no best customers, skipping chart");
    } else {
        plot_best_customers(&report.best_customers, &best)?;
        written.push(best);
    }

    for path in &written {
        info!(chart = %path.display(), "chart saved");
    }
    Ok(written)
}

/// Print the four views to stdout
pub fn print_report(report: &Report) {
    println!("\n=== Monthly Revenue ===");
    println!("  {:<16} | {:>6} | {:>14}", "Month", "Orders", "Revenue");
    println!("  {:-<16}-|-{:->6}-|-{:->14}", "", "", "");
    for row in &report.monthly_revenue {
        println!(
            "  {:<16} | {:>6} | {:>14.2}",
            row.month_label, row.order_count, row.revenue
        );
    }

    println!("\n=== Customer Purchase Patterns (last window) ===");
    println!("Customers: {}", report.rfm.len());
    print_distribution("Recency", &report.distributions.recency);
    print_distribution("Frequency", &report.distributions.frequency);
    print_distribution("Monetary", &report.distributions.monetary);

    println!("\n=== Top Categories by Average Review Score ===");
    println!("  {:<4} | {:<32} | {:>9} | {:>7}", "Rank", "Category", "Avg score", "Reviews");
    println!("  {:-<4}-|-{:-<32}-|-{:->9}-|-{:->7}", "", "", "", "");
    for (i, row) in report.top_categories.iter().enumerate() {
        println!(
            "  {:<4} | {:<32} | {:>9.3} | {:>7}",
            i + 1,
            row.category,
            row.average_review_score,
            row.total_reviews
        );
    }

    println!("\n=== Best Customers ===");
    if let Some(t) = &report.thresholds {
        println!(
            "Thresholds: recency <= {:.2}, frequency >= {:.2}, monetary >= {:.2}",
            t.recency_p25, t.frequency_p75, t.monetary_p75
        );
    }
    println!("  {:<32} | {:>7} | {:>9} | {:>12}", "Customer", "Recency", "Frequency", "Monetary");
    println!("  {:-<32}-|-{:->7}-|-{:->9}-|-{:->12}", "", "", "", "");
    for row in &report.best_customers {
        println!(
            "  {:<32} | {:>7} | {:>9} | {:>12.2}",
            row.customer_id, row.recency, row.frequency, row.monetary
        );
    }

    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }
}

fn print_distribution(name: &str, bins: &[HistogramBin]) {
    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
        println!("  {:<9}: no data", name);
        return;
    };
    let peak = bins.iter().max_by_key(|b| b.count).unwrap_or(first);
    println!(
        "  {:<9}: range {:.2}..{:.2}, most common {:.2}..{:.2} ({} customers)",
        name, first.lower, last.upper, peak.lower, peak.upper, peak.count
    );
}

fn segment_label(value: &SegmentValue<usize>, labels: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => labels.get(*i).cloned().unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

fn bar_color(value: f64, cutoff: f64) -> RGBColor {
    if value >= cutoff {
        DARK_BLUE
    } else {
        SKY_BLUE
    }
}

/// Headroom above the largest value; a flat zero series still gets a unit axis
fn upper_bound(max_value: f64) -> f64 {
    if max_value > 0.0 {
        max_value * 1.1
    } else {
        1.0
    }
}

fn short_id(customer_id: &str) -> String {
    customer_id.chars().take(8).collect()
}
