//! Chart rendering with Plotters and terminal tables for each view

use crate::analysis::{DayTypeUsage, HourlyMean, HourlyProfile, Summary, UserType, UserTypeCount};
use crate::data::DayType;
use crate::view::{ClusterStats, ClusterView, TrendPoint, View, ViewData, WeatherPanel};
use chrono::{Duration, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Color palette for series and clusters
const SERIES_COLORS: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(23, 190, 207),
];

const WIDE: (u32, u32) = (1500, 700);
const GRID: (u32, u32) = (1500, 1000);
const SQUARE: (u32, u32) = (1000, 600);

const USERS_AXIS: &str = "Number of Bike Users";
const MEAN_USERS_AXIS: &str = "Average Number of Bike Users";

fn series_color(index: usize) -> RGBColor {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

/// Render every chart of a view into `output_dir`
///
/// # Returns
/// * Paths of the PNG files written, in display order
pub fn render_view(view: View, data: &ViewData, output_dir: &Path) -> crate::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let path = |suffix: &str| -> PathBuf {
        if suffix.is_empty() {
            output_dir.join(format!("{}.png", view.slug()))
        } else {
            output_dir.join(format!("{}_{}.png", view.slug(), suffix))
        }
    };

    let written = match data {
        ViewData::Trend(points) => {
            let out = path("");
            render_trend(points, &out)?;
            vec![out]
        }
        ViewData::WeatherImpact(panels) => {
            let out = path("");
            render_weather_grid(panels, &out)?;
            vec![out]
        }
        ViewData::UserTypePatterns {
            by_user_type,
            by_day_type,
        } => {
            let first = path("");
            let second = path("day_type");
            render_user_types(by_user_type, &first)?;
            render_user_day_types(by_day_type, &second)?;
            vec![first, second]
        }
        ViewData::HourlyUsage {
            overall,
            by_day_type,
            by_weather,
        } => {
            let all = path("");
            let days = path("day_type");
            let weather = path("weather");

            let overall = [HourlyProfile {
                key: "All days",
                means: overall.clone(),
            }];
            render_hourly("Average Hourly Bike Usage Across All Days", &overall, &all)?;
            render_hourly("Average Hourly Bike Usage: Weekday vs Weekend", by_day_type, &days)?;
            render_hourly("Average Hourly Bike Usage by Weather Situation", by_weather, &weather)?;
            vec![all, days, weather]
        }
        ViewData::Clustering(clusters) => {
            let out = path("");
            render_clusters(clusters, &out)?;
            vec![out]
        }
    };

    for chart in &written {
        debug!(path = %chart.display(), "chart written");
    }
    Ok(written)
}

/// Day-index x axis shared by the date charts
struct DateAxis {
    origin: NaiveDate,
    span: f64,
}

impl DateAxis {
    fn new<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        let mut dates = dates.into_iter();
        let Some(first) = dates.next() else {
            return Self {
                origin: NaiveDate::MIN,
                span: 1.0,
            };
        };
        let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));

        Self {
            origin: min,
            span: ((max - min).num_days() as f64).max(1.0),
        }
    }

    fn x(&self, date: NaiveDate) -> f64 {
        (date - self.origin).num_days() as f64
    }

    fn label(&self, x: f64) -> String {
        (self.origin + Duration::days(x.round() as i64))
            .format("%Y-%m")
            .to_string()
    }
}

fn upper_bound<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().fold(1.0_f64, f64::max) * 1.1
}

fn legend_line(color: RGBColor) -> impl Fn((i32, i32)) -> PathElement<(i32, i32)> {
    move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
}

fn render_trend(points: &[TrendPoint], output_path: &Path) -> crate::Result<()> {
    let axis = DateAxis::new(points.iter().map(|p| p.date));
    let y_max = upper_bound(points.iter().map(|p| f64::from(p.count)));

    let root = BitMapBackend::new(output_path, SQUARE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily Bike Usage Over Time", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..axis.span, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(USERS_AXIS)
        .x_label_formatter(&|x| axis.label(*x))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let color = series_color(0);
    chart
        .draw_series(LineSeries::new(
            points.iter().map(|p| (axis.x(p.date), f64::from(p.count))),
            color.stroke_width(2),
        ))?
        .label("Total Bike Users")
        .legend(legend_line(color));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn render_weather_grid(panels: &[WeatherPanel], output_path: &Path) -> crate::Result<()> {
    let root = BitMapBackend::new(output_path, GRID).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Daily Bike Usage vs. Weather Conditions", ("sans-serif", 30))?;

    for (area, panel) in root.split_evenly((2, 2)).iter().zip(panels) {
        draw_weather_panel(area, panel)?;
    }

    root.present()?;
    Ok(())
}

fn draw_weather_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &WeatherPanel,
) -> crate::Result<()> {
    let x_min = panel.points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = panel.points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let (x_min, x_max) = if x_min.is_finite() && x_max > x_min {
        let pad = (x_max - x_min) * 0.05;
        (x_min - pad, x_max + pad)
    } else {
        (0.0, 1.0)
    };
    let y_max = upper_bound(panel.points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption(panel.factor.title(), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)?;

    chart.configure_mesh().draw()?;

    let color = series_color(0);
    chart
        .draw_series(
            panel
                .points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, color.mix(0.6).filled())),
        )?;

    Ok(())
}

fn render_user_types(rows: &[UserTypeCount], output_path: &Path) -> crate::Result<()> {
    let axis = DateAxis::new(rows.iter().map(|r| r.date));
    let y_max = upper_bound(rows.iter().map(|r| r.count as f64));

    let root = BitMapBackend::new(output_path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily Bike Usage by User Type", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..axis.span, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(USERS_AXIS)
        .x_label_formatter(&|x| axis.label(*x))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, user_type) in UserType::ALL.iter().enumerate() {
        let color = series_color(i);
        chart
            .draw_series(LineSeries::new(
                rows.iter()
                    .filter(|r| r.user_type == *user_type)
                    .map(|r| (axis.x(r.date), r.count as f64)),
                color.mix(0.8).stroke_width(2),
            ))?
            .label(user_type.label())
            .legend(legend_line(color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Weekdays are drawn as solid lines, weekends as thin lines with cross markers
fn render_user_day_types(rows: &[DayTypeUsage], output_path: &Path) -> crate::Result<()> {
    let axis = DateAxis::new(rows.iter().map(|r| r.date));
    let y_max = upper_bound(rows.iter().map(|r| r.count as f64));

    let root = BitMapBackend::new(output_path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Daily Bike Usage by User Type and Day Type", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..axis.span, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(USERS_AXIS)
        .x_label_formatter(&|x| axis.label(*x))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, user_type) in UserType::ALL.iter().enumerate() {
        let color = series_color(i);
        for day_type in DayType::ALL {
            let points: Vec<(f64, f64)> = rows
                .iter()
                .filter(|r| r.user_type == *user_type && r.day_type == day_type)
                .map(|r| (axis.x(r.date), r.count as f64))
                .collect();
            if points.is_empty() {
                continue;
            }

            let label = format!("{} / {}", user_type, day_type);
            match day_type {
                DayType::Weekday => {
                    chart
                        .draw_series(LineSeries::new(points, color.mix(0.8).stroke_width(2)))?
                        .label(label)
                        .legend(legend_line(color));
                }
                DayType::Weekend => {
                    chart.draw_series(LineSeries::new(points.clone(), color.mix(0.5)))?;
                    chart
                        .draw_series(points.into_iter().map(|p| Cross::new(p, 3, color)))?
                        .label(label)
                        .legend(move |(x, y)| Cross::new((x + 10, y), 4, color));
                }
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Point plot of mean usage per hour, one colored series per profile
fn render_hourly<K: Display>(
    title: &str,
    profiles: &[HourlyProfile<K>],
    output_path: &Path,
) -> crate::Result<()> {
    let y_max = upper_bound(profiles.iter().flat_map(|p| p.means.iter().map(|m| m.mean)));

    let root = BitMapBackend::new(output_path, WIDE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..23.5f64, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_labels(24)
        .x_label_formatter(&|x| format!("{:.0}", x))
        .x_desc("Hour of the Day")
        .y_desc(MEAN_USERS_AXIS)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, profile) in profiles.iter().enumerate() {
        let color = series_color(i);
        let points: Vec<(f64, f64)> = profile.means.iter().map(hour_point).collect();

        chart.draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?;
        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 5, color.filled())))?
            .label(profile.key.to_string())
            .legend(legend_line(color));
    }

    if profiles.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn hour_point(mean: &HourlyMean) -> (f64, f64) {
    (f64::from(mean.hour), mean.mean)
}

/// Scatter of usage vs. temperature colored by cluster label
fn render_clusters(view: &ClusterView, output_path: &Path) -> crate::Result<()> {
    let x_max = upper_bound(view.days.iter().map(|d| f64::from(d.count)));
    let y_max = upper_bound(view.days.iter().map(|d| d.temp)).max(1.0);

    let root = BitMapBackend::new(output_path, SQUARE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Clustering of Daily Bike Usage", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc(USERS_AXIS)
        .y_desc("Normalized Temperature")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for cluster in view.available_clusters() {
        let color = series_color(cluster);
        chart
            .draw_series(
                view.days
                    .iter()
                    .filter(|d| d.label == cluster)
                    .map(|d| Circle::new((f64::from(d.count), d.temp), 4, color.filled())),
            )?
            .label(format!("Cluster {}", cluster))
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Print the textual part of a view to stdout
pub fn print_view_summary(data: &ViewData) {
    match data {
        ViewData::Trend(points) => {
            let peak = points.iter().max_by_key(|p| p.count);
            let total: u64 = points.iter().map(|p| u64::from(p.count)).sum();
            println!("Days: {}", points.len());
            println!("Total rentals: {}", total);
            if let Some(peak) = peak {
                println!("Busiest day: {} ({} users)", peak.date, peak.count);
            }
        }
        ViewData::WeatherImpact(panels) => {
            println!("  {:<32} | {:>12}", "Factor", "Correlation");
            println!("  {:-<32}-|-{:->12}", "", "");
            for panel in panels {
                let r = panel
                    .correlation
                    .map(|r| format!("{:.3}", r))
                    .unwrap_or_else(|| "n/a".to_string());
                println!("  {:<32} | {:>12}", panel.factor.title(), r);
            }
        }
        ViewData::UserTypePatterns { by_user_type, .. } => {
            for user_type in UserType::ALL {
                let total: u64 = by_user_type
                    .iter()
                    .filter(|r| r.user_type == user_type)
                    .map(|r| r.count)
                    .sum();
                println!("Total {} users: {}", user_type, total);
            }
        }
        ViewData::HourlyUsage { overall, .. } => {
            if let Some(peak) = overall.iter().max_by(|a, b| a.mean.total_cmp(&b.mean)) {
                println!("Peak hour: {:02}:00 ({:.1} users on average)", peak.hour, peak.mean);
            }
        }
        ViewData::Clustering(view) => {
            print_cluster_statistics(view);
            if let Some(stats) = &view.selected {
                print_cluster_describe(stats);
            }
        }
    }
}

/// Print cluster sizes and centroids
pub fn print_cluster_statistics(view: &ClusterView) {
    let model = &view.model;
    let total = view.days.len();

    println!("\n=== Cluster Statistics ===");
    println!("Number of clusters: {}", model.n_clusters);
    println!("Total days: {}", total);
    println!("Within-cluster sum of squares (Inertia): {:.2}", model.inertia);

    println!("\nCluster sizes:");
    for (i, &size) in model.cluster_sizes().iter().enumerate() {
        let percentage = (size as f64 / total as f64) * 100.0;
        println!("  Cluster {}: {} days ({:.1}%)", i, size, percentage);
    }

    println!("\nCluster centroids (standardized):");
    println!("  Cluster |     cnt |    temp |     hum");
    println!("  --------|---------|---------|---------");
    for (i, centroid) in model.centroids.outer_iter().enumerate() {
        println!(
            "  {:7} | {:7.2} | {:7.2} | {:7.2}",
            i, centroid[0], centroid[1], centroid[2]
        );
    }
}

/// Print a `describe()`-style table for one cluster
pub fn print_cluster_describe(stats: &ClusterStats) {
    println!("\n=== Cluster {} ===", stats.cluster);
    print!("{}", describe_table(stats));
}

/// Rows count/mean/std/min/25%/50%/75%/max, columns cnt/temp/hum
pub fn describe_table(stats: &ClusterStats) -> String {
    let columns: [&Summary; 3] = [&stats.count, &stats.temp, &stats.humidity];
    let rows: [(&str, fn(&Summary) -> f64); 8] = [
        ("count", |s| s.count as f64),
        ("mean", |s| s.mean),
        ("std", |s| s.std),
        ("min", |s| s.min),
        ("25%", |s| s.q25),
        ("50%", |s| s.median),
        ("75%", |s| s.q75),
        ("max", |s| s.max),
    ];

    let mut out = format!("{:<6} {:>12} {:>12} {:>12}\n", "", "cnt", "temp", "hum");
    for (name, value) in rows {
        out.push_str(&format!("{:<6}", name));
        for summary in columns {
            out.push_str(&format!(" {:>12.6}", value(summary)));
        }
        out.push('\n');
    }
    out
}
