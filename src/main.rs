//! Bikescope: bike-sharing demand analysis dashboard
//!
//! This is the main entrypoint that hosts the dashboard either interactively
//! (select an analysis, repeat until quit) or for a single `--view`.

use anyhow::Result;
use bikescope::view::ViewData;
use bikescope::{logger, viz, Args, Dashboard, View, ViewReport};
use clap::Parser;
use inquire::InquireError;

const QUIT: &str = "Quit";
const BACK: &str = "Back";

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    logger::init_logging(if args.verbose { "debug" } else { "warn" });

    let dashboard = Dashboard::new(args.cache(), args.settings()?);

    println!("Bike Sharing Demand Analysis Dashboard");
    println!("======================================\n");

    match args.view {
        Some(view) => {
            let report = dashboard.show(view, args.cluster)?;
            print_report(&report);
        }
        None => run_interactive(&dashboard)?,
    }

    Ok(())
}

/// Prompt for analyses until the analyst quits
fn run_interactive(dashboard: &Dashboard) -> Result<()> {
    // Surface unreadable input before the first prompt
    let data = dashboard.data()?;
    println!(
        "Loaded {} days and {} hourly rows\n",
        data.daily.len(),
        data.hourly.len()
    );

    loop {
        let mut options: Vec<&str> = View::ALL.iter().map(|v| v.label()).collect();
        options.push(QUIT);

        let choice = match inquire::Select::new("Select Analysis Type", options).prompt() {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };
        if choice == QUIT {
            break;
        }

        let view: View = choice.parse()?;
        match dashboard.show(view, None) {
            Ok(report) => {
                print_report(&report);
                if let ViewData::Clustering(clusters) = &report.data {
                    explore_clusters(clusters)?;
                }
            }
            Err(e) => eprintln!("error: {e:#}\n"),
        }
    }

    Ok(())
}

/// Sub-selector showing per-cluster statistics
fn explore_clusters(clusters: &bikescope::view::ClusterView) -> Result<()> {
    let labels: Vec<String> = clusters
        .available_clusters()
        .iter()
        .map(|c| c.to_string())
        .collect();

    loop {
        let mut options: Vec<&str> = labels.iter().map(String::as_str).collect();
        options.push(BACK);

        let choice = match inquire::Select::new("Select Cluster to Analyze", options).prompt() {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };
        if choice == BACK {
            break;
        }

        let cluster: usize = choice.parse()?;
        viz::print_cluster_describe(&clusters.stats(cluster)?);
        println!();
    }

    Ok(())
}

fn print_report(report: &ViewReport) {
    println!("=== {} ===", report.view.heading());
    viz::print_view_summary(&report.data);

    println!("\nCharts:");
    for chart in &report.charts {
        println!("  {}", chart.display());
    }
    println!();
}
