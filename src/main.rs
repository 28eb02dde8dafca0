use anyhow::{Context, Result};
use cre_toolkit::analysis::deflator::InflationDeflator;
use cre_toolkit::analysis::occupancy::occupancy_trend;
use cre_toolkit::analysis::pipeline::{
    slice_requests, BatchReport, SliceOutcome, UtilizationPipeline,
};
use cre_toolkit::analysis::relative_rent::relative_rents;
use cre_toolkit::chart::{occupancy_trend_path, relative_rent_path, BitmapRenderer, ChartRenderer};
use cre_toolkit::config::{Config, DEFAULT_CONFIG_PATH};
use cre_toolkit::data::loader::DataLoader;
use cre_toolkit::data::Sources;
use cre_toolkit::types::{ChartVariant, RentKind};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    let config_arg = env::args().nth(1);
    let config = Config::from_arg(config_arg.as_deref()).with_context(|| {
        format!(
            "failed to load configuration from {}",
            config_arg.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
        )
    })?;
    info!(markets = config.markets.len(), "configuration ready");

    println!("Loading data from: {}", config.data.panel_path.display());
    let sources = match DataLoader::load_sources(&config.data) {
        Ok(sources) => sources,
        Err(e) => {
            println!("Error loading data: {}", e);
            return Err(e).context("input data could not be read");
        }
    };
    println!(
        "Loaded {} panel rows across {} markets",
        sources.panel.len(),
        DataLoader::get_markets(&sources.panel).len()
    );

    let renderer = BitmapRenderer::new(config.output.width, config.output.height);
    let pipeline = UtilizationPipeline::new(&sources, &config.output.directory, &renderer)
        .with_policy(config.join_policy())
        .with_deflator(InflationDeflator::new(config.defaults.base_index));
    println!("Writing charts to: {}", pipeline.output_dir().display());

    let mut variants = Vec::new();
    if config.charts.utilization {
        variants.push(ChartVariant::Standard);
    }
    if config.charts.adjusted_utilization {
        variants.push(ChartVariant::Adjusted);
    }

    for variant in variants {
        let requests = slice_requests(&config.markets, &config.quality_tiers, variant);
        println!(
            "\nStarting to generate {} {:?} visualizations...",
            requests.len(),
            variant
        );
        let report = pipeline.run_batch(&requests);
        print_report(&report);
    }

    if config.charts.relative_rents {
        println!("\n=== Relative Rent Comparison ===");
        render_relative_rents(&config, &sources, &renderer);
    }

    if config.charts.occupancy_trend {
        println!("\n=== Occupancy Trend ===");
        let chart = occupancy_trend(&sources.occupancy);
        let path = occupancy_trend_path(&config.output.directory);
        if chart.series.is_empty() {
            println!("No occupancy data to plot");
        } else {
            match renderer.render_occupancy_trend(&chart, &path) {
                Ok(()) => println!("✓ Saved {}", path.display()),
                Err(e) => {
                    error!(error = %e, "occupancy trend failed");
                    println!("✗ Error creating occupancy trend: {}", e);
                }
            }
        }
    }

    Ok(())
}

fn print_report(report: &BatchReport) {
    let total = report.len();
    for (i, item) in report.items.iter().enumerate() {
        println!("[{}/{}] Processing {}", i + 1, total, item.request);
        match &item.result {
            Ok(SliceOutcome::Rendered(path)) => println!("✓ Saved {}", path.display()),
            Ok(SliceOutcome::NoData) => println!(
                "- No data available for {} with premium quality = {}",
                item.request.market,
                item.request.tier.flag()
            ),
            Err(e) => println!("✗ Error processing {}: {}", item.request, e),
        }
    }
    println!(
        "Completed generating visualizations: {} saved, {} without data, {} failed",
        report.succeeded(),
        report.no_data(),
        report.failed()
    );
}

fn render_relative_rents(config: &Config, sources: &Sources, renderer: &BitmapRenderer) {
    let settings = &config.relative_rents;
    for kind in [RentKind::Direct, RentKind::Sublet] {
        let highlighted = match kind {
            RentKind::Direct => &settings.direct_highlights,
            RentKind::Sublet => &settings.sublet_highlights,
        };
        let chart = relative_rents(
            &sources.panel,
            kind,
            settings.tier,
            &config.markets,
            highlighted,
            settings.event_marker.clone(),
            settings.weighting,
        );
        if chart.is_empty() {
            println!("No {} rent data to compare", kind.label().to_lowercase());
            continue;
        }

        let path = relative_rent_path(&config.output.directory, kind);
        match renderer.render_relative_rent(&chart, &path) {
            Ok(()) => println!("✓ Saved {}", path.display()),
            Err(e) => {
                error!(kind = kind.label(), error = %e, "relative rent chart failed");
                println!("✗ Error creating {} rent chart: {}", kind.label(), e);
            }
        }
    }
}
