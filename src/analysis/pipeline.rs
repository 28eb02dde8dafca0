use super::deflator::InflationDeflator;
use super::join::{join, select_slice, JoinPolicy};
use super::utilization::{build_utilization_chart, UtilizationChart};
use crate::chart::{utilization_path, ChartError, ChartRenderer};
use crate::data::Sources;
use crate::types::{ChartVariant, QualityTier};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Chart error for {market} ({tier}): {source}")]
    Chart {
        market: String,
        tier: QualityTier,
        #[source]
        source: ChartError,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// One (market, tier, chart variant) unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRequest {
    pub market: String,
    pub tier: QualityTier,
    pub variant: ChartVariant,
}

impl SliceRequest {
    pub fn new(market: impl Into<String>, tier: QualityTier, variant: ChartVariant) -> Self {
        Self {
            market: market.into(),
            tier,
            variant,
        }
    }
}

impl fmt::Display for SliceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.market, self.tier.label())
    }
}

/// Every market crossed with every tier, markets outermost.
pub fn slice_requests(
    markets: &[String],
    tiers: &[QualityTier],
    variant: ChartVariant,
) -> Vec<SliceRequest> {
    markets
        .iter()
        .flat_map(|market| {
            tiers
                .iter()
                .map(move |tier| SliceRequest::new(market.clone(), *tier, variant))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceOutcome {
    Rendered(PathBuf),
    /// The panel has no rows for the requested pair. Not an error.
    NoData,
}

#[derive(Debug)]
pub struct BatchItem {
    pub request: SliceRequest,
    pub result: Result<SliceOutcome>,
}

/// Per-item results of a batch run, in request order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.result, Ok(SliceOutcome::Rendered(_))))
            .count()
    }

    pub fn no_data(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.result, Ok(SliceOutcome::NoData)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_err()).count()
    }
}

/// Select, join, deflate, aggregate and render for one slice at a time.
pub struct UtilizationPipeline<'a, R: ChartRenderer + ?Sized> {
    sources: &'a Sources,
    policy: JoinPolicy,
    deflator: InflationDeflator,
    output_dir: PathBuf,
    renderer: &'a R,
}

impl<'a, R: ChartRenderer + ?Sized> UtilizationPipeline<'a, R> {
    pub fn new(sources: &'a Sources, output_dir: impl AsRef<Path>, renderer: &'a R) -> Self {
        Self {
            sources,
            policy: JoinPolicy::default(),
            deflator: InflationDeflator::default(),
            output_dir: output_dir.as_ref().to_path_buf(),
            renderer,
        }
    }

    pub fn with_policy(mut self, policy: JoinPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_deflator(mut self, deflator: InflationDeflator) -> Self {
        self.deflator = deflator;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Chart data for a slice, or `None` when the panel has no rows for it.
    pub fn prepare(&self, request: &SliceRequest) -> Option<UtilizationChart> {
        let slice = select_slice(&self.sources.panel, &request.market, request.tier);
        if slice.is_empty() {
            return None;
        }

        let joined = join(
            slice,
            &self.sources.inflation,
            &self.sources.occupancy,
            &self.policy,
        );
        let defaulted = joined
            .iter()
            .filter(|row| row.inflation_defaulted || row.occupancy_defaulted)
            .count();
        if defaulted > 0 {
            debug!(
                market = %request.market,
                tier = request.tier.label(),
                defaulted,
                "rows joined with default values"
            );
        }

        let deflated = self.deflator.deflate(joined);
        debug!(
            market = %request.market,
            base = self.deflator.base(),
            quarters = deflated.len(),
            "deflated slice"
        );
        Some(build_utilization_chart(
            &request.market,
            request.tier,
            request.variant,
            &deflated,
        ))
    }

    pub fn run(&self, request: &SliceRequest) -> Result<SliceOutcome> {
        let chart = match self.prepare(request) {
            Some(chart) => chart,
            None => {
                info!(
                    "No data available for {} with premium quality = {}",
                    request.market,
                    request.tier.flag()
                );
                return Ok(SliceOutcome::NoData);
            }
        };

        let path = utilization_path(
            &self.output_dir,
            &request.market,
            request.tier,
            request.variant,
        );
        self.renderer
            .render_utilization(&chart, &path)
            .map_err(|source| PipelineError::Chart {
                market: request.market.clone(),
                tier: request.tier,
                source,
            })?;

        info!(path = %path.display(), quarters = chart.len(), "rendered utilization chart");
        Ok(SliceOutcome::Rendered(path))
    }

    /// Runs each request in order. A failure is recorded against its item
    /// and the batch moves on.
    pub fn run_batch(&self, requests: &[SliceRequest]) -> BatchReport {
        let items = requests
            .iter()
            .map(|request| BatchItem {
                request: request.clone(),
                result: self.run(request),
            })
            .collect();
        BatchReport { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::occupancy::OccupancyTrendChart;
    use crate::analysis::relative_rent::RelativeRentChart;
    use crate::chart;
    use crate::data::{InflationRow, PanelRow};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRenderer {
        paths: RefCell<Vec<PathBuf>>,
        charts: RefCell<Vec<UtilizationChart>>,
        fail_for: Option<String>,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render_utilization(&self, chart: &UtilizationChart, path: &Path) -> chart::Result<()> {
            if self.fail_for.as_deref() == Some(chart.market.as_str()) {
                return Err(ChartError::Drawing("backend unavailable".to_string()));
            }
            self.paths.borrow_mut().push(path.to_path_buf());
            self.charts.borrow_mut().push(chart.clone());
            Ok(())
        }

        fn render_relative_rent(&self, _: &RelativeRentChart, _: &Path) -> chart::Result<()> {
            Ok(())
        }

        fn render_occupancy_trend(&self, _: &OccupancyTrendChart, _: &Path) -> chart::Result<()> {
            Ok(())
        }
    }

    fn panel_row(market: &str, year: i32, quarter: u8, rent: f64) -> PanelRow {
        PanelRow {
            market: market.to_string(),
            year: Some(year),
            quarter: Some(quarter),
            tier: Some(QualityTier::Standard),
            total_space: Some(2_000_000.0),
            available_space: Some(500_000.0),
            direct_available_space: Some(400_000.0),
            sublet_available_space: Some(100_000.0),
            internal_class_rent: Some(rent),
            direct_internal_class_rent: Some(rent),
            sublet_internal_class_rent: None,
        }
    }

    fn sources() -> Sources {
        Sources {
            panel: vec![
                panel_row("Austin", 2020, 1, 50.0),
                panel_row("Austin", 2019, 4, 50.0),
                panel_row("Boston", 2019, 4, 60.0),
            ],
            inflation: vec![
                InflationRow {
                    year: Some(2019),
                    quarter: Some(4),
                    inflation_rate: Some(0.0),
                },
                InflationRow {
                    year: Some(2020),
                    quarter: Some(1),
                    inflation_rate: Some(2.0),
                },
            ],
            occupancy: Vec::new(),
        }
    }

    #[test]
    fn test_slice_requests_cross_product() {
        let markets = vec!["Austin".to_string(), "Boston".to_string()];
        let tiers = [QualityTier::Standard, QualityTier::Premium];
        let requests = slice_requests(&markets, &tiers, ChartVariant::Adjusted);

        assert_eq!(requests.len(), 4);
        assert_eq!(
            requests[1],
            SliceRequest::new("Austin", QualityTier::Premium, ChartVariant::Adjusted)
        );
        assert_eq!(requests[2].to_string(), "Boston (Standard)");
    }

    #[test]
    fn test_run_renders_deflated_slice() {
        let sources = sources();
        let renderer = RecordingRenderer::default();
        let pipeline = UtilizationPipeline::new(&sources, "out", &renderer);

        let request = SliceRequest::new("Austin", QualityTier::Standard, ChartVariant::Standard);
        let outcome = pipeline.run(&request).unwrap();
        assert_eq!(pipeline.output_dir(), Path::new("out"));

        assert_eq!(
            outcome,
            SliceOutcome::Rendered(PathBuf::from("out/stacked_bars/AustinStandard.png"))
        );
        let charts = renderer.charts.borrow();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].period_labels(), vec!["2019 Q4", "2020 Q1"]);
        assert_eq!(charts[0].direct_rent_adjusted[0], Some(50.0));
        assert!((charts[0].direct_rent_adjusted[1].unwrap() - 50.0 / 1.02).abs() < 1e-9);
    }

    #[test]
    fn test_missing_slice_is_no_data() {
        let sources = sources();
        let renderer = RecordingRenderer::default();
        let pipeline = UtilizationPipeline::new(&sources, "out", &renderer);

        let request = SliceRequest::new("Austin", QualityTier::Premium, ChartVariant::Standard);
        assert_eq!(pipeline.run(&request).unwrap(), SliceOutcome::NoData);
        assert!(pipeline.prepare(&request).is_none());
        assert!(renderer.paths.borrow().is_empty());
    }

    #[test]
    fn test_batch_contains_failures() {
        let sources = sources();
        let renderer = RecordingRenderer {
            fail_for: Some("Austin".to_string()),
            ..Default::default()
        };
        let pipeline = UtilizationPipeline::new(&sources, "out", &renderer);

        let markets = vec![
            "Austin".to_string(),
            "Boston".to_string(),
            "Tampa".to_string(),
        ];
        let requests = slice_requests(&markets, &[QualityTier::Standard], ChartVariant::Adjusted);
        let report = pipeline.run_batch(&requests);

        assert_eq!(report.len(), 3);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.no_data(), 1);
        assert!(matches!(
            report.items[0].result,
            Err(PipelineError::Chart { ref market, .. }) if market == "Austin"
        ));
        assert_eq!(
            renderer.paths.borrow().as_slice(),
            &[PathBuf::from("out/adj_stacked_bars/adj_BostonStandard.png")]
        );
    }

    #[test]
    fn test_deflator_base_scales_index_only() {
        let sources = sources();
        let renderer = RecordingRenderer::default();
        let pipeline = UtilizationPipeline::new(&sources, "out", &renderer)
            .with_deflator(InflationDeflator::new(250.0));

        let request = SliceRequest::new("Austin", QualityTier::Standard, ChartVariant::Standard);
        let chart = pipeline.prepare(&request).unwrap();

        // Factors are base / index, so the base cancels out of adjusted rents
        assert_eq!(chart.direct_rent_adjusted[0], Some(50.0));
        assert!((chart.direct_rent_adjusted[1].unwrap() - 50.0 / 1.02).abs() < 1e-9);
    }

    #[test]
    fn test_policy_reaches_adjusted_split() {
        let sources = sources();
        let renderer = RecordingRenderer::default();
        let pipeline = UtilizationPipeline::new(&sources, "out", &renderer).with_policy(
            JoinPolicy {
                missing_inflation_rate: 0.0,
                missing_occupancy: 0.5,
            },
        );

        let request = SliceRequest::new("Boston", QualityTier::Standard, ChartVariant::Adjusted);
        let chart = pipeline.prepare(&request).unwrap();

        // 1.5M used, half of it occupied
        assert!((chart.segments[0].values[0] - 0.75).abs() < 1e-9);
        assert!((chart.segments[1].values[0] - 0.75).abs() < 1e-9);
    }
}
