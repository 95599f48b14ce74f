//! Sentinel Pipeline
//!
//! Evidence bundle in, verdict out. Runs the four internal detectors over
//! whatever evidence is present, merges the external scorer results and
//! hands everything to the aggregator.
//!
//! Two entry points with identical results:
//! - `analyze` runs detectors one after another on the caller's thread
//! - `analyze_concurrent` fans them out on tokio's blocking pool

use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::core::aggregator::RiskAggregator;
use crate::core::bytecode_patterns::BytecodePatternDetector;
use crate::core::detector::{run_isolated, Detector};
use crate::core::function_signatures::FunctionSignatureDetector;
use crate::core::scorers::ExternalFindings;
use crate::core::source_patterns::SourcePatternDetector;
use crate::core::transaction_history::TransactionHistoryDetector;
use crate::models::config::AnalysisConfig;
use crate::models::errors::{AppResult, DetectorFailure};
use crate::models::types::{AggregateVerdict, DetectorKind, DetectorOutcome, RawContractInput};

/// Stateless between calls; one instance can serve any number of
/// concurrent analyses.
#[derive(Clone)]
pub struct SentinelPipeline {
    config: Arc<AnalysisConfig>,
    detectors: Vec<Arc<dyn Detector>>,
    aggregator: RiskAggregator,
}

impl SentinelPipeline {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        let detectors: Vec<Arc<dyn Detector>> = vec![
            Arc::new(BytecodePatternDetector::new(Arc::clone(&config))),
            Arc::new(FunctionSignatureDetector::new(Arc::clone(&config))),
            Arc::new(SourcePatternDetector::new(Arc::clone(&config))),
            Arc::new(TransactionHistoryDetector::new(Arc::clone(&config))),
        ];
        Self {
            aggregator: RiskAggregator::new(Arc::clone(&config)),
            detectors,
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the internal detectors sequentially.
    pub fn run_detectors(&self, input: &RawContractInput) -> BTreeMap<DetectorKind, DetectorOutcome> {
        self.detectors
            .iter()
            .map(|detector| (detector.kind(), run_isolated(detector.as_ref(), input)))
            .collect()
    }

    /// Full analysis on the caller's thread.
    ///
    /// Fails only when `input` is structurally invalid; detector problems
    /// end up in `verdict.errors`.
    pub fn analyze(
        &self,
        input: &RawContractInput,
        external: &ExternalFindings,
    ) -> AppResult<AggregateVerdict> {
        input.validate()?;
        let start = Instant::now();

        let outcomes = self.run_detectors(input);
        let verdict = self.finish(input, outcomes, external);

        info!(
            "🛡️ {} analyzed in {:?}",
            input.address,
            start.elapsed()
        );
        Ok(verdict)
    }

    /// Same verdict as `analyze`, with each detector on its own blocking task.
    pub async fn analyze_concurrent(
        &self,
        input: &RawContractInput,
        external: &ExternalFindings,
    ) -> AppResult<AggregateVerdict> {
        input.validate()?;
        let start = Instant::now();
        let shared = Arc::new(input.clone());

        let (kinds, tasks): (Vec<_>, Vec<_>) = self
            .detectors
            .iter()
            .map(|detector| {
                let detector = Arc::clone(detector);
                let input = Arc::clone(&shared);
                let kind = detector.kind();
                let task = tokio::task::spawn_blocking(move || {
                    run_isolated(detector.as_ref(), &input)
                });
                (kind, task)
            })
            .unzip();

        let outcomes: BTreeMap<_, _> = kinds
            .into_iter()
            .zip(join_all(tasks).await)
            .map(|(kind, joined)| {
                let outcome = joined.unwrap_or_else(|e| {
                    warn!("⚠️ Detector task {} did not complete: {}", kind.as_str(), e);
                    DetectorOutcome::Failed(DetectorFailure::new(kind, format!("task failed: {}", e)))
                });
                (kind, outcome)
            })
            .collect();

        let verdict = self.finish(input, outcomes, external);
        info!(
            "🛡️ {} analyzed concurrently in {:?}",
            input.address,
            start.elapsed()
        );
        Ok(verdict)
    }

    fn finish(
        &self,
        input: &RawContractInput,
        mut outcomes: BTreeMap<DetectorKind, DetectorOutcome>,
        external: &ExternalFindings,
    ) -> AggregateVerdict {
        outcomes.extend(external.outcomes());
        let verdict = self.aggregator.aggregate(&outcomes);
        info!(
            "{} {} on chain {}: {} ({:.2})",
            verdict.risk_level.emoji(),
            input.address,
            input.chain_id,
            verdict.risk_level.as_str(),
            verdict.overall_confidence
        );
        verdict
    }
}

impl Default for SentinelPipeline {
    fn default() -> Self {
        Self::new(Arc::new(AnalysisConfig::default()))
    }
}
