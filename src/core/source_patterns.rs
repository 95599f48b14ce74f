//! Source-Pattern Detector
//!
//! Regex scan of Solidity source for dangerous constructs. Indicators are
//! evaluated in table order; each one that matches adds its weight once and
//! keeps a few literal snippets as evidence.

use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::core::detector::Detector;
use crate::models::config::AnalysisConfig;
use crate::models::types::{DetectorFinding, DetectorKind, DetectorOutcome, RawContractInput};
use crate::utils::constants::MAX_SNIPPETS_PER_INDICATOR;

#[derive(Debug, Clone)]
pub struct SourcePatternDetector {
    config: Arc<AnalysisConfig>,
}

impl SourcePatternDetector {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    pub fn analyze_source(&self, source: &str) -> DetectorFinding {
        let mut score = 0.0;
        let mut finding = DetectorFinding::clean(DetectorKind::SourcePattern);

        for indicator in &self.config.source_indicators {
            let mut matches = indicator.pattern.find_iter(source).peekable();
            if matches.peek().is_none() {
                continue;
            }

            let snippets: Vec<&str> = matches
                .by_ref()
                .take(MAX_SNIPPETS_PER_INDICATOR)
                .map(|m| m.as_str())
                .collect();
            let total = snippets.len() + matches.count();

            score += indicator.weight;
            finding = finding
                .with_technique(indicator.technique.clone())
                .with_evidence(
                    indicator.id.clone(),
                    json!({ "count": total, "snippets": snippets }),
                );
        }

        debug!("🔎 Source: {} bytes scanned, score {:.2}", source.len(), score);
        finding.confidence = f64::min(score, 1.0);
        finding
    }
}

impl Detector for SourcePatternDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::SourcePattern
    }

    fn analyze(&self, input: &RawContractInput) -> DetectorOutcome {
        match input.source_code.as_deref() {
            Some(source) => DetectorOutcome::Ran(self.analyze_source(source)),
            None => DetectorOutcome::unavailable(self.kind()),
        }
    }
}
