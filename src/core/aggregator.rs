//! Risk Aggregator
//!
//! Combines detector outcomes into one verdict. Four engines carry weight:
//! ml, symbolic, static (mean of the static detectors that ran) and
//! transaction history. Engines that did not run are dropped and the
//! remaining weights are rescaled to sum to 1.
//!
//! When symbolic did not run, the base profile is the symbolic-absent one
//! (its weight folded into ml) before rescaling.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::config::{AnalysisConfig, EngineWeights};
use crate::models::types::{
    clamp_confidence, AggregateVerdict, DetectorError, DetectorKind, DetectorOutcome, RiskLevel,
};

/// Weighted engine groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Engine {
    Ml,
    Symbolic,
    Static,
    Transaction,
}

impl Engine {
    pub const ALL: [Engine; 4] = [Engine::Ml, Engine::Symbolic, Engine::Static, Engine::Transaction];

    pub fn of(kind: DetectorKind) -> Self {
        match kind {
            DetectorKind::Ml => Engine::Ml,
            DetectorKind::Symbolic => Engine::Symbolic,
            DetectorKind::TransactionHistory => Engine::Transaction,
            DetectorKind::BytecodePattern
            | DetectorKind::FunctionSignature
            | DetectorKind::SourcePattern => Engine::Static,
        }
    }

    fn base_weight(&self, weights: &EngineWeights) -> f64 {
        match self {
            Engine::Ml => weights.ml,
            Engine::Symbolic => weights.symbolic,
            Engine::Static => weights.static_group,
            Engine::Transaction => weights.transaction,
        }
    }
}

/// Reported when no detector could evaluate anything and nothing else
/// explains why
pub const AGGREGATOR_NAME: &str = "aggregator";

#[derive(Debug, Clone)]
pub struct RiskAggregator {
    config: Arc<AnalysisConfig>,
}

impl RiskAggregator {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    /// Effective weight per present engine. Sums to 1 for any non-empty set.
    pub fn effective_weights(&self, present: &BTreeSet<Engine>) -> BTreeMap<Engine, f64> {
        if present.is_empty() {
            return BTreeMap::new();
        }

        let base = if present.contains(&Engine::Symbolic) {
            &self.config.weights
        } else {
            &self.config.symbolic_absent_weights
        };

        let total: f64 = present.iter().map(|e| e.base_weight(base).max(0.0)).sum();
        if total <= 0.0 {
            // Every present engine has zero base weight: fall back to equal shares
            let share = 1.0 / present.len() as f64;
            return present.iter().map(|e| (*e, share)).collect();
        }

        present
            .iter()
            .map(|e| (*e, e.base_weight(base).max(0.0) / total))
            .collect()
    }

    /// Build the verdict. Detectors missing from `outcomes` were not invoked.
    pub fn aggregate(&self, outcomes: &BTreeMap<DetectorKind, DetectorOutcome>) -> AggregateVerdict {
        let mut per_detector = BTreeMap::new();
        let mut errors = Vec::new();
        let mut engine_scores: BTreeMap<Engine, Vec<f64>> = BTreeMap::new();

        for (kind, outcome) in outcomes {
            match outcome {
                DetectorOutcome::Ran(finding) => {
                    let mut finding = finding.clone();
                    finding.detector_name = kind.as_str().to_string();
                    finding.confidence = clamp_confidence(finding.confidence);
                    engine_scores
                        .entry(Engine::of(*kind))
                        .or_default()
                        .push(finding.confidence);
                    per_detector.insert(finding.detector_name.clone(), finding);
                }
                DetectorOutcome::Unavailable { reason, .. } => {
                    if let Some(reason) = reason {
                        errors.push(DetectorError::new(kind.as_str(), reason.clone()));
                    }
                }
                DetectorOutcome::Failed(failure) => {
                    errors.push(DetectorError::new(kind.as_str(), failure.message.clone()));
                }
            }
        }

        if engine_scores.is_empty() {
            if errors.is_empty() {
                errors.push(DetectorError::new(
                    AGGREGATOR_NAME,
                    "no detector could evaluate the supplied evidence",
                ));
            }
            info!("{} No engine evaluated; verdict UNKNOWN", RiskLevel::Unknown.emoji());
            return AggregateVerdict {
                overall_confidence: 0.0,
                risk_level: RiskLevel::Unknown,
                techniques: BTreeSet::new(),
                per_detector,
                errors,
            };
        }

        let present: BTreeSet<Engine> = engine_scores.keys().copied().collect();
        let weights = self.effective_weights(&present);

        let mut total = 0.0;
        for (engine, scores) in &engine_scores {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            let weight = weights.get(engine).copied().unwrap_or(0.0);
            debug!("⚖️ {:?}: score {:.3} x weight {:.3}", engine, mean, weight);
            total += weight * mean;
        }
        let overall_confidence = clamp_confidence(total);
        let risk_level = self.config.thresholds.classify(overall_confidence);

        let techniques: BTreeSet<String> = per_detector
            .values()
            .filter(|f| f.is_positive())
            .flat_map(|f| f.techniques.iter().cloned())
            .collect();

        info!(
            "{} Verdict: {} | Confidence: {:.2} | {} detectors, {} errors",
            risk_level.emoji(),
            risk_level.as_str(),
            overall_confidence,
            per_detector.len(),
            errors.len()
        );

        AggregateVerdict {
            overall_confidence,
            risk_level,
            techniques,
            per_detector,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::DetectorFailure;
    use crate::models::types::DetectorFinding;

    fn aggregator() -> RiskAggregator {
        RiskAggregator::new(Arc::new(AnalysisConfig::default()))
    }

    fn ran(kind: DetectorKind, confidence: f64) -> DetectorOutcome {
        DetectorOutcome::Ran(DetectorFinding::new(kind, confidence))
    }

    #[test]
    fn test_weights_sum_to_one_for_every_subset() {
        let agg = aggregator();
        for mask in 1u8..16 {
            let present: BTreeSet<Engine> = Engine::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, e)| *e)
                .collect();
            let sum: f64 = agg.effective_weights(&present).values().sum();
            assert!((sum - 1.0).abs() < 1e-12, "{:?} sums to {}", present, sum);
        }
    }

    #[test]
    fn test_symbolic_absent_profile() {
        let present: BTreeSet<Engine> = [Engine::Ml, Engine::Static, Engine::Transaction].into();
        let weights = aggregator().effective_weights(&present);
        assert!((weights[&Engine::Ml] - 0.5).abs() < 1e-12);
        assert!((weights[&Engine::Static] - 0.35).abs() < 1e-12);
        assert!((weights[&Engine::Transaction] - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_all_engines_canonical() {
        let present: BTreeSet<Engine> = Engine::ALL.into();
        let weights = aggregator().effective_weights(&present);
        assert!((weights[&Engine::Symbolic] - 0.35).abs() < 1e-12);
        assert!((weights[&Engine::Ml] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_static_is_mean_of_ran_static_detectors() {
        let outcomes = BTreeMap::from([
            (DetectorKind::BytecodePattern, ran(DetectorKind::BytecodePattern, 0.8)),
            (DetectorKind::FunctionSignature, ran(DetectorKind::FunctionSignature, 0.4)),
            (DetectorKind::SourcePattern, DetectorOutcome::unavailable(DetectorKind::SourcePattern)),
        ]);
        let verdict = aggregator().aggregate(&outcomes);
        assert!((verdict.overall_confidence - 0.6).abs() < 1e-9);
        assert_eq!(verdict.risk_level, RiskLevel::High);
        assert!(verdict.errors.is_empty());
    }

    #[test]
    fn test_nothing_present_is_unknown() {
        let outcomes = BTreeMap::from([
            (
                DetectorKind::BytecodePattern,
                DetectorOutcome::unavailable_because(DetectorKind::BytecodePattern, "bytecode not supplied"),
            ),
            (DetectorKind::SourcePattern, DetectorOutcome::unavailable(DetectorKind::SourcePattern)),
        ]);
        let verdict = aggregator().aggregate(&outcomes);
        assert_eq!(verdict.risk_level, RiskLevel::Unknown);
        assert_eq!(verdict.overall_confidence, 0.0);
        assert_eq!(verdict.errors.len(), 1);

        let verdict = aggregator().aggregate(&BTreeMap::new());
        assert_eq!(verdict.risk_level, RiskLevel::Unknown);
        assert_eq!(verdict.errors[0].detector_name, AGGREGATOR_NAME);
    }

    #[test]
    fn test_failure_is_isolated() {
        let outcomes = BTreeMap::from([
            (
                DetectorKind::SourcePattern,
                DetectorOutcome::Failed(DetectorFailure::new(DetectorKind::SourcePattern, "boom")),
            ),
            (DetectorKind::TransactionHistory, ran(DetectorKind::TransactionHistory, 0.5)),
        ]);
        let verdict = aggregator().aggregate(&outcomes);
        assert!((verdict.overall_confidence - 0.5).abs() < 1e-9);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
        assert_eq!(verdict.errors, vec![DetectorError::new("source_pattern", "boom")]);
        assert!(!verdict.per_detector.contains_key("source_pattern"));
    }

    #[test]
    fn test_zero_confidence_techniques_excluded() {
        let mut quiet = DetectorFinding::new(DetectorKind::Ml, 0.0);
        quiet.techniques.insert("Stale Label".to_string());
        let outcomes = BTreeMap::from([
            (DetectorKind::Ml, DetectorOutcome::Ran(quiet)),
            (
                DetectorKind::Symbolic,
                DetectorOutcome::Ran(
                    DetectorFinding::new(DetectorKind::Symbolic, 0.9).with_technique("reentrancy"),
                ),
            ),
        ]);
        let verdict = aggregator().aggregate(&outcomes);
        assert!(verdict.techniques.contains("reentrancy"));
        assert!(!verdict.techniques.contains("Stale Label"));
    }

    #[test]
    fn test_out_of_range_external_confidence_clamped() {
        let mut wild = DetectorFinding::new(DetectorKind::Ml, 0.0);
        wild.confidence = 7.5;
        let outcomes = BTreeMap::from([(DetectorKind::Ml, DetectorOutcome::Ran(wild))]);
        let verdict = aggregator().aggregate(&outcomes);
        assert_eq!(verdict.per_detector["ml"].confidence, 1.0);
        assert_eq!(verdict.overall_confidence, 1.0);
        assert_eq!(verdict.risk_level, RiskLevel::Critical);
    }
}
