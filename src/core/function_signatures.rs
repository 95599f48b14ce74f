//! Function-Signature Heuristics
//!
//! Flags payable, state-mutating ABI functions whose names look like the
//! bait honeypots expose ("withdraw", "claim", "getReward"...).

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::detector::Detector;
use crate::models::config::AnalysisConfig;
use crate::models::types::{
    DetectorFinding, DetectorKind, DetectorOutcome, FunctionDescriptor, RawContractInput,
};

#[derive(Debug, Clone)]
pub struct FunctionSignatureDetector {
    config: Arc<AnalysisConfig>,
}

impl FunctionSignatureDetector {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    pub fn analyze_abi(&self, abi: &[FunctionDescriptor]) -> DetectorFinding {
        // technique -> strongest matched weight; repeated labels count once
        let mut label_weights: BTreeMap<&str, f64> = BTreeMap::new();
        let mut matched = Vec::new();
        let mut candidates = 0usize;

        for function in abi.iter().filter(|f| f.is_state_mutating() && f.is_payable()) {
            candidates += 1;
            let lowered = function.name.to_lowercase();

            for indicator in &self.config.function_indicators {
                if !lowered.contains(&indicator.fragment) {
                    continue;
                }
                let weight = label_weights.entry(indicator.technique.as_str()).or_insert(0.0);
                *weight = weight.max(indicator.weight);
                matched.push(json!({
                    "name": function.name,
                    "signature": function.canonical_signature(),
                    "selector": function.selector(),
                    "indicator": indicator.fragment,
                }));
            }
        }

        let score: f64 = label_weights.values().sum();
        debug!(
            "🔎 ABI: {} entries, {} payable mutating, {} indicator hits",
            abi.len(),
            candidates,
            matched.len()
        );

        let mut finding = DetectorFinding::new(DetectorKind::FunctionSignature, score.min(1.0))
            .with_evidence("function_count", abi.len())
            .with_evidence("payable_mutating_count", candidates)
            .with_evidence("matched_functions", matched);

        for technique in label_weights.keys() {
            finding = finding.with_technique(*technique);
        }
        finding
    }
}

impl Detector for FunctionSignatureDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::FunctionSignature
    }

    fn analyze(&self, input: &RawContractInput) -> DetectorOutcome {
        match input.abi.as_deref() {
            Some(abi) => DetectorOutcome::Ran(self.analyze_abi(abi)),
            None => DetectorOutcome::unavailable(self.kind()),
        }
    }
}
