//! Bytecode Pattern Detector
//!
//! Matches curated opcode-set signatures against the decoded sequence.
//! A pattern fires when all of its opcodes occur anywhere in the code
//! (containment, not subsequence).

use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::detector::Detector;
use crate::models::config::AnalysisConfig;
use crate::models::errors::DecodeError;
use crate::models::types::{DetectorFinding, DetectorKind, DetectorOutcome, RawContractInput};
use crate::utils::constants::{CONTROL_FLOW_OPCODES, EXTERNAL_CALL_OPCODES, STORAGE_OPCODES};
use crate::utils::decoder::{decode, OpcodeSequence};

#[derive(Debug, Clone)]
pub struct BytecodePatternDetector {
    config: Arc<AnalysisConfig>,
}

impl BytecodePatternDetector {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    /// Decode then scan
    pub fn analyze_bytecode(&self, bytecode: &str) -> Result<DetectorFinding, DecodeError> {
        let sequence = decode(bytecode)?;
        Ok(self.scan(&sequence))
    }

    /// Score an already-decoded sequence.
    pub fn scan(&self, sequence: &OpcodeSequence) -> DetectorFinding {
        let present = sequence.distinct();

        let fired: Vec<_> = self
            .config
            .bytecode_patterns
            .iter()
            .filter(|pattern| pattern.opcodes.iter().all(|op| present.contains(op.as_str())))
            .collect();

        let score: f64 = fired.iter().map(|pattern| pattern.weight).sum();
        let matched: Vec<&str> = fired.iter().map(|pattern| pattern.id.as_str()).collect();

        debug!(
            "🔎 Bytecode: {} opcodes, {} patterns fired ({:?})",
            sequence.len(),
            fired.len(),
            matched
        );

        let mut finding = DetectorFinding::new(DetectorKind::BytecodePattern, score.min(1.0))
            .with_evidence("length", sequence.len())
            .with_evidence("opcode_diversity", sequence.diversity())
            .with_evidence("control_flow_count", sequence.count_any(&CONTROL_FLOW_OPCODES))
            .with_evidence("storage_ratio", sequence.ratio_of(&STORAGE_OPCODES))
            .with_evidence("external_call_ratio", sequence.ratio_of(&EXTERNAL_CALL_OPCODES))
            .with_evidence("matched_patterns", json!(matched));

        for pattern in fired {
            finding = finding.with_technique(pattern.technique.clone());
        }
        finding
    }
}

impl Detector for BytecodePatternDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::BytecodePattern
    }

    /// Missing, empty or undecodable bytecode makes the detector unavailable
    /// and is reported, since nothing was checked.
    fn analyze(&self, input: &RawContractInput) -> DetectorOutcome {
        let Some(bytecode) = input.bytecode.as_deref() else {
            return DetectorOutcome::unavailable_because(self.kind(), "bytecode not supplied");
        };

        match decode(bytecode) {
            Ok(sequence) if sequence.is_empty() => {
                DetectorOutcome::unavailable_because(self.kind(), "bytecode has no decodable opcodes")
            }
            Ok(sequence) => DetectorOutcome::Ran(self.scan(&sequence)),
            Err(e) => {
                warn!("⚠️ [{}] {} for {}", e.code().as_str(), e, input.address);
                DetectorOutcome::unavailable_because(self.kind(), e.to_string())
            }
        }
    }
}
