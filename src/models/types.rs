//! Type definitions for the sentinel pipeline
//! Evidence bundle in, detector findings through, one verdict out.

use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::config::RiskThresholds;
use crate::models::errors::{AppError, AppResult, DetectorFailure};

// ============================================
// EVIDENCE BUNDLE
// ============================================

/// Everything the fetcher layer knows about one contract.
///
/// Supplied whole and never mutated. Every evidence field is optional; the
/// detectors that need a missing field report themselves unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContractInput {
    pub address: Address,
    pub chain_id: u64,
    /// Runtime bytecode, optionally `0x`-prefixed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Vec<FunctionDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    /// Transaction history, earliest first (see `TransactionHistoryDetector`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<TxRecord>>,
}

impl RawContractInput {
    pub fn new(address: Address, chain_id: u64) -> Self {
        Self {
            address,
            chain_id,
            ..Default::default()
        }
    }

    pub fn with_bytecode(mut self, bytecode: impl Into<String>) -> Self {
        self.bytecode = Some(bytecode.into());
        self
    }

    pub fn with_abi(mut self, abi: Vec<FunctionDescriptor>) -> Self {
        self.abi = Some(abi);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_code = Some(source.into());
        self
    }

    pub fn with_transactions(mut self, transactions: Vec<TxRecord>) -> Self {
        self.transactions = Some(transactions);
        self
    }

    /// Parse the boundary JSON. Shape errors (e.g. `transactions` not a
    /// list) surface here as `INPUT_INVALID`, before any detector runs.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let input: Self = serde_json::from_str(json)?;
        input.validate()?;
        Ok(input)
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> AppResult<()> {
        if self.chain_id == 0 {
            return Err(AppError::invalid_input("chain_id must be non-zero"));
        }
        Ok(())
    }
}

/// ABI parameter (`{name, type}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
    View,
    Pure,
    #[default]
    Nonpayable,
    Payable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    #[default]
    Function,
    Event,
    Constructor,
    Fallback,
    Receive,
    Error,
}

/// One ABI entry, in Solidity JSON-ABI shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<FunctionParam>,
    #[serde(default)]
    pub payable: bool,
    #[serde(rename = "stateMutability", default)]
    pub state_mutability: StateMutability,
    #[serde(rename = "type", default)]
    pub kind: FunctionKind,
}

impl FunctionDescriptor {
    /// Plain `function` entry with no inputs
    pub fn function(name: impl Into<String>, state_mutability: StateMutability) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            payable: state_mutability == StateMutability::Payable,
            state_mutability,
            kind: FunctionKind::Function,
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, param_type: impl Into<String>) -> Self {
        self.inputs.push(FunctionParam {
            name: name.into(),
            param_type: param_type.into(),
        });
        self
    }

    /// Callable function that may write state.
    pub fn is_state_mutating(&self) -> bool {
        self.kind == FunctionKind::Function
            && !matches!(
                self.state_mutability,
                StateMutability::View | StateMutability::Pure
            )
    }

    /// Legacy ABIs set `payable`, newer ones only `stateMutability`.
    pub fn is_payable(&self) -> bool {
        self.payable || self.state_mutability == StateMutability::Payable
    }

    /// `name(type1,type2)`
    pub fn canonical_signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.param_type.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// 4-byte function selector, `0x`-prefixed hex
    pub fn selector(&self) -> String {
        let hash = keccak256(self.canonical_signature().as_bytes());
        format!("0x{}", hex::encode(&hash[..4]))
    }
}

/// One historical transaction touching the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub hash: B256,
    #[serde(rename = "from", alias = "from_address")]
    pub from_address: Address,
    /// `None` for contract creation
    #[serde(rename = "to", alias = "to_address", default)]
    pub to_address: Option<Address>,
    /// Value in wei
    #[serde(default)]
    pub value: U256,
    #[serde(rename = "input", alias = "input_data", default)]
    pub input_data: String,
    #[serde(default)]
    pub block_number: u64,
    /// Unix seconds
    pub timestamp: u64,
    /// Receipt status when the fetcher has receipts (`true` = success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_status: Option<bool>,
}

impl TxRecord {
    pub fn new(
        hash: B256,
        from_address: Address,
        to_address: Address,
        value: U256,
        timestamp: u64,
    ) -> Self {
        Self {
            hash,
            from_address,
            to_address: Some(to_address),
            value,
            input_data: String::new(),
            block_number: 0,
            timestamp,
            receipt_status: None,
        }
    }

    pub fn with_status(mut self, success: bool) -> Self {
        self.receipt_status = Some(success);
        self
    }

    pub fn is_sent_to(&self, address: Address) -> bool {
        self.to_address == Some(address)
    }

    pub fn carries_value(&self) -> bool {
        !self.value.is_zero()
    }
}

// ============================================
// DETECTOR RESULTS
// ============================================

/// The six engines the aggregator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    BytecodePattern,
    FunctionSignature,
    SourcePattern,
    TransactionHistory,
    Ml,
    Symbolic,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 6] = [
        DetectorKind::BytecodePattern,
        DetectorKind::FunctionSignature,
        DetectorKind::SourcePattern,
        DetectorKind::TransactionHistory,
        DetectorKind::Ml,
        DetectorKind::Symbolic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::BytecodePattern => "bytecode_pattern",
            DetectorKind::FunctionSignature => "function_signature",
            DetectorKind::SourcePattern => "source_pattern",
            DetectorKind::TransactionHistory => "transaction_history",
            DetectorKind::Ml => "ml",
            DetectorKind::Symbolic => "symbolic",
        }
    }
}

/// Clamp into [0, 1]; NaN counts as no signal.
#[inline]
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// What one detector concluded from one evidence source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorFinding {
    pub detector_name: String,
    pub confidence: f64,
    #[serde(default)]
    pub techniques: BTreeSet<String>,
    #[serde(default)]
    pub evidence: BTreeMap<String, Value>,
}

impl DetectorFinding {
    pub fn new(detector: DetectorKind, confidence: f64) -> Self {
        Self::named(detector.as_str(), confidence)
    }

    pub fn named(detector_name: impl Into<String>, confidence: f64) -> Self {
        Self {
            detector_name: detector_name.into(),
            confidence: clamp_confidence(confidence),
            techniques: BTreeSet::new(),
            evidence: BTreeMap::new(),
        }
    }

    /// Ran, found nothing
    pub fn clean(detector: DetectorKind) -> Self {
        Self::new(detector, 0.0)
    }

    pub fn with_technique(mut self, technique: impl Into<String>) -> Self {
        self.techniques.insert(technique.into());
        self
    }

    pub fn with_evidence(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.evidence.insert(key.into(), value.into());
        self
    }

    pub fn is_positive(&self) -> bool {
        self.confidence > 0.0
    }
}

/// Result of invoking one detector.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorOutcome {
    /// Detector had its input and produced a finding (possibly zero)
    Ran(DetectorFinding),
    /// Required input was missing or unusable. Excluded from weighting.
    /// `reason` is reported in `errors` when present.
    Unavailable {
        detector: DetectorKind,
        reason: Option<String>,
    },
    /// Internal fault, isolated at the detector boundary
    Failed(DetectorFailure),
}

impl DetectorOutcome {
    pub fn unavailable(detector: DetectorKind) -> Self {
        Self::Unavailable {
            detector,
            reason: None,
        }
    }

    pub fn unavailable_because(detector: DetectorKind, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            detector,
            reason: Some(reason.into()),
        }
    }

    pub fn finding(&self) -> Option<&DetectorFinding> {
        match self {
            Self::Ran(finding) => Some(finding),
            _ => None,
        }
    }
}

// ============================================
// VERDICT
// ============================================

/// Risk level classification for a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Checked, found nothing
    Safe,
    Low,
    Medium,
    High,
    Critical,
    /// Nothing could be checked
    Unknown,
}

impl RiskLevel {
    /// Classify with the default thresholds
    pub fn from_confidence(confidence: f64) -> Self {
        RiskThresholds::default().classify(confidence)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "✅",
            RiskLevel::Low => "🟡",
            RiskLevel::Medium => "🟠",
            RiskLevel::High => "🔴",
            RiskLevel::Critical => "💀",
            RiskLevel::Unknown => "❓",
        }
    }
}

/// A detector that could not contribute, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorError {
    #[serde(rename = "detector")]
    pub detector_name: String,
    pub message: String,
}

impl DetectorError {
    pub fn new(detector_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            detector_name: detector_name.into(),
            message: message.into(),
        }
    }
}

/// Final, auditable risk verdict for one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VerdictWire", into = "VerdictWire")]
pub struct AggregateVerdict {
    pub overall_confidence: f64,
    pub risk_level: RiskLevel,
    pub techniques: BTreeSet<String>,
    /// Findings of every detector that ran, keyed by detector name
    pub per_detector: BTreeMap<String, DetectorFinding>,
    pub errors: Vec<DetectorError>,
}

impl AggregateVerdict {
    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pretty print the verdict
    pub fn summary(&self) -> String {
        let mut output = format!(
            "{} Risk: {} | Confidence: {:.2}\n",
            self.risk_level.emoji(),
            self.risk_level.as_str(),
            self.overall_confidence
        );

        for (name, finding) in &self.per_detector {
            output.push_str(&format!("   {}: {:.2}\n", name, finding.confidence));
        }

        if !self.techniques.is_empty() {
            output.push_str("   Techniques:\n");
            for technique in &self.techniques {
                output.push_str(&format!("     - {}\n", technique));
            }
        }

        for error in &self.errors {
            output.push_str(&format!("   ⚠️ {}: {}\n", error.detector_name, error.message));
        }

        output
    }
}

/// Wire shape of a finding inside `detectors` (the name is the map key)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FindingWire {
    confidence: f64,
    #[serde(default)]
    techniques: BTreeSet<String>,
    #[serde(default)]
    evidence: BTreeMap<String, Value>,
}

/// Wire shape of a verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VerdictWire {
    confidence: f64,
    risk_level: RiskLevel,
    #[serde(default)]
    techniques: BTreeSet<String>,
    #[serde(default)]
    detectors: BTreeMap<String, FindingWire>,
    #[serde(default)]
    errors: Vec<DetectorError>,
}

impl From<AggregateVerdict> for VerdictWire {
    fn from(verdict: AggregateVerdict) -> Self {
        Self {
            confidence: verdict.overall_confidence,
            risk_level: verdict.risk_level,
            techniques: verdict.techniques,
            detectors: verdict
                .per_detector
                .into_iter()
                .map(|(name, finding)| {
                    (
                        name,
                        FindingWire {
                            confidence: finding.confidence,
                            techniques: finding.techniques,
                            evidence: finding.evidence,
                        },
                    )
                })
                .collect(),
            errors: verdict.errors,
        }
    }
}

impl From<VerdictWire> for AggregateVerdict {
    fn from(wire: VerdictWire) -> Self {
        Self {
            overall_confidence: wire.confidence,
            risk_level: wire.risk_level,
            techniques: wire.techniques,
            per_detector: wire
                .detectors
                .into_iter()
                .map(|(name, finding)| {
                    let restored = DetectorFinding {
                        detector_name: name.clone(),
                        confidence: finding.confidence,
                        techniques: finding.techniques,
                        evidence: finding.evidence,
                    };
                    (name, restored)
                })
                .collect(),
            errors: wire.errors,
        }
    }
}
