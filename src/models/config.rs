//! Configuration module for the sentinel pipeline
//!
//! One immutable `AnalysisConfig` is built up front, wrapped in an `Arc` and
//! handed to every detector by reference. Defaults come from
//! `utils/constants.rs`; numeric thresholds can be overridden from the
//! environment.

use regex::Regex;
use std::fmt::Display;
use std::str::FromStr;
use tracing::info;

use crate::models::errors::{AppError, AppResult};
use crate::models::types::RiskLevel;
use crate::utils::constants::{
    CRITICAL_THRESHOLD, DEFAULT_BYTECODE_PATTERNS, DEFAULT_FUNCTION_INDICATORS,
    DEFAULT_SOURCE_INDICATORS, FAILED_MIN_SAMPLES, FAILED_RATIO_TECHNIQUE,
    FAILED_RATIO_THRESHOLD, FAILED_RATIO_WEIGHT, HIGH_THRESHOLD, LOW_THRESHOLD,
    MEDIUM_THRESHOLD, ML_WEIGHT, OWNER_ONLY_TECHNIQUE, OWNER_ONLY_WEIGHT,
    QUICK_DRAIN_MIN_RATIO_BPS, QUICK_DRAIN_TECHNIQUE, QUICK_DRAIN_WEIGHT,
    QUICK_DRAIN_WINDOW_SECS, STATIC_WEIGHT, SYMBOLIC_ABSENT_WEIGHTS, SYMBOLIC_WEIGHT,
    TRANSACTION_WEIGHT,
};

pub const ENV_QUICK_DRAIN_WINDOW_SECS: &str = "SENTINEL_QUICK_DRAIN_WINDOW_SECS";
pub const ENV_QUICK_DRAIN_MIN_RATIO_BPS: &str = "SENTINEL_QUICK_DRAIN_MIN_RATIO_BPS";
pub const ENV_FAILED_RATIO_THRESHOLD: &str = "SENTINEL_FAILED_RATIO_THRESHOLD";
pub const ENV_FAILED_MIN_SAMPLES: &str = "SENTINEL_FAILED_MIN_SAMPLES";

/// Named opcode-set signature. Fires when every opcode occurs somewhere in
/// the decoded sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct BytecodePattern {
    pub id: String,
    pub opcodes: Vec<String>,
    pub weight: f64,
    pub technique: String,
}

impl BytecodePattern {
    /// An empty opcode set would fire on every contract, so it is rejected.
    pub fn new(id: &str, opcodes: &[&str], weight: f64, technique: &str) -> AppResult<Self> {
        if opcodes.is_empty() {
            return Err(AppError::invalid_config(id, "bytecode pattern needs at least one opcode"));
        }
        Ok(Self {
            id: id.to_string(),
            opcodes: opcodes.iter().map(|op| op.to_string()).collect(),
            weight,
            technique: technique.to_string(),
        })
    }
}

/// Suspicious payable-function name fragment (matched lowercase).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionIndicator {
    pub fragment: String,
    pub weight: f64,
    pub technique: String,
}

impl FunctionIndicator {
    pub fn new(fragment: &str, weight: f64, technique: &str) -> Self {
        Self {
            fragment: fragment.to_lowercase(),
            weight,
            technique: technique.to_string(),
        }
    }
}

/// Regex indicator run over contract source text.
#[derive(Debug, Clone)]
pub struct SourceIndicator {
    pub id: String,
    pub pattern: Regex,
    pub weight: f64,
    pub technique: String,
}

impl SourceIndicator {
    pub fn new(id: &str, pattern: &str, weight: f64, technique: &str) -> AppResult<Self> {
        Ok(Self {
            id: id.to_string(),
            pattern: Regex::new(pattern)?,
            weight,
            technique: technique.to_string(),
        })
    }
}

/// Weight per engine: `static` is the mean of the static detectors that ran.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineWeights {
    pub ml: f64,
    pub symbolic: f64,
    pub static_group: f64,
    pub transaction: f64,
}

impl EngineWeights {
    pub const fn canonical() -> Self {
        Self {
            ml: ML_WEIGHT,
            symbolic: SYMBOLIC_WEIGHT,
            static_group: STATIC_WEIGHT,
            transaction: TRANSACTION_WEIGHT,
        }
    }

    pub const fn symbolic_absent() -> Self {
        Self {
            ml: SYMBOLIC_ABSENT_WEIGHTS[0],
            symbolic: SYMBOLIC_ABSENT_WEIGHTS[1],
            static_group: SYMBOLIC_ABSENT_WEIGHTS[2],
            transaction: SYMBOLIC_ABSENT_WEIGHTS[3],
        }
    }
}

/// Lower bounds (inclusive) for each risk level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: CRITICAL_THRESHOLD,
            high: HIGH_THRESHOLD,
            medium: MEDIUM_THRESHOLD,
            low: LOW_THRESHOLD,
        }
    }
}

impl RiskThresholds {
    pub fn classify(&self, confidence: f64) -> RiskLevel {
        if confidence >= self.critical {
            RiskLevel::Critical
        } else if confidence >= self.high {
            RiskLevel::High
        } else if confidence >= self.medium {
            RiskLevel::Medium
        } else if confidence >= self.low {
            RiskLevel::Low
        } else {
            RiskLevel::Safe
        }
    }
}

/// Knobs for the transaction-history sub-checks
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionHeuristics {
    /// Quick-drain window, exclusive upper bound (seconds)
    pub quick_drain_window_secs: u64,
    /// Minimum withdrawal/deposit ratio in basis points
    pub quick_drain_min_ratio_bps: u64,
    pub quick_drain_weight: f64,
    pub quick_drain_technique: String,
    pub owner_only_weight: f64,
    pub owner_only_technique: String,
    pub failed_ratio_threshold: f64,
    pub failed_min_samples: usize,
    pub failed_ratio_weight: f64,
    pub failed_ratio_technique: String,
}

impl Default for TransactionHeuristics {
    fn default() -> Self {
        Self {
            quick_drain_window_secs: QUICK_DRAIN_WINDOW_SECS,
            quick_drain_min_ratio_bps: QUICK_DRAIN_MIN_RATIO_BPS,
            quick_drain_weight: QUICK_DRAIN_WEIGHT,
            quick_drain_technique: QUICK_DRAIN_TECHNIQUE.to_string(),
            owner_only_weight: OWNER_ONLY_WEIGHT,
            owner_only_technique: OWNER_ONLY_TECHNIQUE.to_string(),
            failed_ratio_threshold: FAILED_RATIO_THRESHOLD,
            failed_min_samples: FAILED_MIN_SAMPLES,
            failed_ratio_weight: FAILED_RATIO_WEIGHT,
            failed_ratio_technique: FAILED_RATIO_TECHNIQUE.to_string(),
        }
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_BYTECODE_TABLE: Vec<BytecodePattern> = DEFAULT_BYTECODE_PATTERNS
        .iter()
        .map(|(id, opcodes, weight, technique)| {
            BytecodePattern::new(id, opcodes, *weight, technique)
                .expect("built-in bytecode pattern has opcodes")
        })
        .collect();

    static ref DEFAULT_SOURCE_TABLE: Vec<SourceIndicator> = DEFAULT_SOURCE_INDICATORS
        .iter()
        .map(|(id, pattern, weight, technique)| {
            SourceIndicator::new(id, pattern, *weight, technique)
                .expect("built-in source pattern compiles")
        })
        .collect();
}

/// Everything the detectors and the aggregator read.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub bytecode_patterns: Vec<BytecodePattern>,
    pub function_indicators: Vec<FunctionIndicator>,
    pub source_indicators: Vec<SourceIndicator>,
    pub transactions: TransactionHeuristics,
    pub weights: EngineWeights,
    /// Base weights when the symbolic engine did not run
    pub symbolic_absent_weights: EngineWeights,
    pub thresholds: RiskThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bytecode_patterns: DEFAULT_BYTECODE_TABLE.clone(),
            function_indicators: DEFAULT_FUNCTION_INDICATORS
                .iter()
                .map(|(fragment, weight, technique)| {
                    FunctionIndicator::new(fragment, *weight, technique)
                })
                .collect(),
            source_indicators: DEFAULT_SOURCE_TABLE.clone(),
            transactions: TransactionHeuristics::default(),
            weights: EngineWeights::canonical(),
            symbolic_absent_weights: EngineWeights::symbolic_absent(),
            thresholds: RiskThresholds::default(),
        }
    }
}

impl AnalysisConfig {
    /// Defaults plus numeric overrides from the environment.
    ///
    /// Unset variables keep their default; malformed ones are an error.
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();
        let tx = &mut config.transactions;

        if let Some(secs) = env_override::<u64>(ENV_QUICK_DRAIN_WINDOW_SECS)? {
            if secs == 0 {
                return Err(AppError::invalid_config(ENV_QUICK_DRAIN_WINDOW_SECS, "must be > 0"));
            }
            tx.quick_drain_window_secs = secs;
        }

        if let Some(bps) = env_override::<u64>(ENV_QUICK_DRAIN_MIN_RATIO_BPS)? {
            if bps == 0 {
                return Err(AppError::invalid_config(ENV_QUICK_DRAIN_MIN_RATIO_BPS, "must be > 0"));
            }
            tx.quick_drain_min_ratio_bps = bps;
        }

        if let Some(ratio) = env_override::<f64>(ENV_FAILED_RATIO_THRESHOLD)? {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(AppError::invalid_config(
                    ENV_FAILED_RATIO_THRESHOLD,
                    "must be in (0, 1]",
                ));
            }
            tx.failed_ratio_threshold = ratio;
        }

        if let Some(samples) = env_override::<usize>(ENV_FAILED_MIN_SAMPLES)? {
            if samples == 0 {
                return Err(AppError::invalid_config(ENV_FAILED_MIN_SAMPLES, "must be >= 1"));
            }
            tx.failed_min_samples = samples;
        }

        Ok(config)
    }

    pub fn with_bytecode_patterns(mut self, patterns: Vec<BytecodePattern>) -> Self {
        self.bytecode_patterns = patterns;
        self
    }

    pub fn with_function_indicators(mut self, indicators: Vec<FunctionIndicator>) -> Self {
        self.function_indicators = indicators;
        self
    }

    pub fn with_source_indicators(mut self, indicators: Vec<SourceIndicator>) -> Self {
        self.source_indicators = indicators;
        self
    }

    pub fn with_transaction_heuristics(mut self, heuristics: TransactionHeuristics) -> Self {
        self.transactions = heuristics;
        self
    }
}

fn env_override<T>(key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            let value = raw
                .trim()
                .parse::<T>()
                .map_err(|e| AppError::invalid_config(key, format!("{:?}: {}", raw, e)))?;
            info!("⚙️ {} overridden from environment", key);
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}
