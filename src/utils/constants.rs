//! Constants Module - Single Source of Truth
//!
//! Weights, thresholds and the default detector tables. `AnalysisConfig`
//! copies these once at construction; no other module hardcodes them.

use alloy_primitives::U256;

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "RusterSentinel";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// ENGINE WEIGHTS
// ============================================

/// ML classifier weight
pub const ML_WEIGHT: f64 = 0.25;
/// Symbolic-execution weight
pub const SYMBOLIC_WEIGHT: f64 = 0.35;
/// Static group (bytecode + ABI + source) weight
pub const STATIC_WEIGHT: f64 = 0.25;
/// Transaction-history weight
pub const TRANSACTION_WEIGHT: f64 = 0.15;

/// Weights used when symbolic execution did not run: `[ml, symbolic, static, transaction]`
pub const SYMBOLIC_ABSENT_WEIGHTS: [f64; 4] = [0.5, 0.0, 0.35, 0.15];

// ============================================
// RISK THRESHOLDS (lower bound, inclusive)
// ============================================

pub const CRITICAL_THRESHOLD: f64 = 0.8;
pub const HIGH_THRESHOLD: f64 = 0.6;
pub const MEDIUM_THRESHOLD: f64 = 0.4;
pub const LOW_THRESHOLD: f64 = 0.2;

// ============================================
// TRANSACTION HISTORY
// ============================================

/// Withdrawal must follow the deposit within this many seconds
pub const QUICK_DRAIN_WINDOW_SECS: u64 = 300;
/// Withdrawal must be at least this share of the deposit (basis points)
pub const QUICK_DRAIN_MIN_RATIO_BPS: u64 = 7_000;
pub const QUICK_DRAIN_WEIGHT: f64 = 0.5;
pub const QUICK_DRAIN_TECHNIQUE: &str = "Quick Drain";

pub const OWNER_ONLY_WEIGHT: f64 = 0.4;
pub const OWNER_ONLY_TECHNIQUE: &str = "Owner Only Withdrawal";

/// Failed / known-status incoming ratio at which the check fires
pub const FAILED_RATIO_THRESHOLD: f64 = 0.5;
/// Fewer known-status incoming transactions than this is not evidence
pub const FAILED_MIN_SAMPLES: usize = 3;
pub const FAILED_RATIO_WEIGHT: f64 = 0.3;
pub const FAILED_RATIO_TECHNIQUE: &str = "Failed Withdrawals";

// ============================================
// SOURCE PATTERNS
// ============================================

/// Literal snippets kept per fired source indicator
pub const MAX_SNIPPETS_PER_INDICATOR: usize = 3;

// ============================================
// OPCODE CLASSES
// ============================================

pub const CONTROL_FLOW_OPCODES: [&str; 3] = ["JUMP", "JUMPI", "JUMPDEST"];
pub const STORAGE_OPCODES: [&str; 2] = ["SLOAD", "SSTORE"];
pub const EXTERNAL_CALL_OPCODES: [&str; 4] = ["CALL", "CALLCODE", "DELEGATECALL", "STATICCALL"];

// ============================================
// DEFAULT DETECTOR TABLES
// ============================================

/// `(id, required opcodes, weight, technique)`
pub const DEFAULT_BYTECODE_PATTERNS: &[(&str, &[&str], f64, &str)] = &[
    ("hidden_self_destruct", &["SELFDESTRUCT"], 0.7, "Hidden Self Destruct"),
    ("balance_disorder", &["CALLVALUE", "BALANCE", "GT"], 0.4, "Balance Disorder"),
    ("hidden_transfer", &["CALLER", "BALANCE", "CALL"], 0.3, "Hidden Transfer"),
    ("straw_man_contract", &["DELEGATECALL", "SLOAD"], 0.5, "Straw Man Contract"),
    ("hidden_state_update", &["SLOAD", "SSTORE", "CALLER", "EQ"], 0.3, "Hidden State Update"),
    ("origin_gate", &["ORIGIN", "EQ", "JUMPI"], 0.3, "Tx Origin Gate"),
];

/// `(lowercase name fragment, weight, technique)`
pub const DEFAULT_FUNCTION_INDICATORS: &[(&str, f64, &str)] = &[
    ("withdraw", 0.6, "Withdrawal Trap"),
    ("multiplicate", 0.6, "Multiplier Bait"),
    ("claim", 0.5, "Reward Bait"),
    ("getreward", 0.5, "Reward Bait"),
    ("collect", 0.4, "Collect Trap"),
    ("mint", 0.3, "Payable Mint"),
];

/// `(id, regex, weight, technique)`, evaluated in this order
pub const DEFAULT_SOURCE_INDICATORS: &[(&str, &str, f64, &str)] = &[
    (
        "owner_only_modifier",
        r"(?i)modifier\s+\w+\s*(\([^)]*\))?\s*\{[^}]*require\s*\(\s*msg\.sender\s*==\s*\w*owner",
        0.3,
        "Owner Only Modifier",
    ),
    ("selfdestruct_call", r"\b(selfdestruct|suicide)\s*\(", 0.5, "Hidden Self Destruct"),
    ("timestamp_dependence", r"\bblock\.timestamp\b|\bnow\b", 0.2, "Timestamp Dependence"),
    ("balance_gated_require", r"require\s*\([^;]*\.balance\b[^;]*\)", 0.4, "Balance Disorder"),
];

// ============================================
// CONVERSION UTILITIES
// ============================================

/// Convert wei to ETH (or native token)
#[inline]
pub fn wei_to_eth(wei: U256) -> f64 {
    let wei_u128: u128 = wei.try_into().unwrap_or(u128::MAX);
    wei_u128 as f64 / 1e18
}
