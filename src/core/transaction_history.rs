//! Transaction-History Heuristics
//!
//! Behavioral checks over the supplied transaction list:
//! 1. Quick drain - value deposited then mostly withdrawn within a short window
//! 2. Owner-only withdrawals - every outgoing value transfer goes to one address
//! 3. Failed-call ratio - most incoming calls revert (needs receipt statuses)
//!
//! Fired sub-check weights are summed and capped at 1.0.
//!
//! Precondition: `transactions[0]` is the earliest transaction. Its sender is
//! taken as the likely owner. The list is not re-sorted.

use alloy_primitives::{Address, U256};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::core::detector::Detector;
use crate::models::config::{AnalysisConfig, TransactionHeuristics};
use crate::models::types::{
    DetectorFinding, DetectorKind, DetectorOutcome, RawContractInput, TxRecord,
};
use crate::utils::constants::wei_to_eth;

const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct TransactionHistoryDetector {
    config: Arc<AnalysisConfig>,
}

impl TransactionHistoryDetector {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }

    pub fn analyze_transactions(&self, transactions: &[TxRecord], contract: Address) -> DetectorFinding {
        let mut finding = DetectorFinding::clean(DetectorKind::TransactionHistory)
            .with_evidence("transaction_count", transactions.len());
        if transactions.is_empty() {
            return finding;
        }

        let heuristics = &self.config.transactions;
        let mut score = 0.0;

        let pairs = quick_drain_pairs(transactions, contract, heuristics);
        if !pairs.is_empty() {
            score += heuristics.quick_drain_weight;
            finding = finding.with_technique(heuristics.quick_drain_technique.clone());
        }
        finding = finding.with_evidence("quick_drain_pairs", pairs);

        let likely_owner = transactions[0].from_address;
        let outgoing: Vec<&TxRecord> = transactions
            .iter()
            .filter(|tx| tx.from_address == contract && tx.carries_value())
            .collect();
        let owner_only = !outgoing.is_empty() && outgoing.iter().all(|tx| tx.is_sent_to(likely_owner));
        if owner_only {
            score += heuristics.owner_only_weight;
            finding = finding.with_technique(heuristics.owner_only_technique.clone());
        }
        finding = finding
            .with_evidence("likely_owner", likely_owner.to_string())
            .with_evidence("outgoing_value_count", outgoing.len())
            .with_evidence("owner_only_withdrawals", owner_only);

        match failed_ratio(transactions, contract, heuristics) {
            Some((ratio, samples)) => {
                if ratio >= heuristics.failed_ratio_threshold {
                    score += heuristics.failed_ratio_weight;
                    finding = finding.with_technique(heuristics.failed_ratio_technique.clone());
                }
                finding = finding
                    .with_evidence("failed_ratio", ratio)
                    .with_evidence("failed_ratio_samples", samples);
            }
            None => {
                finding = finding.with_evidence("failed_ratio", Value::Null);
            }
        }

        debug!(
            "🔎 Transactions: {} records, {} outgoing, score {:.2}",
            transactions.len(),
            outgoing.len(),
            score
        );

        finding.confidence = f64::min(score, 1.0);
        finding
    }
}

/// Every (deposit, withdrawal) pair inside the window whose withdrawal
/// returns at least the configured share of the deposit.
fn quick_drain_pairs(
    transactions: &[TxRecord],
    contract: Address,
    heuristics: &TransactionHeuristics,
) -> Vec<Value> {
    let deposits = transactions
        .iter()
        .filter(|tx| tx.is_sent_to(contract) && tx.carries_value());
    let withdrawals: Vec<&TxRecord> = transactions
        .iter()
        .filter(|tx| tx.from_address == contract && tx.carries_value())
        .collect();

    let ratio_bps = U256::from(heuristics.quick_drain_min_ratio_bps);
    let denominator = U256::from(BPS_DENOMINATOR);

    let mut pairs = Vec::new();
    for deposit in deposits {
        for withdrawal in &withdrawals {
            if withdrawal.timestamp <= deposit.timestamp {
                continue;
            }
            let elapsed = withdrawal.timestamp - deposit.timestamp;
            if elapsed >= heuristics.quick_drain_window_secs {
                continue;
            }
            // value_w / value_d >= bps / 10_000, without floats
            let lhs = withdrawal.value.saturating_mul(denominator);
            let rhs = deposit.value.saturating_mul(ratio_bps);
            if lhs < rhs {
                continue;
            }
            pairs.push(json!({
                "deposit_hash": deposit.hash.to_string(),
                "withdrawal_hash": withdrawal.hash.to_string(),
                "elapsed_secs": elapsed,
                "deposit_value": deposit.value.to_string(),
                "withdrawal_value": withdrawal.value.to_string(),
                "withdrawal_eth": wei_to_eth(withdrawal.value),
            }));
        }
    }
    pairs
}

/// `(failed / known, known)` over incoming transactions with a receipt
/// status, or `None` below the minimum sample count.
fn failed_ratio(
    transactions: &[TxRecord],
    contract: Address,
    heuristics: &TransactionHeuristics,
) -> Option<(f64, usize)> {
    let statuses: Vec<bool> = transactions
        .iter()
        .filter(|tx| tx.is_sent_to(contract))
        .filter_map(|tx| tx.receipt_status)
        .collect();

    if statuses.is_empty() || statuses.len() < heuristics.failed_min_samples {
        return None;
    }
    let failed = statuses.iter().filter(|ok| !**ok).count();
    Some((failed as f64 / statuses.len() as f64, statuses.len()))
}

impl Detector for TransactionHistoryDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::TransactionHistory
    }

    fn analyze(&self, input: &RawContractInput) -> DetectorOutcome {
        match input.transactions.as_deref() {
            Some(transactions) => {
                DetectorOutcome::Ran(self.analyze_transactions(transactions, input.address))
            }
            None => DetectorOutcome::unavailable(self.kind()),
        }
    }
}
