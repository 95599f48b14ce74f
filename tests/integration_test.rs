//! Integration tests for Ruster Sentinel

use alloy_primitives::{Address, B256, U256};
use ruster_sentinel::{
    core::Engine, decode, AggregateVerdict, AnalysisConfig, DecodeError, DetectorKind,
    ExternalFindings, FixedScorer, FunctionDescriptor, RawContractInput, RiskAggregator,
    RiskLevel, SentinelPipeline, StateMutability, TxRecord,
};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

const ONE_ETH: u128 = 1_000_000_000_000_000_000;

fn contract() -> Address {
    Address::from_str("0x00000000000000000000000000000000000000c0").unwrap()
}

fn depositor() -> Address {
    Address::from_str("0x00000000000000000000000000000000000000a1").unwrap()
}

fn eth(n: u128) -> U256 {
    U256::from(n * ONE_ETH)
}

fn bare() -> RawContractInput {
    RawContractInput::new(contract(), 1)
}

fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================
// SCENARIOS
// ============================================

#[test]
fn test_scenario_selfdestruct_bytecode() {
    init_tracing();
    let input = bare().with_bytecode("0xff");
    let verdict = SentinelPipeline::default()
        .analyze(&input, &ExternalFindings::none())
        .unwrap();

    let bytecode = &verdict.per_detector["bytecode_pattern"];
    assert!(close(bytecode.confidence, 0.7));
    assert!(verdict.techniques.contains("Hidden Self Destruct"));
    // static alone carries all the weight
    assert!(close(verdict.overall_confidence, 0.7));
    assert_eq!(verdict.risk_level, RiskLevel::High);
}

#[test]
fn test_scenario_payable_withdraw_only() {
    init_tracing();
    let input = bare().with_abi(vec![FunctionDescriptor::function(
        "withdraw",
        StateMutability::Payable,
    )]);
    let verdict = SentinelPipeline::default()
        .analyze(&input, &ExternalFindings::none())
        .unwrap();

    assert!(close(verdict.per_detector["function_signature"].confidence, 0.6));
    // symbolic absent -> [0.5, 0, 0.35, 0.15]; only static present -> 0.35 / 0.35 = 1
    assert!(close(verdict.overall_confidence, 0.6));
    assert_eq!(verdict.risk_level, RiskLevel::High);
    assert!(verdict.techniques.contains("Withdrawal Trap"));
}

#[test]
fn test_scenario_quick_drain() {
    init_tracing();
    let deposit = TxRecord::new(B256::repeat_byte(0x11), depositor(), contract(), eth(10), 0);
    let withdrawal = TxRecord::new(B256::repeat_byte(0x22), contract(), depositor(), eth(9), 120);
    let input = bare().with_transactions(vec![deposit, withdrawal]);

    let verdict = SentinelPipeline::default()
        .analyze(&input, &ExternalFindings::none())
        .unwrap();

    let history = &verdict.per_detector["transaction_history"];
    assert!(history.techniques.contains("Quick Drain"));
    let pairs = history.evidence["quick_drain_pairs"].as_array().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0]["deposit_hash"], B256::repeat_byte(0x11).to_string());
    assert_eq!(pairs[0]["withdrawal_hash"], B256::repeat_byte(0x22).to_string());
    assert!(verdict.techniques.contains("Quick Drain"));
}

#[test]
fn test_scenario_symbolic_only() {
    init_tracing();
    let symbolic = FixedScorer::new(DetectorKind::Symbolic, 0.9).with_technique("reentrancy");
    let external = ExternalFindings::collect(&bare(), None, Some(&symbolic), true);

    let verdict = SentinelPipeline::default().analyze(&bare(), &external).unwrap();

    // symbolic is the only engine present, so its reweighted weight is 1.0
    assert!(close(verdict.overall_confidence, 0.9));
    assert_eq!(verdict.risk_level, RiskLevel::Critical);
    assert!(verdict.techniques.contains("reentrancy"));
}

#[test]
fn test_all_engines_weighted() {
    let ml = FixedScorer::new(DetectorKind::Ml, 0.2);
    let symbolic = FixedScorer::new(DetectorKind::Symbolic, 0.4);
    let input = bare()
        .with_bytecode("0xff")
        .with_transactions(vec![]);
    let external = ExternalFindings::collect(&input, Some(&ml), Some(&symbolic), true);

    let verdict = SentinelPipeline::default().analyze(&input, &external).unwrap();
    // 0.25*0.2 + 0.35*0.4 + 0.25*0.7 + 0.15*0.0
    assert!(close(verdict.overall_confidence, 0.05 + 0.14 + 0.175));
    assert_eq!(verdict.risk_level, RiskLevel::Low);
}

// ============================================
// DEGRADATION
// ============================================

#[test]
fn test_all_absent_is_unknown() {
    init_tracing();
    let verdict = SentinelPipeline::default()
        .analyze(&bare(), &ExternalFindings::none())
        .unwrap();
    assert_eq!(verdict.risk_level, RiskLevel::Unknown);
    assert_eq!(verdict.overall_confidence, 0.0);
    assert!(!verdict.errors.is_empty());
    assert!(verdict.per_detector.is_empty());
}

#[test]
fn test_clean_evidence_is_safe_not_unknown() {
    let input = bare()
        .with_bytecode("0x6080604052")
        .with_abi(vec![])
        .with_source("contract A {}")
        .with_transactions(vec![]);
    let verdict = SentinelPipeline::default()
        .analyze(&input, &ExternalFindings::none())
        .unwrap();
    assert_eq!(verdict.risk_level, RiskLevel::Safe);
    assert!(verdict.errors.is_empty());
    assert_eq!(verdict.per_detector.len(), 4);
}

#[test]
fn test_bad_bytecode_reported_not_fatal() {
    let input = bare()
        .with_bytecode("0x60f")
        .with_abi(vec![FunctionDescriptor::function("claim", StateMutability::Payable)]);
    let verdict = SentinelPipeline::default()
        .analyze(&input, &ExternalFindings::none())
        .unwrap();

    assert_eq!(verdict.errors.len(), 1);
    assert_eq!(verdict.errors[0].detector_name, "bytecode_pattern");
    assert!(!verdict.per_detector.contains_key("bytecode_pattern"));
    assert!(close(verdict.overall_confidence, 0.5));
}

#[test]
fn test_failing_scorer_isolated() {
    let ml = FixedScorer::failing(DetectorKind::Ml, "model unavailable");
    let input = bare().with_bytecode("0xff");
    let external = ExternalFindings::collect(&input, Some(&ml), None, false);

    let verdict = SentinelPipeline::default().analyze(&input, &external).unwrap();
    assert!(close(verdict.overall_confidence, 0.7));
    assert_eq!(verdict.errors[0].detector_name, "ml");
    assert_eq!(verdict.errors[0].message, "model unavailable");
}

#[test]
fn test_malformed_transactions_rejected() {
    let json = r#"{
        "address": "0x00000000000000000000000000000000000000c0",
        "chain_id": 1,
        "transactions": "not a list"
    }"#;
    let err = RawContractInput::from_json(json).unwrap_err();
    assert_eq!(err.code_str(), "INPUT_INVALID");
}

// ============================================
// PROPERTIES
// ============================================

#[test]
fn test_decode_failure_only_on_malformed_hex() {
    for bad in ["0", "0x0", "abc", "0x12345", "0xgg", "0x60 0", "0x6_"] {
        assert!(decode(bad).is_err(), "{} should fail", bad);
    }
    assert!(matches!(decode("0x123"), Err(DecodeError::OddLength { .. })));
    assert!(matches!(decode("0x12zz"), Err(DecodeError::InvalidHex { .. })));

    // deterministic pseudo-random well-formed inputs
    let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
    for len in 0..64 {
        let hex: String = (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                format!("{:02X}", state as u8)
            })
            .collect();
        assert!(decode(&hex).is_ok(), "{}", hex);
        assert!(decode(&format!("0x{}", hex)).is_ok());
    }
}

#[test]
fn test_redistribution_sums_to_one() {
    let aggregator = RiskAggregator::new(Arc::new(AnalysisConfig::default()));
    for mask in 1u8..16 {
        let present: BTreeSet<Engine> = Engine::ALL
            .into_iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, e)| e)
            .collect();
        let sum: f64 = aggregator.effective_weights(&present).values().sum();
        assert!(close(sum, 1.0), "{:?}", present);
    }
}

fn rich_input() -> RawContractInput {
    bare()
        .with_bytecode("0x6080604052343111ff5455f4")
        .with_abi(vec![
            FunctionDescriptor::function("GetReward", StateMutability::Payable),
            FunctionDescriptor::function("balanceOf", StateMutability::View)
                .with_input("owner", "address"),
        ])
        .with_source("function x() { require(this.balance > 0); selfdestruct(owner); }")
        .with_transactions(vec![
            TxRecord::new(B256::repeat_byte(1), depositor(), contract(), eth(2), 100),
            TxRecord::new(B256::repeat_byte(2), contract(), depositor(), eth(2), 160),
        ])
}

#[test]
fn test_verdict_is_deterministic() {
    let pipeline = SentinelPipeline::default();
    let ml = FixedScorer::new(DetectorKind::Ml, 0.33);
    let input = rich_input();
    let external = ExternalFindings::collect(&input, Some(&ml), None, false);

    let first = pipeline.analyze(&input, &external).unwrap().to_json().unwrap();
    for _ in 0..5 {
        let again = pipeline.analyze(&input, &external).unwrap().to_json().unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn test_verdict_round_trip() {
    let ml = FixedScorer::new(DetectorKind::Ml, 0.1).with_technique("anomaly");
    let input = rich_input();
    let external = ExternalFindings::collect(&input, Some(&ml), None, false);
    let verdict = SentinelPipeline::default().analyze(&input, &external).unwrap();

    let json = verdict.to_json().unwrap();
    let wire: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(wire.get("confidence").is_some());
    assert!(wire["detectors"].get("bytecode_pattern").is_some());
    assert!(wire["detectors"]["bytecode_pattern"].get("detector_name").is_none());

    let parsed = AggregateVerdict::from_json(&json).unwrap();
    assert_eq!(parsed, verdict);
}

#[tokio::test]
async fn test_concurrent_path_matches_sequential() {
    init_tracing();
    let pipeline = SentinelPipeline::default();
    let symbolic = FixedScorer::new(DetectorKind::Symbolic, 0.5);
    let input = rich_input();
    let external = ExternalFindings::collect(&input, None, Some(&symbolic), true);

    let sequential = pipeline.analyze(&input, &external).unwrap();
    let concurrent = pipeline.analyze_concurrent(&input, &external).await.unwrap();
    assert_eq!(sequential.to_json().unwrap(), concurrent.to_json().unwrap());
}

#[tokio::test]
async fn test_independent_analyses_in_parallel() {
    let pipeline = Arc::new(SentinelPipeline::default());
    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                let input = bare().with_bytecode(if i % 2 == 0 { "0xff" } else { "0x6080" });
                pipeline
                    .analyze_concurrent(&input, &ExternalFindings::none())
                    .await
                    .unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let verdict = handle.await.unwrap();
        let expected = if i % 2 == 0 { RiskLevel::High } else { RiskLevel::Safe };
        assert_eq!(verdict.risk_level, expected);
    }
}
