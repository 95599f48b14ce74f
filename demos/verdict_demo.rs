//! Verdict Demo
//!
//! Runs the sentinel pipeline over a few hand-built evidence bundles and
//! prints the verdicts.
//!
//! Run with: cargo run --example verdict_demo

use alloy_primitives::{Address, B256, U256};
use eyre::Result;
use ruster_sentinel::{
    AnalysisConfig, DetectorKind, ExternalFindings, FixedScorer, FunctionDescriptor,
    RawContractInput, SentinelPipeline, StateMutability, TxRecord,
};
use ruster_sentinel::utils::constants::{APP_NAME, APP_VERSION};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    println!(
        r#"
    ╔══════════════════════════════════════════════════════════════╗
    ║   🛡️  RUSTER SENTINEL - VERDICT DEMO                          ║
    ║   Bytecode + ABI + source + history -> one risk verdict      ║
    ╚══════════════════════════════════════════════════════════════╝
    "#
    );

    println!("   {} v{}\n", APP_NAME, APP_VERSION);

    let config = Arc::new(AnalysisConfig::from_env()?);
    let pipeline = SentinelPipeline::new(config);
    let contract: Address = "0x00000000000000000000000000000000000000c0".parse()?;
    let victim: Address = "0x00000000000000000000000000000000000000a1".parse()?;

    // ============================================
    // CASE 1: Self-destructing bait
    // ============================================
    section("CASE 1: SELFDESTRUCT in bytecode, payable withdraw()");
    let input = RawContractInput::new(contract, 1)
        .with_bytecode("0x6080604052ff")
        .with_abi(vec![FunctionDescriptor::function("withdraw", StateMutability::Payable)]);
    let verdict = pipeline.analyze(&input, &ExternalFindings::none())?;
    println!("{}", verdict.summary());

    // ============================================
    // CASE 2: Quick drain, with external scorers
    // ============================================
    section("CASE 2: Quick drain + ML + symbolic (deep analysis)");
    let one_eth = U256::from(1_000_000_000_000_000_000u128);
    let input = RawContractInput::new(contract, 1).with_transactions(vec![
        TxRecord::new(B256::repeat_byte(1), victim, contract, one_eth * U256::from(10), 0),
        TxRecord::new(B256::repeat_byte(2), contract, victim, one_eth * U256::from(9), 120),
    ]);
    let ml = FixedScorer::new(DetectorKind::Ml, 0.4);
    let symbolic = FixedScorer::new(DetectorKind::Symbolic, 0.9).with_technique("reentrancy");
    let external = ExternalFindings::collect(&input, Some(&ml), Some(&symbolic), true);
    let verdict = pipeline.analyze_concurrent(&input, &external).await?;
    println!("{}", verdict.summary());

    // ============================================
    // CASE 3: Nothing to look at
    // ============================================
    section("CASE 3: No evidence at all");
    let verdict = pipeline.analyze(&RawContractInput::new(contract, 1), &ExternalFindings::none())?;
    println!("{}", verdict.summary());
    println!("{}", verdict.to_json()?);

    Ok(())
}

fn section(title: &str) {
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📋 {}", title);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
