//! Ruster Sentinel Library
//!
//! Multi-engine honeypot detection for smart-contract bytecode. Turns raw
//! on-chain evidence into one auditable risk verdict:
//! - Opcode-set signatures over decoded bytecode
//! - Suspicious payable functions in the ABI
//! - Dangerous constructs in verified source
//! - Quick-drain and owner-only patterns in transaction history
//! - ML and symbolic-execution scores supplied by external engines
//!
//! ```no_run
//! use ruster_sentinel::{ExternalFindings, RawContractInput, SentinelPipeline};
//!
//! # fn main() -> ruster_sentinel::AppResult<()> {
//! let input = RawContractInput::from_json(r#"{"address":"0x00000000000000000000000000000000000000c0","chain_id":1,"bytecode":"0x60ff"}"#)?;
//! let verdict = SentinelPipeline::default().analyze(&input, &ExternalFindings::none())?;
//! println!("{}", verdict.summary());
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod models;
pub mod utils;

pub use crate::core::{
    BytecodePatternDetector, Detector, Engine, ExternalFindings, ExternalScorer, FixedScorer,
    FunctionSignatureDetector, RiskAggregator, SentinelPipeline, SourcePatternDetector,
    TransactionHistoryDetector,
};
pub use models::{
    AggregateVerdict, AnalysisConfig, AppError, AppResult, DecodeError, DetectorError,
    DetectorFailure, DetectorFinding, DetectorKind, DetectorOutcome, ErrorCode,
    FunctionDescriptor, RawContractInput, RiskLevel, StateMutability, TxRecord,
};
pub use utils::decoder::{decode, OpcodeSequence};
