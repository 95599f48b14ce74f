//! Core Module - Detectors & Risk Aggregation
//!
//! Brain of the crate: the four internal detectors, the external scorer
//! seam, the aggregator and the pipeline that ties them together.

pub mod aggregator;
pub mod bytecode_patterns;
pub mod detector;
pub mod function_signatures;
pub mod pipeline;
pub mod scorers;
pub mod source_patterns;
pub mod transaction_history;

pub use aggregator::*;
pub use bytecode_patterns::*;
pub use detector::*;
pub use function_signatures::*;
pub use pipeline::*;
pub use scorers::*;
pub use source_patterns::*;
pub use transaction_history::*;
