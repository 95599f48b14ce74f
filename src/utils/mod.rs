//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants and the opcode decoder, shared by every detector.

pub mod constants;
pub mod decoder;

pub use constants::*;
pub use decoder::*;
