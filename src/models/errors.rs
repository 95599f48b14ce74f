//! Centralized Error Handling Module
//!
//! Every failure carries a unique code so it can be grepped in logs.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - INPUT_xxx: boundary validation errors (the only caller-visible failures)
//! - DECODE_xxx: bytecode decoding errors
//! - DETECTOR_xxx: per-detector faults, isolated at the detector boundary
//! - CFG_xxx: configuration errors

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::types::DetectorKind;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Input Errors (1xx)
    // ============================================
    /// Malformed boundary input (wrong JSON shape, bad field value)
    InputInvalid,

    // ============================================
    // Decode Errors (2xx)
    // ============================================
    /// Bytecode hex has an odd number of digits
    DecodeOddLength,
    /// Bytecode contains a non-hex character
    DecodeInvalidHex,

    // ============================================
    // Detector Errors (3xx)
    // ============================================
    /// A detector faulted internally
    DetectorFailed,

    // ============================================
    // Configuration Errors (4xx)
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Source indicator regex failed to compile
    PatternInvalid,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputInvalid => "INPUT_INVALID",
            Self::DecodeOddLength => "DECODE_ODD_LENGTH",
            Self::DecodeInvalidHex => "DECODE_INVALID_HEX",
            Self::DetectorFailed => "DETECTOR_FAILED",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::PatternInvalid => "PATTERN_INVALID",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Boundary input failed structural validation
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputInvalid, msg)
    }

    /// Configuration override could not be parsed or is out of range
    pub fn invalid_config(key: &str, msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("{}: {}", key, msg.into()),
        )
    }
}

// ============================================
// Bytecode decoding
// ============================================

/// Malformed bytecode hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Hex digit count (after the optional `0x`) is odd
    OddLength { digits: usize },
    /// Non-hex character at the given offset (after the optional `0x`)
    InvalidHex { offset: usize, found: char },
}

impl DecodeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::OddLength { .. } => ErrorCode::DecodeOddLength,
            Self::InvalidHex { .. } => ErrorCode::DecodeInvalidHex,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OddLength { digits } => {
                write!(f, "bytecode has odd hex length ({} digits)", digits)
            }
            Self::InvalidHex { offset, found } => {
                write!(f, "invalid hex character {:?} at offset {}", found, offset)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

// ============================================
// Detector faults
// ============================================

/// An unexpected fault inside one detector.
///
/// Never propagated past the detector boundary: the pipeline turns it into
/// an `errors` entry on the verdict and keeps aggregating the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorFailure {
    pub detector: DetectorKind,
    pub message: String,
}

impl DetectorFailure {
    pub fn new(detector: DetectorKind, message: impl Into<String>) -> Self {
        Self {
            detector,
            message: message.into(),
        }
    }
}

impl fmt::Display for DetectorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "detector {} failed: {}", self.detector.as_str(), self.message)
    }
}

impl std::error::Error for DetectorFailure {}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<DecodeError> for AppError {
    fn from(err: DecodeError) -> Self {
        let code = err.code();
        Self::with_source(code, err.to_string(), err)
    }
}

impl From<DetectorFailure> for AppError {
    fn from(err: DetectorFailure) -> Self {
        Self::with_source(ErrorCode::DetectorFailed, err.to_string(), err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::InputInvalid, format!("JSON parse error: {}", err), err)
    }
}

impl From<regex::Error> for AppError {
    fn from(err: regex::Error) -> Self {
        Self::with_source(ErrorCode::PatternInvalid, "Invalid source pattern", err)
    }
}
