//! Detector seam
//!
//! Every internal detector reads one evidence field of `RawContractInput`
//! and answers with a `DetectorOutcome`. Faults stop at this boundary.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::models::errors::DetectorFailure;
use crate::models::types::{DetectorKind, DetectorOutcome, RawContractInput};

/// Pure function from one evidence source to a finding.
pub trait Detector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    /// Never panics on well-formed input; `run_isolated` covers the rest.
    fn analyze(&self, input: &RawContractInput) -> DetectorOutcome;
}

/// Run one detector, turning a panic into `DetectorOutcome::Failed`.
pub fn run_isolated(detector: &dyn Detector, input: &RawContractInput) -> DetectorOutcome {
    let kind = detector.kind();
    isolate(kind, || detector.analyze(input))
}

pub(crate) fn isolate<F>(kind: DetectorKind, f: F) -> DetectorOutcome
where
    F: FnOnce() -> DetectorOutcome,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("💥 Detector {} panicked: {}", kind.as_str(), message);
            DetectorOutcome::Failed(DetectorFailure::new(kind, message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic: <non-string payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::DetectorFinding;

    struct Exploding;

    impl Detector for Exploding {
        fn kind(&self) -> DetectorKind {
            DetectorKind::SourcePattern
        }

        fn analyze(&self, _input: &RawContractInput) -> DetectorOutcome {
            panic!("regex engine blew up")
        }
    }

    struct Quiet;

    impl Detector for Quiet {
        fn kind(&self) -> DetectorKind {
            DetectorKind::BytecodePattern
        }

        fn analyze(&self, _input: &RawContractInput) -> DetectorOutcome {
            DetectorOutcome::Ran(DetectorFinding::clean(DetectorKind::BytecodePattern))
        }
    }

    #[test]
    fn test_panic_becomes_failure() {
        let outcome = run_isolated(&Exploding, &RawContractInput::default());
        match outcome {
            DetectorOutcome::Failed(failure) => {
                assert_eq!(failure.detector, DetectorKind::SourcePattern);
                assert!(failure.message.contains("regex engine blew up"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_normal_outcome_passes_through() {
        let outcome = run_isolated(&Quiet, &RawContractInput::default());
        assert_eq!(outcome.finding().map(|f| f.confidence), Some(0.0));
    }
}
