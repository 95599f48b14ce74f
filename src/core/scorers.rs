//! External scorers
//!
//! The ML classifier and the symbolic-execution engine live outside this
//! crate. They are invoked once, upfront, by the service layer and their
//! results are handed to the pipeline as `ExternalFindings`.

use tracing::{info, warn};

use crate::core::detector::isolate;
use crate::models::errors::DetectorFailure;
use crate::models::types::{DetectorFinding, DetectorKind, DetectorOutcome, RawContractInput};

/// Shape shared by the ML and symbolic collaborators.
pub trait ExternalScorer: Send + Sync {
    fn kind(&self) -> DetectorKind;

    fn analyze(&self, input: &RawContractInput) -> Result<DetectorFinding, DetectorFailure>;
}

/// Scorer that always returns the same result. Useful as a stand-in when
/// the real engine is not wired up, and in tests.
#[derive(Debug, Clone)]
pub struct FixedScorer {
    kind: DetectorKind,
    result: Result<DetectorFinding, DetectorFailure>,
}

impl FixedScorer {
    pub fn new(kind: DetectorKind, confidence: f64) -> Self {
        Self {
            kind,
            result: Ok(DetectorFinding::new(kind, confidence)),
        }
    }

    pub fn with_technique(mut self, technique: &str) -> Self {
        self.result = self.result.map(|finding| finding.with_technique(technique));
        self
    }

    pub fn failing(kind: DetectorKind, message: &str) -> Self {
        Self {
            kind,
            result: Err(DetectorFailure::new(kind, message)),
        }
    }
}

impl ExternalScorer for FixedScorer {
    fn kind(&self) -> DetectorKind {
        self.kind
    }

    fn analyze(&self, _input: &RawContractInput) -> Result<DetectorFinding, DetectorFailure> {
        self.result.clone()
    }
}

/// Results from the external engines. `None` means the engine was not
/// invoked and is excluded from weighting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalFindings {
    pub ml: Option<Result<DetectorFinding, DetectorFailure>>,
    pub symbolic: Option<Result<DetectorFinding, DetectorFailure>>,
}

impl ExternalFindings {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_ml(mut self, finding: DetectorFinding) -> Self {
        self.ml = Some(Ok(finding));
        self
    }

    pub fn with_symbolic(mut self, finding: DetectorFinding) -> Self {
        self.symbolic = Some(Ok(finding));
        self
    }

    /// Invoke the collaborators. Symbolic execution is expensive and only
    /// runs when `deep_analysis` is requested.
    pub fn collect(
        input: &RawContractInput,
        ml: Option<&dyn ExternalScorer>,
        symbolic: Option<&dyn ExternalScorer>,
        deep_analysis: bool,
    ) -> Self {
        let ml = ml.map(|scorer| invoke(scorer, input));
        let symbolic = if deep_analysis {
            symbolic.map(|scorer| invoke(scorer, input))
        } else {
            None
        };

        info!(
            "🤖 External scorers: ml={} symbolic={}",
            describe(&ml),
            describe(&symbolic)
        );
        Self { ml, symbolic }
    }

    /// Outcomes keyed by engine; engines not invoked are left out.
    pub fn outcomes(&self) -> Vec<(DetectorKind, DetectorOutcome)> {
        [
            (DetectorKind::Ml, &self.ml),
            (DetectorKind::Symbolic, &self.symbolic),
        ]
        .into_iter()
        .filter_map(|(kind, result)| {
            let outcome = match result.as_ref()? {
                Ok(finding) => DetectorOutcome::Ran(finding.clone()),
                Err(failure) => DetectorOutcome::Failed(failure.clone()),
            };
            Some((kind, outcome))
        })
        .collect()
    }
}

fn invoke(scorer: &dyn ExternalScorer, input: &RawContractInput) -> Result<DetectorFinding, DetectorFailure> {
    let kind = scorer.kind();
    let outcome = isolate(kind, || match scorer.analyze(input) {
        Ok(finding) => DetectorOutcome::Ran(finding),
        Err(failure) => DetectorOutcome::Failed(failure),
    });
    match outcome {
        DetectorOutcome::Ran(finding) => Ok(finding),
        DetectorOutcome::Failed(failure) => {
            warn!("⚠️ {}", failure);
            Err(failure)
        }
        DetectorOutcome::Unavailable { reason, .. } => Err(DetectorFailure::new(
            kind,
            reason.unwrap_or_else(|| "unavailable".to_string()),
        )),
    }
}

fn describe(result: &Option<Result<DetectorFinding, DetectorFailure>>) -> String {
    match result {
        None => "skipped".to_string(),
        Some(Ok(finding)) => format!("{:.2}", finding.confidence),
        Some(Err(_)) => "failed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panicking;

    impl ExternalScorer for Panicking {
        fn kind(&self) -> DetectorKind {
            DetectorKind::Ml
        }

        fn analyze(&self, _input: &RawContractInput) -> Result<DetectorFinding, DetectorFailure> {
            panic!("model file missing")
        }
    }

    #[test]
    fn test_symbolic_skipped_without_deep_analysis() {
        let input = RawContractInput::default();
        let ml = FixedScorer::new(DetectorKind::Ml, 0.3);
        let symbolic = FixedScorer::new(DetectorKind::Symbolic, 0.9).with_technique("reentrancy");

        let shallow = ExternalFindings::collect(&input, Some(&ml), Some(&symbolic), false);
        assert!(shallow.ml.is_some());
        assert!(shallow.symbolic.is_none());
        assert_eq!(shallow.outcomes().len(), 1);

        let deep = ExternalFindings::collect(&input, Some(&ml), Some(&symbolic), true);
        let finding = deep.symbolic.unwrap().unwrap();
        assert!(finding.techniques.contains("reentrancy"));
    }

    #[test]
    fn test_scorer_panic_is_isolated() {
        let input = RawContractInput::default();
        let findings = ExternalFindings::collect(&input, Some(&Panicking), None, true);
        let failure = findings.ml.unwrap().unwrap_err();
        assert_eq!(failure.detector, DetectorKind::Ml);
        assert!(failure.message.contains("model file missing"));
    }

    #[test]
    fn test_failing_scorer_outcome() {
        let input = RawContractInput::default();
        let scorer = FixedScorer::failing(DetectorKind::Symbolic, "solver timeout");
        let findings = ExternalFindings::collect(&input, None, Some(&scorer), true);
        let outcomes = findings.outcomes();
        assert!(matches!(outcomes[0], (DetectorKind::Symbolic, DetectorOutcome::Failed(_))));
    }
}
