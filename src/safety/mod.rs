//! Input moderation gate.
//!
//! Every user turn passes through the gate before any routing or tool
//! dispatch happens. The gate is fail-closed: if the classifier errors, the
//! turn is refused rather than waved through.

use async_trait::async_trait;
use thiserror::Error;

/// Fixed refusal returned for turns that fail moderation.
pub const REFUSAL_MESSAGE: &str =
    "I cannot process requests containing inappropriate content.";

/// Label a classifier must emit for benign input.
pub const OK_LABEL: &str = "OK";

/// Minimum confidence the benign label needs to clear the gate.
pub const SAFE_CONFIDENCE_THRESHOLD: f32 = 0.75;

/// Errors raised while classifying a turn.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The classifier backend failed to produce scores.
    #[error("Failed to classify input: {0}")]
    ClassifierUnavailable(String),
}

/// A single moderation label with its confidence score.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    /// Category label, e.g. `OK` or `HARM`.
    pub label: String,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f32,
}

/// Verdict produced by the gate for one user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    /// Turn may proceed to routing.
    Safe,
    /// Turn must be refused with [`REFUSAL_MESSAGE`].
    Unsafe,
}

/// Interface implemented by moderation classifiers.
#[async_trait]
pub trait SafetyClassifier: Send + Sync {
    /// Score `input` against the classifier's label set.
    async fn classify(&self, input: &str) -> Result<Vec<LabelScore>, ClassificationError>;
}

/// Moderation gate combining a classifier with the acceptance policy.
pub struct SafetyGate {
    classifier: Box<dyn SafetyClassifier>,
}

impl SafetyGate {
    /// Build a gate around the given classifier.
    pub fn new(classifier: Box<dyn SafetyClassifier>) -> Self {
        Self { classifier }
    }

    /// Classify one turn and apply the acceptance policy.
    ///
    /// A turn is safe only when the top-scoring label is [`OK_LABEL`] and its
    /// confidence strictly exceeds [`SAFE_CONFIDENCE_THRESHOLD`]. Ties where
    /// another label matches the top score resolve to unsafe.
    pub async fn check(&self, input: &str) -> Result<SafetyVerdict, ClassificationError> {
        let scores = self.classifier.classify(input).await?;
        Ok(apply_policy(&scores))
    }
}

fn apply_policy(scores: &[LabelScore]) -> SafetyVerdict {
    let Some(top) = scores
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    else {
        return SafetyVerdict::Unsafe;
    };
    let tied_with_other = scores
        .iter()
        .any(|score| score.label != OK_LABEL && score.confidence >= top.confidence);
    if top.label == OK_LABEL && !tied_with_other && top.confidence > SAFE_CONFIDENCE_THRESHOLD {
        SafetyVerdict::Safe
    } else {
        SafetyVerdict::Unsafe
    }
}

/// Deterministic keyword-based classifier.
///
/// Serves as the default backend so the gate works without network access.
/// Patterns are matched case-insensitively against the whole turn.
pub struct LexiconClassifier {
    harm_patterns: Vec<&'static str>,
    abuse_patterns: Vec<&'static str>,
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self {
            harm_patterns: vec![
                "rm -rf",
                "delete all files",
                "wipe the disk",
                "format the drive",
                "drop all tables",
                "destroy the system",
                "make a bomb",
                "build a weapon",
            ],
            abuse_patterns: vec!["kill yourself", "i will hurt you", "i will kill"],
        }
    }
}

#[async_trait]
impl SafetyClassifier for LexiconClassifier {
    async fn classify(&self, input: &str) -> Result<Vec<LabelScore>, ClassificationError> {
        let lowered = input.to_lowercase();
        let harm = self
            .harm_patterns
            .iter()
            .any(|pattern| lowered.contains(pattern));
        let abuse = self
            .abuse_patterns
            .iter()
            .any(|pattern| lowered.contains(pattern));

        let scores = if harm {
            vec![
                LabelScore {
                    label: "HARM".to_string(),
                    confidence: 0.97,
                },
                LabelScore {
                    label: OK_LABEL.to_string(),
                    confidence: 0.03,
                },
            ]
        } else if abuse {
            vec![
                LabelScore {
                    label: "ABUSE".to_string(),
                    confidence: 0.95,
                },
                LabelScore {
                    label: OK_LABEL.to_string(),
                    confidence: 0.05,
                },
            ]
        } else {
            vec![LabelScore {
                label: OK_LABEL.to_string(),
                confidence: 0.99,
            }]
        };
        Ok(scores)
    }
}
