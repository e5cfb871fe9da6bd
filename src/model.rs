// 🧮 Scoring Model Adapter
//
// The trained model is opaque to the service: it takes a feature vector and
// returns (credit score, repayment class). The shipped implementation reads
// a linear artifact exported from training.

use crate::features::{feature_names, FeatureVector, FEATURE_COUNT};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub credit_score: f64,
    pub repayment_class: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ModelError(pub String);

pub trait ScoringModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<ScoreResult, ModelError>;

    /// Identifies the loaded artifact (recorded with every scored record)
    fn fingerprint(&self) -> &str;
}

// ============================================================================
// LINEAR ARTIFACT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreHead {
    pub intercept: f64,
    pub weights: Vec<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassHead {
    pub intercept: f64,
    pub weights: Vec<f64>,
    /// Allowed class labels; the raw output snaps to the nearest one
    pub classes: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub credit_score: ScoreHead,
    pub repayment_class: ClassHead,
}

impl ModelArtifact {
    /// Reject artifacts trained on a different feature layout
    pub fn validate(&self) -> Result<()> {
        let expected: Vec<&str> = feature_names().collect();
        let actual: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        if actual != expected {
            bail!(
                "artifact feature order {:?} does not match service order {:?}",
                actual,
                expected
            );
        }

        if self.credit_score.weights.len() != FEATURE_COUNT {
            bail!(
                "credit_score has {} weights, expected {}",
                self.credit_score.weights.len(),
                FEATURE_COUNT
            );
        }
        if self.repayment_class.weights.len() != FEATURE_COUNT {
            bail!(
                "repayment_class has {} weights, expected {}",
                self.repayment_class.weights.len(),
                FEATURE_COUNT
            );
        }
        if self.repayment_class.classes.is_empty() {
            bail!("repayment_class needs at least one class label");
        }
        if let (Some(min), Some(max)) = (self.credit_score.min, self.credit_score.max) {
            if min > max {
                bail!("credit_score min {} exceeds max {}", min, max);
            }
        }

        Ok(())
    }
}

pub struct LinearScoringModel {
    artifact: ModelArtifact,
    fingerprint: String,
}

impl LinearScoringModel {
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        let bytes = serde_json::to_vec(&artifact)?;
        Self::build(artifact, &bytes)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).context("Failed to parse model artifact")?;
        Self::build(artifact, bytes)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        Self::from_json(&bytes)
    }

    fn build(artifact: ModelArtifact, bytes: &[u8]) -> Result<Self> {
        artifact.validate()?;

        let mut hasher = Sha256::new();
        hasher.update(bytes);

        Ok(LinearScoringModel {
            artifact,
            fingerprint: format!("{:x}", hasher.finalize()),
        })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}

impl ScoringModel for LinearScoringModel {
    fn predict(&self, features: &FeatureVector) -> Result<ScoreResult, ModelError> {
        let head = &self.artifact.credit_score;
        let mut credit_score = head.intercept + features.dot(&head.weights);
        if !credit_score.is_finite() {
            return Err(ModelError(format!(
                "credit score is not finite ({})",
                credit_score
            )));
        }
        if let Some(min) = head.min {
            credit_score = credit_score.max(min);
        }
        if let Some(max) = head.max {
            credit_score = credit_score.min(max);
        }

        let head = &self.artifact.repayment_class;
        let raw_class = head.intercept + features.dot(&head.weights);
        if !raw_class.is_finite() {
            return Err(ModelError(format!(
                "repayment class output is not finite ({})",
                raw_class
            )));
        }
        let repayment_class = head
            .classes
            .iter()
            .copied()
            .min_by(|a, b| (a - raw_class).abs().total_cmp(&(b - raw_class).abs()))
            .ok_or_else(|| ModelError("no repayment classes configured".to_string()))?;

        Ok(ScoreResult {
            credit_score,
            repayment_class,
        })
    }

    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Small artifact: score = 500 + 10·Farm_Size + 20·Repayment_Status,
    /// class = Repayment_Status snapped to {0, 1, 2}
    pub fn test_artifact() -> ModelArtifact {
        let mut score_weights = vec![0.0; FEATURE_COUNT];
        score_weights[6] = 10.0;
        score_weights[15] = 20.0;

        let mut class_weights = vec![0.0; FEATURE_COUNT];
        class_weights[15] = 1.0;

        ModelArtifact {
            feature_names: feature_names().map(str::to_string).collect(),
            credit_score: ScoreHead {
                intercept: 500.0,
                weights: score_weights,
                min: Some(300.0),
                max: Some(850.0),
            },
            repayment_class: ClassHead {
                intercept: 0.0,
                weights: class_weights,
                classes: vec![0.0, 1.0, 2.0],
            },
        }
    }

    pub fn test_model() -> LinearScoringModel {
        LinearScoringModel::from_artifact(test_artifact()).unwrap()
    }

    /// Model that always fails, for error-path tests
    pub struct FailingModel;

    impl ScoringModel for FailingModel {
        fn predict(&self, _features: &FeatureVector) -> Result<ScoreResult, ModelError> {
            Err(ModelError("input contains NaN".to_string()))
        }

        fn fingerprint(&self) -> &str {
            "failing"
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
