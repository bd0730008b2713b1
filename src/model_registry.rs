use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::features::{FeatureSchema, FeatureVector};

pub const PRIMARY_MODEL_ID: &str = "xgb_model";
pub const SECONDARY_MODEL_ID: &str = "lgbm_model";

/// A trained "probability of scoring given this vector" model. Treated as a
/// black box by the predictor.
pub trait ScoringModel: Send + Sync {
    fn name(&self) -> &str;
    fn predict_proba(&self, features: &FeatureVector) -> f64;
}

/// Standardized logistic model exported by the training job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticArtifact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub feature_means: Vec<f64>,
    #[serde(default)]
    pub feature_stds: Vec<f64>,
    #[serde(default)]
    pub coeffs: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

#[derive(Debug, Clone)]
pub struct LogisticModel {
    artifact: LogisticArtifact,
    schema: FeatureSchema,
}

impl LogisticModel {
    pub fn from_artifact(artifact: LogisticArtifact) -> Result<Self> {
        let schema = FeatureSchema::from_len(artifact.coeffs.len()).ok_or_else(|| {
            anyhow!(
                "model {} has {} coefficients, expected 12 or 20",
                artifact.name,
                artifact.coeffs.len()
            )
        })?;
        if !artifact.feature_names.is_empty() {
            let expected = schema.names();
            if artifact.feature_names.len() != expected.len()
                || artifact
                    .feature_names
                    .iter()
                    .zip(expected)
                    .any(|(a, b)| a != b)
            {
                return Err(anyhow!("model {} feature order mismatch", artifact.name));
            }
        }
        if artifact.coeffs.iter().any(|c| !c.is_finite()) || !artifact.intercept.is_finite() {
            return Err(anyhow!("model {} has non-finite coefficients", artifact.name));
        }
        Ok(Self { artifact, schema })
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    fn standardized(&self, raw: f64, idx: usize) -> f64 {
        let mean = self.artifact.feature_means.get(idx).copied().unwrap_or(0.0);
        let std = self
            .artifact
            .feature_stds
            .get(idx)
            .copied()
            .filter(|s| s.is_finite() && *s > 1e-9)
            .unwrap_or(1.0);
        (raw - mean) / std
    }
}

impl ScoringModel for LogisticModel {
    fn name(&self) -> &str {
        &self.artifact.name
    }

    fn predict_proba(&self, features: &FeatureVector) -> f64 {
        let logit = features
            .values(self.schema)
            .iter()
            .zip(&self.artifact.coeffs)
            .enumerate()
            .fold(self.artifact.intercept, |acc, (idx, (x, c))| {
                acc + c * self.standardized(*x, idx)
            });
        sigmoid(logit)
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub fn model_path(dir: &Path, identifier: &str) -> PathBuf {
    dir.join(format!("{identifier}.json"))
}

pub fn read_model(dir: &Path, identifier: &str) -> Result<LogisticModel> {
    let path = model_path(dir, identifier);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read model artifact {}", path.display()))?;
    let mut artifact: LogisticArtifact = serde_json::from_str(&raw)
        .with_context(|| format!("parse model artifact {}", path.display()))?;
    if artifact.name.trim().is_empty() {
        artifact.name = identifier.to_string();
    }
    LogisticModel::from_artifact(artifact)
}

pub fn load_model(dir: &Path, identifier: &str) -> Option<Arc<dyn ScoringModel>> {
    match read_model(dir, identifier) {
        Ok(model) => Some(Arc::new(model)),
        Err(err) => {
            warn!(model = identifier, "model unavailable: {err:#}");
            None
        }
    }
}

/// Both model slots, fixed at startup. If either slot is empty the predictor
/// runs the heuristic.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    primary: Option<Arc<dyn ScoringModel>>,
    secondary: Option<Arc<dyn ScoringModel>>,
}

impl ModelRegistry {
    pub fn load(dir: Option<&Path>) -> Self {
        let Some(dir) = dir else {
            info!("no model directory configured, using heuristic predictor");
            return Self::default();
        };
        let registry = Self {
            primary: load_model(dir, PRIMARY_MODEL_ID),
            secondary: load_model(dir, SECONDARY_MODEL_ID),
        };
        if registry.is_trained() {
            info!(dir = %dir.display(), "trained models loaded");
        } else {
            warn!(dir = %dir.display(), "model slot missing, using heuristic predictor");
        }
        registry
    }

    pub fn from_models(
        primary: Option<Arc<dyn ScoringModel>>,
        secondary: Option<Arc<dyn ScoringModel>>,
    ) -> Self {
        Self { primary, secondary }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_trained(&self) -> bool {
        self.primary.is_some() && self.secondary.is_some()
    }

    pub fn pair(&self) -> Option<(&Arc<dyn ScoringModel>, &Arc<dyn ScoringModel>)> {
        Some((self.primary.as_ref()?, self.secondary.as_ref()?))
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("primary", &self.primary.as_ref().map(|m| m.name().to_string()))
            .field("secondary", &self.secondary.as_ref().map(|m| m.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;

    fn artifact(coeffs: Vec<f64>) -> LogisticArtifact {
        LogisticArtifact {
            name: "t".into(),
            feature_names: Vec::new(),
            feature_means: Vec::new(),
            feature_stds: Vec::new(),
            coeffs,
            intercept: 0.0,
        }
    }

    #[test]
    fn zero_coefficients_give_even_odds() {
        let model = LogisticModel::from_artifact(artifact(vec![0.0; 12])).unwrap();
        assert_eq!(model.schema(), FeatureSchema::V12);
        let v = FeatureVector::from_values([1.0; FEATURE_COUNT]);
        assert!((model.predict_proba(&v) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn extreme_logits_stay_in_unit_interval() {
        let model = LogisticModel::from_artifact(artifact(vec![1e6; 20])).unwrap();
        let hi = model.predict_proba(&FeatureVector::from_values([1.0; FEATURE_COUNT]));
        let lo = model.predict_proba(&FeatureVector::from_values([-1.0; FEATURE_COUNT]));
        assert!((0.0..=1.0).contains(&hi) && hi > 0.99);
        assert!((0.0..=1.0).contains(&lo) && lo < 0.01);
    }

    #[test]
    fn rejects_unknown_dimensions_and_misordered_names() {
        assert!(LogisticModel::from_artifact(artifact(vec![0.0; 7])).is_err());
        let mut a = artifact(vec![0.0; 12]);
        a.feature_names = crate::features::FeatureSchema::V12
            .names()
            .iter()
            .rev()
            .map(|s| s.to_string())
            .collect();
        assert!(LogisticModel::from_artifact(a).is_err());
    }

    #[test]
    fn missing_directory_means_untrained() {
        assert!(!ModelRegistry::load(None).is_trained());
        let dir = std::env::temp_dir().join("scorer_forecast_no_models_here");
        assert!(!ModelRegistry::load(Some(&dir)).is_trained());
    }
}
