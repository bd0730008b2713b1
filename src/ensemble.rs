use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;
use crate::model_registry::ModelRegistry;

/// Coefficients of the fallback linear heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicCoefficients {
    pub base: f64,
    pub shots_cap: f64,
    pub shots_weight: f64,
    pub goals_cap: f64,
    pub goals_weight: f64,
    pub rating_cap: f64,
    pub rating_weight: f64,
    pub starter_confirmed_boost: f64,
    pub starter_unconfirmed_boost: f64,
    pub home_boost: f64,
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for HeuristicCoefficients {
    fn default() -> Self {
        Self {
            base: 0.52,
            shots_cap: 6.0,
            shots_weight: 0.12,
            goals_cap: 5.0,
            goals_weight: 0.18,
            rating_cap: 9.0,
            rating_weight: 0.035,
            starter_confirmed_boost: 0.08,
            starter_unconfirmed_boost: 0.04,
            home_boost: 0.03,
            floor: 0.40,
            ceiling: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictorMode {
    Ensemble,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub probability: f64,
    pub mode: PredictorMode,
    pub sub_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct EnsemblePredictor {
    registry: ModelRegistry,
    coefficients: HeuristicCoefficients,
    mode: PredictorMode,
}

impl EnsemblePredictor {
    pub fn new(registry: ModelRegistry) -> Self {
        Self::with_coefficients(registry, HeuristicCoefficients::default())
    }

    pub fn with_coefficients(registry: ModelRegistry, coefficients: HeuristicCoefficients) -> Self {
        let mode = if registry.is_trained() {
            PredictorMode::Ensemble
        } else {
            PredictorMode::Heuristic
        };
        Self {
            registry,
            coefficients,
            mode,
        }
    }

    pub fn mode(&self) -> PredictorMode {
        self.mode
    }

    pub fn predict(&self, vector: &FeatureVector) -> Prediction {
        match (self.mode, self.registry.pair()) {
            (PredictorMode::Ensemble, Some((a, b))) => {
                let pa = unit(a.predict_proba(vector));
                let pb = unit(b.predict_proba(vector));
                let mut sub_scores = BTreeMap::new();
                sub_scores.insert(a.name().to_string(), pa);
                sub_scores.insert(b.name().to_string(), pb);
                Prediction {
                    probability: (pa + pb) / 2.0,
                    mode: PredictorMode::Ensemble,
                    sub_scores,
                }
            }
            _ => self.predict_heuristic(vector),
        }
    }

    /// Deterministic path, available whatever the mode.
    pub fn predict_heuristic(&self, vector: &FeatureVector) -> Prediction {
        let c = &self.coefficients;
        let shots = finite_or_zero(vector.shots_total()).min(c.shots_cap) * c.shots_weight;
        let goals = finite_or_zero(vector.goals_last_5()).min(c.goals_cap) * c.goals_weight;
        let rating = finite_or_zero(vector.match_rating()).min(c.rating_cap) * c.rating_weight;
        let starter = if vector.is_starter() >= 1.0 {
            c.starter_confirmed_boost
        } else {
            c.starter_unconfirmed_boost
        };
        let home = if vector.is_home() { c.home_boost } else { 0.0 };

        let raw = c.base + shots + goals + rating + starter + home;
        let mut sub_scores = BTreeMap::new();
        sub_scores.insert("base".to_string(), c.base);
        sub_scores.insert("shots".to_string(), shots);
        sub_scores.insert("recent_goals".to_string(), goals);
        sub_scores.insert("rating".to_string(), rating);
        sub_scores.insert("starter_boost".to_string(), starter);
        sub_scores.insert("home_boost".to_string(), home);
        sub_scores.insert("raw".to_string(), raw);

        Prediction {
            probability: raw.clamp(c.floor, c.ceiling),
            mode: PredictorMode::Heuristic,
            sub_scores,
        }
    }
}

fn unit(p: f64) -> f64 {
    if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x.max(0.0) } else { 0.0 }
}
