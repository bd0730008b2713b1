use serde::{Deserialize, Serialize};

/// Confidence tiers, lowest first so that `Ord` follows probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Faible,
    Moyen,
    Eleve,
    TresEleve,
    QuasiCertain,
}

// Highest bound first; the first match wins.
const THRESHOLDS: [(f64, ConfidenceLevel); 4] = [
    (0.90, ConfidenceLevel::QuasiCertain),
    (0.80, ConfidenceLevel::TresEleve),
    (0.70, ConfidenceLevel::Eleve),
    (0.50, ConfidenceLevel::Moyen),
];

pub fn classify(probability: f64) -> ConfidenceLevel {
    THRESHOLDS
        .iter()
        .find(|(bound, _)| probability >= *bound)
        .map(|(_, level)| *level)
        .unwrap_or(ConfidenceLevel::Faible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(classify(0.90), ConfidenceLevel::QuasiCertain);
        assert_eq!(classify(0.8999), ConfidenceLevel::TresEleve);
        assert_eq!(classify(0.80), ConfidenceLevel::TresEleve);
        assert_eq!(classify(0.70), ConfidenceLevel::Eleve);
        assert_eq!(classify(0.50), ConfidenceLevel::Moyen);
        assert_eq!(classify(0.4999), ConfidenceLevel::Faible);
        assert_eq!(classify(0.0), ConfidenceLevel::Faible);
        assert_eq!(classify(1.0), ConfidenceLevel::QuasiCertain);
    }

    #[test]
    fn nan_is_lowest_tier() {
        assert_eq!(classify(f64::NAN), ConfidenceLevel::Faible);
    }

    #[test]
    fn monotonic_over_unit_interval() {
        let mut prev = classify(0.0);
        for i in 1..=1000 {
            let level = classify(i as f64 / 1000.0);
            assert!(level >= prev, "tier dropped at {i}");
            prev = level;
        }
    }

    #[test]
    fn serializes_as_labels() {
        let raw = serde_json::to_string(&ConfidenceLevel::TresEleve).unwrap();
        assert_eq!(raw, "\"TRES_ELEVE\"");
    }
}
