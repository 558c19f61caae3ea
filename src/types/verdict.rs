//! Risk verdict data structures

use crate::types::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discretised risk level, ordered from safest to riskiest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Band an ensemble score. Lower bounds are inclusive.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.90 {
            RiskLevel::Critical
        } else if score >= 0.72 {
            RiskLevel::High
        } else if score >= 0.45 {
            RiskLevel::Medium
        } else if score >= 0.20 {
            RiskLevel::Low
        } else {
            RiskLevel::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action taken on a transaction.
///
/// The batch endpoints report lower-case statuses (`approved`, `reviewing`, `blocked`),
/// which are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "APPROVED", alias = "approved")]
    Approved,
    #[serde(rename = "REVIEW", alias = "review", alias = "reviewing")]
    Review,
    #[serde(rename = "BLOCKED", alias = "blocked")]
    Blocked,
}

impl Decision {
    /// Decide from an ensemble score. Lower bounds are inclusive.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.82 {
            Decision::Blocked
        } else if score >= 0.45 {
            Decision::Review
        } else {
            Decision::Approved
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Approved => "APPROVED",
            Decision::Review => "REVIEW",
            Decision::Blocked => "BLOCKED",
        };
        f.write_str(s)
    }
}

/// Per-model scores. Each sub-model is a perturbation of the ensemble score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelScores {
    pub xgboost: f64,
    pub lightgbm: f64,
    pub isolation_forest: f64,
    pub autoencoder: f64,
    pub ensemble: f64,
}

impl ModelScores {
    /// Sub-model scores paired with their names, ensemble excluded
    pub fn sub_models(&self) -> [(&'static str, f64); 4] {
        [
            ("xgboost", self.xgboost),
            ("lightgbm", self.lightgbm),
            ("isolation_forest", self.isolation_forest),
            ("autoencoder", self.autoencoder),
        ]
    }
}

/// Boolean signals surfaced next to the score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityFlags {
    pub unusual_amount: bool,
    pub geo_risk: bool,
    #[serde(rename = "highRiskMCC")]
    pub high_risk_mcc: bool,
    pub new_device: bool,
}

/// Verdict produced once per transaction by the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskVerdict {
    /// Ensemble score in [0.01, 0.99]
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    #[serde(rename = "status")]
    pub decision: Decision,
    pub model_scores: ModelScores,
    /// Ordered trigger reasons, may be empty
    #[serde(default)]
    pub fraud_reasons: Vec<String>,
    #[serde(default)]
    pub velocity_flags: VelocityFlags,
    #[serde(default)]
    pub latency_ms: f64,
}

/// A transaction paired with its verdict. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(flatten)]
    pub verdict: RiskVerdict,
}

impl ScoredTransaction {
    pub fn new(transaction: Transaction, verdict: RiskVerdict) -> Self {
        Self {
            transaction,
            verdict,
        }
    }

    pub fn id(&self) -> &str {
        &self.transaction.id
    }

    pub fn is_fraud(&self) -> bool {
        self.verdict.risk_level >= RiskLevel::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(0.05), RiskLevel::Safe);
        assert_eq!(RiskLevel::from_score(0.20), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.4499), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.45), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.72), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.8999), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.90), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Safe < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_decision_thresholds() {
        assert_eq!(Decision::from_score(0.44), Decision::Approved);
        assert_eq!(Decision::from_score(0.45), Decision::Review);
        assert_eq!(Decision::from_score(0.8199), Decision::Review);
        assert_eq!(Decision::from_score(0.82), Decision::Blocked);
        assert_eq!(Decision::from_score(0.99), Decision::Blocked);
    }

    #[test]
    fn test_decision_accepts_backend_statuses() {
        let d: Decision = serde_json::from_str(r#""reviewing""#).unwrap();
        assert_eq!(d, Decision::Review);
        let d: Decision = serde_json::from_str(r#""BLOCKED""#).unwrap();
        assert_eq!(d, Decision::Blocked);
        assert_eq!(serde_json::to_string(&Decision::Approved).unwrap(), r#""APPROVED""#);
    }
}
