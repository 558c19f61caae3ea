//! Rule-ensemble risk scoring engine

use crate::scoring::jitter::JitterSource;
use crate::scoring::rules::{is_private_ip, CountryTier, RiskRules};
use crate::types::transaction::Transaction;
use crate::types::verdict::{Decision, ModelScores, RiskLevel, RiskVerdict, VelocityFlags};
use tracing::trace;

const BASE_RISK: f64 = 0.05;
const ENSEMBLE_JITTER: f64 = 0.02;
const XGBOOST_JITTER: f64 = 0.03;
const LIGHTGBM_JITTER: f64 = 0.03;
const ISOLATION_FOREST_JITTER: f64 = 0.05;
const AUTOENCODER_JITTER: f64 = 0.04;

const BEHAVIOURAL_REASON_SCORE: f64 = 0.5;
const BEHAVIOURAL_REASON_CHANCE: f64 = 0.5;
const ANOMALY_REASON_SCORE: f64 = 0.7;
const ANOMALY_REASON_CHANCE: f64 = 0.4;

const MIN_LATENCY_MS: f64 = 80.0;
const MAX_LATENCY_MS: f64 = 165.0;

/// Amount band contribution; bands are exclusive lower bounds.
fn amount_signal(amount: f64) -> f64 {
    if amount > 10_000.0 {
        0.35
    } else if amount > 5_000.0 {
        0.25
    } else if amount > 2_000.0 {
        0.15
    } else if amount > 1_000.0 {
        0.08
    } else {
        0.0
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.01, 0.99)
}

/// Signals that fired for a single transaction
#[derive(Debug, Clone, Copy)]
struct Signals {
    amount: f64,
    country: CountryTier,
    high_risk_mcc: bool,
    public_ip: bool,
}

/// Deterministic rule ensemble mapping a transaction to a [`RiskVerdict`].
///
/// The engine holds no mutable state. All randomness comes from the
/// [`JitterSource`] passed to each call.
#[derive(Debug, Clone, Default)]
pub struct RiskScoringEngine {
    rules: RiskRules,
}

impl RiskScoringEngine {
    /// Create an engine with the default risk lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom risk lists
    pub fn with_rules(rules: RiskRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RiskRules {
        &self.rules
    }

    fn signals(&self, tx: &Transaction, ip_is_private: bool) -> Signals {
        Signals {
            amount: tx.amount.max(0.0),
            country: self.rules.country_tier(&tx.merchant.country),
            high_risk_mcc: self.rules.is_high_risk_mcc(&tx.merchant.mcc),
            public_ip: !tx.device.ip_address.trim().is_empty() && !ip_is_private,
        }
    }

    fn accumulate(signals: &Signals) -> f64 {
        let mut risk = BASE_RISK + amount_signal(signals.amount);

        risk += match signals.country {
            CountryTier::High => 0.30,
            CountryTier::Medium => 0.12,
            CountryTier::Standard => 0.0,
        };

        if signals.high_risk_mcc {
            risk += 0.22;
        }

        if signals.public_ip {
            risk += 0.06;
        }

        risk.clamp(0.02, 0.98)
    }

    /// Pre-jitter risk, clamped to `[0.02, 0.98]`
    pub fn base_risk(&self, tx: &Transaction, ip_is_private: bool) -> f64 {
        Self::accumulate(&self.signals(tx, ip_is_private))
    }

    /// Score a transaction, classifying its IP address automatically
    pub fn score_transaction<J>(&self, tx: &Transaction, jitter: &mut J) -> RiskVerdict
    where
        J: JitterSource + ?Sized,
    {
        self.score(tx, is_private_ip(&tx.device.ip_address), jitter)
    }

    /// Score a transaction.
    ///
    /// Draw order from `jitter` is fixed: ensemble jitter, the four sub-model
    /// jitters, then the two reason coin flips (each only when its score gate is
    /// met), then simulated latency.
    pub fn score<J>(&self, tx: &Transaction, ip_is_private: bool, jitter: &mut J) -> RiskVerdict
    where
        J: JitterSource + ?Sized,
    {
        let signals = self.signals(tx, ip_is_private);
        let base = Self::accumulate(&signals);

        let ensemble = clamp_score(base + jitter.symmetric(ENSEMBLE_JITTER));

        let model_scores = ModelScores {
            xgboost: clamp_score(ensemble + jitter.symmetric(XGBOOST_JITTER)),
            lightgbm: clamp_score(ensemble + jitter.symmetric(LIGHTGBM_JITTER)),
            isolation_forest: clamp_score(ensemble + jitter.symmetric(ISOLATION_FOREST_JITTER)),
            autoencoder: clamp_score(ensemble + jitter.symmetric(AUTOENCODER_JITTER)),
            ensemble,
        };

        let fraud_reasons = self.reasons(tx, &signals, ensemble, jitter);
        let latency_ms = jitter.between(MIN_LATENCY_MS, MAX_LATENCY_MS);

        let verdict = RiskVerdict {
            risk_score: ensemble,
            risk_level: RiskLevel::from_score(ensemble),
            decision: Decision::from_score(ensemble),
            model_scores,
            fraud_reasons,
            velocity_flags: VelocityFlags {
                unusual_amount: signals.amount > 1_000.0,
                geo_risk: signals.country != CountryTier::Standard,
                high_risk_mcc: signals.high_risk_mcc,
                new_device: signals.public_ip,
            },
            latency_ms,
        };

        trace!(
            transaction_id = %tx.id,
            base_risk = base,
            risk_score = verdict.risk_score,
            decision = %verdict.decision,
            "Transaction scored"
        );

        verdict
    }

    fn reasons<J>(&self, tx: &Transaction, signals: &Signals, ensemble: f64, jitter: &mut J) -> Vec<String>
    where
        J: JitterSource + ?Sized,
    {
        let mut reasons = Vec::new();
        let country = tx.merchant.country.trim();

        if amount_signal(signals.amount) > 0.0 {
            reasons.push(format!(
                "Transaction amount significantly above historical average (${:.2})",
                signals.amount
            ));
        }
        match signals.country {
            CountryTier::High => reasons.push(format!(
                "Transaction origin from OFAC-monitored country ({country})"
            )),
            CountryTier::Medium => {
                reasons.push(format!("Elevated-risk country of origin ({country})"))
            }
            CountryTier::Standard => {}
        }
        if signals.high_risk_mcc {
            reasons.push(format!(
                "High-risk merchant category code detected (MCC {})",
                tx.merchant.mcc.trim()
            ));
        }
        if signals.public_ip {
            reasons.push(format!(
                "IP address {} outside known cardholder region",
                tx.device.ip_address.trim()
            ));
        }

        if ensemble > BEHAVIOURAL_REASON_SCORE && jitter.chance(BEHAVIOURAL_REASON_CHANCE) {
            reasons.push("Behavioral pattern deviates from cardholder's 30-day profile".to_string());
        }
        if ensemble > ANOMALY_REASON_SCORE && jitter.chance(ANOMALY_REASON_CHANCE) {
            reasons.push(
                "Autoencoder reconstruction error exceeds anomaly threshold (0.78)".to_string(),
            );
        }

        reasons
    }
}
