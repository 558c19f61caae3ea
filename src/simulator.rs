//! What-if simulator: score a hand-entered transaction on demand.

use crate::config::AppConfig;
use crate::error::SimulationError;
use crate::feed::buffer::EventBuffer;
use crate::scoring::{JitterSource, RiskScoringEngine, SeededJitter};
use crate::serde_utils::parse_amount;
use crate::types::transaction::{Device, Merchant, Transaction};
use crate::types::verdict::ScoredTransaction;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Default number of results kept in the session history
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Raw form input. Only `merchant` and `amount` are required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationInput {
    pub card_number: String,
    /// Generated when blank
    pub transaction_id: String,
    pub merchant: String,
    pub mcc: String,
    /// Free text, parsed leniently
    pub amount: String,
    pub currency: String,
    pub country: String,
    pub ip_address: String,
}

impl SimulationInput {
    fn validate(&self) -> Result<(), SimulationError> {
        if self.amount.trim().is_empty() {
            return Err(SimulationError::MissingField("amount"));
        }
        if self.merchant.trim().is_empty() {
            return Err(SimulationError::MissingField("merchant"));
        }
        Ok(())
    }

    fn to_transaction(&self) -> Transaction {
        let id = match self.transaction_id.trim() {
            "" => generate_transaction_id(),
            id => id.to_string(),
        };
        let currency = match self.currency.trim() {
            "" => "USD",
            c => c,
        };
        let country = self.country.trim().to_ascii_uppercase();

        let merchant = Merchant {
            name: self.merchant.trim().to_string(),
            category: String::new(),
            mcc: self.mcc.trim().to_string(),
            country: country.clone(),
        };
        let device = Device {
            location: country,
            ip_address: self.ip_address.trim().to_string(),
            fingerprint: String::new(),
        };

        Transaction::new(id, parse_amount(&self.amount), merchant)
            .with_currency(currency)
            .with_device(device)
            .with_masked_pan(mask_card(&self.card_number))
    }
}

/// `TXN-` followed by eight upper-case hex digits
pub fn generate_transaction_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("TXN-{}", hex[..8].to_ascii_uppercase())
}

/// Keep only the last four digits. Inputs with fewer than four digits are
/// returned unchanged.
pub fn mask_card(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return number.to_string();
    }
    let last4: String = digits[digits.len() - 4..].iter().collect();
    format!("**** **** **** {last4}")
}

pub struct WhatIfSimulator {
    engine: RiskScoringEngine,
    jitter: Box<dyn JitterSource>,
    /// Artificial inference latency bounds; `None` returns immediately
    latency: Option<(Duration, Duration)>,
    history: EventBuffer<ScoredTransaction>,
}

impl WhatIfSimulator {
    pub fn new(engine: RiskScoringEngine, jitter: Box<dyn JitterSource>) -> Self {
        Self {
            engine,
            jitter,
            latency: Some((Duration::from_millis(500), Duration::from_millis(1100))),
            history: EventBuffer::new(DEFAULT_HISTORY_CAPACITY),
        }
    }

    /// Simulator using the configured risk lists, latency bounds, history
    /// size and jitter seed. Without a seed the jitter is drawn from entropy.
    pub fn from_config(config: &AppConfig) -> Self {
        let jitter: Box<dyn JitterSource> = match config.simulator.seed {
            Some(seed) => Box::new(SeededJitter::new(seed)),
            None => Box::new(SeededJitter::from_entropy()),
        };
        Self::new(RiskScoringEngine::with_rules(config.scoring.clone()), jitter)
            .with_latency(config.simulator_latency())
            .with_history_capacity(config.simulator.history_capacity)
    }

    pub fn with_latency(mut self, latency: Option<(Duration, Duration)>) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = EventBuffer::new(capacity);
        self
    }

    /// Validate, wait out the simulated latency, score, and record the result.
    ///
    /// Invalid input is rejected before any delay or scoring happens.
    pub async fn simulate(
        &mut self,
        input: &SimulationInput,
    ) -> Result<ScoredTransaction, SimulationError> {
        input.validate()?;
        let transaction = input.to_transaction();

        if let Some((min, max)) = self.latency {
            let delay = self
                .jitter
                .between(min.as_secs_f64(), max.as_secs_f64().max(min.as_secs_f64()));
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }

        let verdict = self.engine.score_transaction(&transaction, &mut self.jitter);
        let scored = ScoredTransaction::new(transaction, verdict);

        info!(
            transaction_id = %scored.id(),
            risk_score = scored.verdict.risk_score,
            risk_level = %scored.verdict.risk_level,
            decision = %scored.verdict.decision,
            reasons = scored.verdict.fraud_reasons.len(),
            "Simulation complete"
        );

        self.history.push(scored.clone());
        Ok(scored)
    }

    /// Session history, newest first
    pub fn history(&self) -> Vec<ScoredTransaction> {
        self.history.snapshot()
    }

    pub fn clear_history(&self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::NeutralJitter;
    use crate::types::verdict::{Decision, RiskLevel};
    use tokio::time::Instant;

    fn input(merchant: &str, amount: &str) -> SimulationInput {
        SimulationInput {
            card_number: "4532 0151 2345 6789".to_string(),
            merchant: merchant.to_string(),
            mcc: "5812".to_string(),
            amount: amount.to_string(),
            country: "US".to_string(),
            ip_address: "192.168.1.10".to_string(),
            ..Default::default()
        }
    }

    fn simulator() -> WhatIfSimulator {
        WhatIfSimulator::new(RiskScoringEngine::new(), Box::new(NeutralJitter))
    }

    #[test]
    fn test_mask_card() {
        assert_eq!(mask_card("4532 0151 2345 6789"), "**** **** **** 6789");
        assert_eq!(mask_card("3714 496353 98431"), "**** **** **** 8431");
        assert_eq!(mask_card("12"), "12");
        assert_eq!(mask_card(""), "");
    }

    #[test]
    fn test_generated_id_shape() {
        let id = generate_transaction_id();
        assert_eq!(id.len(), 12);
        assert!(id.starts_with("TXN-"));
        assert!(id[4..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_purchase() {
        let mut sim = simulator();
        let started = Instant::now();

        let scored = sim.simulate(&input("Starbucks Coffee", "12.50")).await.unwrap();

        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(500));
        assert!(waited <= Duration::from_millis(1101));
        assert_eq!(scored.verdict.decision, Decision::Approved);
        assert_eq!(scored.verdict.risk_level, RiskLevel::Safe);
        assert!(scored.verdict.fraud_reasons.is_empty());
        assert_eq!(scored.transaction.masked_pan, "**** **** **** 6789");
        assert_eq!(scored.transaction.currency, "USD");
        assert!(scored.id().starts_with("TXN-"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_fields_rejected_without_delay() {
        let mut sim = simulator();
        let started = Instant::now();

        let err = sim.simulate(&input("", "10")).await.unwrap_err();
        assert_eq!(err, SimulationError::MissingField("merchant"));
        let err = sim.simulate(&input("Shop", "  ")).await.unwrap_err();
        assert_eq!(err, SimulationError::MissingField("amount"));

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(sim.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_numeric_amount_scores_as_zero() {
        let mut sim = simulator().with_latency(None);
        let scored = sim.simulate(&input("Shop", "abc")).await.unwrap();
        assert_eq!(scored.transaction.amount, 0.0);
        assert_eq!(scored.verdict.decision, Decision::Approved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supplied_id_kept() {
        let mut sim = simulator().with_latency(None);
        let mut form = input("Binance Exchange", "9999.00");
        form.transaction_id = " TXN-ABC123 ".to_string();
        form.mcc = "6051".to_string();
        form.country = "mt".to_string();
        form.ip_address = String::new();

        let scored = sim.simulate(&form).await.unwrap();
        assert_eq!(scored.id(), "TXN-ABC123");
        assert_eq!(scored.verdict.decision, Decision::Review);
        assert_eq!(scored.transaction.merchant.country, "MT");
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_capped_newest_first() {
        let mut sim = simulator().with_latency(None);
        for i in 0..12 {
            let mut form = input("Shop", "5");
            form.transaction_id = format!("TXN-{i}");
            sim.simulate(&form).await.unwrap();
        }

        let history = sim.history();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].id(), "TXN-11");
        assert_eq!(history[9].id(), "TXN-2");

        sim.clear_history();
        assert!(sim.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_seeded_and_capped() {
        let mut config = AppConfig::default();
        config.simulator.seed = Some(7);
        config.simulator.history_capacity = 3;
        config.simulator.min_latency_ms = 100;
        config.simulator.max_latency_ms = 200;

        let mut form = input("Binance Exchange", "4200");
        form.transaction_id = "TXN-SEEDED".to_string();
        form.mcc = "6051".to_string();
        form.country = "NG".to_string();
        form.ip_address = "203.0.113.9".to_string();

        let mut first = WhatIfSimulator::from_config(&config);
        let mut second = WhatIfSimulator::from_config(&config);
        let started = Instant::now();
        let a = first.simulate(&form).await.unwrap();
        let waited = started.elapsed();
        let b = second.simulate(&form).await.unwrap();

        assert!(waited >= Duration::from_millis(100));
        assert!(waited <= Duration::from_millis(201));
        assert_eq!(a.verdict.risk_score, b.verdict.risk_score);
        assert_eq!(a.verdict.risk_level, b.verdict.risk_level);
        assert_eq!(a.verdict.decision, b.verdict.decision);
        assert_eq!(a.verdict.fraud_reasons, b.verdict.fraud_reasons);
        assert_eq!(a.verdict.model_scores, b.verdict.model_scores);

        for i in 0..5 {
            form.transaction_id = format!("TXN-{i}");
            first.simulate(&form).await.unwrap();
        }
        let history = first.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id(), "TXN-4");
    }
}
