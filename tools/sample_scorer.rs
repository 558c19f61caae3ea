//! Sample Scorer
//!
//! Generates a random mix of ordinary and suspicious transactions, scores them
//! with a seeded engine and logs the verdicts. Needs no backend.
//!
//! Usage: sample_scorer [count] [suspicious_rate] [seed]

use fraud_feed::scoring::{RiskScoringEngine, SeededJitter};
use fraud_feed::simulator::generate_transaction_id;
use fraud_feed::types::{Decision, Device, Merchant, ScoredTransaction, Transaction};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::info;

/// Random transaction generator
struct TransactionGenerator {
    rng: StdRng,
}

impl TransactionGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Everyday card-present purchase
    fn generate_ordinary(&mut self) -> Transaction {
        let (name, category, mcc) = self.random_choice(&[
            ("Starbucks Coffee", "Restaurants", "5812"),
            ("Whole Foods Market", "Grocery", "5411"),
            ("Shell Gas Station", "Fuel", "5541"),
            ("Netflix Subscription", "Digital Goods", "5815"),
            ("Amazon Marketplace", "E-commerce", "5999"),
        ]);
        let (country, location) = self.random_choice(&[
            ("US", "New York, US"),
            ("GB", "London, GB"),
            ("DE", "Berlin, DE"),
            ("SG", "Singapore, SG"),
            ("BR", "São Paulo, BR"),
        ]);

        let merchant = Merchant {
            name: name.to_string(),
            category: category.to_string(),
            mcc: mcc.to_string(),
            country: country.to_string(),
        };
        let device = Device {
            location: location.to_string(),
            ip_address: format!("192.168.{}.{}", self.rng.gen_range(0..255), self.rng.gen_range(1..255)),
            fingerprint: format!("fp_{:016x}", self.rng.gen::<u64>()),
        };

        Transaction::new(generate_transaction_id(), self.rng.gen_range(5.0..400.0), merchant)
            .with_device(device)
            .with_currency(self.random_choice(&["USD", "EUR", "GBP"]))
    }

    /// Large amount, risky category or origin, public IP
    fn generate_suspicious(&mut self) -> Transaction {
        let (name, category, mcc) = self.random_choice(&[
            ("Binance Exchange", "Crypto", "6051"),
            ("Luxury Goods Dubai", "Jewelry", "5944"),
            ("Western Union", "Wire Transfer", "4829"),
            ("Lucky Star Casino", "Gambling", "7994"),
        ]);
        let (country, location) = self.random_choice(&[
            ("NG", "Lagos, NG"),
            ("AE", "Dubai, AE"),
            ("RU", "Moscow, RU"),
            ("MT", "Valletta, MT"),
        ]);

        let merchant = Merchant {
            name: name.to_string(),
            category: category.to_string(),
            mcc: mcc.to_string(),
            country: country.to_string(),
        };
        let device = Device {
            location: location.to_string(),
            ip_address: format!(
                "{}.{}.{}.{}",
                self.rng.gen_range(11..170),
                self.rng.gen_range(0..255),
                self.rng.gen_range(0..255),
                self.rng.gen_range(1..255)
            ),
            fingerprint: format!("fp_{:016x}", self.rng.gen::<u64>()),
        };

        Transaction::new(generate_transaction_id(), self.rng.gen_range(1_000.0..15_000.0), merchant)
            .with_device(device)
    }

    fn random_choice<T: Copy>(&mut self, choices: &[T]) -> T {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

/// Suspicious share in [0, 1]; missing or non-finite input falls back to 0.2
fn parse_rate(arg: Option<&str>) -> f64 {
    arg.and_then(|s| s.parse::<f64>().ok())
        .filter(|rate| rate.is_finite())
        .unwrap_or(0.2)
        .clamp(0.0, 1.0)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_scorer=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(50);
    let suspicious_rate = parse_rate(args.get(2).map(String::as_str));
    let seed: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(42);

    info!(count, suspicious_rate, seed, "Starting sample scorer");

    let engine = RiskScoringEngine::new();
    let mut jitter = SeededJitter::new(seed);
    let mut generator = TransactionGenerator::new(seed);
    let mut decisions: HashMap<Decision, u64> = HashMap::new();

    for i in 0..count {
        let transaction = if generator.rng.gen_bool(suspicious_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_ordinary()
        };

        let verdict = engine.score_transaction(&transaction, &mut jitter);
        let scored = ScoredTransaction::new(transaction, verdict);
        *decisions.entry(scored.verdict.decision).or_insert(0) += 1;

        info!(
            transaction_id = %scored.id(),
            merchant = %scored.transaction.merchant.name,
            amount = format!("{:.2}", scored.transaction.amount),
            risk_score = format!("{:.4}", scored.verdict.risk_score),
            risk_level = %scored.verdict.risk_level,
            decision = %scored.verdict.decision,
            "Scored"
        );

        if i == 0 || scored.is_fraud() {
            info!("Sample verdict {}:\n{}", i + 1, serde_json::to_string_pretty(&scored)?);
        }
    }

    info!(
        approved = decisions.get(&Decision::Approved).copied().unwrap_or(0),
        review = decisions.get(&Decision::Review).copied().unwrap_or(0),
        blocked = decisions.get(&Decision::Blocked).copied().unwrap_or(0),
        "Completed"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate(None), 0.2);
        assert_eq!(parse_rate(Some("0.5")), 0.5);
        assert_eq!(parse_rate(Some("7")), 1.0);
        assert_eq!(parse_rate(Some("-1")), 0.0);
        assert_eq!(parse_rate(Some("NaN")), 0.2);
        assert_eq!(parse_rate(Some("inf")), 0.2);
        assert_eq!(parse_rate(Some("lots")), 0.2);
    }

    #[test]
    fn test_generator_is_seeded() {
        let mut a = TransactionGenerator::new(9);
        let mut b = TransactionGenerator::new(9);
        let rate = parse_rate(Some("NaN"));
        for _ in 0..20 {
            assert_eq!(a.rng.gen_bool(rate), b.rng.gen_bool(rate));
        }
    }
}
