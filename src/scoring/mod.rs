//! Risk scoring components

pub mod engine;
pub mod jitter;
pub mod rules;

pub use engine::RiskScoringEngine;
pub use jitter::{JitterSource, NeutralJitter, SeededJitter};
pub use rules::{is_private_ip, CountryTier, RiskRules};
