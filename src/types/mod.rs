//! Type definitions for the fraud feed

pub mod snapshot;
pub mod transaction;
pub mod verdict;

pub use snapshot::{Alert, DashboardMetrics, HealthStatus, ModelRegistry};
pub use transaction::{Device, LiveTransaction, Merchant, Transaction, WireTransaction};
pub use verdict::{Decision, ModelScores, RiskLevel, RiskVerdict, ScoredTransaction, VelocityFlags};
