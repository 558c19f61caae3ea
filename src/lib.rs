//! Fraud Feed Library
//!
//! Real-time fraud-risk feed: a rule-ensemble scoring engine, a server-sent
//! event stream with automatic reconnection, a polling fallback for when the
//! stream is down, and an on-demand what-if simulator.

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod scoring;
pub mod serde_utils;
pub mod simulator;
pub mod types;

pub use client::ApiClient;
pub use config::AppConfig;
pub use error::{ClientError, FeedError, SimulationError};
pub use feed::{FeedEvent, FeedStatus, LiveFeed, StreamState, SubscriptionHandle};
pub use scoring::{JitterSource, RiskScoringEngine, SeededJitter};
pub use simulator::{SimulationInput, WhatIfSimulator};
pub use types::{LiveTransaction, RiskLevel, RiskVerdict, ScoredTransaction, Transaction};
