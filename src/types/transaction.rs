//! Transaction data structures for the live fraud feed

use crate::serde_utils::lenient_amount;
use crate::types::verdict::{Decision, RiskLevel, RiskVerdict, ScoredTransaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Merchant the payment was made to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub name: String,
    /// Human-readable category label ("Crypto", "Food & Drink", ...)
    #[serde(default)]
    pub category: String,
    /// Merchant category code
    #[serde(default)]
    pub mcc: String,
    /// ISO country code of the transaction origin
    #[serde(default)]
    pub country: String,
}

/// Device the payment was initiated from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub fingerprint: String,
}

/// A financial transaction awaiting (or carrying) a risk verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique transaction identifier
    pub id: String,

    /// Masked card number, e.g. `**** **** **** 4242`
    #[serde(default)]
    pub masked_pan: String,

    /// Non-negative amount; malformed values decode as zero
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,

    #[serde(default = "default_currency")]
    pub currency: String,

    pub merchant: Merchant,

    #[serde(default)]
    pub device: Device,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Transaction {
    /// Create a transaction with the required fields, everything else defaulted
    pub fn new(id: impl Into<String>, amount: f64, merchant: Merchant) -> Self {
        Self {
            id: id.into(),
            masked_pan: String::new(),
            amount: amount.max(0.0),
            currency: default_currency(),
            merchant,
            device: Device::default(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_masked_pan(mut self, masked_pan: impl Into<String>) -> Self {
        self.masked_pan = masked_pan.into();
        self
    }
}

/// Simplified scored record pushed over the event stream.
///
/// The stream always carries the verdict, so these are never re-scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveTransaction {
    pub id: String,
    pub merchant: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub amount: f64,
    pub currency: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub status: Decision,
    #[serde(default)]
    pub location: String,
    pub timestamp: DateTime<Utc>,
}

/// Transaction as returned by the batch endpoints: the verdict may or may not be present.
#[derive(Debug, Clone, Deserialize)]
pub struct WireTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(flatten)]
    pub verdict: Option<RiskVerdict>,
}

impl WireTransaction {
    /// Split into the transaction and its verdict, if the server supplied one
    pub fn into_parts(self) -> (Transaction, Option<RiskVerdict>) {
        (self.transaction, self.verdict)
    }
}

impl From<ScoredTransaction> for LiveTransaction {
    fn from(scored: ScoredTransaction) -> Self {
        let ScoredTransaction {
            transaction,
            verdict,
        } = scored;
        Self {
            id: transaction.id,
            merchant: transaction.merchant.name,
            amount: transaction.amount,
            currency: transaction.currency,
            risk_score: verdict.risk_score,
            risk_level: verdict.risk_level,
            status: verdict.decision,
            location: transaction.device.location,
            timestamp: transaction.timestamp,
        }
    }
}
