//! Snapshot payloads returned by the batch query endpoints

use crate::types::transaction::WireTransaction;
use crate::types::verdict::ModelScores;
use serde::Deserialize;

/// Alert raised on a suspicious transaction
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub status: String,
    pub priority: String,
    pub risk_score: f64,
    pub created_at: String,
    pub transaction: WireTransaction,
    pub model_scores: Option<ModelScores>,
}

impl Alert {
    /// Open and investigating alerts still need analyst attention
    pub fn is_active(&self) -> bool {
        matches!(self.status.as_str(), "open" | "investigating")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AlertsEnvelope {
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TransactionsEnvelope {
    pub transactions: Vec<WireTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HourlyPoint {
    pub hour: String,
    pub safe: u64,
    pub fraud: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskBucket {
    pub name: String,
    pub value: u64,
}

/// Aggregate KPI snapshot
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_transactions: u64,
    pub fraud_blocked: u64,
    pub fraud_rate: f64,
    pub avg_latency_ms: f64,
    pub total_volume_usd: f64,
    pub active_alerts: u64,
    pub streaming_throughput: u64,
    pub models_online: u32,
    #[serde(default)]
    pub fraud_savings_m: f64,
    #[serde(default)]
    pub hourly_data: Vec<HourlyPoint>,
    #[serde(default)]
    pub risk_distribution: Vec<RiskBucket>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerfTrend {
    pub day: String,
    pub auc: f64,
    pub precision: f64,
    pub recall: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub status: String,
    pub trained_at: String,
    pub auc: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub drift_score: f64,
    pub predictions: u64,
    #[serde(default)]
    pub perf_trend: Vec<PerfTrend>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagInfo {
    pub name: String,
    pub status: String,
    pub last_run: String,
    pub duration: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStats {
    pub avg_latency_ms: f64,
    pub daily_predictions: u64,
    pub drift_alerts: u32,
    pub feature_store_lag_ms: u64,
}

/// Model registry snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct ModelRegistry {
    pub models: Vec<ModelInfo>,
    #[serde(default)]
    pub dags: Vec<DagInfo>,
    pub monitoring: MonitoringStats,
    pub timestamp: String,
}

impl ModelRegistry {
    pub fn serving_count(&self) -> usize {
        self.models.iter().filter(|m| m.status == "serving").count()
    }
}

/// Health probe response
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_envelope_decodes() {
        let body = r#"{"alerts": [{
            "id": "ALERT-000001",
            "type": "Crypto Wash",
            "status": "open",
            "priority": "critical",
            "riskScore": 0.91,
            "createdAt": "2026-01-12T10:15:00Z",
            "transaction": {
                "id": "TXN-00000",
                "maskedPan": "**** **** **** 4321",
                "amount": 4200.5,
                "currency": "EUR",
                "merchant": {"name": "Binance Exchange", "category": "Various", "mcc": "6051", "country": "MT"},
                "device": {"location": "City, MT", "country": "MT", "ipAddress": "45.33.32.1", "fingerprint": "fp_00000000"},
                "riskScore": 0.91,
                "riskLevel": "critical",
                "timestamp": "2026-01-12T10:15:00Z"
            },
            "modelScores": {"xgboost": 0.9, "lightgbm": 0.88, "isolationForest": 0.93, "autoencoder": 0.87, "ensemble": 0.91}
        }], "total": 1}"#;

        let envelope: AlertsEnvelope = serde_json::from_str(body).unwrap();
        let alert = &envelope.alerts[0];
        assert!(alert.is_active());
        assert_eq!(alert.alert_type, "Crypto Wash");
        assert_eq!(alert.transaction.transaction.merchant.mcc, "6051");
        // no decision on the embedded transaction, so no verdict either
        assert!(alert.transaction.verdict.is_none());
        assert_eq!(alert.model_scores.map(|m| m.ensemble), Some(0.91));
    }

    #[test]
    fn test_health_status() {
        let health: HealthStatus =
            serde_json::from_str(r#"{"status": "healthy", "timestamp": 1.0}"#).unwrap();
        assert!(health.is_healthy());
    }
}
