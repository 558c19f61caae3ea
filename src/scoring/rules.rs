//! Fixed risk lists used by the scoring engine

use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::net::IpAddr;

const HIGH_RISK_COUNTRIES: [&str; 7] = ["NG", "KP", "IR", "BY", "SY", "CU", "VE"];
const MEDIUM_RISK_COUNTRIES: [&str; 8] = ["RU", "MM", "VN", "PK", "BD", "GH", "KE", "AE"];
const HIGH_RISK_MCC: [&str; 7] = ["6051", "5944", "7994", "7801", "7802", "4829", "6012"];

/// Country tier of a transaction origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryTier {
    High,
    Medium,
    Standard,
}

/// Country and merchant-category risk lists.
///
/// Defaults to the built-in lists; each list can be replaced from configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskRules {
    #[serde(deserialize_with = "normalized_codes")]
    pub high_risk_countries: HashSet<String>,
    #[serde(deserialize_with = "normalized_codes")]
    pub medium_risk_countries: HashSet<String>,
    #[serde(deserialize_with = "normalized_codes")]
    pub high_risk_mcc: HashSet<String>,
}

/// Codes are matched trimmed and upper-cased
fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn normalized_codes<'de, D>(deserializer: D) -> Result<HashSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .map(|code| normalize_code(code))
        .filter(|code| !code.is_empty())
        .collect())
}

impl RiskRules {
    pub fn country_tier(&self, country: &str) -> CountryTier {
        let country = normalize_code(country);
        if self.high_risk_countries.contains(&country) {
            CountryTier::High
        } else if self.medium_risk_countries.contains(&country) {
            CountryTier::Medium
        } else {
            CountryTier::Standard
        }
    }

    pub fn is_high_risk_mcc(&self, mcc: &str) -> bool {
        self.high_risk_mcc.contains(&normalize_code(mcc))
    }
}

impl Default for RiskRules {
    fn default() -> Self {
        fn set(items: &[&str]) -> HashSet<String> {
            items.iter().map(|s| normalize_code(s)).collect()
        }

        Self {
            high_risk_countries: set(&HIGH_RISK_COUNTRIES),
            medium_risk_countries: set(&MEDIUM_RISK_COUNTRIES),
            high_risk_mcc: set(&HIGH_RISK_MCC),
        }
    }
}

/// True for RFC1918 addresses (10/8, 172.16/12, 192.168/16).
///
/// Anything unparseable, and every IPv6 address, counts as public.
pub fn is_private_ip(ip: &str) -> bool {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_private(),
        _ => false,
    }
}
