use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Fallback figures for specialities absent from a sheet. Any speciality the
/// tables do not name bills and renews at the "Other" rates.
const FALLBACK_MONTHLY_RATE: f32 = 450.0;
const FALLBACK_BASE_AMOUNT: i32 = 800;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Speciality {
    #[serde(rename = "AI")]
    Ai,
    Cloud,
    Network,
    Security,
    Other,
}

impl Speciality {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "ai" => Some(Speciality::Ai),
            "cloud" => Some(Speciality::Cloud),
            "network" => Some(Speciality::Network),
            "security" => Some(Speciality::Security),
            "other" => Some(Speciality::Other),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Speciality::Ai => "AI",
            Speciality::Cloud => "Cloud",
            Speciality::Network => "Network",
            Speciality::Security => "Security",
            Speciality::Other => "Other",
        }
    }
}

impl fmt::Display for Speciality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Money tables for the contract lifecycle: per-month revenue rates and
/// renewal base amounts, keyed by speciality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffSheet {
    #[serde(default)]
    pub monthly_rates: HashMap<Speciality, f32>,
    #[serde(default)]
    pub base_amounts: HashMap<Speciality, i32>,
}

impl Default for TariffSheet {
    fn default() -> Self {
        Self {
            monthly_rates: HashMap::from([
                (Speciality::Ai, 300.0),
                (Speciality::Cloud, 400.0),
                (Speciality::Network, 350.0),
                (Speciality::Security, 450.0),
                (Speciality::Other, 450.0),
            ]),
            base_amounts: HashMap::from([
                (Speciality::Ai, 1200),
                (Speciality::Cloud, 1000),
                (Speciality::Security, 1300),
                (Speciality::Network, 900),
                (Speciality::Other, 800),
            ]),
        }
    }
}

impl TariffSheet {
    /// Per-month revenue rate for a speciality, falling back to the "Other"
    /// entry and then to the built-in fallback figure.
    pub fn monthly_rate(&self, speciality: Speciality) -> f32 {
        if let Some(rate) = self.monthly_rates.get(&speciality) {
            return *rate;
        }
        if let Some(rate) = self.monthly_rates.get(&Speciality::Other) {
            return *rate;
        }
        FALLBACK_MONTHLY_RATE
    }

    /// Renewal base amount for a speciality, same fallback chain as
    /// [`TariffSheet::monthly_rate`].
    pub fn base_amount(&self, speciality: Speciality) -> i32 {
        if let Some(amount) = self.base_amounts.get(&speciality) {
            return *amount;
        }
        if let Some(amount) = self.base_amounts.get(&Speciality::Other) {
            return *amount;
        }
        FALLBACK_BASE_AMOUNT
    }
}

/// Loyalty bonus on renewal, derived from the student's count of completed
/// (archived) contracts: more than two earns 20%, at least one earns 10%.
pub fn loyalty_multiplier(completed: u64) -> f32 {
    if completed > 2 {
        1.2
    } else if completed > 0 {
        1.1
    } else {
        1.0
    }
}
