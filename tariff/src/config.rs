use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::rates::{Speciality, TariffSheet};

/// Load the effective tariff sheet.
///
/// Precedence per table key: inline env overrides (`TARIFF_MONTHLY_RATES`,
/// `TARIFF_BASE_AMOUNTS`, JSON maps keyed by speciality) over the YAML sheet
/// named by `TARIFF_SHEET`, over the built-in defaults. Malformed input is
/// ignored with a warning rather than aborting startup.
pub fn load_from_env() -> TariffSheet {
    let mut sheet = match std::env::var("TARIFF_SHEET") {
        Ok(path) => match load_sheet(Path::new(&path)) {
            Ok(sheet) => sheet,
            Err(err) => {
                warn!(%path, error = %err, "ignoring unreadable tariff sheet");
                TariffSheet::default()
            }
        },
        Err(_) => TariffSheet::default(),
    };

    for (speciality, rate) in env_map::<f32>("TARIFF_MONTHLY_RATES") {
        sheet.monthly_rates.insert(speciality, rate);
    }
    for (speciality, amount) in env_map::<i32>("TARIFF_BASE_AMOUNTS") {
        sheet.base_amounts.insert(speciality, amount);
    }

    sheet
}

/// Read a YAML tariff sheet. Entries present in the file override the
/// defaults per key; absent tables keep their default figures.
pub fn load_sheet(path: &Path) -> Result<TariffSheet> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading tariff sheet at {}", path.display()))?;
    let file: SheetFile = serde_yaml::from_str(&raw).with_context(|| "parsing tariff sheet YAML")?;

    let mut sheet = TariffSheet::default();
    sheet.monthly_rates.extend(file.monthly_rates);
    sheet.base_amounts.extend(file.base_amounts);
    Ok(sheet)
}

#[derive(Debug, serde::Deserialize)]
struct SheetFile {
    #[serde(default, rename = "monthlyRates")]
    monthly_rates: HashMap<Speciality, f32>,
    #[serde(default, rename = "baseAmounts")]
    base_amounts: HashMap<Speciality, i32>,
}

fn env_map<T: DeserializeOwned>(var: &str) -> HashMap<Speciality, T> {
    let raw = match std::env::var(var) {
        Ok(s) if !s.trim().is_empty() => s,
        _ => return HashMap::new(),
    };
    match serde_json::from_str(&raw) {
        Ok(map) => map,
        Err(err) => {
            warn!(var, error = %err, "ignoring malformed tariff override");
            HashMap::new()
        }
    }
}
