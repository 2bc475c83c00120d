use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::availability::Schedule;

/// Hourly per-person rates for one game type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GameRate {
    pub individual: f64,
    pub group: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BirthdayPackage {
    pub price: f64,
    pub duration_hours: u32,
    pub max_people: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    pub rates: BTreeMap<String, GameRate>,
    pub group_min_size: u32,
    pub allowed_durations: Vec<u32>,
    #[serde(default = "default_unit_minutes")]
    pub unit_minutes: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday_package: Option<BirthdayPackage>,
}

fn default_unit_minutes() -> u32 {
    60
}

fn default_currency() -> String {
    "INR".to_string()
}

impl Default for PricingConfig {
    fn default() -> Self {
        let rates = [
            ("playstation", 120.0, 100.0),
            ("playstation_steering", 150.0, 130.0),
            ("xbox", 120.0, 100.0),
            ("nintendo_switch", 100.0, 80.0),
            ("vr", 200.0, 180.0),
            ("board_games", 60.0, 50.0),
        ]
        .into_iter()
        .map(|(id, individual, group)| (id.to_string(), GameRate { individual, group }))
        .collect();

        Self {
            rates,
            group_min_size: 3,
            allowed_durations: vec![30, 60, 90, 120],
            unit_minutes: default_unit_minutes(),
            currency: default_currency(),
            birthday_package: Some(BirthdayPackage {
                price: 2500.0,
                duration_hours: 4,
                max_people: 8,
            }),
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.group_min_size < 2 {
            anyhow::bail!("group_min_size must be at least 2");
        }
        if self.unit_minutes == 0 {
            anyhow::bail!("unit_minutes must be positive");
        }
        if self.allowed_durations.is_empty() || self.allowed_durations.contains(&0) {
            anyhow::bail!("allowed_durations must be a non-empty list of positive minutes");
        }
        for (game, rate) in &self.rates {
            if !(rate.individual > 0.0 && rate.group > 0.0) {
                anyhow::bail!("rates for {game} must be positive");
            }
            if rate.group > rate.individual {
                anyhow::bail!("group rate for {game} exceeds the individual rate");
            }
        }
        Ok(())
    }

    /// The rate table must price every catalog entry and nothing else.
    pub fn check_against_catalog<'a>(
        &self,
        catalog_ids: impl IntoIterator<Item = &'a str>,
    ) -> anyhow::Result<()> {
        let catalog: BTreeSet<&str> = catalog_ids.into_iter().collect();
        if let Some(missing) = catalog.iter().find(|id| !self.rates.contains_key(**id)) {
            anyhow::bail!("rates are missing game type {missing}");
        }
        if let Some(extra) = self.rates.keys().find(|id| !catalog.contains(id.as_str())) {
            anyhow::bail!("rates list {extra}, which is not in the game type catalog");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ContactInfo {
    pub address: String,
    pub phone: String,
    pub email: String,
    pub hours: String,
    #[serde(default)]
    pub social: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    pub pricing: PricingConfig,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub contact: ContactInfo,
}

impl Settings {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.pricing.validate()?;
        self.schedule.validate()?;
        Ok(())
    }
}
