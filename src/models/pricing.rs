use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceQuery {
    pub game_type: String,
    /// Session length in minutes.
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default = "default_people", alias = "group_size")]
    pub num_people: u32,
}

pub(crate) fn default_duration() -> u32 {
    60
}

pub(crate) fn default_people() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBreakdown {
    pub game_type: String,
    /// Effective hourly per-person rate.
    pub rate: f64,
    pub duration: u32,
    pub hours: f64,
    pub num_people: u32,
    pub group_discount_applied: bool,
    pub total_price: f64,
}

impl PriceBreakdown {
    pub fn per_person(&self) -> f64 {
        self.total_price / self.num_people as f64
    }
}
