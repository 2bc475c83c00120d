use crate::models::{PriceBreakdown, PricingConfig};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("unknown game type: {0}")]
    UnknownGameType(String),

    #[error("duration of {duration} minutes is not offered (choose one of {allowed:?})")]
    InvalidDuration { duration: u32, allowed: Vec<u32> },

    #[error("group size must be at least 1, got {0}")]
    InvalidGroupSize(u32),
}

/// Quotes session prices from a pricing table. Pure: the same inputs always
/// give the same breakdown.
pub struct PricingEngine<'a> {
    config: &'a PricingConfig,
}

impl<'a> PricingEngine<'a> {
    pub fn new(config: &'a PricingConfig) -> Self {
        Self { config }
    }

    pub fn quote(
        &self,
        game_type: &str,
        duration: u32,
        num_people: u32,
    ) -> Result<PriceBreakdown, PricingError> {
        let rates = self
            .config
            .rates
            .get(game_type)
            .ok_or_else(|| PricingError::UnknownGameType(game_type.to_string()))?;

        if !self.config.allowed_durations.contains(&duration) {
            return Err(PricingError::InvalidDuration {
                duration,
                allowed: self.config.allowed_durations.clone(),
            });
        }
        if num_people < 1 {
            return Err(PricingError::InvalidGroupSize(num_people));
        }

        let group_discount_applied = num_people >= self.config.group_min_size;
        let rate = if group_discount_applied {
            rates.group
        } else {
            rates.individual
        };
        let hours = duration as f64 / self.config.unit_minutes as f64;
        let total_price = round_money(rate * hours * num_people as f64);

        Ok(PriceBreakdown {
            game_type: game_type.to_string(),
            rate,
            duration,
            hours,
            num_people,
            group_discount_applied,
            total_price,
        })
    }
}

fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
