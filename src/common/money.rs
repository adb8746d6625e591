use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

// --- Arredondamento monetário ---
// Uma única regra, aplicada da mesma forma a base, imposto e recargo.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Meio para o par (half-even).
    Bankers,
    /// Meio para longe de zero.
    HalfUp,
}

impl RoundingMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bankers" | "half_even" => Some(RoundingMode::Bankers),
            "half_up" => Some(RoundingMode::HalfUp),
            _ => None,
        }
    }

    fn strategy(&self) -> RoundingStrategy {
        match self {
            RoundingMode::Bankers => RoundingStrategy::MidpointNearestEven,
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Casas decimais da moeda (tipicamente 2).
    pub scale: u32,
    pub rounding: RoundingMode,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            scale: 2,
            rounding: RoundingMode::Bankers,
        }
    }
}

impl PricingConfig {
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.scale, self.rounding.strategy())
    }

    /// `amount * pct / 100`, já arredondado.
    pub fn percent_of(&self, amount: Decimal, pct: Decimal) -> Decimal {
        self.round(amount * pct / Decimal::ONE_HUNDRED)
    }
}
