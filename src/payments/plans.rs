use serde::Serialize;

use crate::{config::StripeConfig, domain::Role};

/// A purchasable membership plan, keyed by its Stripe price id.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub price_id: String,
    pub role: Role,
    /// Smallest currency unit (satang).
    pub amount: i64,
    pub currency: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn from_config(config: &StripeConfig) -> Self {
        let plan = |price_id: &str, role, amount, label: &str| Plan {
            price_id: price_id.to_string(),
            role,
            amount,
            currency: "THB".to_string(),
            label: label.to_string(),
        };

        Self {
            plans: vec![
                plan(&config.bronze_price_id, Role::UserBronze, 49_900, "Bronze 499"),
                plan(&config.gold_price_id, Role::UserGold, 129_900, "Gold 1299"),
                plan(&config.platinum_price_id, Role::UserPlatinum, 299_900, "Platinum 2999"),
            ],
        }
    }

    pub fn find(&self, price_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.price_id == price_id)
    }

    pub fn all(&self) -> &[Plan] {
        &self.plans
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::from_config(&StripeConfig::default())
    }
}
