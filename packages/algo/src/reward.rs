//! Reward Calculator
//!
//! XP for one interaction = base XP for the interaction kind, optionally
//! multiplied by a variable-ratio bonus, plus a flat completion bonus.
//!
//! The bonus fires with probability `bonus_probability`; when it does, the
//! multiplier is drawn from weighted tiers. Identical actions therefore earn
//! different XP on purpose. Multipliers are all ≥ 1, so the result is never
//! below the base.

use std::collections::BTreeMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::sanitize::clamp_unit;
use crate::types::InteractionType;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusTier {
    pub multiplier: f64,
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardConfig {
    /// Keyed by wire name (`COMPLETED`, `SWIPE_UP`, ...); missing kinds earn 0
    pub base_xp: BTreeMap<String, u32>,
    pub completion_bonus: u32,
    pub completion_bonus_threshold: f64,
    pub bonus_probability: f64,
    pub bonus_tiers: Vec<BonusTier>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        let base_xp = [
            (InteractionType::Completed, 10),
            (InteractionType::SwipeUp, 5),
            (InteractionType::DoubleTap, 3),
            (InteractionType::Save, 5),
            (InteractionType::SwipeRight, 5),
            (InteractionType::Replay, 2),
            (InteractionType::WordLookup, 1),
        ]
        .into_iter()
        .map(|(kind, xp)| (kind.as_str().to_string(), xp))
        .collect();

        Self {
            base_xp,
            completion_bonus: 5,
            completion_bonus_threshold: 0.9,
            bonus_probability: 0.30,
            bonus_tiers: vec![
                BonusTier { multiplier: 1.5, weight: 15 },
                BonusTier { multiplier: 2.0, weight: 10 },
                BonusTier { multiplier: 3.0, weight: 3 },
                BonusTier { multiplier: 5.0, weight: 2 },
            ],
        }
    }
}

impl RewardConfig {
    pub fn base_for(&self, interaction_type: &InteractionType) -> u32 {
        self.base_xp
            .get(interaction_type.as_str())
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub base_xp: u32,
    pub multiplier: f64,
    pub completion_bonus: u32,
    pub xp_earned: u32,
}

pub struct RewardCalculator {
    config: RewardConfig,
    tiers: Option<WeightedIndex<u32>>,
    rng: ChaCha8Rng,
}

impl RewardCalculator {
    pub fn new(config: RewardConfig) -> Self {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    /// Deterministic calculator for tests and replays
    pub fn with_seed(config: RewardConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: RewardConfig, rng: ChaCha8Rng) -> Self {
        // Tiers with a multiplier below 1 would break the never-below-base rule
        let usable: Vec<u32> = config
            .bonus_tiers
            .iter()
            .map(|tier| if tier.multiplier >= 1.0 { tier.weight } else { 0 })
            .collect();
        let tiers = WeightedIndex::new(usable).ok();
        Self { config, tiers, rng }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    pub fn calculate(
        &mut self,
        interaction_type: &InteractionType,
        completion_rate: Option<f64>,
    ) -> Reward {
        let base_xp = self.config.base_for(interaction_type);
        let multiplier = self.draw_multiplier();

        let completion_bonus = match completion_rate {
            Some(rate) if rate >= self.config.completion_bonus_threshold => {
                self.config.completion_bonus
            }
            _ => 0,
        };

        let boosted = (f64::from(base_xp) * multiplier).round() as u32;
        Reward {
            base_xp,
            multiplier,
            completion_bonus,
            xp_earned: boosted.max(base_xp).saturating_add(completion_bonus),
        }
    }

    fn draw_multiplier(&mut self) -> f64 {
        let probability = clamp_unit(self.config.bonus_probability);
        if probability <= 0.0 || !self.rng.gen_bool(probability) {
            return 1.0;
        }
        match &self.tiers {
            Some(tiers) => self.config.bonus_tiers[tiers.sample(&mut self.rng)].multiplier,
            None => 1.0,
        }
    }
}
