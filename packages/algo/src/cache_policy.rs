//! Feed cache invalidation policy.
//!
//! Interactions that express an explicit preference shift make the user's
//! cached ranking stale; everything else leaves it alone.

use serde::{Deserialize, Serialize};

use crate::types::InteractionType;

pub const DEFAULT_FEED_TTL_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePolicy {
    pub invalidating_types: Vec<InteractionType>,
    pub ttl_secs: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            invalidating_types: vec![InteractionType::SwipeLeft, InteractionType::SwipeRight],
            ttl_secs: DEFAULT_FEED_TTL_SECS,
        }
    }
}

impl CachePolicy {
    pub fn should_invalidate(&self, interaction_type: &InteractionType) -> bool {
        self.invalidating_types.contains(interaction_type)
    }
}
