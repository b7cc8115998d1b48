use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use langfeed_algo::{
    delta_for, engagement_delta, estimate_comprehension, qualifies_for_exposure, InteractionSignals,
    InteractionType,
};

use super::{required, EngineError, FeedEngine};
use crate::store::{InteractionRecord, UserActivity, UserRecord, WordKey};

/// One raw interaction as reported by the client.
///
/// Required fields default to empty so a missing field is reported as a
/// validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionInput {
    pub user_id: String,
    pub content_id: String,
    pub interaction_type: String,
    #[serde(flatten)]
    pub signals: InteractionSignals,
    /// Looked-up word, for `WORD_LOOKUP`
    pub word: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionOutcome {
    pub interaction_id: String,
    pub xp_earned: u32,
    pub inferred_comprehension: f64,
    pub feed_invalidated: bool,
    pub words_updated: usize,
    /// Absent when the user update failed
    pub user: Option<UserRecord>,
}

impl FeedEngine {
    /// Run one interaction through every updater.
    ///
    /// Only validation fails the call. Each later step logs its own failure
    /// and the remaining steps still run.
    pub async fn record_interaction(
        &self,
        input: InteractionInput,
    ) -> Result<InteractionOutcome, EngineError> {
        let user_id = required(&input.user_id, "userId")?.to_string();
        let content_id = required(&input.content_id, "contentId")?.to_string();
        let interaction_type = InteractionType::parse(required(&input.interaction_type, "interactionType")?);
        validate_signals(&input.signals)?;

        let lookup_word = match (&interaction_type, input.word.as_deref().map(str::trim)) {
            (InteractionType::WordLookup, Some(word)) if !word.is_empty() => Some(word.to_string()),
            (InteractionType::WordLookup, _) => {
                return Err(EngineError::Validation("word is required for WORD_LOOKUP".to_string()))
            }
            _ => None,
        };

        let now = Utc::now();
        let signals = input.signals;
        let inferred_comprehension = estimate_comprehension(&signals, &self.config.comprehension);
        let reward = self
            .rewards
            .lock()
            .calculate(&interaction_type, signals.completion_rate);

        let activity = UserActivity {
            inferred_comprehension,
            engagement_delta: engagement_delta(&interaction_type, &self.config.user_score),
            xp_earned: reward.xp_earned,
            occurred_on: now.date_naive(),
        };
        let user = match self
            .store
            .apply_user_activity(&user_id, &activity, &self.config.user_score)
            .await
        {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::warn!(error = %err, user_id = %user_id, "user score update failed");
                None
            }
        };

        let mut words_updated = self
            .update_content_effects(&user_id, &content_id, &interaction_type, &signals, now)
            .await;

        if let Some(word) = lookup_word {
            if self.record_lookup(&user_id, &word).await {
                words_updated += 1;
            }
        }

        let feed_invalidated = match self.cache.on_interaction(&user_id, &interaction_type).await {
            Ok(invalidated) => invalidated,
            Err(err) => {
                tracing::warn!(error = %err, user_id = %user_id, "feed cache invalidation failed");
                false
            }
        };

        let record = InteractionRecord {
            id: Uuid::new_v4().to_string(),
            user_id,
            content_id,
            interaction_type,
            signals,
            word: input.word,
            inferred_comprehension,
            xp_earned: i64::from(reward.xp_earned),
            created_at: now,
        };
        if let Err(err) = self.store.append_interaction(&record).await {
            tracing::error!(error = %err, interaction_id = %record.id, "interaction log append failed");
        }

        tracing::debug!(
            user_id = %record.user_id,
            interaction_type = record.interaction_type.as_str(),
            xp = reward.xp_earned,
            multiplier = reward.multiplier,
            inferred_comprehension,
            feed_invalidated,
            "interaction recorded"
        );

        Ok(InteractionOutcome {
            interaction_id: record.id,
            xp_earned: reward.xp_earned,
            inferred_comprehension,
            feed_invalidated,
            words_updated,
            user,
        })
    }

    /// Content counters and word exposures. Skipped when the content is
    /// unknown. Returns the number of word rows touched.
    async fn update_content_effects(
        &self,
        user_id: &str,
        content_id: &str,
        interaction_type: &InteractionType,
        signals: &InteractionSignals,
        now: DateTime<Utc>,
    ) -> usize {
        match self.store.get_content(content_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(content_id, "content not found, skipping metrics and word updates");
                return 0;
            }
            Err(err) => {
                tracing::warn!(error = %err, content_id, "content lookup failed");
                return 0;
            }
        }

        let delta = delta_for(interaction_type, signals.time_spent_seconds);
        if !delta.is_empty() {
            if let Err(err) = self.store.apply_content_metrics(content_id, &delta).await {
                tracing::warn!(error = %err, content_id, "content metrics update failed");
            }
        }

        if !qualifies_for_exposure(
            interaction_type,
            signals.completion_rate,
            &self.config.word_knowledge,
        ) {
            return 0;
        }

        let words = match self.store.list_content_words(content_id).await {
            Ok(words) => words,
            Err(err) => {
                tracing::warn!(error = %err, content_id, "content word lookup failed");
                return 0;
            }
        };

        let mut updated = 0;
        for content_word in words {
            let key = WordKey::new(user_id, &self.config.language, &content_word.word);
            if key.word.is_empty() {
                continue;
            }
            let result = match self.store.record_word_exposure(&key, now).await {
                Ok(record) => self.refresh_confidence(&record).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(_) => updated += 1,
                Err(err) => {
                    tracing::warn!(error = %err, user_id, word = %key.word, "word exposure update failed")
                }
            }
        }
        updated
    }

    async fn record_lookup(&self, user_id: &str, word: &str) -> bool {
        let key = WordKey::new(user_id, &self.config.language, word);
        let result = match self.store.record_word_lookup(&key).await {
            Ok(record) => self.refresh_confidence(&record).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, user_id, word = %key.word, "word lookup update failed");
                false
            }
        }
    }
}

fn validate_signals(signals: &InteractionSignals) -> Result<(), EngineError> {
    if let Some(rate) = signals.completion_rate {
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(EngineError::Validation(
                "completionRate must be between 0 and 1".to_string(),
            ));
        }
    }
    for (field, value) in [
        ("timeSpentSeconds", signals.time_spent_seconds),
        ("contentDurationSeconds", signals.content_duration_seconds),
    ] {
        if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
            return Err(EngineError::Validation(format!(
                "{field} must be a non-negative number"
            )));
        }
    }
    Ok(())
}
