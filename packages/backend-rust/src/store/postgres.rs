use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;

use langfeed_algo::{
    apply_delta, CefrLevel, ContentMetrics, ContentType, InteractionSignals, InteractionType,
    MetricsDelta, UserScoreConfig, WordCounters,
};

use super::migrate::{run_migrations, MigrationError};
use super::{
    ContentRecord, ContentWord, InteractionRecord, LearningStore, StoreError, UserActivity,
    UserRecord, WordEvent, WordKey, WordKnowledgeRecord,
};

const USER_COLUMNS: &str = r#""id","currentLevel","comprehensionScore","engagementScore","totalXp",
    "streakDays","longestStreak","lastActiveOn","createdAt","updatedAt""#;

const CONTENT_COLUMNS: &str = r#""id","type","level","title","topics","viewCount","likeCount",
    "saveCount","skipCount","averageTimeSpentSeconds","dopamineScore","createdAt","updatedAt""#;

const WORD_COLUMNS: &str = r#""userId","language","word","exposureCount","correctReviews",
    "incorrectReviews","lookupCount","confidenceScore","lastSeenAt","createdAt","updatedAt""#;

const INTERACTION_COLUMNS: &str = r#""id","userId","contentId","interactionType","timeSpentSeconds",
    "completionRate","wordsLookedUp","replayCount","contentDurationSeconds","word",
    "inferredComprehension","xpEarned","createdAt""#;

/// Postgres-backed store. Counters are incremented in SQL; derived values are
/// recomputed under `SELECT ... FOR UPDATE`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), MigrationError> {
        run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bump_word(
        &self,
        key: &WordKey,
        event: WordEvent,
        seen_at: Option<DateTime<Utc>>,
    ) -> Result<WordKnowledgeRecord, StoreError> {
        let column = match event {
            WordEvent::Exposure => "exposureCount",
            WordEvent::Lookup => "lookupCount",
            WordEvent::Review { correct: true } => "correctReviews",
            WordEvent::Review { correct: false } => "incorrectReviews",
        };

        let sql = format!(
            r#"INSERT INTO "word_knowledge" ("userId","language","word","{column}","lastSeenAt")
               VALUES ($1,$2,$3,1,$4)
               ON CONFLICT ("userId","language","word") DO UPDATE SET
                 "{column}" = "word_knowledge"."{column}" + 1,
                 "lastSeenAt" = COALESCE(EXCLUDED."lastSeenAt", "word_knowledge"."lastSeenAt"),
                 "updatedAt" = NOW()
               RETURNING {WORD_COLUMNS}"#
        );

        let row = sqlx::query(&sql)
            .bind(&key.user_id)
            .bind(&key.language)
            .bind(&key.word)
            .bind(seen_at)
            .fetch_one(&self.pool)
            .await?;
        map_word_row(&row)
    }
}

#[async_trait]
impl LearningStore for PgStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let sql = format!(r#"SELECT {USER_COLUMNS} FROM "users" WHERE "id" = $1"#);
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_user_row).transpose()
    }

    async fn create_user(&self, user: UserRecord) -> Result<UserRecord, StoreError> {
        insert_user_if_absent(&self.pool, &user).await?;
        self.get_user(&user.id)
            .await?
            .ok_or_else(|| StoreError::Conflict(format!("user {} vanished after insert", user.id)))
    }

    async fn apply_user_activity(
        &self,
        user_id: &str,
        activity: &UserActivity,
        config: &UserScoreConfig,
    ) -> Result<UserRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_user_if_absent(&mut *tx, &UserRecord::new(user_id)).await?;

        let sql = format!(r#"SELECT {USER_COLUMNS} FROM "users" WHERE "id" = $1 FOR UPDATE"#);
        let row = sqlx::query(&sql).bind(user_id).fetch_one(&mut *tx).await?;
        let updated = map_user_row(&row)?.with_activity(activity, config);

        sqlx::query(
            r#"UPDATE "users" SET "comprehensionScore"=$2,"engagementScore"=$3,"totalXp"=$4,
               "streakDays"=$5,"longestStreak"=$6,"lastActiveOn"=$7,"updatedAt"=$8
               WHERE "id"=$1"#,
        )
        .bind(user_id)
        .bind(updated.comprehension_score)
        .bind(updated.engagement_score)
        .bind(updated.total_xp)
        .bind(updated.streak_days)
        .bind(updated.longest_streak)
        .bind(updated.last_active_on)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn get_content(&self, content_id: &str) -> Result<Option<ContentRecord>, StoreError> {
        let sql = format!(r#"SELECT {CONTENT_COLUMNS} FROM "content" WHERE "id" = $1"#);
        let row = sqlx::query(&sql)
            .bind(content_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_content_row).transpose()
    }

    async fn upsert_content(&self, content: &ContentRecord) -> Result<ContentRecord, StoreError> {
        let sql = format!(
            r#"INSERT INTO "content" ("id","type","level","title","topics","createdAt","updatedAt")
               VALUES ($1,$2,$3,$4,$5,$6,$6)
               ON CONFLICT ("id") DO UPDATE SET "type"=EXCLUDED."type","level"=EXCLUDED."level",
                 "title"=EXCLUDED."title","topics"=EXCLUDED."topics","updatedAt"=NOW()
               RETURNING {CONTENT_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(&content.id)
            .bind(content.content_type.as_str())
            .bind(content.level.as_str())
            .bind(&content.title)
            .bind(Json(&content.topics))
            .bind(content.created_at)
            .fetch_one(&self.pool)
            .await?;
        map_content_row(&row)
    }

    async fn list_content(
        &self,
        levels: &[CefrLevel],
        limit: usize,
    ) -> Result<Vec<ContentRecord>, StoreError> {
        let level_names: Vec<String> = levels.iter().map(|l| l.as_str().to_string()).collect();
        let sql = format!(
            r#"SELECT {CONTENT_COLUMNS} FROM "content"
               WHERE cardinality($1::text[]) = 0 OR "level" = ANY($1)
               ORDER BY "createdAt", "id" LIMIT $2"#
        );
        let rows = sqlx::query(&sql)
            .bind(&level_names)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_content_row).collect()
    }

    async fn apply_content_metrics(
        &self,
        content_id: &str,
        delta: &MetricsDelta,
    ) -> Result<ContentRecord, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(r#"SELECT {CONTENT_COLUMNS} FROM "content" WHERE "id" = $1 FOR UPDATE"#);
        let row = sqlx::query(&sql)
            .bind(content_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("content {content_id}")))?;
        let current = map_content_row(&row)?;
        let metrics = apply_delta(&current.metrics, delta);

        let sql = format!(
            r#"UPDATE "content" SET "viewCount"=$2,"likeCount"=$3,"saveCount"=$4,"skipCount"=$5,
               "averageTimeSpentSeconds"=$6,"dopamineScore"=$7,"updatedAt"=NOW()
               WHERE "id"=$1
               RETURNING {CONTENT_COLUMNS}"#
        );
        let row = sqlx::query(&sql)
            .bind(content_id)
            .bind(metrics.view_count)
            .bind(metrics.like_count)
            .bind(metrics.save_count)
            .bind(metrics.skip_count)
            .bind(metrics.average_time_spent_seconds)
            .bind(metrics.dopamine_score)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        map_content_row(&row)
    }

    async fn list_content_words(&self, content_id: &str) -> Result<Vec<ContentWord>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT "contentId","word","lemma" FROM "content_words"
               WHERE "contentId" = $1 ORDER BY "word""#,
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ContentWord {
                    content_id: row.try_get("contentId")?,
                    word: row.try_get("word")?,
                    lemma: row.try_get("lemma")?,
                })
            })
            .collect()
    }

    async fn upsert_content_words(&self, words: &[ContentWord]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for word in words {
            sqlx::query(
                r#"INSERT INTO "content_words" ("contentId","word","lemma") VALUES ($1,$2,$3)
                   ON CONFLICT ("contentId","word") DO UPDATE SET "lemma" = EXCLUDED."lemma""#,
            )
            .bind(&word.content_id)
            .bind(&word.word)
            .bind(&word.lemma)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_word_knowledge(
        &self,
        key: &WordKey,
    ) -> Result<Option<WordKnowledgeRecord>, StoreError> {
        let sql = format!(
            r#"SELECT {WORD_COLUMNS} FROM "word_knowledge"
               WHERE "userId" = $1 AND "language" = $2 AND "word" = $3"#
        );
        let row = sqlx::query(&sql)
            .bind(&key.user_id)
            .bind(&key.language)
            .bind(&key.word)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_word_row).transpose()
    }

    async fn list_word_knowledge(
        &self,
        user_id: &str,
        language: &str,
    ) -> Result<Vec<WordKnowledgeRecord>, StoreError> {
        let sql = format!(
            r#"SELECT {WORD_COLUMNS} FROM "word_knowledge"
               WHERE "userId" = $1 AND "language" = $2 ORDER BY "word""#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(language)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_word_row).collect()
    }

    async fn record_word_exposure(
        &self,
        key: &WordKey,
        seen_at: DateTime<Utc>,
    ) -> Result<WordKnowledgeRecord, StoreError> {
        self.bump_word(key, WordEvent::Exposure, Some(seen_at)).await
    }

    async fn record_word_lookup(&self, key: &WordKey) -> Result<WordKnowledgeRecord, StoreError> {
        self.bump_word(key, WordEvent::Lookup, None).await
    }

    async fn record_word_review(
        &self,
        key: &WordKey,
        correct: bool,
    ) -> Result<WordKnowledgeRecord, StoreError> {
        self.bump_word(key, WordEvent::Review { correct }, None).await
    }

    async fn set_word_confidence(&self, key: &WordKey, confidence: f64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"UPDATE "word_knowledge" SET "confidenceScore" = $4, "updatedAt" = NOW()
               WHERE "userId" = $1 AND "language" = $2 AND "word" = $3"#,
        )
        .bind(&key.user_id)
        .bind(&key.language)
        .bind(&key.word)
        .bind(confidence.clamp(0.0, 1.0))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("word {}", key.word)));
        }
        Ok(())
    }

    async fn append_interaction(&self, interaction: &InteractionRecord) -> Result<(), StoreError> {
        let signals = &interaction.signals;
        sqlx::query(
            r#"INSERT INTO "interactions" ("id","userId","contentId","interactionType","timeSpentSeconds",
               "completionRate","wordsLookedUp","replayCount","contentDurationSeconds","word",
               "inferredComprehension","xpEarned","createdAt")
               VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)"#,
        )
        .bind(&interaction.id)
        .bind(&interaction.user_id)
        .bind(&interaction.content_id)
        .bind(interaction.interaction_type.as_str())
        .bind(signals.time_spent_seconds)
        .bind(signals.completion_rate)
        .bind(signals.words_looked_up.map(saturating_i32))
        .bind(signals.replay_count.map(saturating_i32))
        .bind(signals.content_duration_seconds)
        .bind(&interaction.word)
        .bind(interaction.inferred_comprehension)
        .bind(interaction.xp_earned)
        .bind(interaction.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionRecord>, StoreError> {
        let sql = format!(
            r#"SELECT {INTERACTION_COLUMNS} FROM "interactions"
               WHERE "userId" = $1 ORDER BY "createdAt" DESC, "id" DESC LIMIT $2"#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_interaction_row).collect()
    }
}

async fn insert_user_if_absent<'e, E>(executor: E, user: &UserRecord) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"INSERT INTO "users" ("id","currentLevel","comprehensionScore","engagementScore","totalXp",
           "streakDays","longestStreak","lastActiveOn","createdAt","updatedAt")
           VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
           ON CONFLICT ("id") DO NOTHING"#,
    )
    .bind(&user.id)
    .bind(user.current_level.as_str())
    .bind(user.comprehension_score)
    .bind(user.engagement_score)
    .bind(user.total_xp)
    .bind(user.streak_days)
    .bind(user.longest_streak)
    .bind(user.last_active_on)
    .bind(user.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn parse_level(raw: &str) -> Result<CefrLevel, StoreError> {
    CefrLevel::parse(raw).ok_or_else(|| StoreError::InvalidRow(format!("unknown level {raw}")))
}

fn map_user_row(row: &PgRow) -> Result<UserRecord, StoreError> {
    let level: String = row.try_get("currentLevel")?;
    Ok(UserRecord {
        id: row.try_get("id")?,
        current_level: parse_level(&level)?,
        comprehension_score: row.try_get("comprehensionScore")?,
        engagement_score: row.try_get("engagementScore")?,
        total_xp: row.try_get("totalXp")?,
        streak_days: row.try_get("streakDays")?,
        longest_streak: row.try_get("longestStreak")?,
        last_active_on: row.try_get("lastActiveOn")?,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

fn map_content_row(row: &PgRow) -> Result<ContentRecord, StoreError> {
    let raw_type: String = row.try_get("type")?;
    let level: String = row.try_get("level")?;
    let Json(topics): Json<Vec<String>> = row.try_get("topics")?;

    Ok(ContentRecord {
        id: row.try_get("id")?,
        content_type: ContentType::parse(&raw_type)
            .ok_or_else(|| StoreError::InvalidRow(format!("unknown content type {raw_type}")))?,
        level: parse_level(&level)?,
        title: row.try_get("title")?,
        topics,
        metrics: ContentMetrics {
            view_count: row.try_get("viewCount")?,
            like_count: row.try_get("likeCount")?,
            save_count: row.try_get("saveCount")?,
            skip_count: row.try_get("skipCount")?,
            average_time_spent_seconds: row.try_get("averageTimeSpentSeconds")?,
            dopamine_score: row.try_get("dopamineScore")?,
        },
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

fn map_word_row(row: &PgRow) -> Result<WordKnowledgeRecord, StoreError> {
    Ok(WordKnowledgeRecord {
        user_id: row.try_get("userId")?,
        language: row.try_get("language")?,
        word: row.try_get("word")?,
        counters: WordCounters {
            exposure_count: row.try_get("exposureCount")?,
            correct_reviews: row.try_get("correctReviews")?,
            incorrect_reviews: row.try_get("incorrectReviews")?,
            lookup_count: row.try_get("lookupCount")?,
        },
        confidence_score: row.try_get("confidenceScore")?,
        last_seen_at: row.try_get("lastSeenAt")?,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

fn map_interaction_row(row: &PgRow) -> Result<InteractionRecord, StoreError> {
    let raw_type: String = row.try_get("interactionType")?;
    let words_looked_up: Option<i32> = row.try_get("wordsLookedUp")?;
    let replay_count: Option<i32> = row.try_get("replayCount")?;

    Ok(InteractionRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        content_id: row.try_get("contentId")?,
        interaction_type: InteractionType::parse(&raw_type),
        signals: InteractionSignals {
            time_spent_seconds: row.try_get("timeSpentSeconds")?,
            completion_rate: row.try_get("completionRate")?,
            words_looked_up: words_looked_up.map(|v| v.max(0) as u32),
            replay_count: replay_count.map(|v| v.max(0) as u32),
            content_duration_seconds: row.try_get("contentDurationSeconds")?,
        },
        word: row.try_get("word")?,
        inferred_comprehension: row.try_get("inferredComprehension")?,
        xp_earned: row.try_get("xpEarned")?,
        created_at: row.try_get("createdAt")?,
    })
}
