use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use langfeed_algo::{
    CachePolicy, ComprehensionConfig, RankingConfig, RewardConfig, UserScoreConfig,
    WordKnowledgeConfig,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Postgres store when set, in-memory store otherwise
    pub database_url: Option<String>,
    /// Redis feed cache when set, in-memory cache otherwise
    pub redis_url: Option<String>,
    pub feed_source_urls: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let feed_source_urls = env_string("FEED_SOURCE_URLS")
            .map(|raw| {
                raw.split(',')
                    .map(|url| url.trim().trim_end_matches('/').to_string())
                    .filter(|url| !url.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host,
            port,
            log_level,
            database_url: env_string("DATABASE_URL"),
            redis_url: env_string("REDIS_URL"),
            feed_source_urls,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Composer settings that are not part of the pure ranking policy
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    pub ranking: RankingConfig,
    pub max_page_size: usize,
    /// Upper bound on candidates requested from each source
    pub candidate_pool: usize,
    pub source_timeout: Duration,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            ranking: RankingConfig::default(),
            max_page_size: 100,
            candidate_pool: 250,
            source_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub comprehension: ComprehensionConfig,
    pub word_knowledge: WordKnowledgeConfig,
    pub user_score: UserScoreConfig,
    pub reward: RewardConfig,
    pub cache: CachePolicy,
    pub composer: ComposerConfig,
    /// Language tag stored with every word-knowledge row
    pub language: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            comprehension: ComprehensionConfig::default(),
            word_knowledge: WordKnowledgeConfig::default(),
            user_score: UserScoreConfig::default(),
            reward: RewardConfig::default(),
            cache: CachePolicy::default(),
            composer: ComposerConfig::default(),
            language: "es".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(enabled) = env_bool("FEED_DURATION_RELATIVE_CREDIT") {
            config.comprehension.duration_relative_time_credit = enabled;
        }
        if let Some(probability) = env_f64("FEED_BONUS_PROBABILITY") {
            config.reward.bonus_probability = probability.clamp(0.0, 1.0);
        }
        if let Some(ttl) = env_u64("FEED_CACHE_TTL_SECS") {
            config.cache.ttl_secs = ttl;
        }
        if let Some(share) = env_f64("FEED_MAX_TYPE_SHARE") {
            if share > 0.0 && share <= 1.0 {
                config.composer.ranking.max_type_share = share;
            }
        }
        if let Some(ms) = env_u64("FEED_SOURCE_TIMEOUT_MS") {
            config.composer.source_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(language) = env_string("LEARNING_LANGUAGE") {
            config.language = language.to_lowercase();
        }

        config
    }
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn env_f64(key: &str) -> Option<f64> {
    env_string(key)?.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    let normalized = env_string(key)?.to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
