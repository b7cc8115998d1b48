//! Curated fallback feed.
//!
//! Served when no live source produced a candidate. Pages wrap around the
//! list; items past the first pass get a `-cycle-N` suffix so ids stay unique
//! across an infinite scroll.

use super::FeedItem;
use crate::types::{CefrLevel, ContentType};

pub const FALLBACK_SOURCE: &str = "fallback";

pub struct FallbackEntry {
    pub id: &'static str,
    pub content_type: ContentType,
    pub level: CefrLevel,
    pub title: &'static str,
    pub known_word_share: f64,
    pub new_words: &'static [&'static str],
}

pub static FALLBACK_FEED: [FallbackEntry; 6] = [
    FallbackEntry {
        id: "fallback-video-1",
        content_type: ContentType::Video,
        level: CefrLevel::A1,
        title: "Abuela gamer conquista el torneo",
        known_word_share: 0.94,
        new_words: &["abuela", "torneo", "rivales"],
    },
    FallbackEntry {
        id: "fallback-video-2",
        content_type: ContentType::Video,
        level: CefrLevel::A1,
        title: "Viaje mágico en acuarela",
        known_word_share: 0.91,
        new_words: &["viajera", "encantado", "acuarela"],
    },
    FallbackEntry {
        id: "fallback-video-3",
        content_type: ContentType::Video,
        level: CefrLevel::A1,
        title: "Necesito un café urgente",
        known_word_share: 0.90,
        new_words: &["urgente", "explica", "comenzar"],
    },
    FallbackEntry {
        id: "fallback-article-1",
        content_type: ContentType::Article,
        level: CefrLevel::A1,
        title: "Trucos para aprender español con series",
        known_word_share: 0.88,
        new_words: &["estrategia", "expresión", "pronunciación"],
    },
    FallbackEntry {
        id: "fallback-video-4",
        content_type: ContentType::Video,
        level: CefrLevel::A2,
        title: "Subiendo nuevas metas",
        known_word_share: 0.93,
        new_words: &["metas", "escaleras", "alcanzar"],
    },
    FallbackEntry {
        id: "fallback-video-5",
        content_type: ContentType::Video,
        level: CefrLevel::A2,
        title: "Di lo que necesitas",
        known_word_share: 0.92,
        new_words: &["paella", "platos", "famosos"],
    },
];

impl FallbackEntry {
    fn to_item(&self, cycle: usize) -> FeedItem {
        let id = if cycle == 0 {
            self.id.to_string()
        } else {
            format!("{}-cycle-{}", self.id, cycle)
        };
        FeedItem {
            id,
            content_type: self.content_type,
            level: self.level,
            title: self.title.to_string(),
            source: FALLBACK_SOURCE.to_string(),
            score: 0.0,
            known_word_share: Some(self.known_word_share),
            new_words: self.new_words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// `limit` items starting at `offset`, wrapping around the curated list
pub fn fallback_page(limit: usize, offset: usize) -> Vec<FeedItem> {
    let len = FALLBACK_FEED.len();
    (offset..offset.saturating_add(limit))
        .map(|position| FALLBACK_FEED[position % len].to_item(position / len))
        .collect()
}
