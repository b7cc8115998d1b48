//! Type-diversity ordering.
//!
//! Greedy selection over the score-ordered list, one page at a time. For each
//! slot the best remaining item is taken that (in order of preference):
//! 1. differs in type from the previous slot and is under its per-page cap
//! 2. is under its per-page cap
//! 3. anything, so a page is never short while candidates remain

use std::collections::HashMap;

use super::FeedItem;
use crate::sanitize::clamp_unit;
use crate::types::ContentType;

/// Items of one type allowed on a page of `page_size`
pub fn type_cap(page_size: usize, max_share: f64) -> usize {
    let cap = (clamp_unit(max_share) * page_size as f64).ceil() as usize;
    cap.max(1)
}

pub fn diversify(ranked: Vec<FeedItem>, page_size: usize, max_share: f64) -> Vec<FeedItem> {
    if page_size == 0 || ranked.len() <= 1 {
        return ranked;
    }

    let cap = type_cap(page_size, max_share);
    let mut remaining = ranked;
    let mut ordered = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut per_type: HashMap<ContentType, usize> = HashMap::new();
        let mut previous: Option<ContentType> = None;

        for _ in 0..page_size {
            if remaining.is_empty() {
                break;
            }
            let under_cap = |item: &FeedItem| per_type.get(&item.content_type).copied().unwrap_or(0) < cap;

            let index = remaining
                .iter()
                .position(|item| Some(item.content_type) != previous && under_cap(item))
                .or_else(|| remaining.iter().position(|item| under_cap(item)))
                .unwrap_or(0);

            let item = remaining.remove(index);
            *per_type.entry(item.content_type).or_insert(0) += 1;
            previous = Some(item.content_type);
            ordered.push(item);
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CefrLevel;

    fn item(id: &str, content_type: ContentType, score: f64) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            content_type,
            level: CefrLevel::A2,
            title: id.to_string(),
            source: "test".to_string(),
            score,
            known_word_share: None,
            new_words: Vec::new(),
        }
    }

    fn count(page: &[FeedItem], content_type: ContentType) -> usize {
        page.iter().filter(|i| i.content_type == content_type).count()
    }

    #[test]
    fn test_type_cap() {
        assert_eq!(type_cap(10, 0.5), 5);
        assert_eq!(type_cap(5, 0.5), 3);
        assert_eq!(type_cap(1, 0.5), 1);
        assert_eq!(type_cap(10, 0.0), 1);
    }

    #[test]
    fn test_no_type_exceeds_share_when_alternatives_exist() {
        let mut ranked = Vec::new();
        for i in 0..8 {
            ranked.push(item(&format!("v{i}"), ContentType::Video, 1.0 - i as f64 * 0.01));
        }
        for i in 0..4 {
            ranked.push(item(&format!("a{i}"), ContentType::Article, 0.5 - i as f64 * 0.01));
        }
        for i in 0..4 {
            ranked.push(item(&format!("s{i}"), ContentType::Social, 0.4 - i as f64 * 0.01));
        }

        let ordered = diversify(ranked, 6, 0.5);
        assert_eq!(ordered.len(), 16);
        for page in ordered.chunks(6).take(2) {
            assert!(count(page, ContentType::Video) <= 3);
        }
        assert_eq!(ordered[0].id, "v0");
        assert_eq!(ordered[1].id, "a0");
        assert_eq!(ordered[2].id, "v1");
    }

    #[test]
    fn test_single_type_backfills() {
        let ranked: Vec<_> = (0..5)
            .map(|i| item(&format!("v{i}"), ContentType::Video, 1.0))
            .collect();
        let ordered = diversify(ranked, 4, 0.5);
        let ids: Vec<_> = ordered.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["v0", "v1", "v2", "v3", "v4"]);
    }

    #[test]
    fn test_keeps_every_item() {
        let ranked = vec![
            item("m0", ContentType::Music, 0.9),
            item("m1", ContentType::Music, 0.8),
            item("a0", ContentType::Article, 0.1),
        ];
        let ordered = diversify(ranked, 2, 0.5);
        let ids: Vec<_> = ordered.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "a0", "m1"]);
    }
}
