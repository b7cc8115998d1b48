//! Content Metrics Aggregator
//!
//! Maps an interaction to counter deltas on the touched content item and
//! keeps a true running average of watch time.

use serde::{Deserialize, Serialize};

use crate::sanitize::finite_or;
use crate::types::InteractionType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetrics {
    pub view_count: i64,
    pub like_count: i64,
    pub save_count: i64,
    pub skip_count: i64,
    pub average_time_spent_seconds: f64,
    /// Composite engagement heuristic; unbounded
    pub dopamine_score: f64,
}

/// Increments produced by one interaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDelta {
    pub views: i64,
    pub likes: i64,
    pub saves: i64,
    pub skips: i64,
    pub dopamine: f64,
    pub time_spent_seconds: Option<f64>,
}

impl MetricsDelta {
    pub fn is_empty(&self) -> bool {
        self.views == 0
            && self.likes == 0
            && self.saves == 0
            && self.skips == 0
            && self.dopamine == 0.0
            && self.time_spent_seconds.is_none()
    }
}

pub fn delta_for(interaction_type: &InteractionType, time_spent_seconds: Option<f64>) -> MetricsDelta {
    let mut delta = MetricsDelta {
        time_spent_seconds: time_spent_seconds
            .filter(|t| t.is_finite())
            .map(|t| t.max(0.0)),
        ..MetricsDelta::default()
    };

    match interaction_type {
        InteractionType::DoubleTap => {
            delta.likes = 1;
            delta.dopamine = 0.01;
        }
        InteractionType::SwipeRight | InteractionType::Save => {
            delta.saves = 1;
            delta.dopamine = 0.015;
        }
        InteractionType::Skip => {
            delta.skips = 1;
            delta.dopamine = -0.005;
        }
        InteractionType::SwipeUp | InteractionType::Completed => {
            delta.views = 1;
        }
        _ => {}
    }

    delta
}

/// Running average over views, weighted by the view count before this event
pub fn running_average(old_average: f64, old_views: i64, new_time: f64) -> f64 {
    let old_views = old_views.max(0) as f64;
    let old_average = finite_or(old_average, 0.0).max(0.0);
    (old_average * old_views + new_time) / (old_views + 1.0)
}

pub fn apply_delta(metrics: &ContentMetrics, delta: &MetricsDelta) -> ContentMetrics {
    let average_time_spent_seconds = match delta.time_spent_seconds {
        Some(time) => running_average(metrics.average_time_spent_seconds, metrics.view_count, time),
        None => metrics.average_time_spent_seconds,
    };

    ContentMetrics {
        view_count: metrics.view_count.saturating_add(delta.views.max(0)),
        like_count: metrics.like_count.saturating_add(delta.likes.max(0)),
        save_count: metrics.save_count.saturating_add(delta.saves.max(0)),
        skip_count: metrics.skip_count.saturating_add(delta.skips.max(0)),
        average_time_spent_seconds,
        dopamine_score: finite_or(metrics.dopamine_score + delta.dopamine, metrics.dopamine_score),
    }
}
