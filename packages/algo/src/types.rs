//! Common Types and Constants
//!
//! Shared vocabulary used across all policy modules: CEFR levels, content
//! kinds, interaction kinds and the behavioral signals attached to an
//! interaction.

use std::fmt;

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Tolerance used when comparing derived scores
pub const EPSILON: f64 = 1e-9;

/// Neutral starting point for per-user rolling scores
pub const NEUTRAL_SCORE: f64 = 0.5;

// ==================== CEFR Levels ====================

/// Proficiency band of a learner or of a piece of content
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum CefrLevel {
    #[default]
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 6] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
        CefrLevel::C2,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// One band harder, saturating at C2
    pub fn step_up(self) -> Self {
        Self::from_index(self.index() + 1).unwrap_or(self)
    }

    /// One band easier, saturating at A1
    pub fn step_down(self) -> Self {
        self.index()
            .checked_sub(1)
            .and_then(Self::from_index)
            .unwrap_or(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C1 => "C1",
            Self::C2 => "C2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "A1" => Some(Self::A1),
            "A2" => Some(Self::A2),
            "B1" => Some(Self::B1),
            "B2" => Some(Self::B2),
            "C1" => Some(Self::C1),
            "C2" => Some(Self::C2),
            _ => None,
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Content ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Article,
    Social,
    Music,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Article => "article",
            Self::Social => "social",
            Self::Music => "music",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "video" => Some(Self::Video),
            "article" => Some(Self::Article),
            "social" => Some(Self::Social),
            "music" => Some(Self::Music),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Interactions ====================

/// What the learner did with a feed item.
///
/// Unrecognized kinds are kept verbatim in [`InteractionType::Other`] so they
/// can still be logged; every policy treats them as neutral.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InteractionType {
    Completed,
    SwipeUp,
    SwipeLeft,
    SwipeRight,
    DoubleTap,
    Save,
    Skip,
    Replay,
    WordLookup,
    Other(String),
}

impl InteractionType {
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "COMPLETED" => Self::Completed,
            "SWIPE_UP" => Self::SwipeUp,
            "SWIPE_LEFT" => Self::SwipeLeft,
            "SWIPE_RIGHT" => Self::SwipeRight,
            "DOUBLE_TAP" => Self::DoubleTap,
            "SAVE" => Self::Save,
            "SKIP" => Self::Skip,
            "REPLAY" => Self::Replay,
            "WORD_LOOKUP" => Self::WordLookup,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "COMPLETED",
            Self::SwipeUp => "SWIPE_UP",
            Self::SwipeLeft => "SWIPE_LEFT",
            Self::SwipeRight => "SWIPE_RIGHT",
            Self::DoubleTap => "DOUBLE_TAP",
            Self::Save => "SAVE",
            Self::Skip => "SKIP",
            Self::Replay => "REPLAY",
            Self::WordLookup => "WORD_LOOKUP",
            Self::Other(raw) => raw.as_str(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<String> for InteractionType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<InteractionType> for String {
    fn from(value: InteractionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Passive behavioral signals attached to one interaction; any subset may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionSignals {
    pub time_spent_seconds: Option<f64>,
    /// Share of the item consumed, in `[0, 1]`
    pub completion_rate: Option<f64>,
    pub words_looked_up: Option<u32>,
    pub replay_count: Option<u32>,
    /// Length of the item, used only by the duration-relative time credit
    pub content_duration_seconds: Option<f64>,
}
