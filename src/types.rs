use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type SessionId = String;
pub type PlayerId = String;
pub type GameTypeId = String;
pub type ContentId = String;
pub type ContentType = String;

/// Game types with a content pool
pub const GAME_EMOJI_GUESS: &str = "emoji-guess";
pub const GAME_TRIVIA: &str = "trivia";
pub const GAME_TRUTH_OR_DARE: &str = "truth-or-dare";
pub const GAME_ROCK_PAPER_SCISSORS: &str = "rock-paper-scissors";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClockStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Expired,
}

/// In-memory state of a session clock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ClockState {
    /// Zero while Idle without a budget
    pub total_budget_seconds: u64,
    pub remaining_seconds: u64,
    pub status: ClockStatus,
    pub last_observed_wall_clock: Option<DateTime<Utc>>,
    /// Running time not yet charged when the clock was paused
    #[serde(default)]
    pub carried_millis: u64,
}

/// A content item the selector can hand out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: ContentId,
    pub game_type: GameTypeId,
    pub content_type: ContentType,
    pub body: ContentBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBody {
    /// Guess the phrase behind a row of emojis
    Emoji { emojis: String, answer: String },
    /// Multiple choice trivia question
    Question {
        question: String,
        choices: Vec<String>,
        correct_index: usize,
    },
    /// Truth-or-dare prompt
    Prompt { prompt_kind: PromptKind, text: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Truth,
    Dare,
}

/// Exposure history of one content item for one player within one game type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentRecord {
    pub player_id: PlayerId,
    pub game_type: GameTypeId,
    pub content_id: ContentId,
    pub content_type: ContentType,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub times_seen: u32,
}

/// Seen/total counts for progress displays ("12/40 questions")
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub seen: usize,
    pub total: usize,
}

/// How a session reacts to the hosting page being hidden
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityPolicy {
    /// Pause the clock while hidden, resume when visible again
    #[default]
    PauseWhenHidden,
    /// Keep burning the budget in real wall-clock time
    BurnWhenHidden,
}
