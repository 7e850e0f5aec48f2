//! Content catalog
//!
//! Read-only pools of emoji puzzles, trivia questions and truth-or-dare
//! prompts, grouped by game type and content category. Loaded from a JSON
//! file or the built-in set.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::types::*;

pub const CONTENT_EMOJI: &str = "emoji";
pub const CONTENT_QUESTION: &str = "question";
pub const CONTENT_TRUTH: &str = "truth";
pub const CONTENT_DARE: &str = "dare";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid content item '{id}': {reason}")]
    Invalid { id: ContentId, reason: String },
}

/// On-disk catalog format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, Default)]
pub struct ContentCatalog {
    items: Vec<ContentItem>,
}

impl ContentCatalog {
    /// Build a catalog, rejecting invalid items
    pub fn new(items: Vec<ContentItem>) -> Result<Self, CatalogError> {
        let catalog = Self { items };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load and validate a JSON catalog file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let file: CatalogFile = serde_json::from_slice(&bytes)?;
        let catalog = Self::new(file.items)?;
        tracing::info!(
            path = %path.as_ref().display(),
            items = catalog.len(),
            "Content catalog loaded"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Validate every item and id uniqueness within each game type
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();

        for item in &self.items {
            let invalid = |reason: &str| CatalogError::Invalid {
                id: item.id.clone(),
                reason: reason.to_string(),
            };

            if item.id.trim().is_empty() {
                return Err(invalid("empty id"));
            }
            if item.game_type.trim().is_empty() || item.content_type.trim().is_empty() {
                return Err(invalid("missing game type or content type"));
            }
            if !seen.insert((item.game_type.as_str(), item.id.as_str())) {
                return Err(invalid("duplicate id within game type"));
            }

            match &item.body {
                ContentBody::Emoji { emojis, answer } => {
                    if emojis.trim().is_empty() || answer.trim().is_empty() {
                        return Err(invalid("emoji puzzle needs emojis and an answer"));
                    }
                }
                ContentBody::Question {
                    question,
                    choices,
                    correct_index,
                } => {
                    if question.trim().is_empty() {
                        return Err(invalid("empty question"));
                    }
                    if !(2..=4).contains(&choices.len()) {
                        return Err(invalid("question needs 2-4 choices"));
                    }
                    if choices.iter().any(|c| c.trim().is_empty()) {
                        return Err(invalid("empty choice"));
                    }
                    if *correct_index >= choices.len() {
                        return Err(invalid("correct_index out of range"));
                    }
                }
                ContentBody::Prompt { text, .. } => {
                    if text.trim().is_empty() {
                        return Err(invalid("empty prompt"));
                    }
                }
            }
        }

        Ok(())
    }

    /// Candidate pool for a (game type, content category) pair, in catalog order
    pub fn pool(&self, game_type: &str, content_type: &str) -> Vec<ContentItem> {
        self.items
            .iter()
            .filter(|i| i.game_type == game_type && i.content_type == content_type)
            .cloned()
            .collect()
    }

    pub fn get(&self, game_type: &str, content_id: &str) -> Option<&ContentItem> {
        self.items
            .iter()
            .find(|i| i.game_type == game_type && i.id == content_id)
    }

    /// Built-in content for emoji-guess, trivia and truth-or-dare
    pub fn builtin() -> Self {
        let mut items = Vec::new();

        for (id, emojis, answer) in [
            ("emoji-1", "🦁👑", "The Lion King"),
            ("emoji-2", "🕷️🧑", "Spider-Man"),
            ("emoji-3", "❄️👸", "Frozen"),
            ("emoji-4", "🚢🧊💔", "Titanic"),
            ("emoji-5", "🍫🏭", "Charlie and the Chocolate Factory"),
            ("emoji-6", "👻🚫", "Ghostbusters"),
        ] {
            items.push(ContentItem {
                id: id.to_string(),
                game_type: GAME_EMOJI_GUESS.to_string(),
                content_type: CONTENT_EMOJI.to_string(),
                body: ContentBody::Emoji {
                    emojis: emojis.to_string(),
                    answer: answer.to_string(),
                },
            });
        }

        for (id, question, choices, correct_index) in [
            (
                "trivia-1",
                "Which planet is known as the Red Planet?",
                ["Venus", "Mars", "Jupiter"],
                1,
            ),
            ("trivia-2", "How many legs does a spider have?", ["Six", "Eight", "Ten"], 1),
            (
                "trivia-3",
                "What is the largest ocean on Earth?",
                ["Pacific", "Atlantic", "Indian"],
                0,
            ),
            (
                "trivia-4",
                "Which gas do plants absorb?",
                ["Oxygen", "Nitrogen", "Carbon dioxide"],
                2,
            ),
            ("trivia-5", "How many minutes are in a full day?", ["1440", "1240", "1640"], 0),
            ("trivia-6", "What is the chemical symbol for gold?", ["Ag", "Gd", "Au"], 2),
        ] {
            items.push(ContentItem {
                id: id.to_string(),
                game_type: GAME_TRIVIA.to_string(),
                content_type: CONTENT_QUESTION.to_string(),
                body: ContentBody::Question {
                    question: question.to_string(),
                    choices: choices.iter().map(|c| c.to_string()).collect(),
                    correct_index,
                },
            });
        }

        for (id, kind, text) in [
            ("truth-1", PromptKind::Truth, "What is the most embarrassing song on your playlist?"),
            ("truth-2", PromptKind::Truth, "What was your worst haircut?"),
            ("truth-3", PromptKind::Truth, "Who was your first celebrity crush?"),
            ("truth-4", PromptKind::Truth, "What is the weirdest food you enjoy?"),
            ("dare-1", PromptKind::Dare, "Do your best impression of someone in the room."),
            ("dare-2", PromptKind::Dare, "Speak in an accent for the next three rounds."),
            ("dare-3", PromptKind::Dare, "Show the last photo in your camera roll."),
            ("dare-4", PromptKind::Dare, "Dance without music for 20 seconds."),
        ] {
            let content_type = match kind {
                PromptKind::Truth => CONTENT_TRUTH,
                PromptKind::Dare => CONTENT_DARE,
            };
            items.push(ContentItem {
                id: id.to_string(),
                game_type: GAME_TRUTH_OR_DARE.to_string(),
                content_type: content_type.to_string(),
                body: ContentBody::Prompt {
                    prompt_kind: kind,
                    text: text.to_string(),
                },
            });
        }

        Self { items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, choices: Vec<&str>, correct_index: usize) -> ContentItem {
        ContentItem {
            id: id.to_string(),
            game_type: GAME_TRIVIA.to_string(),
            content_type: CONTENT_QUESTION.to_string(),
            body: ContentBody::Question {
                question: "Q?".to_string(),
                choices: choices.into_iter().map(String::from).collect(),
                correct_index,
            },
        }
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = ContentCatalog::builtin();
        catalog.validate().unwrap();

        assert_eq!(catalog.pool(GAME_EMOJI_GUESS, CONTENT_EMOJI).len(), 6);
        assert_eq!(catalog.pool(GAME_TRIVIA, CONTENT_QUESTION).len(), 6);
        assert_eq!(catalog.pool(GAME_TRUTH_OR_DARE, CONTENT_TRUTH).len(), 4);
        assert_eq!(catalog.pool(GAME_TRUTH_OR_DARE, CONTENT_DARE).len(), 4);
        assert!(catalog
            .pool(GAME_ROCK_PAPER_SCISSORS, CONTENT_QUESTION)
            .is_empty());
    }

    #[test]
    fn test_rejects_duplicate_ids_within_game_type() {
        let result = ContentCatalog::new(vec![
            question("q1", vec!["a", "b"], 0),
            question("q1", vec!["c", "d"], 1),
        ]);
        match result {
            Err(CatalogError::Invalid { id, reason }) => {
                assert_eq!(id, "q1");
                assert!(reason.contains("duplicate"));
            }
            other => panic!("expected duplicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_same_id_in_different_game_types_is_fine() {
        let mut other = question("q1", vec!["a", "b"], 0);
        other.game_type = "quiz-night".to_string();

        let catalog = ContentCatalog::new(vec![question("q1", vec!["a", "b"], 0), other]).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_rejects_out_of_range_answer() {
        let result = ContentCatalog::new(vec![question("q1", vec!["a", "b", "c"], 3)]);
        assert!(matches!(result, Err(CatalogError::Invalid { .. })));
    }

    #[test]
    fn test_rejects_too_few_choices() {
        let result = ContentCatalog::new(vec![question("q1", vec!["only"], 0)]);
        assert!(matches!(result, Err(CatalogError::Invalid { .. })));
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let file = CatalogFile {
            items: vec![question("q1", vec!["a", "b"], 1)],
        };
        tokio::fs::write(&path, serde_json::to_vec(&file).unwrap())
            .await
            .unwrap();

        let catalog = ContentCatalog::from_file(&path).await.unwrap();
        assert_eq!(catalog.pool(GAME_TRIVIA, CONTENT_QUESTION).len(), 1);
        assert!(catalog.get(GAME_TRIVIA, "q1").is_some());
        assert!(catalog.get(GAME_EMOJI_GUESS, "q1").is_none());
    }

    #[tokio::test]
    async fn test_from_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let result = ContentCatalog::from_file(&path).await;
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }
}
