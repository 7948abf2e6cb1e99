//! Domain types shared by the pipelines and the controller.

use crate::error::{HqError, Result};
use crate::remote::{LeaderboardEntry, QuizPayload};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label of a signed-in visitor. The absence of an `Identity` means "guest".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The label the remote service knows this visitor by.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who produced a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Visitor,
    System,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Visitor => write!(f, "visitor"),
            Origin::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub origin: Origin,
}

impl Message {
    pub fn visitor(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: Origin::Visitor,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            origin: Origin::System,
        }
    }
}

/// Append-only conversation log. Insertion order is significant.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and returns a reference to the stored copy.
    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Identifies one `start()` of the quiz machine. Responses carrying an older
/// token than the current one are stale and get dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundToken(pub u64);

/// A validated multiple-choice question.
///
/// Invariant: when `options` is non-empty, `correct_index < options.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRound {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: String,
}

impl QuizRound {
    /// Whether a visitor can select anything at all in this round.
    pub fn is_selectable(&self) -> bool {
        !self.options.is_empty()
    }
}

impl TryFrom<QuizPayload> for QuizRound {
    type Error = HqError;

    fn try_from(payload: QuizPayload) -> Result<Self> {
        let question = payload
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| HqError::MalformedResponse("quiz has no question".into()))?;
        let options = payload.options.unwrap_or_default();

        // An empty option list is an upstream content problem; the round is
        // still shown, it just cannot be answered.
        let correct_index = if options.is_empty() {
            0
        } else {
            let raw = payload.correct_index.ok_or_else(|| {
                HqError::MalformedResponse("quiz has options but no correct_index".into())
            })?;
            usize::try_from(raw)
                .ok()
                .filter(|idx| *idx < options.len())
                .ok_or_else(|| {
                    HqError::MalformedResponse(format!(
                        "correct_index {} out of range for {} options",
                        raw,
                        options.len()
                    ))
                })?
        };

        Ok(Self {
            question,
            options,
            correct_index,
            explanation: payload.explanation.unwrap_or_default(),
        })
    }
}

/// Result of answering a round. Computed once per round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub round: RoundToken,
    pub selected_index: usize,
    pub is_correct: bool,
    pub explanation: String,
}

/// What became of a score submission after a correct answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    /// No identity was held, nothing was sent.
    Guest,
    /// The remote accepted the submission and reported the new total.
    Saved(f64),
    /// The remote accepted the submission but the total could not be read.
    SavedUnreadable,
    /// Transport failure or non-success status.
    Failed,
}

impl ScoreOutcome {
    pub fn message(&self) -> String {
        match self {
            ScoreOutcome::Guest => "(Login to save score)".to_string(),
            ScoreOutcome::Saved(total) => format!("Total Score: {}", format_score(*total)),
            ScoreOutcome::SavedUnreadable => "(Score saved, total unavailable)".to_string(),
            ScoreOutcome::Failed => "(Error saving score)".to_string(),
        }
    }
}

/// Leaderboard contents as the view should show them.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaderboard {
    Empty,
    Entries(Vec<LeaderboardEntry>),
}

impl Leaderboard {
    pub const PLACEHOLDER: &'static str = "No data yet";

    pub fn from_entries(entries: Option<Vec<LeaderboardEntry>>) -> Self {
        match entries {
            Some(entries) if !entries.is_empty() => Leaderboard::Entries(entries),
            _ => Leaderboard::Empty,
        }
    }

    /// One display line per record, in the order received.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Leaderboard::Empty => vec![Self::PLACEHOLDER.to_string()],
            Leaderboard::Entries(entries) => entries
                .iter()
                .map(|e| format!("{}: {}", e.user_id, format_score(e.total_score)))
                .collect(),
        }
    }
}

/// Scores travel as JSON numbers; whole values print without a fraction.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 && score.abs() < 1e15 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}
