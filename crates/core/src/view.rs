//! View boundary.
//!
//! The controller drives the view; the view never feeds state back. Every
//! value passed here is a snapshot of controller state at render time.

use crate::model::{Leaderboard, Message, ScoreOutcome};

/// Top-level screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    SignedOut,
    Dashboard,
}

/// Recording indicator next to the record button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Ready,
    Listening,
    Processing,
}

impl CaptureStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CaptureStatus::Ready => "Hold to Speak",
            CaptureStatus::Listening => "Listening...",
            CaptureStatus::Processing => "Processing...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    Correct,
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDisplay {
    pub label: String,
    pub enabled: bool,
    pub mark: Option<OptionMark>,
}

/// What the quiz area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizDisplay {
    Loading,
    Round {
        question: String,
        options: Vec<OptionDisplay>,
    },
    /// The round was unusable; a retry is offered.
    Invalid,
    /// The round could not be fetched; the start affordance is back.
    Offline,
}

impl QuizDisplay {
    pub const LOADING_TEXT: &'static str = "Generating tactical scenario...";
    pub const INVALID_TEXT: &'static str = "Invalid data from HQ.";
    pub const OFFLINE_TEXT: &'static str = "Failed to load scenario. HQ offline.";
}

/// Verdict shown under an answered round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Correct { explanation: String },
    Incorrect { explanation: String },
}

impl Feedback {
    pub fn message(&self) -> String {
        match self {
            Feedback::Correct { explanation } => format!("Correct! {} +100 XP", explanation),
            Feedback::Incorrect { explanation } => format!("Incorrect. {}", explanation),
        }
    }
}

/// Rendering surface driven by the controller.
pub trait View: Send + Sync {
    fn show_screen(&self, screen: Screen);

    /// Appends one transcript entry.
    fn append_message(&self, message: &Message);

    fn render_capture_status(&self, status: CaptureStatus);

    fn render_quiz(&self, quiz: &QuizDisplay);

    fn render_feedback(&self, feedback: &Feedback);

    fn render_score(&self, outcome: &ScoreOutcome);

    /// Reveals the "Next Scenario" affordance for the answered round.
    fn show_next_round(&self);

    fn render_leaderboard(&self, board: &Leaderboard);

    /// One-off notice outside any pipeline's own area.
    fn notify(&self, text: &str);
}
