//! Remote Service contract
//!
//! This module defines the four operations the client needs from HQ, the JSON
//! shapes they exchange, and a deterministic offline implementation that
//! mirrors the backend's fallback behavior.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Body of an `ask` call. At least one of the two fields is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Base64 encoded audio recording.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub answer: Option<String>,
}

/// Raw quiz body. Every field is optional on the wire; `QuizRound::try_from`
/// decides whether the result is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizPayload {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub correct_index: Option<i64>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    #[serde(rename = "newScore", default)]
    pub new_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "UserId")]
    pub user_id: String,
    #[serde(rename = "TotalScore", default)]
    pub total_score: f64,
}

impl LeaderboardEntry {
    pub fn new(user_id: impl Into<String>, total_score: f64) -> Self {
        Self {
            user_id: user_id.into(),
            total_score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
}

/// The operations the HQ backend exposes.
///
/// Implementations report transport problems and non-success statuses as
/// `HqError::NetworkFailure`, and bodies that do not parse as
/// `HqError::MalformedResponse`.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Answers a free-text or recorded question.
    async fn ask(&self, request: AskRequest) -> Result<AskResponse>;

    /// Generates a new multiple-choice round.
    async fn quiz(&self) -> Result<QuizPayload>;

    /// Credits a correct answer to a visitor and returns the new total.
    async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse>;

    /// Returns the top scores.
    async fn leaderboard(&self) -> Result<LeaderboardResponse>;
}

/// Points credited per correct answer.
pub const POINTS_PER_ANSWER: f64 = 100.0;

const LEADERBOARD_LIMIT: usize = 10;

/// A `RemoteService` that never leaves the process.
///
/// Useful for demos and development without a deployed backend. It serves
/// the backend's fallback scenario, keeps scores in memory and seeds the
/// leaderboard with the same demo users the backend would.
pub struct OfflineRemoteService {
    scores: Mutex<HashMap<String, f64>>,
}

impl OfflineRemoteService {
    pub fn new() -> Self {
        let seeded = [
            ("Doc-1", 1500.0),
            ("Medic-Alpha", 1200.0),
            ("Combat-Lifesaver", 800.0),
            ("Corpsman-X", 600.0),
            ("Medic-Bravo", 400.0),
        ];
        Self {
            scores: Mutex::new(
                seeded
                    .into_iter()
                    .map(|(user, score)| (user.to_string(), score))
                    .collect(),
            ),
        }
    }
}

impl Default for OfflineRemoteService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteService for OfflineRemoteService {
    async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        let answer = if request.audio.is_some() {
            "Voice systems offline. Type your question instead.".to_string()
        } else {
            format!(
                "HQ Offline: cannot answer '{}' without a remote service.",
                request.question.unwrap_or_default()
            )
        };
        Ok(AskResponse {
            answer: Some(answer),
        })
    }

    async fn quiz(&self) -> Result<QuizPayload> {
        Ok(QuizPayload {
            question: Some(
                "During Care Under Fire, what is the only medically indicated intervention?"
                    .to_string(),
            ),
            options: Some(vec![
                "Airway management".to_string(),
                "Tourniquet application".to_string(),
                "Needle decompression".to_string(),
                "IV access".to_string(),
            ]),
            correct_index: Some(1),
            explanation: Some(
                "Hemorrhage control via tourniquet is the only approved intervention in CUF."
                    .to_string(),
            ),
        })
    }

    async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse> {
        let mut scores = self.scores.lock().unwrap_or_else(|e| e.into_inner());
        let total = scores.entry(request.user_id).or_insert(0.0);
        *total += POINTS_PER_ANSWER;
        Ok(ScoreResponse {
            new_score: Some(*total),
        })
    }

    async fn leaderboard(&self) -> Result<LeaderboardResponse> {
        let scores = self.scores.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<LeaderboardEntry> = scores
            .iter()
            .map(|(user, score)| LeaderboardEntry::new(user.clone(), *score))
            .collect();
        entries.sort_by(|a, b| {
            b.total_score
                .total_cmp(&a.total_score)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        entries.truncate(LEADERBOARD_LIMIT);
        Ok(LeaderboardResponse {
            leaderboard: Some(entries),
        })
    }
}
