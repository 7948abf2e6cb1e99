//! Test doubles for the controller's collaborators.

use async_trait::async_trait;
use hq_core::audio::{AudioDevice, AudioFormat, AudioFragment, AudioStream, OpenStream};
use hq_core::error::{HqError, Result};
use hq_core::model::{Leaderboard, Message, ScoreOutcome};
use hq_core::remote::{
    AskRequest, AskResponse, LeaderboardResponse, QuizPayload, RemoteService, ScoreRequest,
    ScoreResponse,
};
use hq_core::view::{CaptureStatus, Feedback, QuizDisplay, Screen, View};
use mockall::mock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

mock! {
    pub Remote {}

    #[async_trait]
    impl RemoteService for Remote {
        async fn ask(&self, request: AskRequest) -> Result<AskResponse>;
        async fn quiz(&self) -> Result<QuizPayload>;
        async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse>;
        async fn leaderboard(&self) -> Result<LeaderboardResponse>;
    }
}

pub fn quiz_payload(question: &str, options: &[&str], correct: i64) -> QuizPayload {
    QuizPayload {
        question: Some(question.to_string()),
        options: Some(options.iter().map(|o| o.to_string()).collect()),
        correct_index: Some(correct),
        explanation: Some("Tourniquet first.".to_string()),
    }
}

/// A remote whose responses are queued up front and whose score call can be
/// held open until the test releases it.
pub struct ScriptedRemote {
    quiz_responses: Mutex<VecDeque<Result<QuizPayload>>>,
    score_response: Mutex<Result<ScoreResponse>>,
    leaderboard_response: Mutex<Result<LeaderboardResponse>>,
    score_gate: Option<Arc<Notify>>,
    leaderboard_delay: Option<Duration>,
    pub quiz_calls: AtomicUsize,
    pub score_calls: AtomicUsize,
    pub leaderboard_calls: AtomicUsize,
    pub scored_users: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self {
            quiz_responses: Mutex::new(VecDeque::new()),
            score_response: Mutex::new(Ok(ScoreResponse {
                new_score: Some(100.0),
            })),
            leaderboard_response: Mutex::new(Ok(LeaderboardResponse::default())),
            score_gate: None,
            leaderboard_delay: None,
            quiz_calls: AtomicUsize::new(0),
            score_calls: AtomicUsize::new(0),
            leaderboard_calls: AtomicUsize::new(0),
            scored_users: Mutex::new(Vec::new()),
        }
    }

    pub fn with_quiz(self, response: Result<QuizPayload>) -> Self {
        self.quiz_responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_score(self, response: Result<ScoreResponse>) -> Self {
        *self.score_response.lock().unwrap() = response;
        self
    }

    pub fn with_leaderboard(self, response: Result<LeaderboardResponse>) -> Self {
        *self.leaderboard_response.lock().unwrap() = response;
        self
    }

    pub fn with_score_gate(mut self, gate: Arc<Notify>) -> Self {
        self.score_gate = Some(gate);
        self
    }

    pub fn with_leaderboard_delay(mut self, delay: Duration) -> Self {
        self.leaderboard_delay = Some(delay);
        self
    }

    pub fn score_calls(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteService for ScriptedRemote {
    async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        Ok(AskResponse {
            answer: request.question,
        })
    }

    async fn quiz(&self) -> Result<QuizPayload> {
        self.quiz_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.quiz_responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(quiz_payload("Default?", &["A", "B", "C"], 1)))
    }

    async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse> {
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        self.scored_users.lock().unwrap().push(request.user_id);
        if let Some(gate) = &self.score_gate {
            gate.notified().await;
        }
        self.score_response.lock().unwrap().clone()
    }

    async fn leaderboard(&self) -> Result<LeaderboardResponse> {
        self.leaderboard_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.leaderboard_delay {
            tokio::time::sleep(delay).await;
        }
        self.leaderboard_response.lock().unwrap().clone()
    }
}

/// Everything the controller asked a view to do, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Screen(Screen),
    Message(Message),
    Capture(CaptureStatus),
    Quiz(QuizDisplay),
    Feedback(Feedback),
    Score(ScoreOutcome),
    NextRound,
    Leaderboard(Leaderboard),
    Notice(String),
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&ViewEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| matches(e)).count()
    }

    fn record(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl View for RecordingView {
    fn show_screen(&self, screen: Screen) {
        self.record(ViewEvent::Screen(screen));
    }

    fn append_message(&self, message: &Message) {
        self.record(ViewEvent::Message(message.clone()));
    }

    fn render_capture_status(&self, status: CaptureStatus) {
        self.record(ViewEvent::Capture(status));
    }

    fn render_quiz(&self, quiz: &QuizDisplay) {
        self.record(ViewEvent::Quiz(quiz.clone()));
    }

    fn render_feedback(&self, feedback: &Feedback) {
        self.record(ViewEvent::Feedback(feedback.clone()));
    }

    fn render_score(&self, outcome: &ScoreOutcome) {
        self.record(ViewEvent::Score(outcome.clone()));
    }

    fn show_next_round(&self) {
        self.record(ViewEvent::NextRound);
    }

    fn render_leaderboard(&self, board: &Leaderboard) {
        self.record(ViewEvent::Leaderboard(board.clone()));
    }

    fn notify(&self, text: &str) {
        self.record(ViewEvent::Notice(text.to_string()));
    }
}

/// An in-memory microphone that counts how many sessions are open.
pub struct FakeDevice {
    pub opens: AtomicUsize,
    pub live: Arc<AtomicUsize>,
    deny: AtomicBool,
    fragments: Vec<AudioFragment>,
}

impl FakeDevice {
    pub fn new(fragments: Vec<AudioFragment>) -> Self {
        Self {
            opens: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
            deny: AtomicBool::new(false),
            fragments,
        }
    }

    pub fn denied() -> Self {
        let device = Self::new(Vec::new());
        device.deny.store(true, Ordering::SeqCst);
        device
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioDevice for FakeDevice {
    async fn open(&self) -> Result<OpenStream> {
        // Permission prompts are a suspension point.
        tokio::task::yield_now().await;
        if self.deny.load(Ordering::SeqCst) {
            return Err(HqError::DeviceUnavailable("permission denied".to_string()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);

        let (tx, fragments) = mpsc::unbounded_channel();
        Ok(OpenStream {
            stream: Box::new(FakeStream {
                tx: Some(tx),
                pending: self.fragments.clone(),
                live: self.live.clone(),
            }),
            fragments,
            format: AudioFormat::mono(16000),
        })
    }
}

struct FakeStream {
    tx: Option<mpsc::UnboundedSender<AudioFragment>>,
    pending: Vec<AudioFragment>,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl AudioStream for FakeStream {
    async fn stop(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| HqError::InvalidState("already stopped".to_string()))?;
        for fragment in self.pending.drain(..) {
            let _ = tx.send(fragment);
        }
        Ok(())
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
