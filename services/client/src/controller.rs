//! Interaction Controller
//!
//! Composes the chat, quiz and capture pipelines with the session gate and
//! the remote service. The controller owns the held identity and enforces
//! the ordering rules between them:
//!
//! - A score outcome is rendered only while its round is still on screen and
//!   the session that submitted it is still the current one.
//! - "Next Scenario" is revealed only for the round that is still answered.
//! - Chat and quiz own disjoint state and can run at the same time.
//!
//! Errors never escape: device and network problems become view updates,
//! rejected gestures are logged.

use crate::capture::{AudioCapture, CaptureState};
use crate::chat::{ChatPipeline, Query};
use crate::quiz::{QuizMachine, QuizPhase};
use crate::score::submit_score;
use hq_core::audio::AudioDevice;
use hq_core::model::{AnswerOutcome, Identity, Leaderboard, Message, RoundToken};
use hq_core::remote::RemoteService;
use hq_core::session::SessionGate;
use hq_core::view::{CaptureStatus, Screen, View};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const MIC_DENIED: &str = "Microphone access denied";

/// Session state the controller keeps on behalf of the gate.
///
/// `epoch` is bumped on every sign-in and sign-out so in-flight work can tell
/// whether it still belongs to the current session.
pub struct ControllerContext {
    gate: Arc<dyn SessionGate>,
    identity: RwLock<Option<Identity>>,
    epoch: AtomicU64,
}

impl ControllerContext {
    fn new(gate: Arc<dyn SessionGate>) -> Self {
        Self {
            gate,
            identity: RwLock::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn adopt(&self, identity: Option<Identity>) {
        *self.identity.write().unwrap_or_else(|e| e.into_inner()) = identity;
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Identity and epoch read together, for work that outlives the call.
    fn snapshot(&self) -> (Option<Identity>, u64) {
        let identity = self.identity.read().unwrap_or_else(|e| e.into_inner());
        (identity.clone(), self.epoch())
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Pause between an answer and the "Next Scenario" affordance.
    pub next_round_delay: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            next_round_delay: Duration::from_millis(1500),
        }
    }
}

#[derive(Clone)]
pub struct Controller {
    context: Arc<ControllerContext>,
    remote: Arc<dyn RemoteService>,
    view: Arc<dyn View>,
    chat: Arc<ChatPipeline>,
    quiz: Arc<QuizMachine>,
    capture: Arc<AudioCapture>,
    settings: ControllerSettings,
}

impl Controller {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        gate: Arc<dyn SessionGate>,
        device: Arc<dyn AudioDevice>,
        view: Arc<dyn View>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            context: Arc::new(ControllerContext::new(gate)),
            chat: Arc::new(ChatPipeline::new(remote.clone(), view.clone())),
            quiz: Arc::new(QuizMachine::new(remote.clone(), view.clone())),
            capture: Arc::new(AudioCapture::new(device)),
            remote,
            view,
            settings,
        }
    }

    /// Restores any existing session and shows the matching screen.
    pub async fn load(&self) -> Option<Identity> {
        self.context.gate.initialize().await;
        self.enter_session().await
    }

    /// Adopts the identity the gate holds after a successful sign-in.
    pub async fn sign_in(&self) -> Option<Identity> {
        self.enter_session().await
    }

    async fn enter_session(&self) -> Option<Identity> {
        let identity = self.context.gate.current_identity().await;
        self.context.adopt(identity.clone());
        match &identity {
            Some(identity) => {
                info!(identity = %identity, "Session active");
                self.view.show_screen(Screen::Dashboard);
                self.refresh_leaderboard().await;
            }
            None => {
                info!("No session; showing sign-in");
                self.view.show_screen(Screen::SignedOut);
            }
        }
        identity
    }

    /// Ends the session. The transcript and the quiz are kept.
    pub async fn sign_out(&self) {
        self.context.gate.sign_out().await;
        self.context.adopt(None);
        info!("Session ended");
        self.view.show_screen(Screen::SignedOut);
    }

    pub fn identity(&self) -> Option<Identity> {
        self.context.identity()
    }

    pub async fn submit_text(&self, raw: &str) -> Option<Message> {
        self.chat.send_text(raw).await
    }

    pub async fn press_record(&self) {
        self.view.render_capture_status(CaptureStatus::Listening);
        if let Err(e) = self.capture.start().await {
            warn!(error = %e, "Cannot start capture");
            self.view.notify(MIC_DENIED);
            self.view.render_capture_status(CaptureStatus::Ready);
        }
    }

    /// Finishes the recording and sends it as an audio query.
    ///
    /// Waits behind a start that is still acquiring the device, so a quick
    /// release never leaves the microphone open.
    pub async fn release_record(&self) -> Option<Message> {
        let reply = match self.capture.stop().await {
            Ok(Some(audio)) => {
                self.view.render_capture_status(CaptureStatus::Processing);
                Some(self.chat.send_query(Query::Audio(audio)).await)
            }
            Ok(None) => {
                debug!("Record released without a capture");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Capture failed during finalize");
                self.view.notify(MIC_DENIED);
                None
            }
        };
        self.view.render_capture_status(CaptureStatus::Ready);
        reply
    }

    /// Drops any running recording without sending it.
    pub async fn cancel_record(&self) {
        if self.capture.abort().await {
            self.view.render_capture_status(CaptureStatus::Ready);
        }
    }

    pub async fn start_quiz(&self) -> QuizPhase {
        match self.quiz.start().await {
            Ok(phase) => phase,
            Err(e) => {
                debug!(error = %e, "Quiz start rejected");
                self.quiz.phase()
            }
        }
    }

    /// Answers the live round, then scores it and schedules the next one.
    pub async fn answer(&self, selected_index: usize) -> Option<AnswerOutcome> {
        let outcome = match self.quiz.answer(selected_index) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(error = %e, "Answer rejected");
                return None;
            }
        };

        if outcome.is_correct {
            let (identity, epoch) = self.context.snapshot();
            let score = submit_score(self.remote.as_ref(), identity.as_ref()).await;
            if self.quiz.is_showing(outcome.round) && self.context.epoch() == epoch {
                self.view.render_score(&score);
            } else {
                debug!(round = outcome.round.0, ?score, "Dropping stale score outcome");
            }
            self.spawn_leaderboard_refresh();
        }

        self.schedule_next_round(outcome.round);
        Some(outcome)
    }

    /// Best effort; a slow leaderboard never holds up the quiz.
    fn spawn_leaderboard_refresh(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            controller.refresh_leaderboard().await;
        });
    }

    fn schedule_next_round(&self, round: RoundToken) {
        let quiz = self.quiz.clone();
        let view = self.view.clone();
        let delay = self.settings.next_round_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if quiz.is_showing(round) {
                view.show_next_round();
            } else {
                debug!(round = round.0, "Round moved on; not offering next");
            }
        });
    }

    /// Fetches and renders the leaderboard. Failures leave the view as is.
    pub async fn refresh_leaderboard(&self) -> Option<Leaderboard> {
        match self.remote.leaderboard().await {
            Ok(response) => {
                let board = Leaderboard::from_entries(response.leaderboard);
                self.view.render_leaderboard(&board);
                Some(board)
            }
            Err(e) => {
                warn!(error = %e, "Leaderboard refresh failed");
                None
            }
        }
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.chat.transcript()
    }

    pub fn quiz_phase(&self) -> QuizPhase {
        self.quiz.phase()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }
}
