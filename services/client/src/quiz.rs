//! Quiz State Machine
//!
//! One round at a time: `Idle -> Loading -> Active -> Answered`, with
//! `Invalid` for rounds HQ sent in an unusable shape. `start` is accepted from
//! `Idle`, `Answered` and `Invalid`, so the "Next Scenario" and retry
//! affordances both re-enter `Loading`. Every `start` issues a fresh
//! `RoundToken`; work tied to an older token is stale.

use hq_core::error::{HqError, Result};
use hq_core::model::{AnswerOutcome, QuizRound, RoundToken};
use hq_core::remote::{QuizPayload, RemoteService};
use hq_core::view::{Feedback, OptionDisplay, OptionMark, QuizDisplay, View};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Idle,
    Loading,
    Active,
    Answered,
    Invalid,
}

#[derive(Debug)]
struct QuizState {
    phase: QuizPhase,
    token: RoundToken,
    round: Option<QuizRound>,
    outcome: Option<AnswerOutcome>,
}

pub struct QuizMachine {
    remote: Arc<dyn RemoteService>,
    view: Arc<dyn View>,
    state: Mutex<QuizState>,
}

impl QuizMachine {
    pub fn new(remote: Arc<dyn RemoteService>, view: Arc<dyn View>) -> Self {
        Self {
            remote,
            view,
            state: Mutex::new(QuizState {
                phase: QuizPhase::Idle,
                token: RoundToken(0),
                round: None,
                outcome: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QuizState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self) -> QuizPhase {
        self.lock().phase
    }

    /// The live round, if one has been activated.
    pub fn round(&self) -> Option<QuizRound> {
        self.lock().round.clone()
    }

    pub fn outcome(&self) -> Option<AnswerOutcome> {
        self.lock().outcome.clone()
    }

    /// Whether `token` is still the answered round on screen.
    pub fn is_showing(&self, token: RoundToken) -> bool {
        let state = self.lock();
        state.token == token && state.phase == QuizPhase::Answered
    }

    /// Requests a new round and activates it.
    ///
    /// Fails with `InvalidState` while a round is loading or unanswered. Fetch
    /// problems are not errors: they land the machine in `Idle` or `Invalid`
    /// and are reported through the view.
    pub async fn start(&self) -> Result<QuizPhase> {
        let token = self.begin()?;
        let fetched = self.remote.quiz().await;
        Ok(self.activate(token, fetched))
    }

    fn begin(&self) -> Result<RoundToken> {
        let mut state = self.lock();
        match state.phase {
            QuizPhase::Idle | QuizPhase::Answered | QuizPhase::Invalid => {}
            phase => {
                return Err(HqError::InvalidState(format!(
                    "quiz start while {:?}",
                    phase
                )));
            }
        }
        state.token = RoundToken(state.token.0 + 1);
        state.phase = QuizPhase::Loading;
        state.round = None;
        state.outcome = None;
        self.view.render_quiz(&QuizDisplay::Loading);
        info!(round = state.token.0, "Requesting quiz round");
        Ok(state.token)
    }

    fn activate(&self, token: RoundToken, fetched: Result<QuizPayload>) -> QuizPhase {
        let mut state = self.lock();
        if state.token != token || state.phase != QuizPhase::Loading {
            debug!(round = token.0, "Dropping stale quiz response");
            return state.phase;
        }

        match fetched.and_then(QuizRound::try_from) {
            Ok(round) => {
                if !round.is_selectable() {
                    warn!(round = token.0, "Quiz round has no options");
                }
                self.view.render_quiz(&display_round(&round, None));
                info!(round = token.0, options = round.options.len(), "Quiz round active");
                state.round = Some(round);
                state.phase = QuizPhase::Active;
            }
            Err(HqError::NetworkFailure(reason)) => {
                warn!(round = token.0, %reason, "Quiz request failed");
                self.view.render_quiz(&QuizDisplay::Offline);
                state.phase = QuizPhase::Idle;
            }
            Err(e) => {
                warn!(round = token.0, error = %e, "Unusable quiz round");
                self.view.render_quiz(&QuizDisplay::Invalid);
                state.phase = QuizPhase::Invalid;
            }
        }
        state.phase
    }

    /// Answers the active round.
    ///
    /// Freezes and marks the options, then shows the verdict. Only the first
    /// call per round succeeds; anything else is `InvalidState`.
    pub fn answer(&self, selected_index: usize) -> Result<AnswerOutcome> {
        let mut state = self.lock();
        if state.phase != QuizPhase::Active {
            return Err(HqError::InvalidState(format!(
                "answer while {:?}",
                state.phase
            )));
        }
        let round = state
            .round
            .as_ref()
            .ok_or_else(|| HqError::InvalidState("active quiz without a round".to_string()))?;
        if selected_index >= round.options.len() {
            return Err(HqError::InvalidState(format!(
                "option {} of {}",
                selected_index,
                round.options.len()
            )));
        }

        let is_correct = selected_index == round.correct_index;
        let outcome = AnswerOutcome {
            round: state.token,
            selected_index,
            is_correct,
            explanation: round.explanation.clone(),
        };

        self.view
            .render_quiz(&display_round(round, Some(selected_index)));
        let feedback = if is_correct {
            Feedback::Correct {
                explanation: outcome.explanation.clone(),
            }
        } else {
            Feedback::Incorrect {
                explanation: outcome.explanation.clone(),
            }
        };
        self.view.render_feedback(&feedback);

        info!(round = outcome.round.0, selected_index, is_correct, "Quiz answered");
        state.phase = QuizPhase::Answered;
        state.outcome = Some(outcome.clone());
        Ok(outcome)
    }
}

/// Builds the on-screen form of a round; `answered` freezes and marks it.
fn display_round(round: &QuizRound, answered: Option<usize>) -> QuizDisplay {
    let options = round
        .options
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let mark = match answered {
                Some(_) if idx == round.correct_index => Some(OptionMark::Correct),
                Some(selected) if idx == selected => Some(OptionMark::Wrong),
                _ => None,
            };
            OptionDisplay {
                label: label.clone(),
                enabled: answered.is_none(),
                mark,
            }
        })
        .collect();
    QuizDisplay::Round {
        question: round.question.clone(),
        options,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingView, ScriptedRemote, ViewEvent, quiz_payload};

    fn machine(remote: ScriptedRemote) -> (QuizMachine, Arc<RecordingView>) {
        let view = Arc::new(RecordingView::new());
        (QuizMachine::new(Arc::new(remote), view.clone()), view)
    }

    fn abc_round() -> ScriptedRemote {
        ScriptedRemote::new().with_quiz(Ok(quiz_payload("Which?", &["A", "B", "C"], 1)))
    }

    fn last_round_display(view: &RecordingView) -> Vec<OptionDisplay> {
        view.events()
            .into_iter()
            .rev()
            .find_map(|e| match e {
                ViewEvent::Quiz(QuizDisplay::Round { options, .. }) => Some(options),
                _ => None,
            })
            .expect("a rendered round")
    }

    #[tokio::test]
    async fn test_start_activates_round() {
        let (quiz, view) = machine(abc_round());

        assert_eq!(quiz.start().await.unwrap(), QuizPhase::Active);
        assert_eq!(quiz.round().unwrap().correct_index, 1);

        let events = view.events();
        assert_eq!(events[0], ViewEvent::Quiz(QuizDisplay::Loading));
        assert!(last_round_display(&view).iter().all(|o| o.enabled && o.mark.is_none()));
    }

    #[tokio::test]
    async fn test_correct_answer() {
        let (quiz, view) = machine(abc_round());
        quiz.start().await.unwrap();

        let outcome = quiz.answer(1).unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.selected_index, 1);
        assert_eq!(quiz.phase(), QuizPhase::Answered);

        let options = last_round_display(&view);
        assert!(options.iter().all(|o| !o.enabled));
        assert_eq!(options[1].mark, Some(OptionMark::Correct));
        assert_eq!(options[0].mark, None);
        assert_eq!(options[2].mark, None);
        assert!(view.events().contains(&ViewEvent::Feedback(Feedback::Correct {
            explanation: "Tourniquet first.".to_string()
        })));
    }

    #[tokio::test]
    async fn test_wrong_answers_mark_chosen_and_correct() {
        for selected in [0usize, 2] {
            let (quiz, view) = machine(abc_round());
            quiz.start().await.unwrap();

            let outcome = quiz.answer(selected).unwrap();
            assert!(!outcome.is_correct);

            let options = last_round_display(&view);
            assert!(options.iter().all(|o| !o.enabled));
            assert_eq!(options[1].mark, Some(OptionMark::Correct));
            assert_eq!(options[selected].mark, Some(OptionMark::Wrong));
            assert_eq!(
                options.iter().filter(|o| o.mark.is_some()).count(),
                2,
                "only the chosen and the correct option are marked"
            );
        }
    }

    #[tokio::test]
    async fn test_second_answer_is_rejected_without_effect() {
        let (quiz, view) = machine(abc_round());
        quiz.start().await.unwrap();
        quiz.answer(0).unwrap();
        let before = view.events().len();

        for idx in 0..3 {
            assert!(matches!(quiz.answer(idx), Err(HqError::InvalidState(_))));
        }
        assert_eq!(view.events().len(), before);
        assert_eq!(quiz.outcome().unwrap().selected_index, 0);
    }

    #[tokio::test]
    async fn test_answer_outside_active_or_out_of_range() {
        let (quiz, _view) = machine(abc_round());
        assert!(matches!(quiz.answer(0), Err(HqError::InvalidState(_))));

        quiz.start().await.unwrap();
        assert!(matches!(quiz.answer(3), Err(HqError::InvalidState(_))));
        assert_eq!(quiz.phase(), QuizPhase::Active);
    }

    #[tokio::test]
    async fn test_missing_question_is_invalid_and_retryable() {
        let remote = ScriptedRemote::new()
            .with_quiz(Ok(QuizPayload::default()))
            .with_quiz(Ok(quiz_payload("Retry?", &["A", "B"], 0)));
        let (quiz, view) = machine(remote);

        assert_eq!(quiz.start().await.unwrap(), QuizPhase::Invalid);
        assert!(quiz.round().is_none());
        assert!(matches!(quiz.answer(0), Err(HqError::InvalidState(_))));
        assert!(view.events().contains(&ViewEvent::Quiz(QuizDisplay::Invalid)));

        assert_eq!(quiz.start().await.unwrap(), QuizPhase::Active);
    }

    #[tokio::test]
    async fn test_network_failure_returns_to_idle() {
        let remote = ScriptedRemote::new()
            .with_quiz(Err(HqError::NetworkFailure("timed out".to_string())));
        let (quiz, view) = machine(remote);

        assert_eq!(quiz.start().await.unwrap(), QuizPhase::Idle);
        assert!(view.events().contains(&ViewEvent::Quiz(QuizDisplay::Offline)));
    }

    #[tokio::test]
    async fn test_empty_options_activate_but_cannot_be_answered() {
        let remote = ScriptedRemote::new().with_quiz(Ok(QuizPayload {
            question: Some("Nothing to pick?".to_string()),
            options: Some(vec![]),
            correct_index: None,
            explanation: None,
        }));
        let (quiz, _view) = machine(remote);

        assert_eq!(quiz.start().await.unwrap(), QuizPhase::Active);
        assert!(matches!(quiz.answer(0), Err(HqError::InvalidState(_))));
        assert_eq!(quiz.phase(), QuizPhase::Active);
    }

    #[tokio::test]
    async fn test_start_rejected_while_active() {
        let (quiz, _view) = machine(abc_round());
        quiz.start().await.unwrap();
        assert!(matches!(quiz.start().await, Err(HqError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_restart_after_answer_issues_new_token() {
        let (quiz, _view) = machine(abc_round());
        quiz.start().await.unwrap();
        let first = quiz.answer(1).unwrap().round;
        assert!(quiz.is_showing(first));

        assert_eq!(quiz.start().await.unwrap(), QuizPhase::Active);
        assert!(!quiz.is_showing(first));
        assert!(quiz.outcome().is_none());
    }

    #[test]
    fn test_stale_fetch_is_dropped() {
        let (quiz, view) = machine(ScriptedRemote::new());
        let stale = quiz.begin().unwrap();
        quiz.activate(stale, Err(HqError::NetworkFailure("gone".to_string())));
        let current = quiz.begin().unwrap();
        assert_ne!(stale, current);

        let phase = quiz.activate(stale, Ok(quiz_payload("Old?", &["A"], 0)));
        assert_eq!(phase, QuizPhase::Loading);
        assert!(quiz.round().is_none());
        assert_eq!(view.count(|e| matches!(e, ViewEvent::Quiz(QuizDisplay::Round { .. }))), 0);
    }
}
