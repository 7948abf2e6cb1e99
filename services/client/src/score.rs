//! Score Submission
//!
//! Records a correct answer for the signed-in visitor. Guests are never sent
//! to the remote service.

use hq_core::error::HqError;
use hq_core::model::{Identity, ScoreOutcome};
use hq_core::remote::{RemoteService, ScoreRequest};
use tracing::{error, info, warn};

/// Submits one correct answer. Never retries.
pub async fn submit_score(
    remote: &dyn RemoteService,
    identity: Option<&Identity>,
) -> ScoreOutcome {
    let Some(identity) = identity else {
        info!("Correct answer by guest; score not submitted");
        return ScoreOutcome::Guest;
    };

    let request = ScoreRequest {
        user_id: identity.as_str().to_string(),
    };
    match remote.score(request).await {
        Ok(response) => match response.new_score {
            Some(total) => {
                info!(user = %identity, total, "Score saved");
                ScoreOutcome::Saved(total)
            }
            None => {
                warn!(user = %identity, "Score saved but total missing");
                ScoreOutcome::SavedUnreadable
            }
        },
        Err(HqError::MalformedResponse(reason)) => {
            warn!(user = %identity, %reason, "Score saved but total unreadable");
            ScoreOutcome::SavedUnreadable
        }
        Err(e) => {
            error!(user = %identity, error = %e, "Score submission failed");
            ScoreOutcome::Failed
        }
    }
}
