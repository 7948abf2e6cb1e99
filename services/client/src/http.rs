//! `RemoteService` over the HQ JSON API.

use async_trait::async_trait;
use hq_core::error::{HqError, Result};
use hq_core::remote::{
    AskRequest, AskResponse, LeaderboardResponse, QuizPayload, RemoteService, ScoreRequest,
    ScoreResponse,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub struct HttpRemoteService {
    client: Client,
    base_url: String,
}

impl HttpRemoteService {
    /// `base_url` is the API root without a trailing slash.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sends a request and decodes a successful body as `T`.
    async fn send<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| HqError::NetworkFailure(format!("{path}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HqError::NetworkFailure(format!("{path}: status {status}")));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| HqError::NetworkFailure(format!("{path}: {e}")))?;
        debug!(path, status = status.as_u16(), bytes = body.len(), "HQ responded");
        decode_body(path, &body)
    }
}

fn decode_body<T: DeserializeOwned>(path: &str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| HqError::MalformedResponse(format!("{path}: {e}")))
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        let builder = self.client.post(self.url("ask")).json(&request);
        self.send("ask", builder).await
    }

    async fn quiz(&self) -> Result<QuizPayload> {
        let builder = self
            .client
            .post(self.url("quiz"))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        self.send("quiz", builder).await
    }

    async fn score(&self, request: ScoreRequest) -> Result<ScoreResponse> {
        let builder = self.client.post(self.url("score")).json(&request);
        self.send("score", builder).await
    }

    async fn leaderboard(&self) -> Result<LeaderboardResponse> {
        let builder = self.client.get(self.url("leaderboard"));
        self.send("leaderboard", builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body_errors_are_malformed() {
        let err = decode_body::<ScoreResponse>("score", b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, HqError::MalformedResponse(msg) if msg.starts_with("score:")));
    }

    #[test]
    fn test_decode_integer_and_float_scores() {
        let whole: ScoreResponse = decode_body("score", br#"{"newScore": 300}"#).unwrap();
        assert_eq!(whole.new_score, Some(300.0));

        let frac: ScoreResponse = decode_body("score", br#"{"newScore": 250.5}"#).unwrap();
        assert_eq!(frac.new_score, Some(250.5));
    }

    #[test]
    fn test_url_joins_paths() {
        let service =
            HttpRemoteService::new("http://hq.local/prod", Duration::from_secs(1)).unwrap();
        assert_eq!(service.url("quiz"), "http://hq.local/prod/quiz");
    }
}
