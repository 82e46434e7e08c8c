use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use super::collaborators::{AnswerOracle, PhraseSource};
use crate::errors::{CollaboratorError, FailureKind};
use crate::metrics::track_ai_request;
use crate::models::answer::{AnswerCheck, CheckAnswerResponse, Verdict};
use crate::models::category::{Category, Difficulty};
use crate::models::conversation::ConversationLog;
use crate::models::phrase::{GeneratePhraseRequest, GeneratePhraseResponse, PhraseRecord};
use crate::utils::retry::{retry_async_when, RetryConfig};

const GENERATE_PHRASE_PATH: &str = "generate-phrase";
const CHECK_ANSWER_PATH: &str = "check-answer";

#[derive(Debug)]
enum CallError {
    Transport(String),
    Status(StatusCode),
    Body(String),
}

impl CallError {
    fn is_retryable(&self) -> bool {
        match self {
            CallError::Transport(_) => true,
            CallError::Status(status) => status.is_server_error(),
            CallError::Body(_) => false,
        }
    }

    fn into_collaborator(self, kind: FailureKind) -> CollaboratorError {
        match self {
            CallError::Transport(detail) => CollaboratorError::transport(kind, detail),
            CallError::Status(status) => {
                CollaboratorError::transport(kind, format!("backend returned status {}", status))
            }
            CallError::Body(detail) => CollaboratorError::malformed(kind, detail),
        }
    }
}

/// Client for the phrase generation and answer checking backend
#[derive(Clone)]
pub struct AiClient {
    http: Client,
    endpoint: String,
    retry: RetryConfig,
}

impl AiClient {
    pub fn new(endpoint: &str, timeout: Duration, retry: RetryConfig) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, CallError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}/{}", self.endpoint, path);
        let url = url.as_str();
        let http = &self.http;

        let call = retry_async_when(&self.retry, CallError::is_retryable, || async move {
            let response = http
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| CallError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!("AI backend {} returned status {}", path, status);
                return Err(CallError::Status(status));
            }

            response
                .json::<R>()
                .await
                .map_err(|e| CallError::Body(e.to_string()))
        });

        track_ai_request(path, call).await
    }
}

#[async_trait]
impl PhraseSource for AiClient {
    async fn fetch(
        &self,
        category: Category,
        difficulty: Difficulty,
        context: Option<&ConversationLog>,
    ) -> Result<PhraseRecord, CollaboratorError> {
        let request = GeneratePhraseRequest {
            category,
            difficulty,
            difficulty_config: difficulty.modifiers(),
            conversation_history: context.map(ConversationLog::entries),
        };
        tracing::debug!(
            "Requesting {} phrase ({}), history={}",
            category,
            difficulty.as_str(),
            context.map_or(0, ConversationLog::len)
        );

        let response: GeneratePhraseResponse = self
            .post_json(GENERATE_PHRASE_PATH, &request)
            .await
            .map_err(|e| e.into_collaborator(FailureKind::Fetch))?;

        response
            .into_record()
            .map_err(|detail| CollaboratorError::malformed(FailureKind::Fetch, detail))
    }
}

#[async_trait]
impl AnswerOracle for AiClient {
    async fn check(&self, request: AnswerCheck<'_>) -> Result<Verdict, CollaboratorError> {
        tracing::debug!(
            "Checking {} answer, history={}",
            request.answer_type.as_str(),
            request.conversation_history.len()
        );

        let response: CheckAnswerResponse = self
            .post_json(CHECK_ANSWER_PATH, &request)
            .await
            .map_err(|e| e.into_collaborator(FailureKind::Validation))?;

        response
            .into_verdict()
            .map_err(|detail| CollaboratorError::malformed(FailureKind::Validation, detail))
    }
}
