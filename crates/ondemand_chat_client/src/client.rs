//! HTTP client: create a session, submit a query, read the sync body or the
//! SSE stream (`data:` lines terminated by `[DONE]`).

use futures_util::StreamExt;
use serde_json::Value;

use crate::config::Settings;
use crate::messages::{
    append_context_metadata, ContextField, CreateSessionRequest, CreateSessionResponse,
    ResponseMode, StreamSummary, StreamSummaryData, SubmitQueryRequest,
};
use crate::stream::{AccumulatedResult, LineBuffer, StreamAccumulator};

const API_KEY_HEADER: &str = "apikey";

/// A created chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    /// Context metadata echoed back by the server.
    pub context_metadata: Vec<ContextField>,
}

/// Answer to a submitted query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    Sync(Value),
    Stream(AccumulatedResult),
}

impl QueryResponse {
    /// Document printed for the user: the sync body or a stream summary, both
    /// carrying `contextMetadata`.
    pub fn into_report(self, context_metadata: &[ContextField]) -> Value {
        match self {
            QueryResponse::Sync(body) => append_context_metadata(body, context_metadata),
            QueryResponse::Stream(result) => {
                let summary = StreamSummary {
                    message: "Chat query submitted successfully",
                    data: StreamSummaryData {
                        session_id: &result.session_id,
                        message_id: &result.message_id,
                        answer: &result.full_answer,
                        metrics: &result.metrics,
                        status: "completed",
                        context_metadata,
                    },
                };
                serde_json::to_value(&summary).unwrap_or(Value::Null)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{status} - {body}")]
    Status { status: u16, body: String },
}

/// Chat API client bound to one base URL and API key.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl Client {
    pub fn new(settings: &Settings) -> Self {
        Self::with_http(reqwest::Client::new(), settings)
    }

    pub fn with_http(http: reqwest::Client, settings: &Settings) -> Self {
        Self {
            http,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST {base}/sessions`.
    pub async fn create_session(&self, settings: &Settings) -> Result<Session, ClientError> {
        let url = format!("{}/sessions", self.base_url);
        let body = CreateSessionRequest {
            agent_ids: &settings.agent_ids,
            external_user_id: &settings.external_user_id,
            context_metadata: &settings.context_metadata,
        };
        tracing::debug!(%url, body = ?body, "creating session");

        let response = self.post(&url, &body).await?;
        let response = check_status(response).await?;
        let parsed: CreateSessionResponse = serde_json::from_slice(&response.bytes().await?)?;
        tracing::info!(session_id = %parsed.data.id, "session created");
        Ok(Session {
            id: parsed.data.id,
            context_metadata: parsed.data.context_metadata,
        })
    }

    /// `POST {base}/sessions/{id}/query`, read according to the configured mode.
    pub async fn submit_query(
        &self,
        session_id: &str,
        settings: &Settings,
    ) -> Result<QueryResponse, ClientError> {
        let url = format!("{}/sessions/{}/query", self.base_url, session_id);
        let body = SubmitQueryRequest {
            endpoint_id: &settings.endpoint_id,
            query: &settings.query,
            agent_ids: &settings.agent_ids,
            response_mode: settings.response_mode,
            reasoning_mode: &settings.reasoning_mode,
            model_configs: &settings.model,
        };
        tracing::debug!(%url, body = ?body, "submitting query");

        let response = self.post(&url, &body).await?;
        let response = check_status(response).await?;
        match settings.response_mode {
            ResponseMode::Sync => {
                let value: Value = serde_json::from_slice(&response.bytes().await?)?;
                Ok(QueryResponse::Sync(value))
            }
            ResponseMode::Stream => Ok(QueryResponse::Stream(read_stream(response).await?)),
        }
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, ClientError> {
        Ok(self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::warn!(status = status.as_u16(), %body, "request failed");
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Feed the response body line by line until `[DONE]` or end of body.
async fn read_stream(response: reqwest::Response) -> Result<AccumulatedResult, ClientError> {
    let mut chunks = response.bytes_stream();
    let mut lines = LineBuffer::default();
    let mut acc = StreamAccumulator::new();

    while let Some(chunk) = chunks.next().await {
        for line in lines.push(&chunk?) {
            if acc.feed_line(&line).is_done() {
                return Ok(acc.finish());
            }
        }
    }
    if let Some(line) = lines.finish() {
        acc.feed_line(&line);
    }
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stream_report_has_summary_shape() {
        let mut metrics = serde_json::Map::new();
        metrics.insert("tokens".into(), json!(5));
        let result = AccumulatedResult {
            full_answer: "Hi".into(),
            session_id: "s1".into(),
            message_id: "m1".into(),
            metrics,
        };
        let report = QueryResponse::Stream(result).into_report(&[ContextField::new("name", "John")]);
        assert_eq!(
            report,
            json!({
                "message": "Chat query submitted successfully",
                "data": {
                    "sessionId": "s1",
                    "messageId": "m1",
                    "answer": "Hi",
                    "metrics": {"tokens": 5},
                    "status": "completed",
                    "contextMetadata": [{"key": "name", "value": "John"}]
                }
            })
        );
    }

    #[test]
    fn sync_report_appends_context_metadata() {
        let body = json!({"message": "ok", "data": {"answer": "42"}});
        let report = QueryResponse::Sync(body).into_report(&[]);
        assert_eq!(report["data"]["contextMetadata"], json!([]));
    }
}
