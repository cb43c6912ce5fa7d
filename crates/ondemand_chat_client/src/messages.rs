//! JSON wire types for the chat API. Client → server request bodies and
//! server → client responses, including the streamed `data:` events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One context metadata entry attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextField {
    pub key: String,
    pub value: String,
}

impl ContextField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// How the server should deliver the query answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Sync,
    #[default]
    Stream,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Sync => "sync",
            ResponseMode::Stream => "stream",
        }
    }
}

impl std::str::FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(ResponseMode::Sync),
            "stream" => Ok(ResponseMode::Stream),
            other => Err(format!("unknown response mode: {}", other)),
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client → server: `POST /sessions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest<'a> {
    pub agent_ids: &'a [String],
    pub external_user_id: &'a str,
    pub context_metadata: &'a [ContextField],
}

/// Server → client: created session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionResponse {
    pub data: SessionData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub id: String,
    #[serde(default)]
    pub context_metadata: Vec<ContextField>,
}

/// Sampling parameters sent with every query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfigs {
    pub fulfillment_prompt: String,
    pub stop_sequences: Vec<String>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
}

/// Client → server: `POST /sessions/{id}/query`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQueryRequest<'a> {
    pub endpoint_id: &'a str,
    pub query: &'a str,
    pub agent_ids: &'a [String],
    pub response_mode: ResponseMode,
    pub reasoning_mode: &'a str,
    pub model_configs: &'a ModelConfigs,
}

/// Payload of a `fulfillment` event. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentEvent {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Payload of a `metricsLog` event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsLogEvent {
    #[serde(default)]
    pub public_metrics: Option<Map<String, Value>>,
}

/// One streamed event; discriminator is the JSON "eventType" field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum StreamEvent {
    Fulfillment(FulfillmentEvent),
    MetricsLog(MetricsLogEvent),
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Insert `contextMetadata` into the `data` object of a sync response.
/// Bodies without an object-valued `data` field are returned unchanged.
pub fn append_context_metadata(mut body: Value, metadata: &[ContextField]) -> Value {
    if let Some(data) = body.get_mut("data").and_then(Value::as_object_mut) {
        let fields = metadata
            .iter()
            .map(|f| serde_json::json!({ "key": f.key, "value": f.value }))
            .collect();
        data.insert("contextMetadata".to_string(), Value::Array(fields));
    }
    body
}

/// Final document printed after a streamed query completes.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSummary<'a> {
    pub message: &'static str,
    pub data: StreamSummaryData<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummaryData<'a> {
    pub session_id: &'a str,
    pub message_id: &'a str,
    pub answer: &'a str,
    pub metrics: &'a Map<String, Value>,
    pub status: &'static str,
    pub context_metadata: &'a [ContextField],
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_fulfillment_event() {
        let ev = StreamEvent::from_payload(
            r#"{"eventType":"fulfillment","answer":"Hi","sessionId":"s1","messageId":"m1"}"#,
        )
        .unwrap();
        assert_eq!(
            ev,
            StreamEvent::Fulfillment(FulfillmentEvent {
                answer: Some("Hi".into()),
                session_id: Some("s1".into()),
                message_id: Some("m1".into()),
            })
        );
    }

    #[test]
    fn decodes_metrics_log_event() {
        let ev =
            StreamEvent::from_payload(r#"{"eventType":"metricsLog","publicMetrics":{"tokens":5}}"#)
                .unwrap();
        match ev {
            StreamEvent::MetricsLog(m) => {
                let metrics = m.public_metrics.expect("metrics present");
                assert_eq!(metrics.get("tokens"), Some(&json!(5)));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn other_event_types_decode_as_unknown() {
        let ev = StreamEvent::from_payload(r#"{"eventType":"citation","foo":1}"#).unwrap();
        assert_eq!(ev, StreamEvent::Unknown);
    }

    #[test]
    fn missing_event_type_is_an_error() {
        assert!(StreamEvent::from_payload(r#"{"answer":"x"}"#).is_err());
        assert!(StreamEvent::from_payload("not json").is_err());
    }

    #[test]
    fn query_request_uses_camel_case_fields() {
        let model = ModelConfigs {
            fulfillment_prompt: String::new(),
            stop_sequences: vec!["END".into()],
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: 0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        };
        let agents = vec!["agent-1".to_string()];
        let req = SubmitQueryRequest {
            endpoint_id: "predefined-openai-gpt4.1",
            query: "hello",
            agent_ids: &agents,
            response_mode: ResponseMode::Sync,
            reasoning_mode: "grok-4-fast",
            model_configs: &model,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["endpointId"], "predefined-openai-gpt4.1");
        assert_eq!(value["responseMode"], "sync");
        assert_eq!(value["agentIds"], json!(["agent-1"]));
        assert_eq!(value["modelConfigs"]["topP"], json!(1.0));
        assert_eq!(value["modelConfigs"]["stopSequences"], json!(["END"]));
    }

    #[test]
    fn append_context_metadata_inserts_into_data() {
        let body = json!({"message": "ok", "data": {"answer": "42"}});
        let out = append_context_metadata(body, &[ContextField::new("userId", "1")]);
        assert_eq!(out["data"]["answer"], "42");
        assert_eq!(
            out["data"]["contextMetadata"],
            json!([{"key": "userId", "value": "1"}])
        );
    }

    #[test]
    fn append_context_metadata_leaves_body_without_data_alone() {
        let body = json!({"message": "ok"});
        let out = append_context_metadata(body.clone(), &[ContextField::new("k", "v")]);
        assert_eq!(out, body);
    }
}
