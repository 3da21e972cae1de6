// src/model/openai.rs

//! Client for OpenAI-compatible chat completion servers (LM Studio, vLLM,
//! llama.cpp server, OpenAI itself).

use crate::config::Settings;
use crate::error::ModelError;
use crate::model::{
    Args, ChatMessage, ChunkStream, Completion, LanguageModel, Role, ToolCallRecord,
    ToolDefinition,
};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct OpenAiCompatibleModel {
    base_url: String,
    model: String,
    api_key: String,
    client: Client,
}

impl OpenAiCompatibleModel {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        // Idle limits only: a stream may run as long as chunks keep arriving.
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ModelError> {
        Self::new(
            &settings.llm_base_url,
            &settings.llm_model,
            &settings.llm_api_key,
            settings.http_timeout,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn post(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response, ModelError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(ModelError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<Completion, ModelError> {
        let wire_tools: Vec<Value> = tools.iter().map(wire_tool).collect();
        let body = ChatRequest {
            model: &self.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tool_choice: (!wire_tools.is_empty()).then_some("auto"),
            tools: wire_tools,
            stream: false,
        };

        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "chat completion");
        let response = self.post(&body).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(ModelError::InvalidResponse("response has no choices".into()));
        };

        Ok(Completion {
            content: choice.message.content.unwrap_or_default().trim().to_string(),
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(WireToolCall::into_record)
                .collect(),
        })
    }

    async fn stream(&self, prompt: &str) -> Result<ChunkStream, ModelError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![WireMessage::from(&ChatMessage::user(prompt))],
            tools: Vec::new(),
            tool_choice: None,
            stream: true,
        };
        let response = self.post(&body).await?;

        let state = SseState {
            bytes: response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()))
                .boxed(),
            buffer: Vec::new(),
            pending: VecDeque::new(),
            done: false,
        };

        let chunks = stream::unfold(state, |mut st| async move {
            loop {
                if let Some(item) = st.pending.pop_front() {
                    return Some((item, st));
                }
                if st.done {
                    return None;
                }
                match st.bytes.next().await {
                    Some(Ok(bytes)) => {
                        st.buffer.extend_from_slice(&bytes);
                        st.drain_lines();
                    }
                    Some(Err(e)) => {
                        st.done = true;
                        st.pending.push_back(Err(ModelError::from_transport(e)));
                    }
                    None => {
                        st.buffer.push(b'\n');
                        st.drain_lines();
                        st.done = true;
                    }
                }
            }
        });

        Ok(chunks.boxed())
    }
}

struct SseState {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String, ModelError>>,
    done: bool,
}

impl SseState {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.done {
                continue;
            }
            match parse_sse_line(&String::from_utf8_lossy(&line)) {
                SseEvent::Chunk(text) => self.pending.push_back(Ok(text)),
                SseEvent::Done => self.done = true,
                SseEvent::Invalid(reason) => {
                    warn!(%reason, "skipping malformed stream event");
                }
                SseEvent::Skip => {}
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Chunk(String),
    Done,
    Skip,
    Invalid(String),
}

fn parse_sse_line(line: &str) -> SseEvent {
    let Some(data) = line.trim().strip_prefix("data:") else {
        return SseEvent::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(event) => match event
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
        {
            Some(text) if !text.is_empty() => SseEvent::Chunk(text.to_string()),
            _ => SseEvent::Skip,
        },
        Err(e) => SseEvent::Invalid(e.to_string()),
    }
}

fn wire_tool(def: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.parameters,
        }
    })
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage {
    role: Role,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&ChatMessage> for WireMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": Value::Object(call.args.clone()).to_string(),
                        }
                    })
                })
                .collect(),
            tool_call_id: msg.tool_call_id.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireReply,
}

#[derive(Deserialize)]
struct WireReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl WireToolCall {
    fn into_record(self) -> ToolCallRecord {
        let args = match self.function.arguments {
            Value::Object(map) => map,
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                _ => {
                    warn!(tool = %self.function.name, raw = %raw, "tool call arguments are not a JSON object");
                    Args::new()
                }
            },
            _ => Args::new(),
        };
        ToolCallRecord {
            id: self.id,
            name: self.function.name,
            args,
        }
    }
}
