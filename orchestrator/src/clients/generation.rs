//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationClient, GenerationOutcome, ToolInvocation, ToolSpec};
use crate::error::GenerationError;

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ToolFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Serialize)]
struct ToolDef<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    function: ToolFunction<'a>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDef<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    // The API ships function arguments as a JSON-encoded string.
    arguments: String,
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    async fn generate(
        &self,
        system_prompt: &str,
        input: &str,
        tools: &[ToolSpec],
    ) -> Result<GenerationOutcome, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: input,
                },
            ],
            temperature: 0.0,
            tools: tools
                .iter()
                .map(|tool| ToolDef {
                    kind: "function",
                    function: ToolFunction {
                        name: tool.name,
                        description: tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
        };

        let mut builder = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(GenerationError::Status(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let message = body
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse)?
            .message;

        if let Some(call) = message.tool_calls.into_iter().next() {
            debug!("Model elected tool '{}'", call.function.name);
            let arguments = serde_json::from_str(&call.function.arguments)
                .map_err(GenerationError::MalformedToolArguments)?;
            return Ok(GenerationOutcome::ToolCall(ToolInvocation {
                name: call.function.name,
                arguments,
            }));
        }

        Ok(GenerationOutcome::Text(message.content.unwrap_or_default()))
    }
}
