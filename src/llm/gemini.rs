//! Google Gemini provider implementation

use super::types::{ContentBlock, LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmErrorKind, LlmService};
use crate::config::LlmConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: String,
    url: String,
    model_id: String,
}

impl GeminiService {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            url,
            model_id: config.model.clone(),
        })
    }

    fn translate_request(request: &LlmRequest) -> GeminiRequest {
        let system_instruction = if request.system.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: request
                        .system
                        .iter()
                        .map(|s| s.text.as_str())
                        .collect::<Vec<_>>()
                        .join("\n\n"),
                }],
            })
        };

        let mut contents = Vec::new();
        for msg in &request.messages {
            let role = match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };

            let parts: Vec<GeminiPart> = msg
                .content
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => GeminiPart::Text { text: text.clone() },
                    ContentBlock::ToolUse { name, input, .. } => GeminiPart::FunctionCall {
                        function_call: GeminiFunctionCall {
                            id: None,
                            name: name.clone(),
                            args: input.clone(),
                        },
                    },
                    ContentBlock::ToolResult { name, content, .. } => {
                        GeminiPart::FunctionResponse {
                            function_response: GeminiFunctionResponse {
                                name: name.clone(),
                                response: serde_json::json!({ "result": content }),
                            },
                        }
                    }
                })
                .collect();

            if !parts.is_empty() {
                contents.push(GeminiContent {
                    role: Some(role.to_string()),
                    parts,
                });
            }
        }

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![GeminiTool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        // Gemini rejects object schemas with no properties
                        parameters: has_properties(&t.input_schema)
                            .then(|| t.input_schema.clone()),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: request.max_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: Some(max),
            }),
        }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No candidates in response"))?;

        let mut content = Vec::new();
        for (index, part) in candidate.content.parts.into_iter().enumerate() {
            match part {
                GeminiPart::Text { text } => {
                    if !text.is_empty() {
                        content.push(ContentBlock::Text { text });
                    }
                }
                GeminiPart::FunctionCall { function_call } => {
                    // Older models omit ids; the part index keeps them unique within the turn
                    let id = function_call
                        .id
                        .unwrap_or_else(|| format!("call_{index}_{}", function_call.name));
                    content.push(ContentBlock::ToolUse {
                        id,
                        name: function_call.name,
                        input: function_call.args,
                    });
                }
                GeminiPart::FunctionResponse { .. } | GeminiPart::Other(_) => {}
            }
        }

        if content.is_empty() {
            return Err(LlmError::unknown(format!(
                "Empty response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("none")
            )));
        }

        let end_turn = candidate.finish_reason.is_some_and(|r| r == "STOP");

        Ok(LlmResponse {
            content,
            end_turn,
            usage: Usage {
                input_tokens: u64::from(resp.usage_metadata.prompt_token_count),
                output_tokens: u64::from(resp.usage_metadata.candidates_token_count),
            },
        })
    }
}

fn has_properties(schema: &serde_json::Value) -> bool {
    schema
        .get("properties")
        .and_then(serde_json::Value::as_object)
        .is_some_and(|props| !props.is_empty())
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |error_resp| error_resp.error.message);
            return Err(LlmError::new(
                LlmErrorKind::from_status(status.as_u16()),
                format!("HTTP {status}: {message}"),
            ));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
    /// Part kinds we never request (inline data, code execution, ...)
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: GeminiUsageMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
