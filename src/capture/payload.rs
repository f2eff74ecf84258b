use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition as sent by the target CLI in a messages request
/// See: https://docs.anthropic.com/en/api/messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, unique within one request
    #[serde(default)]
    pub name: String,

    /// Free-form description shown to the model
    #[serde(default)]
    pub description: String,

    /// JSON schema of the tool input, kept verbatim
    #[serde(default)]
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Read one entry of the `tools` array
    ///
    /// Non-object entries yield `None`. Missing or non-string `name` and
    /// `description` become empty strings.
    fn from_json(mut entry: Value) -> Option<Self> {
        let fields = entry.as_object_mut()?;
        let text = |value: Option<&Value>| value.and_then(Value::as_str).unwrap_or_default().to_string();
        Some(Self {
            name: text(fields.get("name")),
            description: text(fields.get("description")),
            input_schema: fields.remove("input_schema").unwrap_or_default(),
        })
    }
}

/// Fields frozen from the first qualifying request of a version run
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPayload {
    pub system_prompt: String,
    pub tools: Vec<ToolDefinition>,
}

/// Inbound messages request, reduced to the fields this tool cares about
///
/// Built from any JSON value: fields of an unexpected shape read as empty
/// instead of failing, so every parseable body can still be answered.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagesRequest {
    /// Model name, echoed back in the response
    pub model: Value,

    /// System prompt flattened to one string
    pub system: String,

    pub tools: Vec<ToolDefinition>,
}

impl MessagesRequest {
    pub fn from_json(mut body: Value) -> Self {
        let model = body.get_mut("model").map(Value::take).unwrap_or_default();
        let system = body.get("system").map(flatten_system).unwrap_or_default();
        let tools = match body.get_mut("tools").map(Value::take) {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .filter_map(ToolDefinition::from_json)
                .collect(),
            _ => Vec::new(),
        };

        Self {
            model,
            system,
            tools,
        }
    }

    pub fn into_payload(self) -> CapturedPayload {
        CapturedPayload {
            system_prompt: self.system,
            tools: self.tools,
        }
    }
}

/// Flatten a `system` field into one string
///
/// A string is taken as is. In a block list, plain strings and the `text` of
/// object blocks are joined with newlines; other fragments are dropped. Any
/// other shape is an empty prompt.
fn flatten_system(system: &Value) -> String {
    match system {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                Value::String(text) => Some(text.as_str()),
                Value::Object(fields) => fields.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Synthetic assistant reply returned for every parseable request
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub id: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub role: &'static str,
    pub content: Vec<ContentBlock>,
    pub model: Value,
    pub stop_reason: &'static str,
    pub usage: Usage,
}

#[derive(Debug, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl MessagesResponse {
    pub fn intercepted(model: Value) -> Self {
        Self {
            id: "msg_intercepted",
            kind: "message",
            role: "assistant",
            content: vec![ContentBlock {
                kind: "text",
                text: "Intercepted",
            }],
            model,
            stop_reason: "end_turn",
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
            },
        }
    }
}
