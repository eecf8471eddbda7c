use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to a provider-side audio object attached to an assistant turn.
/// Expired references are rejected by the endpoint, so they are checked
/// against the clock before being replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
    pub id: String,
    /// Expiry in epoch seconds; zero means unknown and is treated as expired.
    #[serde(default)]
    pub expires_ts: u64,
}

impl AudioRef {
    pub fn is_live(&self, now_epoch_secs: u64) -> bool {
        self.expires_ts != 0 && self.expires_ts > now_epoch_secs
    }
}

/// A model-requested function invocation recorded on a past turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Locally recorded result of executing a tool. `cmd` names the command the
/// result belongs to; `result` is a generic fallback payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ToolOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One historical exchange. Immutable during a build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    /// Message id of the reply that produced this turn, used for
    /// chain continuation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioRef>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub tool_outputs: Vec<ToolOutput>,
}

impl ConversationTurn {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioData {
    pub data: String,
    pub format: String,
}

/// One element of a structured multimodal message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    InputImage { image_url: String },
    InputAudio { input_audio: AudioData },
}

/// Message content is either a plain string or a structured part list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioId {
    pub id: String,
}

/// A conversational `{role, content}` input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMessage {
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioId>,
}

impl InputMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
            audio: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
            audio: None,
        }
    }
}

fn function_call_output_tag() -> String {
    "function_call_output".to_string()
}

/// Wire record pairing a recorded tool call with its local output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallOutput {
    #[serde(rename = "type", default = "function_call_output_tag")]
    pub kind: String,
    pub call_id: String,
    pub output: String,
}

impl FunctionCallOutput {
    pub fn new(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            kind: function_call_output_tag(),
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// One entry of the request's `input` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputItem {
    FunctionCallOutput(FunctionCallOutput),
    Message(InputMessage),
}

impl InputItem {
    pub fn as_message(&self) -> Option<&InputMessage> {
        match self {
            Self::Message(message) => Some(message),
            Self::FunctionCallOutput(_) => None,
        }
    }

    pub fn as_function_call_output(&self) -> Option<&FunctionCallOutput> {
        match self {
            Self::FunctionCallOutput(output) => Some(output),
            Self::Message(_) => None,
        }
    }
}

/// Declaration of a locally callable function offered to the model. The
/// parameter schema travels as a JSON-encoded string and is parsed during
/// request assembly; malformed JSON aborts the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerFileRef {
    pub container_id: String,
    pub file_id: String,
}

/// Aggregated result of one turn, populated by the unpacker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextRecord {
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub msg_id: String,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    /// Lazily initialized: stays `None` when no citations were found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
    #[serde(default)]
    pub images: Vec<PathBuf>,
    #[serde(default)]
    pub files: Vec<ContainerFileRef>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}
