//! Conversation pipeline for OpenAI's Responses API: decide eligibility,
//! build the input sequence from history, dispatch the request, unpack the
//! reply into a normalized context record.

mod builder;
mod config;
mod dispatch;
mod error;
mod files;
mod gate;
mod model;
mod reply;
mod tokens;
mod unpack;

pub mod content;
pub mod types;
pub mod utils;

pub use builder::{BuildRequest, BuiltInput, MessageBuilder};
pub use config::{ChatConfig, RemoteToolsConfig, ResponsesConfig};
pub use content::{Attachment, AttachmentSource, AudioPayload};
pub use dispatch::{RequestPlan, ResponsesClient, assemble_body, clamp_max_output_tokens};
pub use error::{ColloquyError, Result};
pub use files::ContainerFileClient;
pub use gate::{GateContext, RESPONSES_ALLOWED_MODES, responses_allowed};
pub use model::{Mode, ModelProfile, ProviderFamily, ReasoningEffort};
pub use reply::{Annotation, Reply, ReplyContent, ReplyItem, ReplyUsage};
pub use tokens::{HeuristicCounter, HistoryWindow, TailWindow, TokenCounter};
pub use types::{
    AudioRef, ContainerFileRef, ContextRecord, ConversationTurn, FunctionSpec, InputItem,
    InputMessage, MessageContent, ToolCall, ToolOutput,
};
pub use unpack::{
    ContainerFiles, DirImagePaths, ImagePaths, NoopContainerFiles, unpack_response,
};
