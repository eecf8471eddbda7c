use serde::{Deserialize, Serialize};

/// Conversation modes the client can run a turn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Chat,
    Vision,
    Audio,
    Research,
    Agent,
    Expert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Google,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// Static description of a model: identity, capability flags and context
/// window size. Drives both eligibility checks and request assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfile {
    pub id: String,
    pub provider: ProviderFamily,
    /// Context window size in tokens.
    pub ctx: u64,
    #[serde(default)]
    pub modes: Vec<Mode>,
    #[serde(default)]
    pub image_input: bool,
    #[serde(default)]
    pub audio_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
}

impl ModelProfile {
    pub fn new(id: impl Into<String>, ctx: u64) -> Self {
        Self {
            id: id.into(),
            provider: ProviderFamily::OpenAi,
            ctx,
            modes: vec![Mode::Chat],
            image_input: false,
            audio_input: false,
            reasoning_effort: None,
        }
    }

    pub fn with_provider(mut self, provider: ProviderFamily) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_modes(mut self, modes: Vec<Mode>) -> Self {
        self.modes = modes;
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = Some(effort);
        self
    }

    pub fn is_openai(&self) -> bool {
        self.provider == ProviderFamily::OpenAi
    }

    /// Audio-capable assistant output: replayed assistant turns may carry an
    /// `audio: {id}` reference.
    pub fn supports_audio_output(&self) -> bool {
        self.modes.contains(&Mode::Audio)
    }
}

/// Models that reject the `tools` parameter outright; any configured
/// functions are dropped before dispatch.
pub const TOOLS_DENYLIST: &[&str] = &["gpt-4o-search-preview", "gpt-4o-mini-search-preview"];

/// Legacy reasoning models for which the `tools` field must be omitted
/// entirely, even when empty-compatible tools were assembled.
pub const NO_TOOL_PARAM_MODELS: &[&str] = &["o1-mini", "o1-preview"];

pub const REMOTE_WEB_SEARCH_DENYLIST: &[&str] = &["o1-pro"];
pub const REMOTE_CODE_INTERPRETER_DENYLIST: &[&str] = &["o1-pro"];
pub const REMOTE_IMAGE_DENYLIST: &[&str] = &["o1-pro", "o3-deep-research"];

/// Remote tool descriptors are skipped for these model id prefixes.
pub(crate) fn rejects_remote_tools(model_id: &str) -> bool {
    model_id.starts_with("o1") || model_id.starts_with("o3")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_output_follows_mode_set() {
        let model = ModelProfile::new("gpt-4o-audio-preview", 128_000)
            .with_modes(vec![Mode::Chat, Mode::Audio]);
        assert!(model.supports_audio_output());
        assert!(!ModelProfile::new("gpt-4o", 128_000).supports_audio_output());
    }

    #[test]
    fn reasoning_prefixes_reject_remote_tools() {
        assert!(rejects_remote_tools("o1-mini"));
        assert!(rejects_remote_tools("o3"));
        assert!(!rejects_remote_tools("gpt-4o"));
    }
}
