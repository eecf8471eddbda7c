use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_max_total_tokens() -> u64 {
    8_192
}

/// Global toggles for the provider-hosted remote tools appended to the
/// request's tool list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RemoteToolsConfig {
    #[serde(default)]
    pub web_search: bool,
    #[serde(default)]
    pub code_interpreter: bool,
    #[serde(default)]
    pub image: bool,
}

/// Toggles deciding when the Responses path is taken at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResponsesConfig {
    /// Global switch; everything below narrows it.
    #[serde(default)]
    pub enabled: bool,
    /// Sub-toggle consulted while the legacy agent orchestration is active.
    #[serde(default)]
    pub agent: bool,
    /// Sub-toggle consulted while expert orchestration is active.
    #[serde(default)]
    pub experts: bool,
    /// Sole decider for internal expert-to-expert calls.
    #[serde(default)]
    pub experts_internal: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Replay conversation history into the request input.
    #[serde(default = "default_true")]
    pub use_context: bool,
    /// Pair recorded tool calls with local tool outputs on the final turn.
    #[serde(default)]
    pub func_call_native: bool,
    /// Upper bound on context tokens, clamped to the model's own window.
    #[serde(default = "default_max_total_tokens")]
    pub max_total_tokens: u64,
    #[serde(default)]
    pub remote_tools: RemoteToolsConfig,
    #[serde(default)]
    pub responses: ResponsesConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            use_context: true,
            func_call_native: false,
            max_total_tokens: default_max_total_tokens(),
            remote_tools: RemoteToolsConfig::default(),
            responses: ResponsesConfig::default(),
        }
    }
}
