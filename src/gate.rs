use crate::config::ResponsesConfig;
use crate::model::{Mode, ModelProfile};

/// Modes the Responses path may serve.
pub const RESPONSES_ALLOWED_MODES: &[Mode] =
    &[Mode::Chat, Mode::Research, Mode::Agent, Mode::Expert];

/// Runtime situation the eligibility decision is made in.
#[derive(Debug, Clone, Copy)]
pub struct GateContext {
    pub mode: Mode,
    /// Mode of the enclosing invocation; same as `mode` at top level.
    pub parent_mode: Mode,
    /// Internal expert-to-expert call.
    pub is_expert_call: bool,
    /// Legacy agent orchestration currently active.
    pub agent_legacy_active: bool,
    /// Expert orchestration currently active.
    pub experts_active: bool,
}

impl GateContext {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            parent_mode: mode,
            is_expert_call: false,
            agent_legacy_active: false,
            experts_active: false,
        }
    }
}

/// Decide whether the Responses path applies, versus falling back to the
/// conventional chat endpoint. Default is no.
pub fn responses_allowed(
    model: &ModelProfile,
    config: &ResponsesConfig,
    gate: &GateContext,
) -> bool {
    if !model.is_openai() {
        return false;
    }
    if !RESPONSES_ALLOWED_MODES.contains(&gate.mode)
        || !RESPONSES_ALLOWED_MODES.contains(&gate.parent_mode)
        || !config.enabled
    {
        return false;
    }

    let mut allowed = true;
    if gate.agent_legacy_active && !config.agent {
        allowed = false;
    }
    if gate.experts_active && !config.experts {
        allowed = false;
    }
    // Internal expert calls are decided by their own toggle alone.
    if gate.is_expert_call {
        allowed = config.experts_internal;
    }
    allowed
}
