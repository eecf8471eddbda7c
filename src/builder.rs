use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::config::ChatConfig;
use crate::content::{Attachment, AudioPayload, audio_content, vision_content};
use crate::model::ModelProfile;
use crate::tokens::{HeuristicCounter, HistoryWindow, TailWindow, TokenCounter};
use crate::types::{
    AudioId, AudioRef, ConversationTurn, FunctionCallOutput, InputItem, InputMessage,
    MessageContent,
};

/// Everything a single build needs, borrowed from the caller.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest<'a> {
    pub prompt: &'a str,
    pub system_prompt: Option<&'a str>,
    pub history: &'a [ConversationTurn],
    pub attachments: &'a [Attachment],
    pub audio_payload: Option<&'a AudioPayload>,
    /// Session-level audio reference, used when a replayed turn carries none.
    pub session_audio: Option<&'a AudioRef>,
}

/// Result of one build. Carries everything the dispatcher and the next turn
/// need; there is no hidden state retained between builds.
#[derive(Debug, Clone)]
pub struct BuiltInput {
    pub items: Vec<InputItem>,
    /// Chain-continuation id from the most recent qualifying turn.
    pub prev_response_id: Option<String>,
    /// A matched tool output terminated the sequence and the fresh prompt
    /// was suppressed.
    pub tool_output: bool,
    pub input_tokens: u64,
}

/// Converts a prompt, system text, history and attachments into the ordered
/// input sequence for one request.
pub struct MessageBuilder<C = HeuristicCounter, W = TailWindow<HeuristicCounter>> {
    config: ChatConfig,
    counter: C,
    window: W,
}

impl MessageBuilder {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            counter: HeuristicCounter,
            window: TailWindow::new(HeuristicCounter),
        }
    }
}

impl<C, W> MessageBuilder<C, W> {
    pub fn with_counter<C2>(self, counter: C2) -> MessageBuilder<C2, W> {
        MessageBuilder {
            config: self.config,
            counter,
            window: self.window,
        }
    }

    pub fn with_window<W2>(self, window: W2) -> MessageBuilder<C, W2> {
        MessageBuilder {
            config: self.config,
            counter: self.counter,
            window,
        }
    }
}

impl<C: TokenCounter, W: HistoryWindow> MessageBuilder<C, W> {
    pub fn build(&self, model: &ModelProfile, request: &BuildRequest<'_>) -> BuiltInput {
        self.build_at(model, request, epoch_now())
    }

    /// Deterministic variant taking the clock explicitly; audio references
    /// whose expiry is not past `now_epoch_secs` are replayed, the rest are
    /// silently dropped.
    pub fn build_at(
        &self,
        model: &ModelProfile,
        request: &BuildRequest<'_>,
        now_epoch_secs: u64,
    ) -> BuiltInput {
        let mut items = Vec::<InputItem>::new();
        let mut prev_response_id = None;
        let mut tool_output = false;

        let system_prompt = request.system_prompt.unwrap_or_default();
        let used_tokens = self
            .counter
            .count_user(request.prompt, system_prompt, &model.id);
        let budget = self.config.max_total_tokens.min(model.ctx);

        if self.config.use_context {
            let turns = self
                .window
                .fit(request.history, used_tokens, budget, &model.id);
            for (index, turn) in turns.iter().enumerate() {
                let is_last = index + 1 == turns.len();

                if !turn.input.is_empty() {
                    items.push(InputItem::Message(InputMessage::user(turn.input.clone())));
                }

                if !turn.output.is_empty() {
                    let mut message = InputMessage::assistant(turn.output.clone());
                    if model.supports_audio_output() {
                        let audio = turn.audio.as_ref().or(request.session_audio);
                        if let Some(audio) = audio.filter(|a| a.is_live(now_epoch_secs)) {
                            message.audio = Some(AudioId {
                                id: audio.id.clone(),
                            });
                        }
                    }
                    items.push(InputItem::Message(message));

                    tool_output = false;
                    if is_last && self.config.func_call_native && !turn.tool_calls.is_empty() {
                        tool_output = append_tool_outputs(&mut items, turn);
                    }
                }

                if turn.tool_calls.is_empty() || tool_output {
                    if let Some(msg_id) = &turn.msg_id {
                        prev_response_id = Some(msg_id.clone());
                    }
                }
            }
        }

        if !tool_output {
            let mut content = MessageContent::Text(request.prompt.to_string());
            if model.image_input {
                content = vision_content(request.prompt, request.attachments);
            }
            if model.audio_input {
                content = audio_content(content, request.audio_payload);
            }
            items.push(InputItem::Message(InputMessage {
                role: crate::types::Role::User,
                content,
                audio: None,
            }));
        }

        let input_tokens = self.counter.count_items(&items, &model.id);
        BuiltInput {
            items,
            prev_response_id,
            tool_output,
            input_tokens,
        }
    }
}

/// Pair each recorded call with at most one output: an entry whose `cmd`
/// matches the call's function name wins, otherwise the first entry exposing
/// a generic `result`. First match ends the scan for that call.
fn append_tool_outputs(items: &mut Vec<InputItem>, turn: &ConversationTurn) -> bool {
    let mut matched = false;
    for call in &turn.tool_calls {
        if call.call_id.is_empty() || call.name.is_empty() {
            continue;
        }
        for output in &turn.tool_outputs {
            if output.cmd.as_deref() == Some(call.name.as_str()) {
                let payload = serde_json::to_string(output).unwrap_or_default();
                items.push(InputItem::FunctionCallOutput(FunctionCallOutput::new(
                    call.call_id.clone(),
                    payload,
                )));
                matched = true;
                break;
            } else if let Some(result) = &output.result {
                items.push(InputItem::FunctionCallOutput(FunctionCallOutput::new(
                    call.call_id.clone(),
                    value_to_plain_string(result),
                )));
                matched = true;
                break;
            }
        }
    }
    matched
}

fn value_to_plain_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
