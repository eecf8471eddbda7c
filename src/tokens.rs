use crate::types::{ConversationTurn, InputItem};

/// Token accounting collaborator. The crate ships a cheap heuristic; callers
/// with a real tokenizer implement this over it.
pub trait TokenCounter: Send + Sync {
    fn count_text(&self, text: &str, model_id: &str) -> u64;

    /// Tokens consumed by a built input sequence, including a small
    /// per-record envelope overhead.
    fn count_items(&self, items: &[InputItem], model_id: &str) -> u64 {
        items
            .iter()
            .map(|item| {
                let encoded = serde_json::to_string(item).unwrap_or_default();
                self.count_text(&encoded, model_id).saturating_add(4)
            })
            .sum()
    }

    /// Tokens already committed to the fresh prompt and system text before
    /// any history is replayed.
    fn count_user(&self, prompt: &str, system_prompt: &str, model_id: &str) -> u64 {
        self.count_text(prompt, model_id)
            .saturating_add(self.count_text(system_prompt, model_id))
    }
}

/// Rough chars/4 estimate, biased high enough to stay safe for trimming.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count_text(&self, text: &str, _model_id: &str) -> u64 {
        (text.chars().count() as u64).div_ceil(4)
    }
}

/// History-fitting collaborator: selects which trailing turns fit under the
/// remaining token budget.
pub trait HistoryWindow: Send + Sync {
    fn fit<'a>(
        &self,
        turns: &'a [ConversationTurn],
        used_tokens: u64,
        budget: u64,
        model_id: &str,
    ) -> &'a [ConversationTurn];
}

/// Default fitting policy: walk backwards from the newest turn, admitting
/// whole turns until the budget runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct TailWindow<C = HeuristicCounter> {
    counter: C,
}

impl<C> TailWindow<C> {
    pub fn new(counter: C) -> Self {
        Self { counter }
    }
}

impl<C: TokenCounter> HistoryWindow for TailWindow<C> {
    fn fit<'a>(
        &self,
        turns: &'a [ConversationTurn],
        used_tokens: u64,
        budget: u64,
        model_id: &str,
    ) -> &'a [ConversationTurn] {
        let mut remaining = budget.saturating_sub(used_tokens);
        let mut start = turns.len();
        for (index, turn) in turns.iter().enumerate().rev() {
            let cost = self
                .counter
                .count_text(&turn.input, model_id)
                .saturating_add(self.counter.count_text(&turn.output, model_id))
                .saturating_add(8);
            if cost > remaining {
                break;
            }
            remaining -= cost;
            start = index;
        }
        &turns[start..]
    }
}
