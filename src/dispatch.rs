use serde_json::{Map, Value, json};

use crate::builder::BuiltInput;
use crate::config::ChatConfig;
use crate::model::{
    ModelProfile, NO_TOOL_PARAM_MODELS, REMOTE_CODE_INTERPRETER_DENYLIST, REMOTE_IMAGE_DENYLIST,
    REMOTE_WEB_SEARCH_DENYLIST, TOOLS_DENYLIST, rejects_remote_tools,
};
use crate::reply::Reply;
use crate::types::{FunctionSpec, InputItem};
use crate::utils::http::send_checked_json;
use crate::{ColloquyError, Result};

#[cfg(feature = "streaming")]
use futures_util::stream::BoxStream;

/// One request, fully described. Produced from a [`BuiltInput`] plus the
/// caller's per-turn settings; consumed once by the client.
#[derive(Debug, Clone)]
pub struct RequestPlan {
    pub items: Vec<InputItem>,
    pub prev_response_id: Option<String>,
    pub input_tokens: u64,
    pub instructions: Option<String>,
    pub functions: Vec<FunctionSpec>,
    /// Requested output budget; zero means no hint.
    pub max_output_tokens: u64,
    pub stream: bool,
}

impl RequestPlan {
    pub fn from_built(built: BuiltInput) -> Self {
        Self {
            items: built.items,
            prev_response_id: built.prev_response_id,
            input_tokens: built.input_tokens,
            instructions: None,
            functions: Vec::new(),
            max_output_tokens: 0,
            stream: false,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_functions(mut self, functions: Vec<FunctionSpec>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u64) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Clamp a requested output budget so input plus output never exceeds the
/// model's context window. Floored at zero; zero hints pass through.
pub fn clamp_max_output_tokens(input_tokens: u64, hint: u64, ctx: u64) -> u64 {
    if hint == 0 || input_tokens.saturating_add(hint) <= ctx {
        return hint;
    }
    ctx.saturating_sub(input_tokens).saturating_sub(1)
}

/// Assemble the request body: input, capability-gated tool list, reasoning
/// hint, clamped output budget, chain id and instructions. Pure; the only
/// failure is a malformed function parameter schema.
pub fn assemble_body(
    model: &ModelProfile,
    config: &ChatConfig,
    plan: &RequestPlan,
) -> Result<Map<String, Value>> {
    let mut body = Map::<String, Value>::new();
    body.insert("model".to_string(), Value::String(model.id.clone()));
    body.insert("input".to_string(), serde_json::to_value(&plan.items)?);
    body.insert("stream".to_string(), Value::Bool(plan.stream));

    let mut tools = Vec::<Value>::new();
    for function in &plan.functions {
        if function.name.trim().is_empty() {
            continue;
        }
        let parameters = match function.params.as_deref().filter(|p| !p.is_empty()) {
            Some(raw) => {
                serde_json::from_str::<Value>(raw).map_err(|source| {
                    ColloquyError::FunctionParams {
                        name: function.name.clone(),
                        source,
                    }
                })?
            }
            None => Value::Object(Map::new()),
        };
        tools.push(json!({
            "type": "function",
            "name": function.name,
            "parameters": parameters,
            "description": function.desc.clone().unwrap_or_default(),
        }));
    }

    if let Some(effort) = model.reasoning_effort {
        body.insert("reasoning".to_string(), json!({ "effort": effort }));
    }

    let denylisted = TOOLS_DENYLIST.contains(&model.id.as_str());
    if denylisted {
        tools.clear();
    }

    if !denylisted && !rejects_remote_tools(&model.id) {
        if config.remote_tools.web_search
            && !REMOTE_WEB_SEARCH_DENYLIST.contains(&model.id.as_str())
        {
            tools.push(json!({ "type": "web_search_preview" }));
        }
        if config.remote_tools.code_interpreter
            && !REMOTE_CODE_INTERPRETER_DENYLIST.contains(&model.id.as_str())
        {
            tools.push(json!({
                "type": "code_interpreter",
                "container": { "type": "auto" },
            }));
        }
        if config.remote_tools.image && !REMOTE_IMAGE_DENYLIST.contains(&model.id.as_str()) {
            let mut tool = json!({ "type": "image_generation" });
            if plan.stream {
                // Required by the endpoint when streaming image output.
                tool["partial_images"] = json!(1);
            }
            tools.push(tool);
        }
    }

    if !NO_TOOL_PARAM_MODELS.contains(&model.id.as_str()) && !tools.is_empty() {
        body.insert("tools".to_string(), Value::Array(tools));
    }

    let max_output_tokens =
        clamp_max_output_tokens(plan.input_tokens, plan.max_output_tokens, model.ctx);
    if max_output_tokens > 0 {
        body.insert(
            "max_output_tokens".to_string(),
            Value::Number(max_output_tokens.into()),
        );
    }

    if let Some(prev) = plan.prev_response_id.as_deref().filter(|s| !s.is_empty()) {
        body.insert(
            "previous_response_id".to_string(),
            Value::String(prev.to_string()),
        );
    }
    if let Some(instructions) = plan.instructions.as_deref().filter(|s| !s.is_empty()) {
        body.insert(
            "instructions".to_string(),
            Value::String(instructions.to_string()),
        );
    }

    Ok(body)
}

/// HTTP client for the Responses endpoint; the crate's sole external-effect
/// point.
#[derive(Clone)]
pub struct ResponsesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ResponsesClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("reqwest client build should not fail");

        Self {
            http,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn responses_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/responses") {
            base.to_string()
        } else {
            format!("{base}/responses")
        }
    }

    /// Non-streaming dispatch. The reply's `id` is the chain-continuation
    /// identifier for the caller's next turn.
    pub async fn send(
        &self,
        model: &ModelProfile,
        config: &ChatConfig,
        plan: &RequestPlan,
    ) -> Result<Reply> {
        let plan = RequestPlan {
            stream: false,
            ..plan.clone()
        };
        let body = assemble_body(model, config, &plan)?;

        send_checked_json(
            self.http
                .post(self.responses_url())
                .bearer_auth(&self.api_key)
                .json(&body),
        )
        .await
    }

    /// Streaming dispatch: returns the raw SSE data stream. Consuming (or
    /// dropping) it is the caller's responsibility.
    #[cfg(feature = "streaming")]
    pub async fn stream(
        &self,
        model: &ModelProfile,
        config: &ChatConfig,
        plan: &RequestPlan,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let plan = RequestPlan {
            stream: true,
            ..plan.clone()
        };
        let body = assemble_body(model, config, &plan)?;

        let response = crate::utils::http::send_checked(
            self.http
                .post(self.responses_url())
                .bearer_auth(&self.api_key)
                .header("Accept", "text/event-stream")
                .json(&body),
        )
        .await?;

        Ok(crate::utils::sse::sse_data_stream(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReasoningEffort;
    use crate::types::{InputItem, InputMessage};

    fn plan() -> RequestPlan {
        RequestPlan {
            items: vec![InputItem::Message(InputMessage::user("hi"))],
            prev_response_id: None,
            input_tokens: 10,
            instructions: None,
            functions: Vec::new(),
            max_output_tokens: 0,
            stream: false,
        }
    }

    fn remote_all() -> ChatConfig {
        ChatConfig {
            remote_tools: crate::config::RemoteToolsConfig {
                web_search: true,
                code_interpreter: true,
                image: true,
            },
            ..ChatConfig::default()
        }
    }

    #[test]
    fn clamp_matches_window_arithmetic() {
        assert_eq!(clamp_max_output_tokens(100, 50, 120), 19);
        assert_eq!(clamp_max_output_tokens(10, 50, 120), 50);
        assert_eq!(clamp_max_output_tokens(200, 50, 120), 0);
        assert_eq!(clamp_max_output_tokens(100, 0, 120), 0);
    }

    #[test]
    fn body_carries_model_input_and_stream() {
        let model = ModelProfile::new("gpt-4o", 128_000);
        let body = assemble_body(&model, &ChatConfig::default(), &plan()).expect("body");
        assert_eq!(body.get("model"), Some(&Value::String("gpt-4o".into())));
        assert!(body.get("input").and_then(Value::as_array).is_some());
        assert_eq!(body.get("stream"), Some(&Value::Bool(false)));
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn blank_function_names_are_skipped_and_params_parsed() {
        let model = ModelProfile::new("gpt-4o", 128_000);
        let plan = plan().with_functions(vec![
            FunctionSpec {
                name: "  ".to_string(),
                desc: None,
                params: None,
            },
            FunctionSpec {
                name: "add".to_string(),
                desc: Some("adds".to_string()),
                params: Some(r#"{"type":"object"}"#.to_string()),
            },
        ]);
        let body = assemble_body(&model, &ChatConfig::default(), &plan).expect("body");
        let tools = body.get("tools").and_then(Value::as_array).expect("tools");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].get("name"), Some(&Value::String("add".into())));
        assert_eq!(
            tools[0].get("parameters"),
            Some(&serde_json::json!({ "type": "object" }))
        );
    }

    #[test]
    fn malformed_function_params_abort_assembly() {
        let model = ModelProfile::new("gpt-4o", 128_000);
        let plan = plan().with_functions(vec![FunctionSpec {
            name: "add".to_string(),
            desc: None,
            params: Some("{not json".to_string()),
        }]);
        let err = assemble_body(&model, &ChatConfig::default(), &plan).expect_err("must fail");
        assert!(matches!(err, ColloquyError::FunctionParams { name, .. } if name == "add"));
    }

    #[test]
    fn denylisted_model_sends_no_tools_despite_toggles() {
        for id in ["gpt-4o-search-preview", "gpt-4o-mini-search-preview"] {
            let model = ModelProfile::new(id, 128_000);
            let plan = plan().with_functions(vec![FunctionSpec {
                name: "add".to_string(),
                desc: None,
                params: None,
            }]);
            let body = assemble_body(&model, &remote_all(), &plan).expect("body");
            assert!(body.get("tools").is_none(), "{id} must carry no tools");
        }
    }

    #[test]
    fn remote_tools_follow_config_toggles() {
        let model = ModelProfile::new("gpt-4o", 128_000);
        let body = assemble_body(&model, &remote_all(), &plan()).expect("body");
        let tools = body.get("tools").and_then(Value::as_array).expect("tools");
        let kinds: Vec<_> = tools
            .iter()
            .filter_map(|t| t.get("type").and_then(Value::as_str))
            .collect();
        assert_eq!(
            kinds,
            vec!["web_search_preview", "code_interpreter", "image_generation"]
        );
        assert!(tools[2].get("partial_images").is_none());
    }

    #[test]
    fn image_tool_requests_partial_images_only_when_streaming() {
        let model = ModelProfile::new("gpt-4o", 128_000);
        let plan = plan().with_stream(true);
        let body = assemble_body(&model, &remote_all(), &plan).expect("body");
        let tools = body.get("tools").and_then(Value::as_array).expect("tools");
        let image = tools
            .iter()
            .find(|t| t.get("type").and_then(Value::as_str) == Some("image_generation"))
            .expect("image tool");
        assert_eq!(image.get("partial_images"), Some(&Value::Number(1.into())));
    }

    #[test]
    fn reasoning_prefixes_get_no_remote_tools() {
        let model = ModelProfile::new("o3", 200_000);
        let body = assemble_body(&model, &remote_all(), &plan()).expect("body");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn legacy_reasoning_models_omit_tools_field_entirely() {
        let model = ModelProfile::new("o1-mini", 128_000);
        let plan = plan().with_functions(vec![FunctionSpec {
            name: "add".to_string(),
            desc: None,
            params: None,
        }]);
        let body = assemble_body(&model, &remote_all(), &plan).expect("body");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn reasoning_effort_is_forwarded() {
        let model = ModelProfile::new("o3", 200_000).with_reasoning_effort(ReasoningEffort::High);
        let body = assemble_body(&model, &ChatConfig::default(), &plan()).expect("body");
        assert_eq!(
            body.get("reasoning"),
            Some(&serde_json::json!({ "effort": "high" }))
        );
    }

    #[test]
    fn chain_id_and_instructions_are_top_level() {
        let model = ModelProfile::new("gpt-4o", 128_000);
        let mut plan = plan().with_instructions("be terse");
        plan.prev_response_id = Some("resp_7".to_string());
        let body = assemble_body(&model, &ChatConfig::default(), &plan).expect("body");
        assert_eq!(
            body.get("previous_response_id"),
            Some(&Value::String("resp_7".into()))
        );
        assert_eq!(
            body.get("instructions"),
            Some(&Value::String("be terse".into()))
        );
    }

    #[test]
    fn clamped_budget_is_sent_when_positive() {
        let model = ModelProfile::new("gpt-4o", 120);
        let mut plan = plan().with_max_output_tokens(50);
        plan.input_tokens = 100;
        let body = assemble_body(&model, &ChatConfig::default(), &plan).expect("body");
        assert_eq!(
            body.get("max_output_tokens"),
            Some(&Value::Number(19.into()))
        );

        // Floored to zero: the hint is dropped rather than sent as 0.
        plan.input_tokens = 200;
        let body = assemble_body(&model, &ChatConfig::default(), &plan).expect("body");
        assert!(body.get("max_output_tokens").is_none());
    }
}
