use serde::Deserialize;
use serde_json::Value;

use crate::types::ToolCall;

/// Non-streaming reply from the Responses endpoint, reduced to the fields
/// the unpacker consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    pub id: String,
    #[serde(default)]
    pub output: Vec<ReplyItem>,
    #[serde(default)]
    pub usage: ReplyUsage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// Closed set of reply output item kinds. Kinds this crate does not consume
/// collapse into `Unknown` and are skipped.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyItem {
    Message {
        #[serde(default)]
        content: Vec<ReplyContent>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        #[serde(default)]
        arguments: String,
    },
    ImageGenerationCall {
        #[serde(default)]
        result: String,
    },
    CodeInterpreterCall {
        #[serde(default)]
        code: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyContent {
    OutputText {
        #[serde(default)]
        text: String,
        #[serde(default)]
        annotations: Vec<Annotation>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    UrlCitation {
        url: String,
    },
    ContainerFileCitation {
        container_id: String,
        file_id: String,
    },
    #[serde(other)]
    Unknown,
}

impl Reply {
    /// Aggregate text across all message items, in output order.
    pub fn output_text(&self) -> String {
        let mut out = String::new();
        for item in &self.output {
            let ReplyItem::Message { content } = item else {
                continue;
            };
            for part in content {
                if let ReplyContent::OutputText { text, .. } = part {
                    out.push_str(text);
                }
            }
        }
        out
    }

    /// Normalized tool-call descriptors from `function_call` items. The
    /// argument payload arrives JSON-encoded; undecodable payloads are kept
    /// as raw strings.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        let mut calls = Vec::new();
        for item in &self.output {
            let ReplyItem::FunctionCall {
                call_id,
                name,
                arguments,
            } = item
            else {
                continue;
            };
            let parsed = serde_json::from_str::<Value>(arguments)
                .unwrap_or_else(|_| Value::String(arguments.clone()));
            calls.push(ToolCall {
                call_id: call_id.clone(),
                name: name.clone(),
                arguments: parsed,
            });
        }
        calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_known_and_unknown_items() {
        let raw = json!({
            "id": "resp_1",
            "output": [
                { "type": "message", "content": [
                    { "type": "output_text", "text": "hi", "annotations": [] }
                ]},
                { "type": "function_call", "call_id": "c1", "name": "add",
                  "arguments": "{\"a\":1}" },
                { "type": "reasoning", "summary": [] }
            ],
            "usage": { "input_tokens": 3, "output_tokens": 7 }
        });
        let reply: Reply = serde_json::from_value(raw).expect("reply");

        assert_eq!(reply.output_text(), "hi");
        assert_eq!(reply.usage.output_tokens, 7);
        assert!(matches!(reply.output[2], ReplyItem::Unknown));

        let calls = reply.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "add");
        assert_eq!(calls[0].arguments, json!({ "a": 1 }));
    }

    #[test]
    fn undecodable_arguments_fall_back_to_raw_string() {
        let raw = json!({
            "id": "resp_1",
            "output": [
                { "type": "function_call", "call_id": "c1", "name": "add",
                  "arguments": "not json" }
            ]
        });
        let reply: Reply = serde_json::from_value(raw).expect("reply");
        assert_eq!(reply.tool_calls()[0].arguments, json!("not json"));
    }

    #[test]
    fn unknown_annotations_are_tolerated() {
        let raw = json!({
            "id": "resp_1",
            "output": [
                { "type": "message", "content": [
                    { "type": "output_text", "text": "t", "annotations": [
                        { "type": "url_citation", "url": "https://example.com" },
                        { "type": "file_path", "file_id": "f1" }
                    ]}
                ]}
            ]
        });
        let reply: Reply = serde_json::from_value(raw).expect("reply");
        let ReplyItem::Message { content } = &reply.output[0] else {
            panic!("expected message");
        };
        let ReplyContent::OutputText { annotations, .. } = &content[0] else {
            panic!("expected output_text");
        };
        assert_eq!(annotations.len(), 2);
        assert!(matches!(annotations[1], Annotation::Unknown));
    }
}
