//! Forcing model output into JSON.
//!
//! Models wrap JSON in Markdown fences or surround it with prose. The helpers
//! here strip that away and, if parsing still fails, ask the model once more
//! to reformat its previous answer.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{instrument, warn};

use vendorrisk_shared::{ChatMessage, LlmConfig, Result, VendorRiskError};

use crate::chat::ChatModel;

const JSON_SYSTEM_PROMPT: &str = "You are a precise data-returning model. \
    Always respond ONLY with valid JSON, no text before or after.";

static JSON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json(.*?)(?:```|$)").expect("valid regex"));

static ANY_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)(?:```|$)").expect("valid regex"));

/// Options for [`complete_json`].
#[derive(Debug, Clone, Copy)]
pub struct JsonOptions {
    pub temperature: f32,
    /// Total model calls, including the first.
    pub max_attempts: u32,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_attempts: 2,
        }
    }
}

impl From<&LlmConfig> for JsonOptions {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.json_temperature,
            max_attempts: config.max_json_attempts,
        }
    }
}

/// Narrow raw model output down to the most likely JSON text.
///
/// A ```` ```json ```` fence takes precedence over a bare fence. Within the
/// result, the span from the first `{` to the last `}` is kept when present.
pub fn extract_json_block(raw: &str) -> &str {
    let fenced = JSON_FENCE_RE
        .captures(raw)
        .or_else(|| ANY_FENCE_RE.captures(raw))
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str());

    match (fenced.find('{'), fenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &fenced[start..=end],
        _ => fenced.trim(),
    }
}

/// Call the model and parse its reply as JSON, retrying with a repair prompt.
///
/// Transport and API errors abort immediately. When every attempt yields
/// unparseable output, a parse error carrying the last raw reply is returned.
#[instrument(skip_all, fields(max_attempts = opts.max_attempts))]
pub async fn complete_json(model: &dyn ChatModel, prompt: &str, opts: JsonOptions) -> Result<Value> {
    let attempts = opts.max_attempts.max(1);
    let mut prompt = prompt.to_string();
    let mut last_raw = String::new();
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let messages = [
            ChatMessage::system(JSON_SYSTEM_PROMPT),
            ChatMessage::user(prompt.as_str()),
        ];
        let raw = model.complete(&messages, opts.temperature).await?;

        match serde_json::from_str::<Value>(extract_json_block(&raw)) {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(attempt, error = %e, "model returned invalid JSON");
                prompt = format!(
                    "The previous response was invalid JSON. \
                     Please reformat and return valid JSON only.\n\n{raw}"
                );
                last_error = e.to_string();
                last_raw = raw;
            }
        }
    }

    Err(VendorRiskError::parse(format!(
        "failed to produce valid JSON after {attempts} attempts ({last_error}); raw output: {last_raw}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records the user prompts it received.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage], _temperature: f32) -> Result<String> {
            assert_eq!(messages[0].role, "system");
            self.prompts.lock().unwrap().push(messages[1].content.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected model call")
        }
    }

    #[test]
    fn strips_json_fence() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(extract_json_block(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence_with_language_tag() {
        let raw = "```JSON\n{\"b\": [1, 2]}\n```";
        assert_eq!(extract_json_block(raw), "{\"b\": [1, 2]}");
    }

    #[test]
    fn unterminated_fence_uses_rest_of_output() {
        let raw = "```json\n{\"c\": true}";
        assert_eq!(extract_json_block(raw), "{\"c\": true}");
    }

    #[test]
    fn narrows_to_outer_braces_in_prose() {
        let raw = "Sure! {\"nested\": {\"x\": 1}} hope that helps";
        assert_eq!(extract_json_block(raw), "{\"nested\": {\"x\": 1}}");
    }

    #[test]
    fn leaves_non_object_output_trimmed() {
        assert_eq!(extract_json_block("  [1, 2]  "), "[1, 2]");
        assert_eq!(extract_json_block("not json"), "not json");
    }

    #[tokio::test]
    async fn parses_first_reply() {
        let model = ScriptedModel::new(vec![Ok("```json\n{\"financial_risk\": 2}\n```".into())]);
        let value = complete_json(&model, "score it", JsonOptions::default())
            .await
            .unwrap();
        assert_eq!(value["financial_risk"], 2);
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repairs_after_one_invalid_reply() {
        let model = ScriptedModel::new(vec![
            Ok("{financial_risk: 2,}".into()),
            Ok("{\"financial_risk\": 2}".into()),
        ]);
        let value = complete_json(&model, "score it", JsonOptions::default())
            .await
            .unwrap();
        assert_eq!(value["financial_risk"], 2);

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].starts_with("The previous response was invalid JSON."));
        assert!(prompts[1].ends_with("{financial_risk: 2,}"));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let model = ScriptedModel::new(vec![Ok("nope".into()), Ok("still nope".into())]);
        let err = complete_json(&model, "score it", JsonOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VendorRiskError::Parse { .. }));
        assert!(err.to_string().contains("still nope"));
    }

    #[tokio::test]
    async fn transport_error_is_not_retried() {
        let model = ScriptedModel::new(vec![Err(VendorRiskError::Llm("HTTP 500".into()))]);
        let err = complete_json(&model, "score it", JsonOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VendorRiskError::Llm(_)));
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }
}
