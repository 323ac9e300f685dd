//! Session model: raw playground payloads and the canonical messages they
//! normalize into.
//!
//! Raw types mirror what the playground service sends. Every field is
//! optional and deserialized leniently: a value of the wrong JSON type is
//! dropped (or rendered as text) rather than failing the whole record.
//! Structural damage, such as a run that is not an object, still fails to
//! parse.
//!
//! Canonical types are what a chat view renders: a role, a plain-string
//! body, and optional tool calls and media.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value, json};

// ---------------------------------------------------------------------------
// Raw (untrusted) types
// ---------------------------------------------------------------------------

/// A session record as returned by the playground service.
///
/// Two layouts exist in the wild: newer services put runs at the root
/// (`runs`), older ones nest them under `memory.runs` or `memory.chats`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawSessionRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub agent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    /// Root-level run list.
    #[serde(default, deserialize_with = "lenient_runs")]
    pub runs: Option<Vec<RawRun>>,
    #[serde(default, deserialize_with = "lenient_memory")]
    pub memory: Option<RawMemory>,
    #[serde(default)]
    pub agent_data: Option<Value>,
}

/// Legacy container for run history.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawMemory {
    #[serde(default, deserialize_with = "lenient_runs")]
    pub runs: Option<Vec<RawRun>>,
    #[serde(default, deserialize_with = "lenient_runs")]
    pub chats: Option<Vec<RawRun>>,
}

/// One request/response exchange.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRun {
    #[serde(default)]
    pub message: Option<RawMessage>,
    #[serde(default)]
    pub response: Option<RawResponse>,
}

/// The user side of a run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub role: Option<String>,
    /// Either a plain string or a list of typed content parts.
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<Number>,
}

/// The agent side of a run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawResponse {
    /// A plain string or any structured value.
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<Number>,
    /// Entries are kept exactly as sent; non-object entries are skipped.
    #[serde(default, deserialize_with = "lenient_tool_calls")]
    pub tools: Option<Vec<ToolCall>>,
    /// Opaque; may carry `reasoning_messages`.
    #[serde(default)]
    pub extra_data: Option<Value>,
    #[serde(default)]
    pub images: Option<Value>,
    #[serde(default)]
    pub videos: Option<Value>,
    #[serde(default)]
    pub audio: Option<Value>,
    #[serde(default)]
    pub response_audio: Option<Value>,
}

/// A reasoning trace entry found under `extra_data.reasoning_messages`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ReasoningMessage {
    fields: Map<String, Value>,
}

impl ReasoningMessage {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Whether this entry records a tool invocation.
    pub fn is_tool(&self) -> bool {
        self.fields.get("role").and_then(Value::as_str) == Some("tool")
    }

    /// The value under `key`, treating JSON `null` as absent.
    fn present(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }
}

// ---------------------------------------------------------------------------
// Canonical types
// ---------------------------------------------------------------------------

/// Who produced a canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Agent => "agent",
        }
    }
}

/// A tool invocation attached to an agent message.
///
/// The JSON object is held as-is, key order included, and serializes back
/// unchanged. Entries from `response.tools` are never touched; only calls
/// promoted from the reasoning trace get defaults (see
/// [`ToolCall::with_defaults`]). The accessors read leniently and fall back
/// to the same defaults for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolCall {
    fields: Map<String, Value>,
}

impl ToolCall {
    /// Wrap a `response.tools` entry without changing it.
    pub fn verbatim(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Promote a tool-role reasoning message, filling every absent field.
    ///
    /// `role` and `content` are copied as sent. A missing or `null` value
    /// elsewhere becomes: empty id and name, empty args, no error,
    /// `{"time": 0}` metrics, and `now` (epoch seconds) as the timestamp.
    /// Keys outside these eight are not carried over.
    pub fn with_defaults(msg: &ReasoningMessage, now: i64) -> Self {
        fn or_else(value: Option<&Value>, default: impl FnOnce() -> Value) -> Value {
            value.cloned().unwrap_or_else(default)
        }

        let mut fields = Map::new();
        if let Some(role) = msg.fields.get("role") {
            fields.insert("role".into(), role.clone());
        }
        if let Some(content) = msg.fields.get("content") {
            fields.insert("content".into(), content.clone());
        }
        fields.insert(
            "tool_call_id".into(),
            or_else(msg.present("tool_call_id"), || Value::from("")),
        );
        fields.insert(
            "tool_name".into(),
            or_else(msg.present("tool_name"), || Value::from("")),
        );
        fields.insert(
            "tool_args".into(),
            or_else(msg.present("tool_args"), || Value::Object(Map::new())),
        );
        fields.insert(
            "tool_call_error".into(),
            or_else(msg.present("tool_call_error"), || Value::Bool(false)),
        );
        fields.insert(
            "metrics".into(),
            or_else(msg.present("metrics"), || json!({"time": 0})),
        );
        fields.insert(
            "created_at".into(),
            or_else(msg.present("created_at"), || Value::from(now)),
        );
        Self { fields }
    }

    /// Raw access to any key, known or not.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn role(&self) -> &str {
        self.str_field("role")
    }

    pub fn content(&self) -> Option<&Value> {
        self.fields.get("content")
    }

    /// `content` as display text (`null` and absent give `""`).
    pub fn content_text(&self) -> String {
        self.content().map(value_to_text).unwrap_or_default()
    }

    pub fn tool_call_id(&self) -> &str {
        self.str_field("tool_call_id")
    }

    pub fn tool_name(&self) -> &str {
        self.str_field("tool_name")
    }

    /// Arguments as sent; may be an object, a JSON-encoded string, or absent.
    pub fn tool_args(&self) -> Option<&Value> {
        self.fields.get("tool_args")
    }

    /// Only a JSON `true` counts as an error.
    pub fn tool_call_error(&self) -> bool {
        self.fields
            .get("tool_call_error")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn metrics_time(&self) -> f64 {
        self.fields
            .get("metrics")
            .and_then(|m| m.get("time"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    /// Whole epoch seconds, when the call carries a numeric timestamp.
    pub fn created_at(&self) -> Option<i64> {
        match self.fields.get("created_at") {
            Some(Value::Number(n)) => epoch_secs(n),
            _ => None,
        }
    }

    fn str_field(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

/// A display-ready chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMessage {
    pub role: MessageRole,
    pub content: String,
    /// Never `Some(vec![])`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub videos: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_audio: Option<Value>,
    /// Epoch seconds, exactly as sent by the service (fractions included).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Number>,
}

/// One entry of an agent's session list, passed through as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Content helpers
// ---------------------------------------------------------------------------

/// Render any JSON value as display text.
///
/// Strings are returned as-is; `null` becomes empty; everything else is its
/// compact JSON form.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Join the `text` of every `type == "text"` part with a single space.
///
/// Parts of any other type, and non-object entries, are skipped. A text part
/// without a `text` field contributes an empty segment.
pub fn flatten_text_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .filter_map(Value::as_object)
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
        .map(|part| part.get("text").map(value_to_text).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole epoch seconds for a JSON timestamp; fractions are floored.
pub fn epoch_secs(n: &Number) -> Option<i64> {
    n.as_i64()
        .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => None,
        Some(value) => Some(value_to_text(&value)),
    })
}

/// Numbers pass through untouched; anything else is dropped.
fn lenient_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Number>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => Some(n),
        _ => None,
    })
}

/// A run list that is not an array is treated as absent.
fn lenient_runs<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<RawRun>>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value::<RawRun>(item).map_err(serde::de::Error::custom))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        _ => Ok(None),
    }
}

fn lenient_memory<'de, D: Deserializer<'de>>(d: D) -> Result<Option<RawMemory>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        Some(value @ Value::Object(_)) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Tool entries that are not objects are skipped.
fn lenient_tool_calls<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Vec<ToolCall>>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(ToolCall::verbatim(map)),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reasoning(value: Value) -> ReasoningMessage {
        serde_json::from_value(value).expect("parse reasoning message")
    }

    #[test]
    fn promoted_call_fills_every_field() {
        let msg = reasoning(json!({"role": "tool", "content": "42"}));
        let call = ToolCall::with_defaults(&msg, 1_700_000_000);

        assert_eq!(call.role(), "tool");
        assert_eq!(call.content_text(), "42");
        assert_eq!(call.tool_call_id(), "");
        assert_eq!(call.tool_name(), "");
        assert_eq!(call.tool_args(), Some(&json!({})));
        assert!(!call.tool_call_error());
        assert_eq!(call.get("metrics"), Some(&json!({"time": 0})));
        assert_eq!(call.created_at(), Some(1_700_000_000));
    }

    #[test]
    fn promoted_call_keeps_present_fields_in_fixed_order() {
        let msg = reasoning(json!({
            "stop_after_tool_call": false,
            "created_at": 17,
            "metrics": {"time": 1.5, "tokens": 12},
            "tool_call_error": true,
            "tool_args": {"q": "rust"},
            "tool_name": "search",
            "tool_call_id": "call_1",
            "content": null,
            "role": "tool"
        }));
        let call = ToolCall::with_defaults(&msg, 99);

        assert_eq!(call.content(), Some(&Value::Null));
        assert_eq!(call.tool_call_id(), "call_1");
        assert_eq!(call.tool_args(), Some(&json!({"q": "rust"})));
        assert!(call.tool_call_error());
        assert_eq!(call.metrics_time(), 1.5);
        assert_eq!(call.created_at(), Some(17));
        assert_eq!(call.get("stop_after_tool_call"), None);
        assert_eq!(
            serde_json::to_string(&call).expect("serialize"),
            concat!(
                r#"{"role":"tool","content":null,"tool_call_id":"call_1","tool_name":"search","#,
                r#""tool_args":{"q":"rust"},"tool_call_error":true,"#,
                r#""metrics":{"time":1.5,"tokens":12},"created_at":17}"#
            )
        );
    }

    #[test]
    fn verbatim_call_is_left_untouched() {
        let source = r#"{"tool_name":"t","tool_args":"{\"q\":1}","content":null,"zeta":1,"alpha":2}"#;
        let call: ToolCall = serde_json::from_str(source).expect("parse tool call");

        assert_eq!(call.tool_args(), Some(&json!("{\"q\":1}")));
        assert_eq!(call.created_at(), None);
        assert_eq!(call.content(), Some(&Value::Null));
        assert_eq!(serde_json::to_string(&call).expect("serialize"), source);
    }

    #[test]
    fn accessors_degrade_on_wrong_types() {
        let call: ToolCall = serde_json::from_value(json!({
            "tool_name": 12,
            "tool_call_error": "yes",
            "metrics": 3,
            "created_at": "later"
        }))
        .expect("parse tool call");
        assert_eq!(call.tool_name(), "");
        assert!(!call.tool_call_error());
        assert_eq!(call.metrics_time(), 0.0);
        assert_eq!(call.created_at(), None);
        assert_eq!(call.get("tool_name"), Some(&json!(12)));
    }

    #[test]
    fn flatten_keeps_only_text_parts() {
        let parts = vec![
            json!({"type": "text", "text": "a"}),
            json!({"type": "image", "url": "http://x/y.png"}),
            json!("stray"),
            json!({"type": "text", "text": "b"}),
        ];
        assert_eq!(flatten_text_parts(&parts), "a b");
    }

    #[test]
    fn value_to_text_renders_structures_as_json() {
        assert_eq!(value_to_text(&json!("plain")), "plain");
        assert_eq!(value_to_text(&Value::Null), "");
        assert_eq!(value_to_text(&json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn value_to_text_keeps_source_key_order() {
        let value: Value =
            serde_json::from_str(r#"{"type":"text","answer":"x"}"#).expect("parse");
        assert_eq!(value_to_text(&value), r#"{"type":"text","answer":"x"}"#);
    }

    #[test]
    fn lenient_fields_tolerate_wrong_types() {
        let record: RawSessionRecord = serde_json::from_value(json!({
            "session_id": 7,
            "runs": "not-a-list",
            "memory": [],
        }))
        .expect("lenient parse");
        assert_eq!(record.session_id.as_deref(), Some("7"));
        assert!(record.runs.is_none());
        assert!(record.memory.is_none());

        let msg: RawMessage =
            serde_json::from_value(json!({"created_at": "yesterday"})).expect("parse message");
        assert_eq!(msg.created_at, None);
    }

    #[test]
    fn fractional_timestamps_pass_through() {
        let msg: RawMessage =
            serde_json::from_value(json!({"created_at": 12.9})).expect("parse message");
        let created_at = msg.created_at.expect("timestamp kept");
        assert_eq!(created_at.as_f64(), Some(12.9));
        assert_eq!(epoch_secs(&created_at), Some(12));
    }

    #[test]
    fn canonical_message_omits_absent_fields() {
        let msg = CanonicalMessage {
            role: MessageRole::User,
            content: "hi".to_string(),
            tool_calls: None,
            extra_data: None,
            images: None,
            videos: None,
            audio: None,
            response_audio: None,
            created_at: Some(Number::from(1)),
        };
        assert_eq!(
            serde_json::to_value(&msg).expect("serialize"),
            json!({"role": "user", "content": "hi", "created_at": 1})
        );
    }
}
