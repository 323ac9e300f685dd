//! Raw session record → canonical message list.
//!
//! Normalization runs in three steps:
//!
//! 1. [`classify`] picks exactly one run list from the record
//!    ([`SessionShape`]). Lists are never merged across layouts.
//! 2. Each run yields an optional user message followed by an optional agent
//!    message. Agent messages collect tool calls from `response.tools` and,
//!    for the legacy `memory` layouts only, from tool-role reasoning
//!    messages.
//! 3. User content given as typed parts is flattened to the space-joined
//!    text of its `text` parts.
//!
//! Everything here is pure; the caller supplies "now" for tool-call
//! timestamp defaults.

use serde_json::{Number, Value};
use tracing::{debug, trace};

use crate::model::{
    CanonicalMessage, MessageRole, RawResponse, RawRun, RawSessionRecord, ReasoningMessage,
    ToolCall, flatten_text_parts, value_to_text,
};

/// Key under `response.extra_data` holding the reasoning trace.
const REASONING_MESSAGES_KEY: &str = "reasoning_messages";

// ---------------------------------------------------------------------------
// Shape classification
// ---------------------------------------------------------------------------

/// The run list a record is read from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionShape<'a> {
    /// Root-level `runs`.
    RunsRoot(&'a [RawRun]),
    /// Legacy `memory.runs`.
    MemoryRuns(&'a [RawRun]),
    /// Legacy `memory.chats`.
    MemoryChats(&'a [RawRun]),
    Empty,
}

impl<'a> SessionShape<'a> {
    pub fn runs(&self) -> &'a [RawRun] {
        match *self {
            SessionShape::RunsRoot(runs)
            | SessionShape::MemoryRuns(runs)
            | SessionShape::MemoryChats(runs) => runs,
            SessionShape::Empty => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionShape::RunsRoot(_) => "runs",
            SessionShape::MemoryRuns(_) => "memory.runs",
            SessionShape::MemoryChats(_) => "memory.chats",
            SessionShape::Empty => "empty",
        }
    }

    /// Only the legacy layouts keep tool calls inside the reasoning trace.
    fn promotes_reasoning_tools(&self) -> bool {
        matches!(
            self,
            SessionShape::MemoryRuns(_) | SessionShape::MemoryChats(_)
        )
    }
}

/// Pick the authoritative run list.
///
/// Precedence: non-empty root `runs`, then non-empty `memory.runs`, then
/// non-empty `memory.chats`.
pub fn classify(record: &RawSessionRecord) -> SessionShape<'_> {
    fn non_empty(runs: Option<&Vec<RawRun>>) -> Option<&[RawRun]> {
        runs.map(Vec::as_slice).filter(|r| !r.is_empty())
    }

    if let Some(runs) = non_empty(record.runs.as_ref()) {
        return SessionShape::RunsRoot(runs);
    }
    let Some(memory) = record.memory.as_ref() else {
        return SessionShape::Empty;
    };
    if let Some(runs) = non_empty(memory.runs.as_ref()) {
        return SessionShape::MemoryRuns(runs);
    }
    if let Some(chats) = non_empty(memory.chats.as_ref()) {
        return SessionShape::MemoryChats(chats);
    }
    SessionShape::Empty
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Message body before flattening.
#[derive(Debug, Clone, PartialEq)]
enum MessageContent {
    Text(String),
    Parts(Vec<Value>),
}

impl MessageContent {
    fn flatten(self) -> String {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Parts(parts) => flatten_text_parts(&parts),
        }
    }
}

#[derive(Debug)]
struct ExtractedMessage {
    role: MessageRole,
    content: MessageContent,
    tool_calls: Option<Vec<ToolCall>>,
    media: Media,
    created_at: Option<Number>,
}

#[derive(Debug, Default)]
struct Media {
    extra_data: Option<Value>,
    images: Option<Value>,
    videos: Option<Value>,
    audio: Option<Value>,
    response_audio: Option<Value>,
}

fn user_content(content: Option<&Value>) -> MessageContent {
    match content {
        Some(Value::Array(parts)) => MessageContent::Parts(parts.clone()),
        Some(other) => MessageContent::Text(value_to_text(other)),
        None => MessageContent::Text(String::new()),
    }
}

fn extract_run(run: &RawRun, shape: &SessionShape<'_>, now: i64) -> Vec<ExtractedMessage> {
    let mut out = Vec::with_capacity(2);

    if let Some(message) = &run.message {
        out.push(ExtractedMessage {
            role: MessageRole::User,
            content: user_content(message.content.as_ref()),
            tool_calls: None,
            media: Media::default(),
            created_at: message.created_at.clone(),
        });
    }

    if let Some(response) = &run.response {
        let tool_calls = collect_tool_calls(response, shape.promotes_reasoning_tools(), now);
        out.push(ExtractedMessage {
            role: MessageRole::Agent,
            content: MessageContent::Text(
                response.content.as_ref().map(value_to_text).unwrap_or_default(),
            ),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            media: Media {
                extra_data: response.extra_data.clone(),
                images: response.images.clone(),
                videos: response.videos.clone(),
                audio: response.audio.clone(),
                response_audio: response.response_audio.clone(),
            },
            created_at: response.created_at.clone(),
        });
    }

    out
}

/// `response.tools` as sent, then (optionally) promoted reasoning messages.
fn collect_tool_calls(response: &RawResponse, promote_reasoning: bool, now: i64) -> Vec<ToolCall> {
    let mut calls: Vec<ToolCall> = response.tools.iter().flatten().cloned().collect();

    if promote_reasoning {
        calls.extend(reasoning_tool_calls(response.extra_data.as_ref(), now));
    }
    calls
}

fn reasoning_tool_calls(extra_data: Option<&Value>, now: i64) -> Vec<ToolCall> {
    let Some(entries) = extra_data
        .and_then(|extra| extra.get(REASONING_MESSAGES_KEY))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(fields) => Some(ReasoningMessage::new(fields.clone())),
            other => {
                trace!(kind = json_kind(other), "skipping non-object reasoning message");
                None
            }
        })
        .filter(ReasoningMessage::is_tool)
        .map(|msg| ToolCall::with_defaults(&msg, now))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn finalize(msg: ExtractedMessage) -> CanonicalMessage {
    CanonicalMessage {
        role: msg.role,
        content: msg.content.flatten(),
        tool_calls: msg.tool_calls,
        extra_data: msg.media.extra_data,
        images: msg.media.images,
        videos: msg.media.videos,
        audio: msg.media.audio,
        response_audio: msg.media.response_audio,
        created_at: msg.created_at,
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Current time as whole epoch seconds.
pub fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Normalize a parsed record. `now` stamps promoted reasoning tool calls
/// that lack `created_at`.
pub fn normalize_record(record: &RawSessionRecord, now: i64) -> Vec<CanonicalMessage> {
    let shape = classify(record);
    debug!(
        shape = shape.name(),
        runs = shape.runs().len(),
        "classified session record"
    );

    let messages: Vec<CanonicalMessage> = shape
        .runs()
        .iter()
        .flat_map(|run| extract_run(run, &shape, now))
        .map(finalize)
        .collect();

    debug!(messages = messages.len(), "normalized session record");
    messages
}

/// Parse a raw JSON payload and normalize it.
pub fn normalize_value(
    value: Value,
    now: i64,
) -> Result<Vec<CanonicalMessage>, serde_json::Error> {
    let record: RawSessionRecord = serde_json::from_value(value)?;
    Ok(normalize_record(&record, now))
}
