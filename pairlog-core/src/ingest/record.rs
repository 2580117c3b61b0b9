//! Raw JSONL record types (serde deserialization)
//!
//! Each session log line is one JSON object discriminated by its `type` tag.
//! The tag is matched exhaustively: a line whose tag is not listed here fails
//! to decode and is skipped by the normalizer.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub(crate) enum RawRecord {
    User(MessageRecord),
    Assistant(MessageRecord),
    System(SystemRecord),
    Commit(CommitRecord),
    Summary(IgnoredRecord),
    FileHistorySnapshot(IgnoredRecord),
}

/// Fields shared by `user` and `assistant` records.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct MessageRecord {
    pub uuid: Option<String>,
    pub session_id: Option<String>,
    pub timestamp: Option<String>,
    pub git_branch: Option<String>,
    pub is_compact_summary: bool,
    pub is_meta: bool,
    pub message: Option<RawMessage>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct RawMessage {
    pub model: Option<String>,
    pub content: Option<RawContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },
    // thinking, image, and anything newer
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct SystemRecord {
    pub uuid: Option<String>,
    pub session_id: Option<String>,
    pub timestamp: Option<String>,
    pub git_branch: Option<String>,
    pub subtype: Option<String>,
    pub content: Option<String>,
}

/// A version-control log entry merged into the session stream.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CommitRecord {
    pub uuid: Option<String>,
    pub session_id: Option<String>,
    pub timestamp: Option<String>,
    pub sha: Option<String>,
    pub message: Option<String>,
    pub branch: Option<String>,
}

/// Records that never produce events.
#[derive(Debug, Deserialize)]
pub(crate) struct IgnoredRecord {}

impl RawContent {
    /// Plain text blocks joined with newlines.
    pub fn text(&self) -> String {
        match self {
            RawContent::Text(s) => s.clone(),
            RawContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            RawContent::Text(_) => &[],
            RawContent::Blocks(blocks) => blocks,
        }
    }
}

/// Flatten a tool result payload (string or list of text blocks) to text.
pub(crate) fn tool_result_text(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
