//! Core domain types for pairlog
//!
//! These types are the canonical data model that every analysis reads.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | One atomic happening in a session (prompt, tool call, commit, ...) |
//! | **Session** | Ordered events sharing one session id (see [`crate::session`]) |
//! | **Correction** | A logged record of the human reversing an assistant action |
//! | **Pattern** | A cluster of similar past corrections |
//!
//! Events are produced once by the normalizer and never mutated afterwards.
//! Corrections accumulate in an append-only log; patterns are a derived view
//! recomputed from that log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Events
// ============================================

/// Type tag of an event.
///
/// One event may carry more than one tag: a prompt can also be a
/// correction, and a tool call can also be a sub-agent spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Prompt,
    AssistantResponse,
    ToolCall,
    SubAgentSpawn,
    Correction,
    Compaction,
    Error,
    Commit,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Prompt => "prompt",
            EventType::AssistantResponse => "assistant_response",
            EventType::ToolCall => "tool_call",
            EventType::SubAgentSpawn => "sub_agent_spawn",
            EventType::Correction => "correction",
            EventType::Compaction => "compaction",
            EventType::Error => "error",
            EventType::Commit => "commit",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prompt" => Ok(EventType::Prompt),
            "assistant_response" => Ok(EventType::AssistantResponse),
            "tool_call" => Ok(EventType::ToolCall),
            "sub_agent_spawn" => Ok(EventType::SubAgentSpawn),
            "correction" => Ok(EventType::Correction),
            "compaction" => Ok(EventType::Compaction),
            "error" => Ok(EventType::Error),
            "commit" => Ok(EventType::Commit),
            _ => Err(format!("unknown event type: {}", s)),
        }
    }
}

/// Payload of an event, one variant per primary type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Human-authored message
    Prompt {
        /// Set when the prompt reverses the preceding assistant turn
        correction: bool,
    },
    /// Assistant-authored text
    AssistantResponse,
    /// Assistant-authored structured tool invocation
    ToolCall {
        tool: String,
        input: serde_json::Value,
        /// Set when the tool dispatches a sub-agent
        sub_agent: bool,
    },
    /// Context compression marker
    Compaction,
    /// Failed tool result
    Error,
    /// Version-control commit
    Commit { sha: Option<String> },
}

impl EventKind {
    /// The primary type tag of this payload.
    pub fn primary_type(&self) -> EventType {
        match self {
            EventKind::Prompt { .. } => EventType::Prompt,
            EventKind::AssistantResponse => EventType::AssistantResponse,
            EventKind::ToolCall { .. } => EventType::ToolCall,
            EventKind::Compaction => EventType::Compaction,
            EventKind::Error => EventType::Error,
            EventKind::Commit { .. } => EventType::Commit,
        }
    }
}

/// One immutable record of something that happened during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Record uuid from the log, or `{session_id}:{line}` when absent
    pub id: String,
    /// Typed payload
    pub kind: EventKind,
    /// Text payload (prompt text, response text, command, commit message)
    pub content: String,
    /// `None` when the log line carried no parseable timestamp
    pub timestamp: Option<DateTime<Utc>>,
    pub session_id: String,
    /// Project path or identifier
    pub project: String,
    /// Human-friendly project name
    pub project_name: String,
    pub branch: Option<String>,

    // Lineage
    pub source_file: String,
    /// 1-based line number within `source_file`
    pub source_line: usize,

    /// Model name, tool name, and other recognized extras
    pub metadata: serde_json::Value,
}

impl Event {
    /// All type tags carried by this event, primary tag first.
    pub fn types(&self) -> Vec<EventType> {
        let mut types = vec![self.kind.primary_type()];
        match &self.kind {
            EventKind::Prompt { correction: true } => types.push(EventType::Correction),
            EventKind::ToolCall {
                sub_agent: true, ..
            } => types.push(EventType::SubAgentSpawn),
            _ => {}
        }
        types
    }

    /// Check whether this event carries the given type tag.
    pub fn is(&self, event_type: EventType) -> bool {
        match event_type {
            EventType::Correction => matches!(self.kind, EventKind::Prompt { correction: true }),
            EventType::SubAgentSpawn => matches!(
                self.kind,
                EventKind::ToolCall {
                    sub_agent: true,
                    ..
                }
            ),
            other => self.kind.primary_type() == other,
        }
    }

    /// Whether the assistant authored this event.
    pub fn is_assistant_activity(&self) -> bool {
        matches!(
            self.kind,
            EventKind::AssistantResponse | EventKind::ToolCall { .. }
        )
    }

    /// Tool name for tool calls.
    pub fn tool_name(&self) -> Option<&str> {
        match &self.kind {
            EventKind::ToolCall { tool, .. } => Some(tool.as_str()),
            _ => None,
        }
    }

    /// Tool input for tool calls.
    pub fn tool_input(&self) -> Option<&serde_json::Value> {
        match &self.kind {
            EventKind::ToolCall { input, .. } => Some(input),
            _ => None,
        }
    }

    /// Content truncated to `max_chars` characters for display.
    pub fn preview(&self, max_chars: usize) -> String {
        crate::text::truncate_chars(&self.content, max_chars)
    }
}

// ============================================
// Corrections
// ============================================

/// Why the assistant had to be corrected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionCategory {
    VaguePrompt,
    StaleContext,
    WrongAssumption,
    WrongFile,
    WrongScope,
    #[default]
    Other,
}

impl CorrectionCategory {
    /// All categories in declaration order.
    pub const ALL: [CorrectionCategory; 6] = [
        CorrectionCategory::VaguePrompt,
        CorrectionCategory::StaleContext,
        CorrectionCategory::WrongAssumption,
        CorrectionCategory::WrongFile,
        CorrectionCategory::WrongScope,
        CorrectionCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionCategory::VaguePrompt => "vague_prompt",
            CorrectionCategory::StaleContext => "stale_context",
            CorrectionCategory::WrongAssumption => "wrong_assumption",
            CorrectionCategory::WrongFile => "wrong_file",
            CorrectionCategory::WrongScope => "wrong_scope",
            CorrectionCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for CorrectionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CorrectionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vague_prompt" => Ok(CorrectionCategory::VaguePrompt),
            "stale_context" => Ok(CorrectionCategory::StaleContext),
            "wrong_assumption" => Ok(CorrectionCategory::WrongAssumption),
            "wrong_file" => Ok(CorrectionCategory::WrongFile),
            "wrong_scope" => Ok(CorrectionCategory::WrongScope),
            "other" => Ok(CorrectionCategory::Other),
            _ => Err(format!("unknown correction category: {}", s)),
        }
    }
}

/// A correction as submitted by a caller, before validation.
///
/// Fields are optional so a partially-filled entry can be rejected with a
/// reason instead of failing to deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCorrection {
    pub what_user_said: Option<String>,
    pub what_you_did_wrong: Option<String>,
    pub root_cause: Option<String>,
    pub category: Option<String>,
}

/// One entry of the append-only correction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    /// Unique identifier (uuid v4)
    pub id: String,
    /// Project the correction was logged against
    pub project: String,
    pub what_user_said: String,
    pub what_you_did_wrong: String,
    pub root_cause: String,
    pub category: CorrectionCategory,
    pub logged_at: DateTime<Utc>,
}

impl Correction {
    /// All free text of the correction, used for keyword extraction.
    pub fn text(&self) -> String {
        format!(
            "{} {} {}",
            self.what_user_said, self.what_you_did_wrong, self.root_cause
        )
    }
}

// ============================================
// Patterns
// ============================================

/// A recurring mistake: a cluster of two or more similar corrections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    /// Digest of the sorted member correction ids
    pub id: String,
    /// Human-readable description
    pub pattern: String,
    /// Top keywords by in-cluster frequency (at most 8)
    pub keywords: Vec<String>,
    /// Number of corrections in the cluster
    pub frequency: usize,
    /// Latest `logged_at` in the cluster
    pub last_seen: DateTime<Utc>,
    /// Longest correction text in the cluster, truncated
    pub context: String,
    /// Up to three verbatim user messages
    pub examples: Vec<String>,
    /// Most common category among members
    pub category: CorrectionCategory,
}
