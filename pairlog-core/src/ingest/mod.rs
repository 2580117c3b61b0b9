//! Event normalizer: raw session logs → canonical [`Event`]s
//!
//! Session logs are JSONL, one record per line. Each line yields zero or one
//! event. Lines that are not JSON, or whose `type` tag is not recognized, are
//! skipped and reported in [`NormalizeReport`]; they never abort the session.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pairlog_core::ingest::{self, DirectoryLogSource, LogSource};
//! use pairlog_core::Config;
//!
//! let config = Config::load()?;
//! let source = DirectoryLogSource::new(root, &config.ingest.session_glob);
//! for path in source.session_files()? {
//!     let report = ingest::normalize_file(&path, &config.ingest)?;
//!     println!("{} events, {} skipped", report.events.len(), report.skipped);
//! }
//! ```

mod record;

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::types::{Event, EventKind};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use record::{tool_result_text, CommitRecord, ContentBlock, MessageRecord, RawRecord, SystemRecord};
use regex::Regex;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Tools that dispatch a sub-agent.
pub const SUB_AGENT_TOOLS: &[&str] = &["Task", "Agent", "dispatch_agent"];

/// Negation cues that mark a prompt following assistant activity as a correction.
static CORRECTION_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:no|wrong|not that|i meant|actually|instead|undo|revert)\b")
        .expect("correction cue regex is valid")
});

/// Identity of the session a batch of lines belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSource {
    /// Fallback session id for records that carry none
    pub session_id: String,
    pub project: String,
    pub project_name: String,
    pub source_file: String,
}

impl SessionSource {
    pub fn new(
        session_id: impl Into<String>,
        project: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        let session_id = session_id.into();
        Self {
            source_file: format!("{}.jsonl", session_id),
            session_id,
            project: project.into(),
            project_name: project_name.into(),
        }
    }

    /// Derive the session identity from a log path.
    ///
    /// Logs live at `<root>/<encoded-project>/<session-id>.jsonl`, where the
    /// project directory is the working directory with `/` replaced by `-`.
    /// The encoding loses the original separators, so `project_name` is only
    /// the last `-` segment; use [`crate::Session::belongs_to`] to match
    /// hyphenated names.
    pub fn from_path(path: &Path) -> Self {
        let session_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let project = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let project_name = project
            .rsplit('-')
            .find(|s| !s.is_empty())
            .unwrap_or(&project)
            .to_string();

        Self {
            session_id,
            project,
            project_name,
            source_file: path.to_string_lossy().to_string(),
        }
    }
}

/// Outcome of normalizing one session's lines.
#[derive(Debug, Default)]
pub struct NormalizeReport {
    /// Events in log order
    pub events: Vec<Event>,
    /// Lines that could not be decoded
    pub skipped: usize,
    /// One message per skipped line
    pub warnings: Vec<String>,
}

// ============================================
// Line-level normalization
// ============================================

/// Incremental normalizer fed one line at a time.
struct Normalizer<'a> {
    source: &'a SessionSource,
    report: NormalizeReport,
    /// Whether the last emitted event, ignoring failed tool results, was
    /// authored by the assistant
    after_assistant: bool,
}

impl<'a> Normalizer<'a> {
    fn new(source: &'a SessionSource) -> Self {
        Self {
            source,
            report: NormalizeReport::default(),
            after_assistant: false,
        }
    }

    fn skip(&mut self, line_no: usize, message: String) {
        tracing::warn!(
            source_file = %self.source.source_file,
            line = line_no,
            "{}",
            message
        );
        self.report.skipped += 1;
        self.report.warnings.push(format!("line {}: {}", line_no, message));
    }

    fn feed(&mut self, line_no: usize, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                self.skip(line_no, format!("malformed JSON: {}", e));
                return;
            }
        };

        let record = match RawRecord::deserialize(&value) {
            Ok(r) => r,
            Err(e) => {
                let tag = value.get("type").and_then(|t| t.as_str()).unwrap_or("<none>");
                self.skip(line_no, format!("unrecognized record type {:?}: {}", tag, e));
                return;
            }
        };

        if let Some(event) = self.convert(line_no, record) {
            // A failed tool result answers the assistant's call; the turn is
            // still the assistant's until the user writes.
            if !matches!(event.kind, EventKind::Error) {
                self.after_assistant = event.is_assistant_activity();
            }
            self.report.events.push(event);
        }
    }

    fn convert(&self, line_no: usize, record: RawRecord) -> Option<Event> {
        match record {
            RawRecord::User(rec) => self.convert_user(line_no, rec),
            RawRecord::Assistant(rec) => self.convert_assistant(line_no, rec),
            RawRecord::System(rec) => self.convert_system(line_no, rec),
            RawRecord::Commit(rec) => Some(self.convert_commit(line_no, rec)),
            RawRecord::Summary(_) | RawRecord::FileHistorySnapshot(_) => None,
        }
    }

    fn convert_user(&self, line_no: usize, rec: MessageRecord) -> Option<Event> {
        if rec.is_meta {
            return None;
        }
        let content = rec.message.as_ref()?.content.as_ref()?;
        let header = Header::from_message(&rec);

        if rec.is_compact_summary {
            return Some(self.event(line_no, header, EventKind::Compaction, content.text()));
        }

        let failed = content.blocks().iter().find_map(|b| match b {
            ContentBlock::ToolResult {
                content,
                is_error: true,
            } => Some(tool_result_text(content)),
            _ => None,
        });
        if let Some(error_text) = failed {
            return Some(self.event(line_no, header, EventKind::Error, error_text));
        }

        let text = content.text();
        if text.trim().is_empty() {
            // Successful tool results and empty messages carry no event
            return None;
        }

        let correction = self.after_assistant && CORRECTION_CUE.is_match(&text);
        Some(self.event(line_no, header, EventKind::Prompt { correction }, text))
    }

    /// One event per assistant record. A record holding both text and tool
    /// uses becomes a single `tool_call` and its text is dropped, so such
    /// turns do not count as assistant messages (the denominator of the
    /// Error Recovery correction rate).
    fn convert_assistant(&self, line_no: usize, rec: MessageRecord) -> Option<Event> {
        let message = rec.message.as_ref()?;
        let content = message.content.as_ref()?;
        let mut header = Header::from_message(&rec);
        if let Some(model) = &message.model {
            header.metadata.insert("model".into(), model.clone().into());
        }

        let mut tool_uses = content.blocks().iter().filter_map(|b| match b {
            ContentBlock::ToolUse { id, name, input } => Some((id, name, input)),
            _ => None,
        });

        if let Some((id, name, input)) = tool_uses.next() {
            header.metadata.insert("tool_name".into(), name.clone().into());
            if let Some(id) = id {
                header.metadata.insert("tool_use_id".into(), id.clone().into());
            }
            let extra = tool_uses.count();
            if extra > 0 {
                header
                    .metadata
                    .insert("additional_tool_calls".into(), extra.into());
            }
            let kind = EventKind::ToolCall {
                tool: name.clone(),
                input: input.clone(),
                sub_agent: SUB_AGENT_TOOLS.contains(&name.as_str()),
            };
            return Some(self.event(line_no, header, kind, tool_call_content(input)));
        }

        let text = content.text();
        if text.trim().is_empty() {
            return None;
        }
        Some(self.event(line_no, header, EventKind::AssistantResponse, text))
    }

    fn convert_system(&self, line_no: usize, rec: SystemRecord) -> Option<Event> {
        if rec.subtype.as_deref() != Some("compact_boundary") {
            return None;
        }
        let header = Header {
            uuid: rec.uuid,
            session_id: rec.session_id,
            timestamp: rec.timestamp,
            branch: rec.git_branch,
            metadata: serde_json::Map::new(),
        };
        Some(self.event(
            line_no,
            header,
            EventKind::Compaction,
            rec.content.unwrap_or_default(),
        ))
    }

    fn convert_commit(&self, line_no: usize, rec: CommitRecord) -> Event {
        let header = Header {
            uuid: rec.uuid,
            session_id: rec.session_id,
            timestamp: rec.timestamp,
            branch: rec.branch,
            metadata: serde_json::Map::new(),
        };
        self.event(
            line_no,
            header,
            EventKind::Commit { sha: rec.sha },
            rec.message.unwrap_or_default(),
        )
    }

    fn event(&self, line_no: usize, header: Header, kind: EventKind, content: String) -> Event {
        let session_id = header
            .session_id
            .unwrap_or_else(|| self.source.session_id.clone());
        Event {
            id: header
                .uuid
                .unwrap_or_else(|| format!("{}:{}", session_id, line_no)),
            kind,
            content,
            timestamp: header.timestamp.as_deref().and_then(parse_timestamp),
            session_id,
            project: self.source.project.clone(),
            project_name: self.source.project_name.clone(),
            branch: header.branch,
            source_file: self.source.source_file.clone(),
            source_line: line_no,
            metadata: serde_json::Value::Object(header.metadata),
        }
    }

    fn finish(self) -> NormalizeReport {
        tracing::debug!(
            source_file = %self.source.source_file,
            events = self.report.events.len(),
            skipped = self.report.skipped,
            "Normalized session"
        );
        self.report
    }
}

/// Common record fields lifted out before building an event.
struct Header {
    uuid: Option<String>,
    session_id: Option<String>,
    timestamp: Option<String>,
    branch: Option<String>,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl Header {
    fn from_message(rec: &MessageRecord) -> Self {
        Self {
            uuid: rec.uuid.clone(),
            session_id: rec.session_id.clone(),
            timestamp: rec.timestamp.clone(),
            branch: rec.git_branch.clone(),
            metadata: serde_json::Map::new(),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Short text payload for a tool call: the most descriptive input field.
fn tool_call_content(input: &serde_json::Value) -> String {
    const FIELDS: [&str; 7] = [
        "prompt",
        "command",
        "file_path",
        "notebook_path",
        "path",
        "pattern",
        "url",
    ];
    FIELDS
        .iter()
        .find_map(|f| input.get(f).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| match input {
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
}

// ============================================
// Entry points
// ============================================

/// Normalize already-materialized lines of one session.
pub fn normalize_lines<I, S>(lines: I, source: &SessionSource) -> NormalizeReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalizer = Normalizer::new(source);
    for (idx, line) in lines.into_iter().enumerate() {
        normalizer.feed(idx + 1, line.as_ref());
    }
    normalizer.finish()
}

/// Normalize a session by streaming lines from a reader.
///
/// Lines that are not valid UTF-8 are skipped like any other malformed line.
/// Only read failures are errors.
pub fn normalize_reader<R: BufRead>(reader: R, source: &SessionSource) -> Result<NormalizeReport> {
    let mut normalizer = Normalizer::new(source);
    for (idx, chunk) in reader.split(b'\n').enumerate() {
        let bytes = chunk?;
        match std::str::from_utf8(&bytes) {
            Ok(line) => normalizer.feed(idx + 1, line),
            Err(e) => normalizer.skip(idx + 1, format!("invalid UTF-8: {}", e)),
        }
    }
    Ok(normalizer.finish())
}

/// Normalize one session log file.
///
/// Files above `config.stream_threshold_bytes` are streamed through a
/// [`BufReader`]; smaller files are read in one go.
pub fn normalize_file(path: &Path, config: &IngestConfig) -> Result<NormalizeReport> {
    let source = SessionSource::from_path(path);
    let size = std::fs::metadata(path)?.len();

    if size > config.stream_threshold_bytes {
        tracing::debug!(path = %path.display(), size, "Streaming large session log");
        let file = File::open(path)?;
        return normalize_reader(BufReader::new(file), &source);
    }

    let bytes = std::fs::read(path)?;
    normalize_reader(bytes.as_slice(), &source)
}

// ============================================
// Log sources
// ============================================

/// Supplies the session log files to analyze.
pub trait LogSource {
    /// Paths of all session logs, in a stable order.
    fn session_files(&self) -> Result<Vec<PathBuf>>;
}

/// Session logs found under a directory by glob pattern.
#[derive(Debug, Clone)]
pub struct DirectoryLogSource {
    root: PathBuf,
    pattern: String,
}

impl DirectoryLogSource {
    pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            pattern: pattern.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LogSource for DirectoryLogSource {
    fn session_files(&self) -> Result<Vec<PathBuf>> {
        let full_pattern = self.root.join(&self.pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let entries = glob::glob(&pattern_str).map_err(|e| Error::Parse {
            source_file: self.root.display().to_string(),
            message: format!("invalid glob pattern: {}", e),
        })?;

        let mut files: Vec<PathBuf> = entries.flatten().filter(|p| p.is_file()).collect();
        files.sort();
        tracing::debug!(root = %self.root.display(), count = files.len(), "Discovered session logs");
        Ok(files)
    }
}

/// Normalize every session log a source provides.
///
/// A file that cannot be read is logged and left out; the rest still load.
pub fn normalize_all(source: &dyn LogSource, config: &IngestConfig) -> Result<Vec<NormalizeReport>> {
    let mut reports = Vec::new();
    for path in source.session_files()? {
        match normalize_file(&path, config) {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read session log");
            }
        }
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventType;
    use std::io::Write;

    fn source() -> SessionSource {
        SessionSource::new("s1", "/home/dev/shop", "shop")
    }

    fn user(uuid: &str, text: &str) -> String {
        serde_json::json!({
            "type": "user",
            "uuid": uuid,
            "sessionId": "s1",
            "timestamp": "2025-01-10T10:00:00Z",
            "message": {"role": "user", "content": text}
        })
        .to_string()
    }

    fn assistant_text(uuid: &str, text: &str) -> String {
        serde_json::json!({
            "type": "assistant",
            "uuid": uuid,
            "sessionId": "s1",
            "timestamp": "2025-01-10T10:01:00Z",
            "message": {"model": "claude", "content": [{"type": "text", "text": text}]}
        })
        .to_string()
    }

    fn assistant_tool(uuid: &str, name: &str, input: serde_json::Value) -> String {
        serde_json::json!({
            "type": "assistant",
            "uuid": uuid,
            "sessionId": "s1",
            "timestamp": "2025-01-10T10:02:00Z",
            "message": {"content": [{"type": "tool_use", "id": "t", "name": name, "input": input}]}
        })
        .to_string()
    }

    #[test]
    fn test_five_event_correction_scenario() {
        let lines = vec![
            user("e1", "fix the tests"),
            assistant_tool("e2", "Bash", serde_json::json!({"command": "cargo test"})),
            assistant_text("e3", "All tests pass now."),
            user("e4", "no, the auth test"),
            assistant_tool("e5", "Read", serde_json::json!({"file_path": "tests/auth.rs"})),
        ];
        let report = normalize_lines(&lines, &source());

        assert_eq!(report.skipped, 0);
        assert_eq!(report.events.len(), 5);
        let fourth = &report.events[3];
        assert!(fourth.is(EventType::Prompt));
        assert!(fourth.is(EventType::Correction));
        assert!(!report.events[0].is(EventType::Correction));
        assert_eq!(report.events[4].content, "tests/auth.rs");
    }

    #[test]
    fn test_correction_requires_preceding_assistant_turn() {
        let lines = vec![user("a", "hello"), user("b", "no, actually do the other thing")];
        let report = normalize_lines(&lines, &source());
        assert!(!report.events[1].is(EventType::Correction));
    }

    #[test]
    fn test_correction_after_failed_tool_result() {
        let failed = r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t","content":"The user rejected this edit","is_error":true}]}}"#;
        let lines = vec![
            user("a", "rename the config loader"),
            assistant_tool("b", "Edit", serde_json::json!({"file_path": "src/main.rs"})),
            failed.to_string(),
            user("d", "no, wrong file, edit src/config.rs instead"),
        ];
        let report = normalize_lines(&lines, &source());

        let types: Vec<Vec<EventType>> = report.events.iter().map(|e| e.types()).collect();
        assert_eq!(types[2], vec![EventType::Error]);
        assert!(report.events[3].is(EventType::Prompt));
        assert!(report.events[3].is(EventType::Correction));
    }

    #[test]
    fn test_failed_tool_result_does_not_open_assistant_turn() {
        let failed = r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t","content":"exit 1","is_error":true}]}}"#;
        let lines = vec![
            user("a", "run the suite"),
            failed.to_string(),
            user("c", "no, just the unit tests"),
        ];
        let report = normalize_lines(&lines, &source());
        assert!(!report.events[2].is(EventType::Correction));
    }

    #[test]
    fn test_correction_cue_is_word_bounded() {
        let lines = vec![
            assistant_text("a", "done"),
            user("b", "now add a note about nothing"),
        ];
        let report = normalize_lines(&lines, &source());
        assert!(!report.events[1].is(EventType::Correction));
    }

    #[test]
    fn test_sub_agent_spawn() {
        let lines = vec![assistant_tool(
            "a",
            "Task",
            serde_json::json!({"description": "explore", "prompt": "Survey src/"}),
        )];
        let report = normalize_lines(&lines, &source());
        let event = &report.events[0];
        assert!(event.is(EventType::ToolCall));
        assert!(event.is(EventType::SubAgentSpawn));
        assert_eq!(event.content, "Survey src/");
        assert_eq!(event.metadata["tool_name"], "Task");
    }

    #[test]
    fn test_mixed_text_and_tool_use_is_one_tool_call() {
        let line = serde_json::json!({
            "type": "assistant",
            "uuid": "m",
            "sessionId": "s1",
            "message": {"content": [
                {"type": "text", "text": "Reading the module."},
                {"type": "tool_use", "id": "t1", "name": "Read", "input": {"file_path": "src/lib.rs"}},
                {"type": "tool_use", "id": "t2", "name": "Read", "input": {"file_path": "src/main.rs"}}
            ]}
        })
        .to_string();
        let report = normalize_lines([line], &source());

        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].types(), vec![EventType::ToolCall]);
        assert_eq!(report.events[0].metadata["additional_tool_calls"], 1);

        let session = crate::Session::assemble(report.events);
        assert_eq!(session.assistant_messages().len(), 0);
        assert_eq!(session.tool_calls().len(), 1);
    }

    #[test]
    fn test_tool_results() {
        let ok = r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t","content":"fine"}]}}"#;
        let failed = r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"t","content":"exit 1","is_error":true}]}}"#;
        let report = normalize_lines([ok, failed], &source());

        assert_eq!(report.events.len(), 1);
        assert!(report.events[0].is(EventType::Error));
        assert_eq!(report.events[0].content, "exit 1");
        assert_eq!(report.events[0].id, "s1:2");
    }

    #[test]
    fn test_compaction_and_commit() {
        let lines = [
            r#"{"type":"system","subtype":"compact_boundary","content":"Conversation compacted"}"#,
            r#"{"type":"system","subtype":"informational","content":"hi"}"#,
            r#"{"type":"user","isCompactSummary":true,"message":{"content":"Summary of earlier work"}}"#,
            r#"{"type":"commit","sha":"abc123","message":"fix auth"}"#,
        ];
        let report = normalize_lines(lines, &source());
        let types: Vec<EventType> = report.events.iter().map(|e| e.kind.primary_type()).collect();
        assert_eq!(
            types,
            vec![EventType::Compaction, EventType::Compaction, EventType::Commit]
        );
        assert_eq!(
            report.events[2].kind,
            EventKind::Commit {
                sha: Some("abc123".to_string())
            }
        );
    }

    #[test]
    fn test_malformed_and_unknown_lines_are_skipped() {
        let lines = vec![
            "{not json".to_string(),
            r#"{"type":"progress"}"#.to_string(),
            String::new(),
            r#"{"type":"summary","summary":"x"}"#.to_string(),
            user("ok", "still parsed"),
        ];
        let report = normalize_lines(&lines, &source());
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].starts_with("line 1:"));
        assert!(report.warnings[1].contains("progress"));
    }

    #[test]
    fn test_unparsable_timestamp_is_none() {
        let line = r#"{"type":"user","timestamp":"yesterday","message":{"content":"hi there"}}"#;
        let report = normalize_lines([line], &source());
        assert_eq!(report.events[0].timestamp, None);
    }

    #[test]
    fn test_streamed_and_buffered_files_agree() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join("-home-dev-shop");
        std::fs::create_dir_all(&project_dir).unwrap();
        let path = project_dir.join("sess-1.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{}", user("a", "update src/lib.rs")).unwrap();
        file.write_all(&[0xff, 0xfe, b'\n']).unwrap();
        writeln!(file, "{}", assistant_text("b", "done")).unwrap();
        drop(file);

        let buffered = normalize_file(&path, &IngestConfig::default()).unwrap();
        let streamed = normalize_file(
            &path,
            &IngestConfig {
                stream_threshold_bytes: 0,
                ..IngestConfig::default()
            },
        )
        .unwrap();

        assert_eq!(buffered.events, streamed.events);
        assert_eq!(buffered.events.len(), 2);
        assert_eq!(buffered.skipped, 1);
        assert_eq!(buffered.events[0].project, "-home-dev-shop");
        assert_eq!(buffered.events[0].project_name, "shop");
    }

    #[test]
    fn test_directory_log_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("p1")).unwrap();
        std::fs::write(dir.path().join("p1/b.jsonl"), "").unwrap();
        std::fs::write(dir.path().join("p1/a.jsonl"), "").unwrap();
        std::fs::write(dir.path().join("p1/notes.txt"), "").unwrap();

        let source = DirectoryLogSource::new(dir.path(), "**/*.jsonl");
        let files = source.session_files().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("p1/a.jsonl"));
    }
}
