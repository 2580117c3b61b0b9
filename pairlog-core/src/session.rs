//! Session assembler
//!
//! Groups events by `session_id` and pre-computes the views every analysis
//! reads. Views are index lists into the one event vector a [`Session`]
//! owns, so no event is ever duplicated or reordered between them.

use crate::types::{Event, EventType};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// An ordered sequence of events sharing one session id.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub project: String,
    pub project_name: String,
    events: Vec<Event>,
    views: Views,
    duration_minutes: f64,
}

/// Indices into `Session::events`, each in ascending order.
#[derive(Debug, Clone, Default)]
struct Views {
    user_messages: Vec<usize>,
    assistant_messages: Vec<usize>,
    tool_calls: Vec<usize>,
    corrections: Vec<usize>,
    compactions: Vec<usize>,
    commits: Vec<usize>,
    sub_agent_spawns: Vec<usize>,
}

impl Session {
    /// Build a session from its events, in log order.
    pub fn assemble(events: Vec<Event>) -> Self {
        let mut views = Views::default();
        for (idx, event) in events.iter().enumerate() {
            for t in event.types() {
                let view = match t {
                    EventType::Prompt => &mut views.user_messages,
                    EventType::AssistantResponse => &mut views.assistant_messages,
                    EventType::ToolCall => &mut views.tool_calls,
                    EventType::Correction => &mut views.corrections,
                    EventType::Compaction => &mut views.compactions,
                    EventType::Commit => &mut views.commits,
                    EventType::SubAgentSpawn => &mut views.sub_agent_spawns,
                    EventType::Error => continue,
                };
                view.push(idx);
            }
        }

        let duration_minutes = match (events.first(), events.last()) {
            (Some(first), Some(last)) if events.len() >= 2 => {
                match (first.timestamp, last.timestamp) {
                    (Some(start), Some(end)) => (end - start).num_seconds() as f64 / 60.0,
                    _ => 0.0,
                }
            }
            _ => 0.0,
        };

        let (id, project, project_name) = events
            .first()
            .map(|e| (e.session_id.clone(), e.project.clone(), e.project_name.clone()))
            .unwrap_or_default();

        Self {
            id,
            project,
            project_name,
            events,
            views,
            duration_minutes,
        }
    }

    /// All events in log order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn view<'a>(&'a self, indices: &'a [usize]) -> impl ExactSizeIterator<Item = &'a Event> + 'a {
        indices.iter().map(move |&i| &self.events[i])
    }

    pub fn user_messages(&self) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.view(&self.views.user_messages)
    }

    pub fn assistant_messages(&self) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.view(&self.views.assistant_messages)
    }

    pub fn tool_calls(&self) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.view(&self.views.tool_calls)
    }

    pub fn corrections(&self) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.view(&self.views.corrections)
    }

    pub fn compactions(&self) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.view(&self.views.compactions)
    }

    pub fn commits(&self) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.view(&self.views.commits)
    }

    pub fn sub_agent_spawns(&self) -> impl ExactSizeIterator<Item = &Event> + '_ {
        self.view(&self.views.sub_agent_spawns)
    }

    /// Positions of corrections within [`Session::events`].
    pub fn correction_positions(&self) -> &[usize] {
        &self.views.corrections
    }

    /// Positions of compactions within [`Session::events`].
    pub fn compaction_positions(&self) -> &[usize] {
        &self.views.compactions
    }

    /// Last timestamp minus first timestamp, in minutes.
    ///
    /// Zero with fewer than two events or when either end lacks a timestamp.
    pub fn duration_minutes(&self) -> f64 {
        self.duration_minutes
    }

    /// Earliest known timestamp.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.events.iter().find_map(|e| e.timestamp)
    }

    /// Distinct paths touched by tool calls.
    pub fn files_touched(&self) -> BTreeSet<&str> {
        self.tool_calls().filter_map(touched_path).collect()
    }

    /// Whether a user-supplied project name refers to this session's project.
    ///
    /// Accepts the short name, the encoded directory name, the original
    /// working directory, or any trailing part of it (`my-app` for
    /// `-Users-dev-my-app`).
    pub fn belongs_to(&self, query: &str) -> bool {
        let encoded = query.trim().replace('/', "-");
        let tail = encoded.trim_start_matches('-');
        if tail.is_empty() {
            return false;
        }
        self.project_name == query
            || self.project == encoded
            || self.project.ends_with(&format!("-{}", tail))
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

/// The file a tool call reads or writes, from its input.
pub fn touched_path(event: &Event) -> Option<&str> {
    let input = event.tool_input()?;
    ["file_path", "notebook_path", "path"]
        .iter()
        .find_map(|k| input.get(k).and_then(|v| v.as_str()))
        .filter(|p| !p.is_empty())
}

/// Group events into sessions, in order of each session's first event.
pub fn assemble_sessions(events: impl IntoIterator<Item = Event>) -> Vec<Session> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<Event>> = HashMap::new();

    for event in events {
        if !grouped.contains_key(&event.session_id) {
            order.push(event.session_id.clone());
        }
        grouped.entry(event.session_id.clone()).or_default().push(event);
    }

    order
        .into_iter()
        .filter_map(|id| grouped.remove(&id))
        .map(Session::assemble)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;
    use chrono::TimeZone;
    use serde_json::json;

    fn event(session: &str, kind: EventKind, minute: Option<u32>) -> Event {
        Event {
            id: format!("{}-{:?}", session, minute),
            kind,
            content: String::new(),
            timestamp: minute.map(|m| Utc.with_ymd_and_hms(2025, 1, 10, 10, m, 0).unwrap()),
            session_id: session.to_string(),
            project: "p".to_string(),
            project_name: "p".to_string(),
            branch: None,
            source_file: "f".to_string(),
            source_line: 0,
            metadata: json!({}),
        }
    }

    fn tool(name: &str, input: serde_json::Value) -> EventKind {
        EventKind::ToolCall {
            tool: name.to_string(),
            input,
            sub_agent: name == "Task",
        }
    }

    #[test]
    fn test_views_preserve_order_without_duplication() {
        let session = Session::assemble(vec![
            event("s", EventKind::Prompt { correction: false }, Some(0)),
            event("s", tool("Task", json!({"prompt": "x"})), Some(1)),
            event("s", EventKind::AssistantResponse, Some(2)),
            event("s", EventKind::Prompt { correction: true }, Some(3)),
            event("s", EventKind::Commit { sha: None }, Some(30)),
        ]);

        assert_eq!(session.user_messages().len(), 2);
        assert_eq!(session.corrections().len(), 1);
        assert_eq!(session.tool_calls().len(), 1);
        assert_eq!(session.sub_agent_spawns().len(), 1);
        assert_eq!(session.commits().len(), 1);
        assert_eq!(session.correction_positions(), &[3]);
        // The correction is the same event as the second user message
        let second_prompt = session.user_messages().nth(1).unwrap();
        let correction = session.corrections().next().unwrap();
        assert!(std::ptr::eq(second_prompt, correction));
        assert_eq!(session.duration_minutes(), 30.0);
    }

    #[test]
    fn test_duration_degrades_to_zero() {
        let single = Session::assemble(vec![event("s", EventKind::AssistantResponse, Some(5))]);
        assert_eq!(single.duration_minutes(), 0.0);

        let missing = Session::assemble(vec![
            event("s", EventKind::AssistantResponse, Some(5)),
            event("s", EventKind::AssistantResponse, None),
        ]);
        assert_eq!(missing.duration_minutes(), 0.0);

        let empty = Session::assemble(Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.duration_minutes(), 0.0);
    }

    #[test]
    fn test_assemble_sessions_groups_in_first_appearance_order() {
        let sessions = assemble_sessions(vec![
            event("b", EventKind::AssistantResponse, Some(0)),
            event("a", EventKind::AssistantResponse, Some(1)),
            event("b", EventKind::AssistantResponse, Some(2)),
        ]);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "b");
        assert_eq!(sessions[0].len(), 2);
        assert_eq!(sessions[1].id, "a");
    }

    #[test]
    fn test_files_touched() {
        let session = Session::assemble(vec![
            event("s", tool("Read", json!({"file_path": "src/a.rs"})), None),
            event("s", tool("Edit", json!({"file_path": "src/a.rs"})), None),
            event("s", tool("Glob", json!({"path": "src"})), None),
            event("s", tool("Bash", json!({"command": "ls"})), None),
        ]);
        let files: Vec<&str> = session.files_touched().into_iter().collect();
        assert_eq!(files, vec!["src", "src/a.rs"]);
    }

    #[test]
    fn test_belongs_to_hyphenated_project() {
        let mut e = event("s", EventKind::AssistantResponse, Some(0));
        e.project = "-Users-dev-my-app".to_string();
        e.project_name = "app".to_string();
        let session = Session::assemble(vec![e]);

        assert!(session.belongs_to("my-app"));
        assert!(session.belongs_to("app"));
        assert!(session.belongs_to("/Users/dev/my-app"));
        assert!(session.belongs_to("-Users-dev-my-app"));
        assert!(!session.belongs_to("other-app"));
        assert!(!session.belongs_to("y-app"));
        assert!(!session.belongs_to(""));
    }
}
