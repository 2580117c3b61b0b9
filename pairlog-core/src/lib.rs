//! # pairlog-core
//!
//! Core library for pairlog: retrospective analysis of AI coding-assistant
//! session logs.
//!
//! This library provides:
//! - Normalization of raw JSONL session logs into typed events
//! - Session assembly with pre-computed event views
//! - A rule-based triage classifier for user instructions
//! - A correction log that learns recurring mistake patterns
//! - A twelve-category collaboration scorecard
//! - Configuration, logging and SQLite persistence
//!
//! ## Architecture
//!
//! ```text
//! raw JSONL ──► ingest ──► Event ──► session ──► Session ──► scorecard
//!
//! instruction ───────────────► triage ◄── Pattern ◄── patterns ◄── corrections (db)
//! ```
//!
//! Analysis is pure and total. Only the I/O layer (files, SQLite) returns
//! errors.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pairlog_core::ingest::{normalize_all, DirectoryLogSource};
//! use pairlog_core::scorecard::ScorecardEngine;
//! use pairlog_core::session::assemble_sessions;
//! use pairlog_core::Config;
//!
//! let config = Config::load().expect("failed to load config");
//! let source = DirectoryLogSource::new("/path/to/logs", &config.ingest.session_glob);
//! let events = normalize_all(&source, &config.ingest)
//!     .expect("failed to read logs")
//!     .into_iter()
//!     .flat_map(|report| report.events);
//! let sessions = assemble_sessions(events);
//! let card = ScorecardEngine::standard(&config.scorecard).compute(&sessions, "shop", "week");
//! println!("{}", pairlog_core::scorecard::render_markdown(&card));
//! ```

// Re-export commonly used items at the crate root
pub use config::{Capabilities, Config, Profile};
pub use db::Database;
pub use error::{Error, Result};
pub use patterns::PatternLearner;
pub use scorecard::{Scorecard, ScorecardEngine};
pub use session::Session;
pub use triage::{classify, Classification, TriageLevel};
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod patterns;
pub mod scorecard;
pub mod session;
pub mod store;
pub mod text;
pub mod triage;
pub mod types;
