use crate::types::LogLevel;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Receives a pod's log one line at a time, without the trailing newline.
pub trait LogSink: Send {
    fn push_line(&mut self, line: &str);
}

/// Outcome of classifying a single service log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Level(LogLevel),
    /// Structured, but the level is missing or not one we know.
    UnknownLevel(Option<String>),
    NonClassifiable,
}

/// Only JSON objects are structured. A `level` that is neither a string nor null makes the line non-classifiable.
pub fn classify_line(line: &str) -> LineClass {
    let record = match serde_json::from_str::<serde_json::Value>(line) {
        Ok(serde_json::Value::Object(record)) => record,
        _ => return LineClass::NonClassifiable,
    };
    match record.get("level") {
        None | Some(serde_json::Value::Null) => LineClass::UnknownLevel(None),
        Some(serde_json::Value::String(level)) => match level.parse::<LogLevel>() {
            Ok(known) => LineClass::Level(known),
            Err(()) => LineClass::UnknownLevel(Some(level.clone())),
        },
        Some(_) => LineClass::NonClassifiable,
    }
}

/// Level histogram for a running service's log.
#[derive(Debug, Default, Clone)]
pub struct LevelHistogram {
    pod: String,
    pub counts: BTreeMap<LogLevel, u64>,
    pub non_classifiable: u64,
    pub total: u64,
}

impl LevelHistogram {
    pub fn new(pod: impl Into<String>) -> Self {
        Self {
            pod: pod.into(),
            ..Self::default()
        }
    }
}

impl LogSink for LevelHistogram {
    fn push_line(&mut self, line: &str) {
        self.total += 1;
        match classify_line(line) {
            LineClass::Level(level) => *self.counts.entry(level).or_insert(0) += 1,
            LineClass::UnknownLevel(Some(level)) => {
                warn!("Unknown log level in pod {}: {}", self.pod, level)
            }
            LineClass::UnknownLevel(None) => {
                debug!("Structured log line without a level in pod {}", self.pod)
            }
            LineClass::NonClassifiable => self.non_classifiable += 1,
        }
    }
}

/// Compile a job grep pattern; matching is always case-insensitive.
pub fn compile_grep_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Full capture of a job's log plus the lines matching the grep pattern.
#[derive(Debug, Clone)]
pub struct JobLogCapture {
    pattern: Regex,
    pub full_log: String,
    pub matched_lines: Vec<String>,
}

impl JobLogCapture {
    pub fn new(pattern: Regex) -> Self {
        Self {
            pattern,
            full_log: String::new(),
            matched_lines: Vec::new(),
        }
    }
}

impl LogSink for JobLogCapture {
    fn push_line(&mut self, line: &str) {
        if self.pattern.is_match(line) {
            self.matched_lines.push(line.to_string());
        }
        self.full_log.push_str(line);
        self.full_log.push('\n');
    }
}
