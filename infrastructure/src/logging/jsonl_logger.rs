//! JSONL file writer for planner transcripts.
//!
//! Each [`ConversationEvent`] becomes one JSON line carrying its payload
//! fields plus `type`, `run_id` and `timestamp`.

use atelier_application::{ConversationEvent, ConversationLogger};
use atelier_domain::RunId;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Appends one JSON object per line. Flushes after every record and on `Drop`.
pub struct JsonlConversationLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
    run_id: Option<String>,
}

impl JsonlConversationLogger {
    /// Create a logger writing to `path`, creating parent directories.
    ///
    /// Returns `None` (after a warning) when the file cannot be created, so
    /// a broken log location never stops a run.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create transcript directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        match File::create(path) {
            Ok(file) => Some(Self {
                writer: Mutex::new(BufWriter::new(file)),
                path: path.to_path_buf(),
                run_id: None,
            }),
            Err(e) => {
                warn!("Could not create transcript {}: {}", path.display(), e);
                None
            }
        }
    }

    /// `<dir>/<run_id>.conversation.jsonl`, tagging every record with the run.
    pub fn for_run(dir: impl AsRef<Path>, run_id: &RunId) -> Option<Self> {
        let path = dir
            .as_ref()
            .join(format!("{}.conversation.jsonl", run_id));
        Self::new(path).map(|mut logger| {
            logger.run_id = Some(run_id.to_string());
            logger
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, event: ConversationEvent) -> Value {
        let mut map = match event.payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        map.insert(
            "type".to_string(),
            Value::String(event.event_type.to_string()),
        );
        if let Some(run_id) = &self.run_id {
            map.insert("run_id".to_string(), Value::String(run_id.clone()));
        }
        map.insert(
            "timestamp".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        );
        Value::Object(map)
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let Ok(line) = serde_json::to_string(&self.record(event)) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlConversationLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_record_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.conversation.jsonl");
        let logger = JsonlConversationLogger::new(&path).unwrap();

        logger.log(ConversationEvent::llm_response(1, "Looking up tides", 1));
        logger.log(ConversationEvent::tool_call(
            1,
            "web_search",
            r#"{"query":"tides"}"#,
        ));
        logger.log(ConversationEvent::tool_result(1, "web_search", true, "3 results"));
        drop(logger);

        let records = read_lines(&path);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["type"], "llm_response");
        assert_eq!(records[0]["iteration"], 1);
        assert_eq!(records[1]["tool"], "web_search");
        assert_eq!(records[2]["success"], true);
        assert!(records.iter().all(|r| r.get("timestamp").is_some()));
        assert!(records.iter().all(|r| r.get("run_id").is_none()));
    }

    #[test]
    fn test_for_run_names_file_and_tags_records() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = RunId::generate();
        let logger = JsonlConversationLogger::for_run(dir.path().join("runs"), &run_id).unwrap();
        assert!(
            logger
                .path()
                .ends_with(format!("runs/{}.conversation.jsonl", run_id))
        );

        logger.log(ConversationEvent::new("planning_complete", serde_json::json!("done")));
        let path = logger.path().to_path_buf();
        drop(logger);

        let records = read_lines(&path);
        assert_eq!(records[0]["type"], "planning_complete");
        assert_eq!(records[0]["data"], "done");
        assert_eq!(records[0]["run_id"], run_id.to_string());
    }

    #[test]
    fn test_unwritable_location_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        assert!(JsonlConversationLogger::new(blocker.join("nested/log.jsonl")).is_none());
    }
}
