//! Newline-delimited JSON sink for agent events

use crate::event::AgentEvent;
use crate::mealy::{Sink, SinkError};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Writes each event as one wire-format line tagged with its agent id
pub struct JsonlSink<W> {
    name: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonlSink<BufWriter<File>> {
    /// Append to `path`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened.
    pub fn append_file(name: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(name, BufWriter::new(file)))
    }
}

impl<W: Write + Send> Sink<AgentEvent> for JsonlSink<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&self, id: &str, outputs: &[AgentEvent]) -> Result<(), SinkError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        for event in outputs {
            let mut raw = event.to_raw()?;
            raw.agent_id = Some(id.to_string());
            serde_json::to_writer(&mut *writer, &raw).map_err(crate::event::CodecError::from)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MessageKind, RawEvent, StreamKind};
    use std::io::{BufRead, BufReader};

    #[test]
    fn test_writes_one_tagged_line_per_event() {
        let sink = JsonlSink::new("memory", Vec::new());
        let events = vec![
            AgentEvent::message(1, MessageKind::user("u1", "hi")),
            AgentEvent::stream(2, StreamKind::text_delta("yo")),
        ];
        sink.dispatch("agent-7", &events).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: RawEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.event_type, "user_message");
        assert_eq!(first.agent_id.as_deref(), Some("agent-7"));
        assert_eq!(AgentEvent::from_raw(first), events[0]);
    }

    #[test]
    fn test_append_file_keeps_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.jsonl");
        let event = AgentEvent::message(1, MessageKind::user("u1", "hi"));

        for _ in 0..2 {
            let sink = JsonlSink::append_file("messages", &path).unwrap();
            sink.dispatch("a", std::slice::from_ref(&event)).unwrap();
        }

        let lines: Vec<String> = BufReader::new(File::open(&path).unwrap())
            .lines()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.contains("\"agentId\":\"a\"")));
    }
}
