//! Replays a JSONL file of driver events through the agent engine
//!
//! Reads from the file named by `AGENT_EVENTS_INPUT`, or stdin. Every output
//! is written to stdout as JSONL; message events are additionally appended to
//! `AGENT_EVENTS_MESSAGE_LOG` when it is set.

use agent_events::event::RawEvent;
use agent_events::jsonl::JsonlSink;
use agent_events::mealy::SinkSet;
use agent_events::telemetry::{self, LogFormat};
use agent_events::{AgentEngine, AgentEvent, EngineConfig};
use std::fs::File;
use std::io::{self, BufRead, BufReader};

const INPUT_VAR: &str = "AGENT_EVENTS_INPUT";
const MESSAGE_LOG_VAR: &str = "AGENT_EVENTS_MESSAGE_LOG";
const DEFAULT_AGENT_ID: &str = "default";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init(LogFormat::from_env())?;

    let config = EngineConfig::from_env()?;
    tracing::info!(?config, "Starting replay");
    let engine = AgentEngine::from_config(&config);

    let mut sinks = SinkSet::new().with_sink(JsonlSink::new("stdout", io::stdout()));
    if let Ok(path) = std::env::var(MESSAGE_LOG_VAR) {
        tracing::info!(path = %path, "Appending message events");
        sinks = sinks.with_filtered_sink(JsonlSink::append_file("message-log", &path)?, |e| {
            matches!(e, AgentEvent::Message(_))
        });
    }

    let input: Box<dyn BufRead> = if let Ok(path) = std::env::var(INPUT_VAR) {
        tracing::info!(path = %path, "Reading events from file");
        Box::new(BufReader::new(File::open(&path)?))
    } else {
        Box::new(io::stdin().lock())
    };

    let mut processed = 0usize;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let raw: RawEvent = match serde_json::from_str(&line) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping invalid event line");
                continue;
            }
        };
        let agent_id = raw
            .agent_id
            .clone()
            .unwrap_or_else(|| DEFAULT_AGENT_ID.to_string());

        let outputs = engine.process(&agent_id, AgentEvent::from_raw(raw));
        sinks.dispatch(&agent_id, &outputs);
        processed += 1;
    }

    tracing::info!(events = processed, "Replay finished");
    Ok(())
}
