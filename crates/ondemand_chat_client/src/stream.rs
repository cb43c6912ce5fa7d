//! Folds server-sent-event lines from a streamed query into one result.
//!
//! Only `data:` lines are considered. The payload `[DONE]` ends the stream;
//! any other payload is decoded as a [`StreamEvent`] and payloads that fail to
//! decode are skipped.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::messages::StreamEvent;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Final state of a streamed answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedResult {
    pub full_answer: String,
    pub session_id: String,
    pub message_id: String,
    pub metrics: Map<String, Value>,
}

/// Whether the caller should keep feeding lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Done,
}

impl LineOutcome {
    pub fn is_done(self) -> bool {
        self == LineOutcome::Done
    }
}

#[derive(Debug, Default)]
pub struct StreamAccumulator {
    result: AccumulatedResult,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one raw line. Returns [`LineOutcome::Done`] on the terminator;
    /// nothing should be fed after that.
    pub fn feed_line(&mut self, line: &str) -> LineOutcome {
        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            return LineOutcome::Continue;
        };
        let payload = rest.trim();
        if payload == DONE_SENTINEL {
            return LineOutcome::Done;
        }
        match StreamEvent::from_payload(payload) {
            Ok(event) => self.apply(event),
            Err(e) => tracing::debug!(error = %e, payload, "skipping undecodable stream event"),
        }
        LineOutcome::Continue
    }

    fn apply(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Fulfillment(ev) => {
                if let Some(answer) = ev.answer {
                    self.result.full_answer.push_str(&answer);
                }
                if let Some(id) = ev.session_id {
                    self.result.session_id = id;
                }
                if let Some(id) = ev.message_id {
                    self.result.message_id = id;
                }
            }
            StreamEvent::MetricsLog(ev) => {
                if let Some(metrics) = ev.public_metrics {
                    self.result.metrics = metrics;
                }
            }
            StreamEvent::Unknown => {}
        }
    }

    pub fn result(&self) -> &AccumulatedResult {
        &self.result
    }

    pub fn finish(self) -> AccumulatedResult {
        self.result
    }
}

/// Fold a whole line sequence. Lines after the terminator are not pulled.
pub fn accumulate<I, S>(lines: I) -> AccumulatedResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut acc = StreamAccumulator::new();
    for line in lines {
        if acc.feed_line(line.as_ref()).is_done() {
            break;
        }
    }
    acc.finish()
}

/// Splits a byte stream into lines, carrying partial lines across chunks.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and drain every complete line (without `\n` or a
    /// trailing `\r`).
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Remaining unterminated line, if any.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
