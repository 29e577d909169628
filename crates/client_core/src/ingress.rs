//! Decodes the mission stream into typed dashboard events.
//!
//! The stream is server-sent events: `event:` names the kind, `data:`
//! carries a JSON payload, and a blank line ends the frame.

use shared::{
    domain::{Formation, Pod},
    protocol::{
        FormationUpdatePayload, PodUpdatePayload, FORMATION_UPDATE_EVENT, POD_UPDATE_EVENT,
    },
};
use thiserror::Error;
use tracing::debug;

const DEFAULT_EVENT_NAME: &str = "message";

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    PodUpdate(Pod),
    FormationUpdate(Formation),
}

#[derive(Debug, Error)]
pub enum IngressError {
    #[error("malformed {event} payload: {source}")]
    MalformedPayload {
        event: &'static str,
        source: serde_json::Error,
    },
    #[error("{event} payload is missing a {field}")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },
    #[error("{event} payload has an invalid {field}")]
    InvalidField {
        event: &'static str,
        field: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Incremental frame splitter; bytes may arrive cut at arbitrary points.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    // Set after a corrupt line until the frame's blank-line terminator.
    skipping: bool,
}

impl SseFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every frame completed by `chunk`. A line that is not valid
    /// UTF-8 discards only the frame it belongs to.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = match String::from_utf8(line) {
                Ok(line) => line,
                Err(err) => {
                    debug!(%err, "discarding stream frame with invalid UTF-8");
                    self.event = None;
                    self.data.clear();
                    self.skipping = true;
                    continue;
                }
            };
            if self.skipping {
                if line.is_empty() {
                    self.skipping = false;
                }
                continue;
            }
            if let Some(frame) = self.consume_line(&line) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Drops any partially received frame, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.event = None;
        self.data.clear();
        self.skipping = false;
    }

    fn consume_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            // id/retry are transport concerns; reconnect timing is configured locally.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(SseFrame {
            event: event.unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
            data,
        })
    }
}

/// `Ok(None)` for event kinds the dashboard does not consume.
pub fn decode_frame(frame: &SseFrame) -> Result<Option<StreamEvent>, IngressError> {
    match frame.event.as_str() {
        POD_UPDATE_EVENT => {
            let payload: PodUpdatePayload = serde_json::from_str(&frame.data).map_err(|source| {
                IngressError::MalformedPayload {
                    event: POD_UPDATE_EVENT,
                    source,
                }
            })?;
            validate_position(&payload.pod)?;
            Ok(Some(StreamEvent::PodUpdate(payload.pod)))
        }
        FORMATION_UPDATE_EVENT => {
            let payload: FormationUpdatePayload =
                serde_json::from_str(&frame.data).map_err(|source| {
                    IngressError::MalformedPayload {
                        event: FORMATION_UPDATE_EVENT,
                        source,
                    }
                })?;
            if payload.formation.as_str().is_empty() {
                return Err(IngressError::MissingField {
                    event: FORMATION_UPDATE_EVENT,
                    field: "formation name",
                });
            }
            Ok(Some(StreamEvent::FormationUpdate(payload.formation)))
        }
        _ => Ok(None),
    }
}

fn validate_position(pod: &Pod) -> Result<(), IngressError> {
    if pod.x.is_finite() && pod.y.is_finite() {
        Ok(())
    } else {
        Err(IngressError::InvalidField {
            event: POD_UPDATE_EVENT,
            field: "position",
        })
    }
}

#[cfg(test)]
#[path = "tests/ingress_tests.rs"]
mod tests;
