//! Frame encoding and decoding
//!
//! Frames are single-line JSON objects separated by `\n`. Outbound frames are
//! commands; inbound frames are either responses (carry an `id`) or events
//! (carry a `type` and no `id`).

use serde_json::Value;
use tokio_util::codec::LinesCodec;

use crate::error::{SimResult, SimulatorError};
use crate::event::SimulatorEvent;
use crate::wire::{Command, Response};

/// Default upper bound for one frame.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// A response to some command
    Response(Response),
    /// An asynchronous event
    Event(SimulatorEvent),
    /// Carries an `id` but does not have the shape of a response
    MalformedResponse {
        /// The correlation id that was present
        id: String,
        /// Why decoding failed
        reason: String,
    },
    /// Names a known event `type` but its payload does not decode
    MalformedEvent {
        /// The `type` field
        kind: String,
        /// Why decoding failed
        reason: String,
    },
    /// Carries no `id` and a `type` this client does not know
    UnknownEvent {
        /// The `type` field, if any
        kind: Option<String>,
    },
}

/// Frame codec for the simulator wire protocol
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    /// Maximum frame size in bytes, excluding the delimiter
    max_frame_len: usize,
}

impl FrameCodec {
    /// Create a new codec with default settings
    pub fn new() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Create a codec with custom max frame size
    pub fn with_max_size(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    /// Get the maximum frame size
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Check if a frame size is valid
    pub fn is_valid_size(&self, size: usize) -> bool {
        size > 0 && size <= self.max_frame_len
    }

    /// Line codec for `FramedRead`/`FramedWrite` with this codec's limit
    pub fn lines_codec(&self) -> LinesCodec {
        LinesCodec::new_with_max_length(self.max_frame_len)
    }

    /// Encode `{id, command, data}` as one line (without the delimiter)
    pub fn encode_command(&self, id: &str, command: &Command) -> SimResult<String> {
        let mut value = serde_json::to_value(command)
            .map_err(|e| SimulatorError::protocol(format!("failed to encode command: {e}")))?;
        match &mut value {
            Value::Object(object) => {
                object.insert("id".to_string(), Value::String(id.to_string()));
            }
            other => {
                return Err(SimulatorError::protocol(format!(
                    "command encoded to non-object {other}"
                )));
            }
        }

        let line = value.to_string();
        if !self.is_valid_size(line.len()) {
            return Err(SimulatorError::protocol(format!(
                "Frame size {} exceeds maximum {}",
                line.len(),
                self.max_frame_len
            )));
        }
        Ok(line)
    }

    /// Classify and decode one inbound line
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Protocol`] if the line is not a JSON object.
    pub fn decode_frame(&self, line: &str) -> SimResult<InboundFrame> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| SimulatorError::protocol(format!("frame is not valid JSON: {e}")))?;
        let Value::Object(object) = &value else {
            return Err(SimulatorError::protocol("frame is not a JSON object"));
        };

        match object.get("id") {
            Some(Value::String(id)) => {
                let id = id.clone();
                Ok(match serde_json::from_value::<Response>(value) {
                    Ok(response) => InboundFrame::Response(response),
                    Err(e) => InboundFrame::MalformedResponse {
                        id,
                        reason: e.to_string(),
                    },
                })
            }
            Some(other) => Err(SimulatorError::protocol(format!(
                "frame id must be a string, got {other}"
            ))),
            None => {
                let kind = object
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(match (serde_json::from_value::<SimulatorEvent>(value), kind) {
                    (Ok(event), _) => InboundFrame::Event(event),
                    (Err(e), Some(kind)) if SimulatorEvent::is_known_kind(&kind) => {
                        InboundFrame::MalformedEvent {
                            kind,
                            reason: e.to_string(),
                        }
                    }
                    (Err(_), kind) => InboundFrame::UnknownEvent { kind },
                })
            }
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ResponseStatus;

    #[test]
    fn test_codec_custom_max_size() {
        let codec = FrameCodec::with_max_size(64);
        assert_eq!(codec.max_frame_len(), 64);
        assert!(codec.is_valid_size(64));
        assert!(!codec.is_valid_size(0));
        assert!(!codec.is_valid_size(65));
    }

    #[test]
    fn test_encode_rejects_oversized_frame() {
        let codec = FrameCodec::with_max_size(16);
        let result = codec.encode_command("0123456789abcdef", &Command::ping());
        assert!(matches!(result, Err(SimulatorError::Protocol(_))));
    }

    #[test]
    fn test_decode_response() -> SimResult<()> {
        let frame = FrameCodec::new().decode_frame(r#"{"id":"a","status":"error","error":"busy"}"#)?;
        let InboundFrame::Response(response) = frame else {
            return Err(SimulatorError::protocol("expected response"));
        };
        assert_eq!(response.status, ResponseStatus::Error);
        assert_eq!(response.error.as_deref(), Some("busy"));
        Ok(())
    }

    #[test]
    fn test_decode_id_without_status_is_malformed() -> SimResult<()> {
        let frame = FrameCodec::new().decode_frame(r#"{"id":"a","data":{}}"#)?;
        assert!(matches!(frame, InboundFrame::MalformedResponse { ref id, .. } if id == "a"));
        Ok(())
    }

    #[test]
    fn test_decode_unknown_event() -> SimResult<()> {
        let frame = FrameCodec::new().decode_frame(r#"{"type":"weather_changed"}"#)?;
        assert_eq!(
            frame,
            InboundFrame::UnknownEvent {
                kind: Some("weather_changed".to_string())
            }
        );
        Ok(())
    }

    #[test]
    fn test_decode_known_event_with_bad_payload_is_malformed() -> SimResult<()> {
        let codec = FrameCodec::new();
        let crash = codec.decode_frame(r#"{"type":"crash_detected","impact_force":"high"}"#)?;
        assert!(matches!(
            crash,
            InboundFrame::MalformedEvent { ref kind, .. } if kind == "crash_detected"
        ));
        let sensor = codec.decode_frame(r#"{"type":"sensor_update","vehicleId":"vw_tcross"}"#)?;
        assert!(matches!(
            sensor,
            InboundFrame::MalformedEvent { ref kind, .. } if kind == "sensor_update"
        ));
        Ok(())
    }

    #[test]
    fn test_decode_garbage_is_protocol_error() {
        let codec = FrameCodec::new();
        assert!(codec.decode_frame("not json").is_err());
        assert!(codec.decode_frame("[1,2,3]").is_err());
        assert!(codec.decode_frame(r#"{"id":7,"status":"success"}"#).is_err());
    }
}
