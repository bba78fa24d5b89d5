use serde::Deserialize;

use crate::models::Document;

/// Wire envelope of one stream frame: `{"type": ..., "data": ...}`.
#[derive(Debug, Deserialize)]
struct FrameEnvelope {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    data: serde_json::Value,
}

/// A decoded inbound stream frame.
#[derive(Debug)]
pub enum InboundFrame {
    /// One result document produced by the job.
    Document(Box<Document>),

    /// Terminal success; the connection ends after this frame.
    Done,

    /// Terminal failure with the server-supplied message.
    Error(String),

    /// A frame kind this client does not know. Logged and ignored so
    /// newer servers can add kinds without breaking older clients.
    Unknown(String),
}

impl InboundFrame {
    /// Decode one text frame.
    ///
    /// A malformed payload is an error the caller logs and skips; it does
    /// not terminate the stream.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: FrameEnvelope = serde_json::from_str(text)?;
        match envelope.kind.as_str() {
            "document" => Ok(InboundFrame::Document(Box::new(serde_json::from_value(
                envelope.data,
            )?))),
            "done" => Ok(InboundFrame::Done),
            "error" => Ok(InboundFrame::Error(error_message(&envelope.data))),
            _ => Ok(InboundFrame::Unknown(envelope.kind)),
        }
    }
}

/// Extract a readable message from an error frame payload.
///
/// Accepts a bare string or an `{"error": ...}` object; anything else is
/// reported verbatim.
fn error_message(data: &serde_json::Value) -> String {
    if let Some(s) = data.as_str() {
        return s.to_string();
    }
    if let Some(s) = data.get("error").and_then(|v| v.as_str()) {
        return s.to_string();
    }
    data.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_document_frame() {
        let frame = InboundFrame::parse(
            r##"{"type": "document", "data": {"markdown": "# hi", "metadata": {}}}"##,
        )
        .unwrap();

        match frame {
            InboundFrame::Document(doc) => assert_eq!(doc.markdown.as_deref(), Some("# hi")),
            other => panic!("expected document frame, got {other:?}"),
        }
    }

    #[test]
    fn parse_done_frame() {
        let frame = InboundFrame::parse(r#"{"type": "done", "data": []}"#).unwrap();
        assert!(matches!(frame, InboundFrame::Done));
    }

    #[test]
    fn parse_error_frame_variants() {
        let frame = InboundFrame::parse(r#"{"type": "error", "data": "boom"}"#).unwrap();
        match frame {
            InboundFrame::Error(msg) => assert_eq!(msg, "boom"),
            other => panic!("expected error frame, got {other:?}"),
        }

        let frame =
            InboundFrame::parse(r#"{"type": "error", "data": {"error": "rate limited"}}"#).unwrap();
        match frame {
            InboundFrame::Error(msg) => assert_eq!(msg, "rate limited"),
            other => panic!("expected error frame, got {other:?}"),
        }

        let frame = InboundFrame::parse(r#"{"type": "error", "data": {"code": 7}}"#).unwrap();
        match frame {
            InboundFrame::Error(msg) => assert_eq!(msg, r#"{"code":7}"#),
            other => panic!("expected error frame, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        let frame = InboundFrame::parse(r#"{"type": "heartbeat", "data": {}}"#).unwrap();
        match frame {
            InboundFrame::Unknown(kind) => assert_eq!(kind, "heartbeat"),
            other => panic!("expected unknown frame, got {other:?}"),
        }
    }

    #[test]
    fn malformed_frame_is_an_error() {
        assert!(InboundFrame::parse("not json").is_err());
        assert!(InboundFrame::parse(r#"{"data": {}}"#).is_err());
        assert!(InboundFrame::parse(r#"{"type": "document", "data": 42}"#).is_err());
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let frame = InboundFrame::parse(r#"{"type": "done"}"#).unwrap();
        assert!(matches!(frame, InboundFrame::Done));
    }
}
