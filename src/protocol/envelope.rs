//! JSON-RPC envelope classification and construction.
//!
//! Every message on the bus is one of four shapes:
//!
//! - `Request`:      `{jsonrpc, id, method, params}`
//! - `Response`:     `{jsonrpc, id, result}`
//! - `Error`:        `{jsonrpc, id, error}`
//! - `Notification`: `{jsonrpc, method, params}`
//!
//! Classification is by field presence: `id` + `result` is a response,
//! `id` + `error` an error response, `id` + `method` a request, `method`
//! alone a notification. Anything else is malformed and rejected at this
//! boundary before it can reach dispatch.

use serde_json::{json, Value};

use crate::error::{BuslinkError, Result};

use super::ResultCode;

/// JSON-RPC version tag stamped on every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// An inbound request awaiting a response from this component.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// A successful response to a request this component sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: u64,
    pub result: Value,
}

/// An error response to a request this component sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub id: u64,
    pub error: Value,
}

/// A fire-and-forget notification (no `id`, no reply expected).
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Value,
}

/// The parsed shape of any message received from the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEnvelope {
    Request(Request),
    Response(Response),
    Error(ErrorResponse),
    Notification(Notification),
}

impl InboundEnvelope {
    /// Parse raw wire text into a classified envelope.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::classify(value)
    }

    /// Classify an already-decoded JSON value.
    pub fn classify(value: Value) -> Result<Self> {
        let Value::Object(mut obj) = value else {
            return Err(BuslinkError::Protocol(
                "envelope is not a JSON object".into(),
            ));
        };

        match obj.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            _ => {
                return Err(BuslinkError::Protocol(
                    "missing or unsupported jsonrpc version".into(),
                ));
            }
        }

        let id = match obj.get("id") {
            None => None,
            Some(v) => Some(v.as_u64().ok_or_else(|| {
                BuslinkError::Protocol("id is not an unsigned integer".into())
            })?),
        };

        let method = match obj.get("method") {
            None => None,
            Some(Value::String(_)) => {
                let Some(Value::String(m)) = obj.remove("method") else {
                    unreachable!()
                };
                Some(m)
            }
            Some(_) => return Err(BuslinkError::Protocol("method is not a string".into())),
        };

        match (id, method) {
            (Some(id), _) if obj.contains_key("result") => Ok(InboundEnvelope::Response(
                Response {
                    id,
                    result: obj.remove("result").unwrap_or(Value::Null),
                },
            )),
            (Some(id), _) if obj.contains_key("error") => Ok(InboundEnvelope::Error(
                ErrorResponse {
                    id,
                    error: obj.remove("error").unwrap_or(Value::Null),
                },
            )),
            (Some(id), Some(method)) => Ok(InboundEnvelope::Request(Request {
                id,
                method,
                params: obj.remove("params").unwrap_or(Value::Null),
            })),
            (None, Some(method)) => Ok(InboundEnvelope::Notification(Notification {
                method,
                params: obj.remove("params").unwrap_or(Value::Null),
            })),
            _ => Err(BuslinkError::Protocol(
                "envelope has no method, result, or error".into(),
            )),
        }
    }
}

/// Shape of an outbound envelope, derived by the same field-presence rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Request,
    Response,
    Error,
    Notification,
}

/// Classify an outbound envelope without consuming it.
///
/// Returns `None` for values that are not a well-formed envelope.
pub fn kind_of(value: &Value) -> Option<EnvelopeKind> {
    let obj = value.as_object()?;
    let has_id = obj.get("id").map(Value::is_u64).unwrap_or(false);
    let has_method = obj.get("method").map(Value::is_string).unwrap_or(false);

    if has_id && obj.contains_key("result") {
        Some(EnvelopeKind::Response)
    } else if has_id && obj.contains_key("error") {
        Some(EnvelopeKind::Error)
    } else if has_id && has_method {
        Some(EnvelopeKind::Request)
    } else if has_method {
        Some(EnvelopeKind::Notification)
    } else {
        None
    }
}

/// Build a request envelope.
pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Build a response envelope with an arbitrary result payload.
pub fn response(id: u64, result: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    })
}

/// Build the common `{code, method}` result envelope.
///
/// The result echoes the originating method name so the core can correlate
/// the status code back to the operation.
pub fn result_with_code(id: u64, code: ResultCode, method: &str) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": {
            "code": code,
            "method": method,
        },
    })
}

/// Build an error-response envelope.
pub fn error_response(id: u64, code: ResultCode, message: &str) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": {
            "code": code,
            "message": message,
        },
    })
}

/// Build a notification envelope (no `id`, no reply expected).
pub fn notification(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params,
    })
}

/// Render an envelope to the wire text sent over the transport link.
pub fn to_wire(envelope: &Value) -> Result<String> {
    Ok(serde_json::to_string(envelope)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_request() {
        let raw = r#"{"jsonrpc":"2.0","id":7,"method":"UI.AddCommand","params":{"appId":1}}"#;
        let envelope = InboundEnvelope::parse(raw).unwrap();

        match envelope {
            InboundEnvelope::Request(req) => {
                assert_eq!(req.id, 7);
                assert_eq!(req.method, "UI.AddCommand");
                assert_eq!(req.params["appId"], 1);
            }
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_response() {
        let raw = r#"{"jsonrpc":"2.0","id":3,"result":{"code":0,"method":"UI.Show"}}"#;
        let envelope = InboundEnvelope::parse(raw).unwrap();

        match envelope {
            InboundEnvelope::Response(resp) => {
                assert_eq!(resp.id, 3);
                assert_eq!(resp.result["code"], 0);
            }
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_error_response() {
        let raw = r#"{"jsonrpc":"2.0","id":9,"error":{"code":4,"message":"rejected"}}"#;
        let envelope = InboundEnvelope::parse(raw).unwrap();

        match envelope {
            InboundEnvelope::Error(err) => {
                assert_eq!(err.id, 9);
                assert_eq!(err.error["message"], "rejected");
            }
            other => panic!("expected error response, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_notification() {
        let raw = r#"{"jsonrpc":"2.0","method":"VR.OnChoice","params":{"choiceID":42}}"#;
        let envelope = InboundEnvelope::parse(raw).unwrap();

        match envelope {
            InboundEnvelope::Notification(note) => {
                assert_eq!(note.method, "VR.OnChoice");
                assert_eq!(note.params["choiceID"], 42);
            }
            other => panic!("expected notification, got {:?}", other),
        }
    }

    #[test]
    fn test_response_wins_over_request_shape() {
        // A response that also echoes a method field classifies as a response.
        let raw = r#"{"jsonrpc":"2.0","id":1,"method":"UI.Show","result":{"code":0}}"#;
        let envelope = InboundEnvelope::parse(raw).unwrap();
        assert!(matches!(envelope, InboundEnvelope::Response(_)));
    }

    #[test]
    fn test_missing_params_defaults_to_null() {
        let raw = r#"{"jsonrpc":"2.0","id":3,"method":"UI.GetCapabilities"}"#;
        let envelope = InboundEnvelope::parse(raw).unwrap();

        match envelope {
            InboundEnvelope::Request(req) => assert!(req.params.is_null()),
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_rejected() {
        // Not JSON at all.
        assert!(InboundEnvelope::parse("not json").is_err());
        // Not an object.
        assert!(InboundEnvelope::parse(r#"[1,2,3]"#).is_err());
        // Missing jsonrpc tag.
        assert!(InboundEnvelope::parse(r#"{"id":1,"method":"UI.Show"}"#).is_err());
        // Wrong version.
        assert!(InboundEnvelope::parse(r#"{"jsonrpc":"1.0","id":1,"method":"UI.Show"}"#).is_err());
        // Non-numeric id.
        assert!(
            InboundEnvelope::parse(r#"{"jsonrpc":"2.0","id":"x","method":"UI.Show"}"#).is_err()
        );
        // Non-string method.
        assert!(InboundEnvelope::parse(r#"{"jsonrpc":"2.0","id":1,"method":5}"#).is_err());
        // id with no method, result, or error.
        assert!(InboundEnvelope::parse(r#"{"jsonrpc":"2.0","id":1}"#).is_err());
        // Nothing at all.
        assert!(InboundEnvelope::parse(r#"{"jsonrpc":"2.0"}"#).is_err());
    }

    #[test]
    fn test_builders_round_trip_through_classifier() {
        let req = request(5, "UI.Show", json!({"appId": 1}));
        assert_eq!(kind_of(&req), Some(EnvelopeKind::Request));
        assert!(matches!(
            InboundEnvelope::classify(req).unwrap(),
            InboundEnvelope::Request(_)
        ));

        let resp = result_with_code(5, ResultCode::Success, "UI.Show");
        assert_eq!(kind_of(&resp), Some(EnvelopeKind::Response));

        let err = error_response(5, ResultCode::Rejected, "nope");
        assert_eq!(kind_of(&err), Some(EnvelopeKind::Error));

        let note = notification("UI.OnCommand", json!({"commandId": 2}));
        assert_eq!(kind_of(&note), Some(EnvelopeKind::Notification));
        assert!(matches!(
            InboundEnvelope::classify(note).unwrap(),
            InboundEnvelope::Notification(_)
        ));
    }

    #[test]
    fn test_result_with_code_shape() {
        let value = result_with_code(7, ResultCode::Success, "UI.AddCommand");
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["result"]["code"], 0);
        assert_eq!(value["result"]["method"], "UI.AddCommand");
    }

    #[test]
    fn test_kind_of_rejects_non_envelopes() {
        assert_eq!(kind_of(&json!(42)), None);
        assert_eq!(kind_of(&json!({"id": 1})), None);
        assert_eq!(kind_of(&json!({})), None);
    }

    #[test]
    fn test_to_wire_is_parseable() {
        let value = notification("UI.OnDriverDistraction", json!({"state": "DD_ON"}));
        let wire = to_wire(&value).unwrap();
        let back: Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, value);
    }
}
