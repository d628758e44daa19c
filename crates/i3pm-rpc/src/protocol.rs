//! JSON-RPC 2.0 protocol types for the i3pm daemon socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

// Standard JSON-RPC 2.0 error codes.
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// Daemon-specific error code ranges (1000-1599), one range per error kind.
pub const VALIDATION_FAILED: i32 = 1000;
pub const CONFIGURATION_ERROR: i32 = 1100;
pub const FILESYSTEM_ERROR: i32 = 1200;
pub const VCS_ERROR: i32 = 1300;
pub const COMPOSITOR_IPC_ERROR: i32 = 1400;
pub const STATE_ERROR: i32 = 1500;
pub const AUTHENTICATION_ERROR: i32 = 1600;

/// JSON-RPC 2.0 request id: either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        RequestId::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl Request {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }

    #[must_use]
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: RequestId,
}

impl Response {
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    #[must_use]
    pub fn error(id: RequestId, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Structured JSON-RPC error: `{code, message, suggestion?, context?}` per
/// the error-handling design (suggestion/context ride in `data`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_suggestion(code: i32, message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(serde_json::json!({ "suggestion": suggestion.into() })),
        }
    }

    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    #[must_use]
    pub fn invalid_request() -> Self {
        Self::new(INVALID_REQUEST, "Invalid Request")
    }

    #[must_use]
    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found")
    }

    #[must_use]
    pub fn method_not_found_named(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("method not found: {method}"))
    }

    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    #[must_use]
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(VALIDATION_FAILED, message)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Incoming message that could be a request, response, or notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

impl Message {
    /// Parse a single JSON-RPC line into a `Message`.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or doesn't match any message type.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize this message to JSON (without the trailing newline).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    #[must_use]
    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(r) if r.id.is_some())
    }

    #[must_use]
    pub fn is_notification(&self) -> bool {
        matches!(self, Message::Request(r) if r.id.is_none())
            || matches!(self, Message::Notification(_))
    }

    #[must_use]
    pub fn is_response(&self) -> bool {
        matches!(self, Message::Response(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization_includes_jsonrpc_version() {
        let req = Request::new("test", Some(serde_json::json!({"key": "value"})), 1.into());
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"test\""));
        assert!(json.contains("\"id\":1"));
    }

    #[test]
    fn request_without_params_omits_field() {
        let req = Request::new("ping", None, 1.into());
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("\"params\""));
    }

    #[test]
    fn notification_has_no_id() {
        let notif = Request::notification("test", None);
        let json = serde_json::to_string(&notif).unwrap();
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn response_success_omits_error() {
        let resp = Response::success(1.into(), serde_json::json!({"status": "ok"}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn response_error_omits_result() {
        let resp = Response::error(1.into(), RpcError::method_not_found());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("\"result\""));
        assert!(json.contains("-32601"));
    }

    #[test]
    fn response_roundtrip() {
        let resp = Response::success(42.into(), serde_json::json!({"data": [1, 2, 3]}));
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, RequestId::Number(42));
        assert!(parsed.result.is_some());
    }

    #[test]
    fn request_id_serialization_untagged() {
        let json = serde_json::to_string(&RequestId::Number(123)).unwrap();
        assert_eq!(json, "123");
        let json = serde_json::to_string(&RequestId::String("abc".into())).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn message_parse_distinguishes_request_notification_response() {
        let req = Message::parse(r#"{"jsonrpc":"2.0","method":"m","id":1}"#).unwrap();
        assert!(req.is_request());

        let notif = Message::parse(r#"{"jsonrpc":"2.0","method":"m"}"#).unwrap();
        assert!(notif.is_notification());

        let resp = Message::parse(r#"{"jsonrpc":"2.0","result":{},"id":1}"#).unwrap();
        assert!(resp.is_response());
    }

    #[test]
    fn rpc_error_with_suggestion_carries_suggestion_in_data() {
        let err = RpcError::with_suggestion(
            VALIDATION_FAILED,
            "workspace number out of range",
            "use a value between 1 and 70",
        );
        assert_eq!(err.code, VALIDATION_FAILED);
        assert_eq!(err.data.unwrap()["suggestion"], "use a value between 1 and 70");
    }

    #[test]
    fn daemon_error_ranges_are_distinct() {
        let ranges = [
            VALIDATION_FAILED,
            CONFIGURATION_ERROR,
            FILESYSTEM_ERROR,
            VCS_ERROR,
            COMPOSITOR_IPC_ERROR,
            STATE_ERROR,
            AUTHENTICATION_ERROR,
        ];
        for (i, a) in ranges.iter().enumerate() {
            for b in &ranges[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
