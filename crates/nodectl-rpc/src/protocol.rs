//! JSON-RPC envelope types.
//!
//! The control plane speaks JSON-RPC 1.0 for maximum compatibility, borrowing
//! the 2.0 conventions for the contents of `error`. Replies always carry all of
//! `result`, `error` and `id`; when `error` is set, `result` is an empty object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INTERNAL_ERROR: i32 = -32603;
pub const MISC_ERROR: i32 = -1;
pub const TYPE_ERROR: i32 = -3;
pub const INVALID_PARAMETER: i32 = -8;
pub const IN_WARMUP: i32 = -28;

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(PARSE_ERROR, message)
    }

    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, message)
    }

    #[must_use]
    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not found")
    }

    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    /// Dispatch attempted before warmup finished; carries the warmup status.
    #[must_use]
    pub fn in_warmup(status: impl Into<String>) -> Self {
        Self::new(IN_WARMUP, status)
    }

    /// Generic failure raised from inside a command handler.
    #[must_use]
    pub fn misc_error(message: impl Into<String>) -> Self {
        Self::new(MISC_ERROR, message)
    }

    #[must_use]
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(TYPE_ERROR, message)
    }

    #[must_use]
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMETER, message)
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}

/// Build an error object.
#[must_use]
pub fn build_error(code: i32, message: impl Into<String>) -> RpcError {
    RpcError::new(code, message)
}

/// Parameters as they arrived on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Params {
    #[default]
    Absent,
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl Params {
    /// Number of supplied arguments (positional slots or named keys).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Params::Absent => 0,
            Params::Positional(values) => values.len(),
            Params::Named(map) => map.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        matches!(self, Params::Named(_))
    }

    /// Positional argument at `index`. Named and absent params yield `None`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            Params::Positional(values) => values.get(index),
            Params::Absent | Params::Named(_) => None,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Params::Absent => Value::Null,
            Params::Positional(values) => Value::Array(values.clone()),
            Params::Named(map) => Value::Object(map.clone()),
        }
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Positional(values)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Named(map)
    }
}

/// A request as seen by the dispatcher.
///
/// `uri` and `auth_user` are filled in by the transport before parsing; a
/// parsed request keeps them. `help_probe` asks the handler to describe
/// itself instead of running.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub id: Value,
    pub method: String,
    pub params: Params,
    pub help_probe: bool,
    pub uri: String,
    pub auth_user: String,
}

impl Default for JsonRpcRequest {
    fn default() -> Self {
        Self {
            id: Value::Null,
            method: String::new(),
            params: Params::Absent,
            help_probe: false,
            uri: String::new(),
            auth_user: String::new(),
        }
    }
}

impl JsonRpcRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, params: impl Into<Params>) -> Self {
        Self {
            method: method.into(),
            params: params.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Value) -> Self {
        self.id = id;
        self
    }

    /// Fill this request from a raw envelope.
    ///
    /// The id is read first so that an error reply for a malformed request
    /// can still be correlated by the caller.
    ///
    /// # Errors
    ///
    /// Returns an `INVALID_REQUEST` error if the envelope is not an object,
    /// the method is missing or not a string, or params is neither an array
    /// nor an object.
    pub fn parse(&mut self, envelope: &Value) -> Result<(), RpcError> {
        let Value::Object(request) = envelope else {
            return Err(RpcError::invalid_request("Invalid Request object"));
        };

        self.id = request.get("id").cloned().unwrap_or(Value::Null);

        self.method = match request.get("method") {
            None | Some(Value::Null) => {
                return Err(RpcError::invalid_request("Missing method"));
            }
            Some(Value::String(method)) => method.clone(),
            Some(_) => return Err(RpcError::invalid_request("Method must be a string")),
        };
        tracing::trace!("Parsed request method={}", self.method);

        self.params = match request.get("params") {
            None | Some(Value::Null) => Params::Absent,
            Some(Value::Array(values)) => Params::Positional(values.clone()),
            Some(Value::Object(map)) => Params::Named(map.clone()),
            Some(_) => {
                return Err(RpcError::invalid_request(
                    "Params must be an array or object",
                ));
            }
        };

        Ok(())
    }
}

/// Build a request envelope.
#[must_use]
pub fn build_request(method: &str, params: Value, id: Value) -> Value {
    json!({
        "method": method,
        "params": params,
        "id": id,
    })
}

/// A reply envelope. All three members are always serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Value,
}

impl Reply {
    /// Build a reply; an error forces `result` to an empty object.
    #[must_use]
    pub fn new(result: Value, error: Option<RpcError>, id: Value) -> Self {
        let result = if error.is_some() {
            Value::Object(Map::new())
        } else {
            result
        };
        Self { result, error, id }
    }

    #[must_use]
    pub fn success(result: Value, id: Value) -> Self {
        Self::new(result, None, id)
    }

    #[must_use]
    pub fn failure(error: RpcError, id: Value) -> Self {
        Self::new(Value::Null, Some(error), id)
    }

    /// Convert a dispatch outcome into a reply.
    #[must_use]
    pub fn from_outcome(outcome: Result<Value, RpcError>, id: Value) -> Self {
        match outcome {
            Ok(result) => Self::success(result, id),
            Err(error) => Self::failure(error, id),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "result": self.result,
            "error": self.error,
            "id": self.id,
        })
    }

    /// Newline-terminated text form.
    #[must_use]
    pub fn to_text(&self) -> String {
        format!("{}\n", self.to_value())
    }

    /// Split the reply back into a dispatch outcome.
    ///
    /// # Errors
    ///
    /// Returns the carried error if the reply holds one.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        }
    }
}

/// Build a reply envelope as a JSON value.
#[must_use]
pub fn build_reply(result: Value, error: Option<RpcError>, id: Value) -> Value {
    Reply::new(result, error, id).to_value()
}

/// Build a reply and serialize it with a trailing newline.
#[must_use]
pub fn serialize_reply(result: Value, error: Option<RpcError>, id: Value) -> String {
    Reply::new(result, error, id).to_text()
}

/// A frame body is a single envelope (object) or a batch (array).
///
/// # Errors
///
/// Returns a `PARSE_ERROR` for any other JSON value.
pub fn check_body(body: &Value) -> Result<(), RpcError> {
    if body.is_object() || body.is_array() {
        Ok(())
    } else {
        Err(RpcError::parse_error("Top-level object parse error"))
    }
}

/// Errors raised while correlating a batch reply
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("Malformed batch: {0}")]
    MalformedBatch(&'static str),
}

/// Order the members of a batch reply by their integer `id`.
///
/// The result has exactly `expected` slots. Slots whose id never appeared stay
/// `Value::Null`; a repeated id overwrites the earlier member.
///
/// # Errors
///
/// Returns `BatchError::MalformedBatch` if `reply` is not an array, a member
/// is not an object, or a member id is not an integer below `expected`.
pub fn parse_batch_reply(reply: &Value, expected: usize) -> Result<Vec<Value>, BatchError> {
    let Value::Array(members) = reply else {
        return Err(BatchError::MalformedBatch("Batch must be an array"));
    };

    let mut batch = vec![Value::Null; expected];
    for member in members {
        if !member.is_object() {
            return Err(BatchError::MalformedBatch("Batch member must be object"));
        }
        let id = member
            .get("id")
            .and_then(Value::as_u64)
            .ok_or(BatchError::MalformedBatch("Batch member id must be an integer"))?;
        let slot = usize::try_from(id)
            .ok()
            .filter(|slot| *slot < expected)
            .ok_or(BatchError::MalformedBatch("Batch member id larger than size"))?;
        batch[slot] = member.clone();
    }
    Ok(batch)
}
