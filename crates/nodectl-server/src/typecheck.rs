//! Argument type checks for command handlers.
//!
//! These only check the types of what was passed; argument count is the
//! handler's business.

use std::fmt;

use nodectl_rpc::{Params, RpcError};
use serde_json::{Map, Value};

/// Coarse JSON value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Bool,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Bool => "bool",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Check the leading positional arguments against `expected`.
///
/// Arguments beyond the end of `params` are not checked. With `allow_null`,
/// a `null` argument passes any check.
///
/// # Errors
///
/// Returns a `TYPE_ERROR` for the first argument of the wrong type.
pub fn rpc_type_check(
    params: &Params,
    expected: &[JsonType],
    allow_null: bool,
) -> Result<(), RpcError> {
    for (index, expected) in expected.iter().enumerate() {
        let Some(value) = params.get(index) else {
            break;
        };
        if allow_null && value.is_null() {
            continue;
        }
        rpc_type_check_argument(value, *expected)?;
    }
    Ok(())
}

/// Check one argument.
///
/// # Errors
///
/// Returns a `TYPE_ERROR` naming both types on mismatch.
pub fn rpc_type_check_argument(value: &Value, expected: JsonType) -> Result<(), RpcError> {
    let actual = JsonType::of(value);
    if actual == expected {
        Ok(())
    } else {
        Err(RpcError::type_error(format!(
            "Expected type {expected}, got {actual}"
        )))
    }
}

/// Check the members of an object argument.
///
/// `expected` maps keys to their type; `None` accepts any type but still
/// requires the key unless `allow_null` is set. In `strict` mode keys not
/// listed in `expected` are rejected.
///
/// # Errors
///
/// Returns a `TYPE_ERROR` for a missing key, a mistyped member, or (in strict
/// mode) an unexpected key.
pub fn rpc_type_check_obj(
    object: &Map<String, Value>,
    expected: &[(&str, Option<JsonType>)],
    allow_null: bool,
    strict: bool,
) -> Result<(), RpcError> {
    for (key, kind) in expected {
        let value = object.get(*key).unwrap_or(&Value::Null);
        if !allow_null && value.is_null() {
            return Err(RpcError::type_error(format!("Missing {key}")));
        }

        let Some(kind) = kind else {
            continue;
        };
        let actual = JsonType::of(value);
        if actual != *kind && !(allow_null && value.is_null()) {
            return Err(RpcError::type_error(format!(
                "Expected type {kind} for {key}, got {actual}"
            )));
        }
    }

    if strict
        && let Some(key) = object
            .keys()
            .find(|key| !expected.iter().any(|(name, _)| *name == key.as_str()))
    {
        return Err(RpcError::type_error(format!("Unexpected key {key}")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodectl_rpc::TYPE_ERROR;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn test_argument_mismatch_message() {
        let err = rpc_type_check_argument(&json!(5), JsonType::String).unwrap_err();
        assert_eq!(err.code, TYPE_ERROR);
        assert_eq!(err.message, "Expected type string, got number");
    }

    #[test]
    fn test_argument_match() {
        assert!(rpc_type_check_argument(&json!([1]), JsonType::Array).is_ok());
        assert!(rpc_type_check_argument(&json!(true), JsonType::Bool).is_ok());
    }

    #[test]
    fn test_positional_checks_only_supplied() {
        let params = Params::from(vec![json!("stop")]);
        let types = [JsonType::String, JsonType::Number];
        assert!(rpc_type_check(&params, &types, false).is_ok());
    }

    #[test]
    fn test_positional_null_allowed() {
        let params = Params::from(vec![json!(null), json!(3)]);
        let types = [JsonType::String, JsonType::Number];
        assert!(rpc_type_check(&params, &types, true).is_ok());

        let err = rpc_type_check(&params, &types, false).unwrap_err();
        assert_eq!(err.message, "Expected type string, got null");
    }

    #[test]
    fn test_obj_missing_key() {
        let obj = object(json!({"a": 1}));
        let err =
            rpc_type_check_obj(&obj, &[("a", None), ("b", None)], false, false).unwrap_err();
        assert_eq!(err.message, "Missing b");

        assert!(rpc_type_check_obj(&obj, &[("a", None), ("b", None)], true, false).is_ok());
    }

    #[test]
    fn test_obj_wrong_type() {
        let obj = object(json!({"count": "3"}));
        let err = rpc_type_check_obj(&obj, &[("count", Some(JsonType::Number))], false, false)
            .unwrap_err();
        assert_eq!(err.message, "Expected type number for count, got string");
    }

    #[test]
    fn test_obj_strict_rejects_extra_key() {
        let obj = object(json!({"a": 1, "extra": 2}));
        let expected = [("a", Some(JsonType::Number))];
        assert!(rpc_type_check_obj(&obj, &expected, false, false).is_ok());

        let err = rpc_type_check_obj(&obj, &expected, false, true).unwrap_err();
        assert_eq!(err.code, TYPE_ERROR);
        assert_eq!(err.message, "Unexpected key extra");
    }
}
