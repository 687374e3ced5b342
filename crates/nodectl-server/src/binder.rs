//! Named-to-positional argument binding.
//!
//! A command declares its positional slots by name. A request carrying an
//! object of named arguments is rewritten into the positional array the
//! handler expects: slots skipped between two supplied arguments become
//! `null`, slots skipped after the last supplied argument are dropped.

use std::collections::HashSet;

use nodectl_rpc::{JsonRpcRequest, Params};
use serde_json::Value;

use crate::error::{Result, ServerError};

/// Rewrite `request`'s named params into positional params for `param_names`.
///
/// Each entry of `param_names` may list `|`-separated aliases; the first alias
/// present in the request wins. Positional or absent params are returned
/// unchanged.
///
/// # Errors
///
/// Returns `ServerError::UnknownNamedParameter` with the first (in request
/// order) key that matched no declared slot.
pub fn transform_named_arguments(
    request: &JsonRpcRequest,
    param_names: &[String],
) -> Result<JsonRpcRequest> {
    let Params::Named(args) = &request.params else {
        return Ok(request.clone());
    };

    let mut consumed: HashSet<&str> = HashSet::with_capacity(args.len());
    let mut positional = Vec::with_capacity(param_names.len());
    let mut holes = 0usize;

    for slot in param_names {
        let matched = slot
            .split('|')
            .find(|alias| !consumed.contains(alias) && args.contains_key(*alias));

        match matched {
            Some(alias) => {
                positional.extend(std::iter::repeat_n(Value::Null, holes));
                holes = 0;
                positional.push(args[alias].clone());
                consumed.insert(alias);
            }
            None => holes += 1,
        }
    }

    if let Some(unknown) = args.keys().find(|key| !consumed.contains(key.as_str())) {
        return Err(ServerError::UnknownNamedParameter(unknown.clone()));
    }

    let mut out = request.clone();
    out.params = Params::Positional(positional);
    Ok(out)
}
