//! Turning raw request bodies into reply text.

use nodectl_rpc::{JsonRpcRequest, Reply, RpcError, check_body};
use serde_json::Value;
use tracing::debug;

use crate::server::RpcServer;

impl RpcServer {
    /// Parse and execute one envelope, never failing.
    ///
    /// `template` supplies the transport fields. Errors become an error reply
    /// carrying whatever id was parsed before the failure.
    #[must_use]
    pub fn execute_one(&self, template: &JsonRpcRequest, envelope: &Value) -> Reply {
        let mut request = template.clone();
        let outcome = request
            .parse(envelope)
            .and_then(|()| self.execute(&request).map_err(RpcError::from));
        if let Err(e) = &outcome {
            debug!("Request {} failed: {}", request.method, e);
        }
        Reply::from_outcome(outcome, request.id)
    }

    /// Execute a batch in order and serialize the replies as one array.
    ///
    /// Each member is handled on its own; a failing member becomes an error
    /// reply and the rest still run.
    #[must_use]
    pub fn execute_batch(&self, template: &JsonRpcRequest, members: &[Value]) -> String {
        debug!("Executing batch of {}", members.len());
        let replies: Vec<Value> = members
            .iter()
            .map(|member| self.execute_one(template, member).to_value())
            .collect();
        format!("{}\n", Value::Array(replies))
    }

    /// Answer a whole request body: an array is a batch, an object a single
    /// request. Anything else is a parse error.
    #[must_use]
    pub fn handle_body(&self, template: &JsonRpcRequest, body: &Value) -> String {
        if let Err(e) = check_body(body) {
            return Reply::failure(e, Value::Null).to_text();
        }
        match body {
            Value::Array(members) => self.execute_batch(template, members),
            _ => self.execute_one(template, body).to_text(),
        }
    }
}
