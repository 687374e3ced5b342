//! Single-request dispatch.

use std::time::Duration;

use nodectl_rpc::{JsonRpcRequest, Params};
use serde_json::Value;
use tracing::debug;

use crate::binder::transform_named_arguments;
use crate::error::{Result, ServerError};
use crate::registry::HandlerError;
use crate::server::RpcServer;
use crate::timer::TimerAction;

/// What a handler may touch on the server while it runs.
pub struct CommandContext<'a> {
    server: &'a RpcServer,
}

impl<'a> CommandContext<'a> {
    #[must_use]
    pub fn new(server: &'a RpcServer) -> Self {
        Self { server }
    }

    #[must_use]
    pub fn server(&self) -> &'a RpcServer {
        self.server
    }

    pub fn request_shutdown(&self) {
        self.server.request_shutdown();
    }

    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.server.uptime()
    }

    /// Full help listing, or the help of one command.
    #[must_use]
    pub fn help(&self, command: Option<&str>, template: &JsonRpcRequest) -> String {
        self.server.help(command, template)
    }

    /// # Errors
    ///
    /// Returns `ServerError::NoTimerBackend` if no backend is installed.
    pub fn run_later(&self, name: &str, action: TimerAction, delay_secs: u64) -> Result<()> {
        self.server.run_later(name, action, delay_secs)
    }

    #[must_use]
    pub fn is_deprecated_rpc_enabled(&self, method: &str) -> bool {
        self.server.is_deprecated_rpc_enabled(method)
    }
}

impl RpcServer {
    /// Execute one parsed request.
    ///
    /// A request in help-probe mode is answered with the command's help text
    /// instead of running it.
    ///
    /// # Errors
    ///
    /// Returns `InWarmup` before warmup has finished, `MethodNotFound` for an
    /// unregistered method, `UnknownNamedParameter` from argument binding, and
    /// the handler's own failure otherwise.
    pub fn execute(&self, request: &JsonRpcRequest) -> Result<Value> {
        let (in_warmup, status) = self.warmup.status();
        if in_warmup {
            return Err(ServerError::InWarmup(status));
        }

        let command = self
            .registry
            .get(&request.method)
            .ok_or_else(|| ServerError::MethodNotFound(request.method.clone()))?;

        self.signals.pre_command.emit(&command);

        if request.help_probe {
            return Ok(Value::String(command.handler.help().to_string()));
        }

        debug!(
            "Dispatching {} (user={:?}, uri={:?})",
            request.method, request.auth_user, request.uri
        );

        let ctx = CommandContext::new(self);
        let outcome = if matches!(request.params, Params::Named(_)) {
            let bound = transform_named_arguments(request, &command.param_names)?;
            command.handler.call(&ctx, &bound)
        } else {
            command.handler.call(&ctx, request)
        };

        outcome.map_err(|e| match e {
            HandlerError::Failed(message) => ServerError::HandlerFailure(message),
            HandlerError::Rpc(e) => ServerError::Rpc(e),
        })
    }
}
