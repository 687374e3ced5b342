//! Built-in control commands: `help`, `stop`, `uptime`.

use std::sync::Arc;

use nodectl_rpc::JsonRpcRequest;
use serde_json::Value;

use crate::dispatch::CommandContext;
use crate::help::{help_example_cli, help_example_rpc};
use crate::registry::{CommandDescriptor, CommandHandler, HandlerError, HandlerResult, HelpText};
use crate::typecheck::{JsonType, rpc_type_check};

const CATEGORY: &str = "control";

struct Help;

impl CommandHandler for Help {
    fn call(&self, ctx: &CommandContext<'_>, request: &JsonRpcRequest) -> HandlerResult {
        if request.params.len() > 1 {
            return Err(HandlerError::Failed(self.help().to_string()));
        }
        rpc_type_check(&request.params, &[JsonType::String], true)?;

        let command = request
            .params
            .get(0)
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty());
        Ok(Value::String(ctx.help(command, request)))
    }

    fn help(&self) -> HelpText {
        HelpText::new(
            "help ( \"command\" )",
            "\nList all commands, or get help for a specified command.\n\
             \nArguments:\n\
             1. \"command\"     (string, optional) The command to get help on\n\
             \nResult:\n\
             \"text\"     (string) The help text\n",
        )
    }
}

struct Stop;

impl CommandHandler for Stop {
    fn call(&self, ctx: &CommandContext<'_>, request: &JsonRpcRequest) -> HandlerResult {
        // A single ignored argument is tolerated for older callers.
        if request.params.len() > 1 {
            return Err(HandlerError::Failed(self.help().to_string()));
        }
        ctx.request_shutdown();
        Ok(Value::String("nodectl server stopping".to_string()))
    }

    fn help(&self) -> HelpText {
        HelpText::new("stop", "\nStop the nodectl server.")
    }
}

struct Uptime;

impl CommandHandler for Uptime {
    fn call(&self, ctx: &CommandContext<'_>, request: &JsonRpcRequest) -> HandlerResult {
        if request.params.len() > 1 {
            return Err(HandlerError::Failed(self.help().to_string()));
        }
        Ok(Value::from(ctx.uptime().as_secs()))
    }

    fn help(&self) -> HelpText {
        HelpText::new(
            "uptime",
            format!(
                "\nReturns the total uptime of the server.\n\
                 \nResult:\n\
                 ttt        (numeric) The number of seconds that the server has been running\n\
                 \nExamples:\n{}{}",
                help_example_cli("uptime", ""),
                help_example_rpc("uptime", "")
            ),
        )
    }
}

/// The static table every server starts with.
#[must_use]
pub fn control_commands() -> Vec<CommandDescriptor> {
    vec![
        CommandDescriptor::new(CATEGORY, "help", Arc::new(Help), &["command"]),
        CommandDescriptor::new(CATEGORY, "stop", Arc::new(Stop), &[]),
        CommandDescriptor::new(CATEGORY, "uptime", Arc::new(Uptime), &[]),
    ]
}
