//! Help text aggregation.

use std::collections::HashSet;
use std::fmt::Write as _;

use nodectl_rpc::{JsonRpcRequest, Params, RpcError};
use serde_json::Value;

use crate::error::ServerError;
use crate::server::RpcServer;

/// Commands in this category are left out of the full listing.
pub const HIDDEN_CATEGORY: &str = "hidden";

impl RpcServer {
    /// Help for one command, or the summary listing of every command.
    ///
    /// A single command is asked for its help through the dispatcher, so the
    /// warmup gate and pre-command observers apply. The listing shows the
    /// first help line of each handler once, grouped under a heading per
    /// category.
    #[must_use]
    pub fn help(&self, command: Option<&str>, template: &JsonRpcRequest) -> String {
        match command {
            Some(name) => self.help_for(name, template),
            None => self.help_listing(),
        }
    }

    fn help_for(&self, name: &str, template: &JsonRpcRequest) -> String {
        let mut probe = template.clone();
        probe.method = name.to_string();
        probe.params = Params::Absent;
        probe.help_probe = true;

        match self.execute(&probe) {
            Ok(Value::String(text)) => text,
            Ok(other) => other.to_string(),
            Err(ServerError::MethodNotFound(_)) => format!("help: unknown command: {name}"),
            Err(e) => RpcError::from(e).message,
        }
    }

    fn help_listing(&self) -> String {
        let mut out = String::new();
        let mut category: Option<String> = None;
        let mut seen = HashSet::new();

        for (_, command) in self.registry.sorted_for_help() {
            if command.category == HIDDEN_CATEGORY || !seen.insert(command.handler_id()) {
                continue;
            }

            if category.as_deref() != Some(command.category.as_str()) {
                if category.is_some() {
                    out.push('\n');
                }
                let _ = writeln!(out, "== {} ==", capitalize(&command.category));
                category = Some(command.category.clone());
            }

            let help = command.handler.help();
            let summary = help.summary.lines().next().unwrap_or_default();
            let _ = writeln!(out, "{summary}");
        }

        out.pop();
        out
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Example invocation through the control CLI, for help bodies.
#[must_use]
pub fn help_example_cli(method: &str, args: &str) -> String {
    format!("> nodectl {method} {args}\n")
}

/// Example raw JSON-RPC request, for help bodies.
#[must_use]
pub fn help_example_rpc(method: &str, args: &str) -> String {
    format!(
        "> nodectl --raw '{{\"jsonrpc\": \"1.0\", \"id\": \"example\", \"method\": \"{method}\", \"params\": [{args}]}}'\n"
    )
}
