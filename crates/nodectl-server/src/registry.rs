//! Command registry mapping method names to command descriptors.
//!
//! The registry is filled from the static control table at construction and
//! may be extended until the server starts running. Once running it is only
//! read. Names are never overwritten.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use nodectl_rpc::{JsonRpcRequest, RpcError};
use serde_json::Value;
use tracing::debug;

use crate::dispatch::CommandContext;

/// Self-description of a command.
///
/// `summary` is the one-line usage shown in the full listing; `body` is the
/// prose shown when help for this command alone is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpText {
    pub summary: String,
    pub body: String,
}

impl HelpText {
    #[must_use]
    pub fn new(summary: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for HelpText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "{}", self.summary)
        } else {
            write!(f, "{}\n{}", self.summary, self.body)
        }
    }
}

/// Failure raised by a command handler
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Free-form failure, reported to the caller as a generic error.
    #[error("{0}")]
    Failed(String),

    /// Structured error reported to the caller unchanged.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl HandlerError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

pub type HandlerResult = std::result::Result<Value, HandlerError>;

/// A callable command.
///
/// `call` does the work. `help` describes the command and must never fail or
/// have side effects.
pub trait CommandHandler: Send + Sync {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns a `HandlerError` if the command cannot complete.
    fn call(&self, ctx: &CommandContext<'_>, request: &JsonRpcRequest) -> HandlerResult;

    fn help(&self) -> HelpText;
}

/// Handler built from a closure and a fixed help text.
pub struct FnCommand<F> {
    help: HelpText,
    func: F,
}

impl<F> FnCommand<F>
where
    F: Fn(&CommandContext<'_>, &JsonRpcRequest) -> HandlerResult + Send + Sync,
{
    #[must_use]
    pub fn new(help: HelpText, func: F) -> Self {
        Self { help, func }
    }
}

impl<F> CommandHandler for FnCommand<F>
where
    F: Fn(&CommandContext<'_>, &JsonRpcRequest) -> HandlerResult + Send + Sync,
{
    fn call(&self, ctx: &CommandContext<'_>, request: &JsonRpcRequest) -> HandlerResult {
        (self.func)(ctx, request)
    }

    fn help(&self) -> HelpText {
        self.help.clone()
    }
}

/// Static metadata for a registered command.
///
/// Each entry of `param_names` names one positional slot; `"a|b"` accepts
/// either key `a` or key `b` for that slot when called with named arguments.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub category: String,
    pub name: String,
    pub handler: Arc<dyn CommandHandler>,
    pub param_names: Vec<String>,
}

impl CommandDescriptor {
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
        param_names: &[&str],
    ) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
            handler,
            param_names: param_names.iter().map(ToString::to_string).collect(),
        }
    }

    /// Address of the handler object, shared by every name bound to it.
    #[must_use]
    pub fn handler_id(&self) -> *const () {
        Arc::as_ptr(&self.handler).cast::<()>()
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("category", &self.category)
            .field("name", &self.name)
            .field("param_names", &self.param_names)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<CommandDescriptor>>>,
    running: Arc<AtomicBool>,
}

impl CommandRegistry {
    /// Create an empty registry that refuses registration while `running`
    /// is set.
    #[must_use]
    pub fn new(running: Arc<AtomicBool>) -> Self {
        Self {
            commands: RwLock::new(HashMap::new()),
            running,
        }
    }

    /// Create a registry preloaded with a static command table.
    #[must_use]
    pub fn with_commands(
        running: Arc<AtomicBool>,
        table: impl IntoIterator<Item = CommandDescriptor>,
    ) -> Self {
        let commands = table
            .into_iter()
            .map(|command| (command.name.clone(), Arc::new(command)))
            .collect();
        Self {
            commands: RwLock::new(commands),
            running,
        }
    }

    /// Add a command under its own name.
    ///
    /// Returns `false` without touching the table if the server is already
    /// running or the name is taken.
    pub fn append_command(&self, command: CommandDescriptor) -> bool {
        let name = command.name.clone();
        self.append_command_as(&name, command)
    }

    /// Add a command under `name`, which may differ from the descriptor's
    /// own name (aliases).
    pub fn append_command_as(&self, name: &str, command: CommandDescriptor) -> bool {
        if self.running.load(Ordering::SeqCst) {
            debug!("Refusing to register {} while running", name);
            return false;
        }

        let mut commands = self
            .commands
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if commands.contains_key(name) {
            debug!("Refusing to overwrite command {}", name);
            return false;
        }

        debug!("Registered command {} ({})", name, command.category);
        commands.insert(name.to_string(), Arc::new(command));
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<CommandDescriptor>> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of all registered commands, in no particular order.
    #[must_use]
    pub fn list_commands(&self) -> Vec<String> {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Registered entries sorted by `(category, name)`.
    ///
    /// The name is the registration key, so an alias sorts under its own name.
    #[must_use]
    pub fn sorted_for_help(&self) -> Vec<(String, Arc<CommandDescriptor>)> {
        let mut entries: Vec<_> = self
            .commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, command)| (name.clone(), Arc::clone(command)))
            .collect();
        entries.sort_by(|(a_name, a), (b_name, b)| {
            (&a.category, a_name).cmp(&(&b.category, b_name))
        });
        entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(name: &str, category: &str) -> CommandDescriptor {
        let handler = FnCommand::new(HelpText::new(name, ""), |_ctx, req| {
            Ok(req.params.to_value())
        });
        CommandDescriptor::new(category, name, Arc::new(handler), &["value"])
    }

    fn idle_registry() -> CommandRegistry {
        CommandRegistry::new(Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn test_append_and_get() {
        let registry = idle_registry();
        assert!(registry.is_empty());
        assert!(registry.append_command(echo("echo", "util")));

        let found = registry.get("echo").unwrap();
        assert_eq!(found.name, "echo");
        assert_eq!(found.param_names, vec!["value"]);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_name_is_rejected_and_table_unchanged() {
        let registry = idle_registry();
        assert!(registry.append_command(echo("echo", "util")));
        let first = registry.get("echo").unwrap();

        assert!(!registry.append_command(echo("echo", "other")));
        assert_eq!(registry.len(), 1);
        let still = registry.get("echo").unwrap();
        assert!(Arc::ptr_eq(&first, &still));
        assert_eq!(still.category, "util");
    }

    #[test]
    fn test_append_refused_while_running() {
        let running = Arc::new(AtomicBool::new(true));
        let registry = CommandRegistry::new(Arc::clone(&running));
        assert!(!registry.append_command(echo("echo", "util")));
        assert!(registry.is_empty());

        running.store(false, Ordering::SeqCst);
        assert!(registry.append_command(echo("echo", "util")));
    }

    #[test]
    fn test_with_commands_and_list() {
        let registry = CommandRegistry::with_commands(
            Arc::new(AtomicBool::new(false)),
            vec![echo("a", "x"), echo("b", "y")],
        );
        let mut names = registry.list_commands();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_sorted_for_help_then_name() {
        let registry = idle_registry();
        registry.append_command(echo("zeta", "alpha"));
        registry.append_command(echo("beta", "omega"));
        registry.append_command(echo("alpha", "alpha"));

        let order: Vec<String> = registry
            .sorted_for_help()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(order, vec!["alpha", "zeta", "beta"]);
    }

    #[test]
    fn test_alias_shares_handler_identity() {
        let registry = idle_registry();
        let command = echo("echo", "util");
        let alias = command.clone();
        assert!(registry.append_command(command));
        assert!(registry.append_command_as("echo2", alias));

        let a = registry.get("echo").unwrap();
        let b = registry.get("echo2").unwrap();
        assert_eq!(a.handler_id(), b.handler_id());
    }

    #[test]
    fn test_help_text_display() {
        let text = HelpText::new("stop", "\nStop the server.");
        assert_eq!(text.to_string(), "stop\n\nStop the server.");
        assert_eq!(HelpText::new("ping", "").to_string(), "ping");
    }

    #[test]
    fn test_handler_error_from_rpc_error() {
        let err: HandlerError = RpcError::invalid_parameter("bad").into();
        assert!(matches!(err, HandlerError::Rpc(ref e) if e.code == -8));
        assert_eq!(HandlerError::failed("nope").to_string(), "nope");
    }
}
