//! Control-plane command dispatcher for nodectl.
//!
//! An [`RpcServer`] owns a registry of commands and answers JSON-RPC request
//! bodies against it: single requests, batches, and help queries. The
//! [`socket`] module serves it over a Unix socket for the `nodectld` binary.

pub mod batch;
pub mod binder;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod help;
pub mod registry;
pub mod server;
pub(crate) mod session;
pub mod signals;
pub mod socket;
pub mod timer;
pub mod typecheck;
pub mod warmup;

pub use binder::transform_named_arguments;
pub use commands::control_commands;
pub use config::ServerConfig;
pub use dispatch::CommandContext;
pub use error::{Result, ServerError};
pub use help::{HIDDEN_CATEGORY, help_example_cli, help_example_rpc};
pub use registry::{
    CommandDescriptor, CommandHandler, CommandRegistry, FnCommand, HandlerError, HandlerResult,
    HelpText,
};
pub use server::RpcServer;
pub use signals::{LifecycleSignals, Signal};
pub use timer::{DeferredTimers, TimerAction, TimerBackend, TimerHandle, TokioTimerBackend};
pub use typecheck::{JsonType, rpc_type_check, rpc_type_check_argument, rpc_type_check_obj};
pub use warmup::WarmupGate;
