//! The control-plane server instance.
//!
//! `RpcServer` owns every piece of dispatcher state: the command registry,
//! the warmup gate, lifecycle observers and deferred timers. Nothing is
//! process-global, so tests can run many servers side by side.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::commands::control_commands;
use crate::config::ServerConfig;
use crate::registry::{CommandDescriptor, CommandRegistry};
use crate::signals::LifecycleSignals;
use crate::timer::{DeferredTimers, TimerAction};
use crate::warmup::WarmupGate;

pub struct RpcServer {
    pub(crate) registry: CommandRegistry,
    pub(crate) warmup: WarmupGate,
    pub(crate) signals: LifecycleSignals,
    timers: DeferredTimers,
    running: Arc<AtomicBool>,
    started_at: Instant,
    shutdown: CancellationToken,
    config: ServerConfig,
}

impl Default for RpcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcServer {
    /// Server with the control commands and default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        let running = Arc::new(AtomicBool::new(false));
        Self {
            registry: CommandRegistry::with_commands(Arc::clone(&running), control_commands()),
            warmup: WarmupGate::new(),
            signals: LifecycleSignals::default(),
            timers: DeferredTimers::new(),
            running,
            started_at: Instant::now(),
            shutdown: CancellationToken::new(),
            config,
        }
    }

    /// Register a command. Refused once the server is running or if the name
    /// is taken.
    pub fn append_command(&self, command: CommandDescriptor) -> bool {
        self.registry.append_command(command)
    }

    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    #[must_use]
    pub fn warmup(&self) -> &WarmupGate {
        &self.warmup
    }

    #[must_use]
    pub fn timers(&self) -> &DeferredTimers {
        &self.timers
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Mark the server running and notify `started` observers.
    pub fn start(&self) {
        info!("Starting RPC server");
        self.running.store(true, Ordering::SeqCst);
        self.signals.started.emit(&());
    }

    /// Stop accepting new work.
    pub fn interrupt(&self) {
        info!("Interrupting RPC server");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Cancel pending timers and notify `stopped` observers.
    pub fn stop(&self) {
        info!("Stopping RPC server");
        self.timers.clear();
        self.signals.stopped.emit(&());
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask whoever owns the serving loop to shut down.
    pub fn request_shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.cancel();
    }

    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Time since this server instance was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    #[must_use]
    pub fn is_deprecated_rpc_enabled(&self, method: &str) -> bool {
        self.config.deprecated_rpc.contains(method)
    }

    /// Schedule `action` through the timer backend.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::NoTimerBackend` if no backend is installed.
    pub fn run_later(
        &self,
        name: &str,
        action: TimerAction,
        delay_secs: u64,
    ) -> crate::error::Result<()> {
        self.timers.run_later(name, action, delay_secs)
    }

    pub fn on_started<F>(&self, slot: F)
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.signals.started.connect(slot);
    }

    pub fn on_stopped<F>(&self, slot: F)
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.signals.stopped.connect(slot);
    }

    pub fn on_pre_command<F>(&self, slot: F)
    where
        F: Fn(&CommandDescriptor) + Send + Sync + 'static,
    {
        self.signals.pre_command.connect(slot);
    }
}
