//! Runs the long-lived processes of the agent side by side and shuts them
//! down together.
//!
//! - Every process gets a clone of one `CancellationToken`
//! - SIGINT/SIGTERM, or the first process error, cancels the token
//! - Closers run after all processes have stopped, bounded by a timeout
//!
//! # Example
//!
//! ```no_run
//! use iota_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let result = Runner::new()
//!         .with_app_process(|ctx| async move {
//!             ctx.cancelled().await;
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("flushing");
//!             Ok(())
//!         })
//!         .with_closer_timeout(Duration::from_secs(5))
//!         .run()
//!         .await;
//!
//!     std::process::exit(if result.is_ok() { 0 } else { 1 });
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// A long-lived process; it should return once the token is cancelled
pub type AppProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send,
>;

/// A cleanup step run after all processes have stopped
pub type Closer =
    Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send>;

pub struct Runner {
    processes: Vec<(String, AppProcess)>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
    handle_signals: bool,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Closer timeout defaults to 10 seconds
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
            handle_signals: true,
        }
    }

    /// Add a boxed process under a name used in logs
    pub fn with_named_process(mut self, name: impl Into<String>, process: AppProcess) -> Self {
        self.processes.push((name.into(), process));
        self
    }

    pub fn with_app_process<F, Fut>(self, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = format!("process-{}", self.processes.len());
        self.with_named_process(name, Box::new(|token| Box::pin(process(token))))
    }

    /// Closers run concurrently; one failing does not stop the others
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Share cancellation with code outside the runner
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Disable SIGINT/SIGTERM handling
    pub fn without_signal_handlers(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    /// Run all processes until they finish, one fails, or a shutdown signal
    /// arrives, then run the closers.
    ///
    /// Returns the first process error, if any.
    pub async fn run(self) -> anyhow::Result<()> {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();

        for (name, process) in self.processes {
            let process_token = token.clone();
            info!(process = %name, "starting process");
            join_set.spawn(async move { (name, process(process_token).await) });
        }

        let signal_handlers = if self.handle_signals {
            spawn_signal_handlers(&token)
        } else {
            Vec::new()
        };

        let mut first_error = None;
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((name, Ok(()))) => {
                    debug!(process = %name, "process completed");
                }
                Ok((name, Err(err))) => {
                    error!(process = %name, "process error: {:#}", err);
                    if first_error.is_none() {
                        first_error = Some(err.context(format!("process {} failed", name)));
                    }
                    token.cancel();
                }
                Err(err) => {
                    error!("process panicked: {}", err);
                    if first_error.is_none() {
                        first_error = Some(anyhow::anyhow!("process panicked: {}", err));
                    }
                    token.cancel();
                }
            }
        }

        for handler in signal_handlers {
            handler.abort();
        }

        Self::run_closers(self.closers, self.closer_timeout).await;

        match first_error {
            Some(err) => {
                error!("exiting with error: {:#}", err);
                Err(err)
            }
            None => {
                info!("exiting normally");
                Ok(())
            }
        }
    }

    async fn run_closers(closers: Vec<Closer>, timeout: Duration) {
        if closers.is_empty() {
            return;
        }
        info!("running closers with timeout of {:?}", timeout);

        let mut closer_set = JoinSet::new();
        for closer in closers {
            closer_set.spawn(closer());
        }

        let drain = async {
            while let Some(result) = closer_set.join_next().await {
                match result {
                    Ok(Ok(())) => debug!("closer completed"),
                    Ok(Err(err)) => error!("closer error: {:#}", err),
                    Err(err) => error!("closer panicked: {}", err),
                }
            }
        };

        if tokio::time::timeout(timeout, drain).await.is_err() {
            error!("closers timed out after {:?}", timeout);
            closer_set.abort_all();
        } else {
            info!("all closers completed");
        }
    }
}

fn spawn_signal_handlers(token: &CancellationToken) -> Vec<JoinHandle<()>> {
    let mut handlers = Vec::new();

    let ctrl_c_token = token.clone();
    handlers.push(tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received SIGINT");
                ctrl_c_token.cancel();
            }
            Err(err) => error!("failed to listen for SIGINT: {}", err),
        }
    }));

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm_token = token.clone();
        handlers.push(tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                    info!("received SIGTERM");
                    sigterm_token.cancel();
                }
                Err(err) => error!("failed to listen for SIGTERM: {}", err),
            }
        }));
    }

    handlers
}
