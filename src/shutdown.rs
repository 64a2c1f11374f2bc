use log::{error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Cancellation signal shared by the election tasks and the serving loop
#[derive(Clone)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
    timeout: Duration,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Shutdown {
    /// Create a new shutdown signal; `timeout` bounds how long each task is
    /// awaited once shutdown starts
    pub fn new(timeout: Duration) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            timeout,
        }
    }

    /// Initialize signal handlers for graceful shutdown
    pub fn initialize_signal_handlers(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let shutdown = self.clone();
            let mut sigterm = signal(SignalKind::terminate())?;
            tokio::spawn(async move {
                sigterm.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown");
                shutdown.initiate_shutdown();
            });

            let shutdown = self.clone();
            let mut sigint = signal(SignalKind::interrupt())?;
            tokio::spawn(async move {
                sigint.recv().await;
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                shutdown.initiate_shutdown();
            });
        }

        #[cfg(not(unix))]
        {
            let shutdown = self.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    shutdown.initiate_shutdown();
                }
            });
        }

        Ok(())
    }

    /// Initiate graceful shutdown
    pub fn initiate_shutdown(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            info!("Graceful shutdown initiated");
            self.notify.notify_waiters();
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is requested
    pub async fn wait_for_shutdown(&self) {
        let notified = self.notify.notified();
        if self.is_shutdown_requested() {
            return;
        }
        notified.await;
    }

    /// Sleep for `duration` unless shutdown interrupts it.
    ///
    /// Returns `false` when shutdown was requested before or during the sleep.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.notify.notified();
        if self.is_shutdown_requested() {
            return false;
        }
        tokio::select! {
            _ = notified => false,
            _ = tokio::time::sleep(duration) => !self.is_shutdown_requested(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Tracks background tasks so they can be joined on shutdown
#[derive(Clone)]
pub struct TaskManager {
    active_tasks: Arc<Mutex<Vec<TaskHandle>>>,
    shutdown: Shutdown,
}

impl TaskManager {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            active_tasks: Arc::new(Mutex::new(Vec::new())),
            shutdown,
        }
    }

    /// Register a task for graceful shutdown
    pub fn register_task(&self, name: &str, handle: tokio::task::JoinHandle<()>) {
        self.active_tasks.lock().push(TaskHandle::new(name, handle));
    }

    pub fn len(&self) -> usize {
        self.active_tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_tasks.lock().is_empty()
    }

    /// Names of the tracked tasks that have not finished yet.
    pub fn running(&self) -> Vec<String> {
        self.active_tasks
            .lock()
            .iter()
            .filter(|task| !task.handle.is_finished())
            .map(|task| task.name.clone())
            .collect()
    }

    /// Await every registered task, aborting the ones that overrun the
    /// shutdown timeout
    pub async fn shutdown_all_tasks(&self) -> Result<(), Vec<String>> {
        let tasks = std::mem::take(&mut *self.active_tasks.lock());

        if tasks.is_empty() {
            return Ok(());
        }

        info!("Shutting down {} active tasks", tasks.len());
        let mut errors = Vec::new();
        let timeout = self.shutdown.timeout();

        for mut task in tasks {
            tokio::select! {
                result = &mut task.handle => {
                    match result {
                        Ok(_) => info!("Task '{}' completed", task.name),
                        Err(e) if e.is_cancelled() => info!("Task '{}' was cancelled", task.name),
                        Err(e) => {
                            error!("Task '{}' failed: {}", task.name, e);
                            errors.push(format!("Task '{}' failed: {}", task.name, e));
                        }
                    }
                }
                _ = tokio::time::sleep(timeout) => {
                    warn!("Task '{}' did not complete within timeout, aborting", task.name);
                    errors.push(format!("Task '{}' timeout", task.name));
                    task.handle.abort();
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Abort every registered task without waiting
    pub fn abort_all(&self) {
        for task in std::mem::take(&mut *self.active_tasks.lock()) {
            task.handle.abort();
        }
    }
}

/// Handle for a background task
pub struct TaskHandle {
    pub name: String,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TaskHandle {
    pub fn new(name: &str, handle: tokio::task::JoinHandle<()>) -> Self {
        Self {
            name: name.to_string(),
            handle,
        }
    }
}
