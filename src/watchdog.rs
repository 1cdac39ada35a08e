//! Watchdog supervisor.
//!
//! The diagnostic run executes in a worker process (this binary re-executed
//! with `--worker`). The supervisor only watches the worker's lifecycle: it
//! polls liveness, and on timeout or interrupt it terminates the worker,
//! waits a short grace period and kills it if it is still running.

use async_trait::async_trait;
use std::future::Future;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Command-line flag that selects worker mode.
pub const WORKER_FLAG: &str = "--worker";

/// Supervisor limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Wall-clock budget for the worker.
    pub timeout: Duration,
    /// Interval between liveness checks.
    pub poll_interval: Duration,
    /// Time allowed for the worker to exit after a terminate request.
    pub grace_period: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            grace_period: Duration::from_secs(1),
        }
    }
}

impl WatchdogConfig {
    /// Same intervals with a different budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A supervised worker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkerProcess: Send {
    /// Whether the worker is still running.
    fn is_alive(&mut self) -> bool;

    /// Ask the worker to exit.
    fn terminate(&mut self) -> Result<()>;

    /// Wait up to `timeout` for the worker to exit. Returns `true` if it did.
    async fn join(&mut self, timeout: Duration) -> bool;

    /// Kill the worker outright.
    fn kill(&mut self) -> Result<()>;
}

/// Worker running as a child process of this binary.
pub struct ChildWorker {
    child: Child,
}

impl ChildWorker {
    /// Re-execute the current binary in worker mode with `args`.
    pub fn spawn(args: &[String]) -> Result<Self> {
        let exe = std::env::current_exe()?;
        debug!("Spawning worker: {} {} {:?}", exe.display(), WORKER_FLAG, args);

        let child = Command::new(exe)
            .arg(WORKER_FLAG)
            .args(args)
            .kill_on_drop(true)
            .spawn()?;

        Ok(Self { child })
    }

    /// OS process id, while the child has not been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

#[async_trait]
impl WorkerProcess for ChildWorker {
    fn is_alive(&mut self) -> bool {
        still_running(self.child.try_wait())
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(id) = self.child.id() else {
            return Ok(());
        };
        let pid = i32::try_from(id).map_err(|_| {
            crate::error::Error::Internal(format!("worker pid {} out of range", id))
        })?;

        kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(std::io::Error::from)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<()> {
        self.child.start_kill()?;
        Ok(())
    }

    async fn join(&mut self, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, self.child.wait()).await,
            Ok(Ok(_))
        )
    }

    fn kill(&mut self) -> Result<()> {
        self.child.start_kill()?;
        Ok(())
    }
}

/// Interpret a `try_wait` result.
///
/// A status that cannot be queried counts as running.
fn still_running(status: std::io::Result<Option<ExitStatus>>) -> bool {
    match status {
        Ok(Some(status)) => {
            debug!("Worker exited with {}", status);
            false
        }
        Ok(None) => true,
        Err(e) => {
            warn!("Unable to query worker status: {}", e);
            true
        }
    }
}

/// How supervision ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// The worker exited on its own.
    Completed,
    /// The budget ran out and the worker was stopped.
    TimedOut,
    /// An interrupt arrived and the worker was stopped.
    Interrupted,
}

/// Enforces the wall-clock budget on a worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Watchdog {
    config: WatchdogConfig,
}

impl Watchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> WatchdogConfig {
        self.config
    }

    /// Watch `worker` until it exits, the budget runs out or `interrupt`
    /// resolves. The worker is never left running on return.
    pub async fn supervise<W, F>(&self, worker: &mut W, interrupt: F) -> WatchdogOutcome
    where
        W: WorkerProcess + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        let deadline = Instant::now() + self.config.timeout;

        loop {
            if !worker.is_alive() {
                info!("Worker finished");
                return WatchdogOutcome::Completed;
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Worker still running after {:?}, stopping it",
                    self.config.timeout
                );
                self.force_stop(worker).await;
                return WatchdogOutcome::TimedOut;
            }

            let step = self.config.poll_interval.min(deadline - now);
            tokio::select! {
                _ = &mut interrupt => {
                    info!("Interrupt received, stopping worker");
                    self.force_stop(worker).await;
                    return WatchdogOutcome::Interrupted;
                }
                _ = tokio::time::sleep(step) => {}
            }
        }
    }

    /// Terminate, wait the grace period, then kill.
    async fn force_stop<W>(&self, worker: &mut W)
    where
        W: WorkerProcess + ?Sized,
    {
        if let Err(e) = worker.terminate() {
            warn!("Terminate request failed: {}", e);
        }

        if worker.join(self.config.grace_period).await {
            debug!("Worker exited after terminate");
            return;
        }

        warn!("Worker ignored terminate, killing it");
        if let Err(e) = worker.kill() {
            warn!("Kill failed: {}", e);
        }

        if !worker.join(self.config.grace_period).await {
            warn!("Worker did not exit after kill");
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
///
/// If no handler can be installed the future never resolves.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = terminate.recv() => debug!("SIGTERM received"),
                }
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn exits_after(polls: usize) -> MockWorkerProcess {
        let mut worker = MockWorkerProcess::new();
        let mut seen = 0;
        worker.expect_is_alive().returning(move || {
            seen += 1;
            seen <= polls
        });
        worker
    }

    fn never_exits() -> MockWorkerProcess {
        let mut worker = MockWorkerProcess::new();
        worker.expect_is_alive().return_const(true);
        worker
    }

    #[test]
    fn test_default_config() {
        let config = WatchdogConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.grace_period, Duration::from_secs(1));
        assert_eq!(
            config.with_timeout(Duration::from_secs(5)).timeout,
            Duration::from_secs(5)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_completes_before_timeout() {
        let mut worker = exits_after(3);
        worker.expect_terminate().never();
        worker.expect_kill().never();

        let start = Instant::now();
        let outcome = Watchdog::default()
            .supervise(&mut worker, std::future::pending())
            .await;

        assert_eq!(outcome, WatchdogOutcome::Completed);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_terminates_worker() {
        let mut worker = never_exits();
        worker.expect_terminate().times(1).returning(|| Ok(()));
        worker
            .expect_join()
            .with(eq(Duration::from_secs(1)))
            .times(1)
            .return_const(true);
        worker.expect_kill().never();

        let start = Instant::now();
        let outcome = Watchdog::default()
            .supervise(&mut worker, std::future::pending())
            .await;

        assert_eq!(outcome, WatchdogOutcome::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stubborn_worker_is_killed() {
        let mut seq = Sequence::new();
        let mut worker = never_exits();
        worker
            .expect_terminate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        worker
            .expect_join()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(false);
        worker
            .expect_kill()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        worker
            .expect_join()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(true);

        let watchdog = Watchdog::new(WatchdogConfig::default().with_timeout(Duration::from_secs(2)));
        let outcome = watchdog.supervise(&mut worker, std::future::pending()).await;

        assert_eq!(outcome, WatchdogOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_failure_still_kills() {
        let mut worker = never_exits();
        worker
            .expect_terminate()
            .returning(|| Err(Error::Internal("no such process".to_string())));
        worker.expect_join().return_const(false);
        worker.expect_kill().times(1).returning(|| Ok(()));

        let watchdog = Watchdog::new(WatchdogConfig::default().with_timeout(Duration::ZERO));
        let outcome = watchdog.supervise(&mut worker, std::future::pending()).await;

        assert_eq!(outcome, WatchdogOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_stops_worker() {
        let mut worker = never_exits();
        worker.expect_terminate().times(1).returning(|| Ok(()));
        worker.expect_join().return_const(true);

        let start = Instant::now();
        let outcome = Watchdog::default()
            .supervise(&mut worker, tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert_eq!(outcome, WatchdogOutcome::Interrupted);
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    #[test]
    fn test_status_query_error_counts_as_running() {
        let error = std::io::Error::new(std::io::ErrorKind::Other, "wait failed");
        assert!(still_running(Err(error)));
        assert!(still_running(Ok(None)));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_counts_as_finished() {
        use std::os::unix::process::ExitStatusExt;
        assert!(!still_running(Ok(Some(ExitStatus::from_raw(0)))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_worker_is_not_signalled() {
        let mut worker = exits_after(0);
        worker.expect_terminate().never();

        let outcome = Watchdog::default()
            .supervise(&mut worker, async {})
            .await;

        assert_eq!(outcome, WatchdogOutcome::Completed);
    }
}
