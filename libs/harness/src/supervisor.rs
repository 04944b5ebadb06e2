//! Service process supervision and readiness polling.
//!
//! The application's backend and frontend processes are managed through
//! an external control script (`stop` / `start-e2e` commands) so they
//! live outside the harness's own process tree. The supervisor:
//! - stops any already-running instances (idempotent)
//! - launches the stack in the background with output redirected to a
//!   diagnostic log
//! - polls every health target until the whole stack answers, or the
//!   attempt budget is exhausted
//!
//! The spawned launcher is retained as an explicit handle so teardown
//! kills exactly what was started before falling back to the script's
//! own `stop`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::descriptor::{default_health_targets, HealthTarget};
use crate::error::HarnessError;

/// Per-probe HTTP timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-target detail is logged on attempt 1 and then every
/// `LOG_EVERY_ATTEMPTS` attempts, keeping operator output readable over
/// minutes of polling.
const LOG_EVERY_ATTEMPTS: u32 = 10;

/// Supervisor configuration, split from [`HarnessConfig`] so tests can
/// point the health targets at stub servers.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub control_script: PathBuf,
    pub service_log: PathBuf,
    pub targets: Vec<HealthTarget>,
}

impl SupervisorConfig {
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            control_script: config.control_script.clone(),
            service_log: config.service_log.clone(),
            targets: default_health_targets(),
        }
    }
}

/// Outcome of a single status probe against one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
    pub name: String,
    pub url: String,
    pub ready: bool,
    /// HTTP status line or connection error, for operator display.
    pub detail: String,
}

/// Handle to the background launcher process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pub pid: Option<u32>,
    pub log_path: PathBuf,
}

pub struct ServiceSupervisor {
    config: SupervisorConfig,
    client: reqwest::Client,
    child: Option<Child>,
}

impl ServiceSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            config,
            client,
            child: None,
        }
    }

    /// Stop any already-running instances of the target services.
    ///
    /// Idempotent: a non-zero exit (nothing was running) is not an
    /// error. Failing to invoke the script at all is.
    pub async fn ensure_stopped(&self) -> Result<(), HarnessError> {
        info!(script = %self.config.control_script.display(), "Stopping existing services");

        let status = Command::new(&self.config.control_script)
            .arg("stop")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| HarnessError::ProcessControl {
                action: "stop",
                source,
            })?;

        if status.success() {
            info!("Existing services stopped");
        } else {
            debug!(%status, "No existing services to stop");
        }
        Ok(())
    }

    /// Launch the stack in the background, redirecting output to the
    /// diagnostic log. Returns immediately; readiness is established
    /// separately by [`wait_until_ready`](Self::wait_until_ready).
    pub async fn start_in_background(&mut self) -> Result<ProcessHandle, HarnessError> {
        let start_err = |source| HarnessError::ProcessControl {
            action: "start-e2e",
            source,
        };

        let log = std::fs::File::create(&self.config.service_log).map_err(start_err)?;
        let err_log = log.try_clone().map_err(start_err)?;

        let child = Command::new(&self.config.control_script)
            .arg("start-e2e")
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(err_log))
            // Services must outlive the harness process unless explicitly
            // stopped in teardown.
            .kill_on_drop(false)
            .spawn()
            .map_err(start_err)?;

        let handle = ProcessHandle {
            pid: child.id(),
            log_path: self.config.service_log.clone(),
        };
        info!(
            pid = handle.pid,
            log = %handle.log_path.display(),
            "Services starting in background"
        );

        self.child = Some(child);
        Ok(handle)
    }

    /// Poll every health target until all answer within one attempt.
    ///
    /// A target is ready on any 2xx or 4xx response: a 4xx still proves
    /// the process is accepting connections and routing requests. 5xx
    /// and connection failures count as not ready. Returns the attempt
    /// number that succeeded; exhausting `max_attempts` is fatal.
    pub async fn wait_until_ready(
        &self,
        max_attempts: u32,
        interval: Duration,
    ) -> Result<u32, HarnessError> {
        info!(
            targets = self.config.targets.len(),
            max_attempts,
            interval_secs = interval.as_secs(),
            "Waiting for services to become ready"
        );

        let mut last_failing = String::new();
        for attempt in 1..=max_attempts {
            tokio::time::sleep(interval).await;

            let verbose = attempt == 1 || attempt % LOG_EVERY_ATTEMPTS == 0;
            match self.probe_all(verbose).await {
                None => {
                    info!(attempt, max_attempts, "All services ready");
                    return Ok(attempt);
                }
                Some(not_ready) => {
                    if verbose {
                        info!(
                            attempt,
                            max_attempts,
                            not_ready = %not_ready,
                            "Still waiting for services"
                        );
                    }
                    last_failing = not_ready;
                }
            }
        }

        Err(HarnessError::ReadinessTimeout {
            attempts: max_attempts,
            interval_secs: interval.as_secs(),
            last_failing,
        })
    }

    /// One serial pass over the targets, short-circuiting on the first
    /// not-ready one. Returns that target's name, or `None` when every
    /// target answered.
    async fn probe_all(&self, verbose: bool) -> Option<String> {
        for target in &self.config.targets {
            match self.client.get(&target.url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() || status.is_client_error() {
                        if verbose {
                            debug!(target = %target.name, %status, "Target ready");
                        }
                    } else {
                        if verbose {
                            debug!(target = %target.name, %status, "Target not ready");
                        }
                        return Some(target.name.clone());
                    }
                }
                Err(e) => {
                    if verbose {
                        debug!(target = %target.name, error = %e, "Target unreachable");
                    }
                    return Some(target.name.clone());
                }
            }
        }
        None
    }

    /// Probe every target once without short-circuiting, for status
    /// display. Unlike [`wait_until_ready`](Self::wait_until_ready)
    /// this never sleeps or retries.
    pub async fn check_all(&self) -> Vec<TargetStatus> {
        let mut statuses = Vec::with_capacity(self.config.targets.len());
        for target in &self.config.targets {
            let (ready, detail) = match self.client.get(&target.url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    (
                        status.is_success() || status.is_client_error(),
                        status.to_string(),
                    )
                }
                Err(e) => (false, e.to_string()),
            };
            statuses.push(TargetStatus {
                name: target.name.clone(),
                url: target.url.clone(),
                ready,
                detail,
            });
        }
        statuses
    }

    /// Stop everything this supervisor started: kill the retained
    /// launcher, then invoke the script's `stop` for processes the
    /// launcher re-parented. Best-effort; failures are logged.
    pub async fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            match child.start_kill() {
                Ok(()) => debug!(pid = child.id(), "Killed service launcher"),
                Err(e) => debug!(error = %e, "Service launcher already exited"),
            }
            let _ = child.wait().await;
        }

        if let Err(e) = self.ensure_stopped().await {
            warn!(error = %e, "Failed to stop services during teardown");
        }
    }
}
