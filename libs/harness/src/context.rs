//! Suite lifecycle: explicit context and setup state machine.
//!
//! `SuiteContext` owns the provisioner, supervisor, and reset
//! coordinator for one suite run. It is passed into setup/teardown/reset
//! hooks explicitly; there is no process-global state, so two suites
//! could run in the same process without sharing infrastructure.
//!
//! Setup walks `Stopped → ProvisioningDb → StartingServices →
//! PollingReady → Ready`. Any failure transitions to `SetupFailed`,
//! unwinds whatever was already started, and propagates the error —
//! scenarios never run against a partially-up system.

use tracing::{error, info};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::provision::{DatabaseProvisioner, ProvisionedDatabase};
use crate::reset::ResetCoordinator;
use crate::supervisor::{ServiceSupervisor, SupervisorConfig};

/// Phase of the suite lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuitePhase {
    Stopped,
    ProvisioningDb,
    StartingServices,
    PollingReady,
    Ready,
    SetupFailed,
}

/// Process-wide suite state: provisioned databases plus supervised
/// service processes. Created by the BeforeAll-equivalent hook, torn
/// down by the AfterAll-equivalent hook.
pub struct SuiteContext {
    config: HarnessConfig,
    phase: SuitePhase,
    provisioner: DatabaseProvisioner,
    supervisor: ServiceSupervisor,
    reset: ResetCoordinator,
}

impl SuiteContext {
    pub fn new(config: HarnessConfig) -> Self {
        let supervisor = ServiceSupervisor::new(SupervisorConfig::from_harness(&config));
        let provisioner = DatabaseProvisioner::new(config.clone());
        let reset = ResetCoordinator::new(config.clone());

        Self {
            config,
            phase: SuitePhase::Stopped,
            provisioner,
            supervisor,
            reset,
        }
    }

    pub fn phase(&self) -> SuitePhase {
        self.phase
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The provisioned databases; empty outside `Ready`.
    pub fn databases(&self) -> &[ProvisionedDatabase] {
        self.provisioner.databases()
    }

    /// Bring the whole test environment up: databases, services,
    /// readiness. Fails fast — on any error the phase is `SetupFailed`,
    /// already-started infrastructure is unwound, and the error
    /// propagates to the suite runner.
    pub async fn setup(&mut self) -> Result<(), HarnessError> {
        info!("E2E suite setup starting");

        self.phase = SuitePhase::ProvisioningDb;
        if let Err(e) = self.provisioner.start_all().await {
            return self.fail_setup(e).await;
        }

        self.phase = SuitePhase::StartingServices;
        if let Err(e) = self.supervisor.ensure_stopped().await {
            return self.fail_setup(e).await;
        }
        if let Err(e) = self.supervisor.start_in_background().await {
            return self.fail_setup(e).await;
        }

        self.phase = SuitePhase::PollingReady;
        let polled = self
            .supervisor
            .wait_until_ready(self.config.max_ready_attempts, self.config.ready_interval)
            .await;
        if let Err(e) = polled {
            return self.fail_setup(e).await;
        }

        self.phase = SuitePhase::Ready;
        info!("E2E suite ready");
        Ok(())
    }

    /// Restore every database to seeded baseline before a scenario.
    /// Only permitted while the suite is `Ready`.
    pub async fn reset_scenario(&self) -> Result<(), HarnessError> {
        if self.phase != SuitePhase::Ready {
            return Err(HarnessError::NotReady { phase: self.phase });
        }
        self.reset.reset_all(self.provisioner.databases()).await
    }

    /// Stop services and databases. Best-effort: teardown failures are
    /// logged and never block process exit.
    pub async fn teardown(&mut self) {
        info!("E2E suite teardown");
        self.supervisor.stop().await;
        self.provisioner.stop_all().await;
        self.phase = SuitePhase::Stopped;
        info!("E2E suite teardown complete");
    }

    async fn fail_setup(&mut self, e: HarnessError) -> Result<(), HarnessError> {
        error!(error = %e, phase = ?self.phase, "Suite setup failed");
        self.phase = SuitePhase::SetupFailed;

        // Unwind whatever was already started; these are teardown-grade
        // failures and only logged.
        self.supervisor.stop().await;
        self.provisioner.stop_all().await;

        Err(e)
    }
}
