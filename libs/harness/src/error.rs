//! Error types for the test environment orchestrator.

use thiserror::Error;

use crate::context::SuitePhase;

/// Errors raised by suite setup, per-scenario reset, and process control.
///
/// Provisioning and readiness variants are fatal for suite setup; reset
/// variants are fatal for the scenario (and the run, since later scenarios
/// cannot trust the data state). Teardown failures are logged at the call
/// site rather than surfaced through this type.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A database container failed to start.
    #[error("failed to start database container for '{service}': {source}")]
    DbStart {
        service: &'static str,
        #[source]
        source: testcontainers::TestcontainersError,
    },

    /// A started database never accepted connections.
    #[error("database for '{service}' did not accept connections within {waited_secs}s: {source}")]
    DbConnect {
        service: &'static str,
        waited_secs: u64,
        #[source]
        source: sqlx::Error,
    },

    /// Schema script failed to apply.
    #[error("schema load failed for '{service}': {source}")]
    SchemaLoad {
        service: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Seed script failed to apply.
    #[error("seed load failed for '{service}': {source}")]
    SeedLoad {
        service: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A schema or seed script exists but could not be read.
    #[error("failed to read script {path}: {source}")]
    ScriptRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a generated environment file.
    #[error("failed to write env file {path}: {source}")]
    EnvFileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A service name with no registered application-table list.
    ///
    /// This is a configuration error, never a silent no-op: resetting an
    /// unknown service would leave a scenario running against unknown state.
    #[error("no table list registered for service '{0}'")]
    UnknownService(String),

    /// Clearing or re-seeding a database failed mid-scenario.
    #[error("reset failed for '{service}': {source}")]
    Reset {
        service: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Services never became ready within the polling budget.
    #[error("services not ready after {attempts} attempts ({interval_secs}s interval); last failing target: {last_failing}")]
    ReadinessTimeout {
        attempts: u32,
        interval_secs: u64,
        last_failing: String,
    },

    /// The process control script could not be invoked.
    #[error("process control '{action}' failed: {source}")]
    ProcessControl {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Scenario work attempted while the suite is not in `Ready`.
    #[error("suite is in phase {phase:?}; scenario work requires Ready")]
    NotReady { phase: SuitePhase },
}
