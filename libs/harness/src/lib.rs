//! # pointstack-harness
//!
//! Test environment orchestrator for the pointstack e2e suite.
//!
//! The harness provisions ephemeral, isolated Postgres instances per
//! backend service, starts the application's processes against them,
//! polls for readiness, and guarantees every scenario begins from a
//! known-clean seeded state.
//!
//! ## Components
//!
//! - **Database provisioner** ([`provision`]): one container per
//!   service, schema + seed load, connection coordinates, env files
//! - **Service supervisor** ([`supervisor`]): external-script process
//!   control and health polling
//! - **Reset coordinator** ([`reset`]): per-scenario restore to seeded
//!   baseline without re-provisioning
//! - **Suite context** ([`context`]): explicit lifecycle state machine
//!   tying the three together
//!
//! ## Lifecycle
//!
//! The provisioner runs once per suite; the supervisor starts once per
//! suite against the provisioner's connection info; the reset
//! coordinator runs once per scenario against the live handles.
//! Page-object and step-definition layers consume only the readiness
//! guarantee and never hold database handles.

pub mod config;
pub mod context;
pub mod descriptor;
pub mod envfile;
pub mod error;
pub mod provision;
pub mod reset;
pub mod sqlscript;
pub mod supervisor;

pub use config::HarnessConfig;
pub use context::{SuiteContext, SuitePhase};
pub use descriptor::{default_health_targets, tables_for, HealthTarget, ServiceDescriptor, SERVICES};
pub use error::HarnessError;
pub use provision::{DatabaseProvisioner, ProvisionedDatabase};
pub use reset::ResetCoordinator;
pub use supervisor::{ProcessHandle, ServiceSupervisor, SupervisorConfig, TargetStatus};
