//! Harness configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::descriptor::ServiceDescriptor;

/// Suite-wide configuration for provisioning, process control, and
/// readiness polling.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Root directory containing one subdirectory per service, each with
    /// a `database/` folder holding `schema.sql` and `seed.sql`.
    pub services_root: PathBuf,

    /// Script accepting `stop` and `start-e2e` commands for the backend
    /// and frontend processes.
    pub control_script: PathBuf,

    /// Diagnostic log that captures service startup output instead of
    /// the harness's own stdout.
    pub service_log: PathBuf,

    /// Postgres image tag for ephemeral databases.
    pub db_image_tag: String,

    /// Database superuser for all ephemeral instances.
    pub db_user: String,

    /// Password for `db_user`.
    pub db_password: String,

    /// Maximum readiness polling attempts before setup fails.
    pub max_ready_attempts: u32,

    /// Fixed delay between polling attempts.
    pub ready_interval: Duration,

    /// Whether `start_all` writes `.env.e2e` files next to each service.
    pub emit_env_files: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            services_root: PathBuf::from("."),
            control_script: PathBuf::from("./scripts/manage-services.sh"),
            service_log: PathBuf::from("/tmp/e2e-service-startup.log"),
            db_image_tag: "16-alpine".to_string(),
            db_user: "testuser".to_string(),
            db_password: "testpass".to_string(),
            max_ready_attempts: 60,
            ready_interval: Duration::from_secs(2),
            emit_env_files: true,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from `STACK_*` environment variables, falling
    /// back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("STACK_SERVICES_ROOT") {
            config.services_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STACK_CONTROL_SCRIPT") {
            config.control_script = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STACK_SERVICE_LOG") {
            config.service_log = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("STACK_DB_IMAGE_TAG") {
            config.db_image_tag = v;
        }
        if let Some(attempts) = std::env::var("STACK_READY_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.max_ready_attempts = attempts;
        }
        if let Some(secs) = std::env::var("STACK_READY_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.ready_interval = Duration::from_secs(secs);
        }
        if let Ok(v) = std::env::var("STACK_EMIT_ENV_FILES") {
            config.emit_env_files = v != "0" && v.to_lowercase() != "false";
        }

        config
    }

    /// Directory holding a service's database scripts.
    pub fn database_dir(&self, service: &ServiceDescriptor) -> PathBuf {
        self.services_root.join(service.name).join("database")
    }

    /// Path to a service's schema script.
    pub fn schema_path(&self, service: &ServiceDescriptor) -> PathBuf {
        self.database_dir(service).join("schema.sql")
    }

    /// Path to a service's seed script.
    pub fn seed_path(&self, service: &ServiceDescriptor) -> PathBuf {
        self.database_dir(service).join("seed.sql")
    }

    /// Path the generated environment file is written to.
    pub fn env_file_path(&self, service: &ServiceDescriptor) -> PathBuf {
        self.services_root.join(service.name).join(".env.e2e")
    }

    /// Config rooted at a directory, for tests.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        Self {
            services_root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}
