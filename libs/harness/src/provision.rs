//! Ephemeral database provisioning.
//!
//! One isolated Postgres container per service descriptor, started
//! concurrently at suite start:
//! - Launch the container and wait for it to accept connections
//! - Open a connection pool scoped to the service's database
//! - Apply the service's schema and seed scripts (each optional)
//! - Write per-service env files so externally-launched processes can
//!   find their database
//!
//! Any single failure fails the whole `start_all` call; a test suite
//! must never observe a partially-provisioned stack. Containers are
//! removed when their handles drop, so an aborted startup leaves no
//! orphaned instances behind.

use std::time::{Duration, Instant};

use futures_util::future::try_join_all;
use sqlx::postgres::{PgPool, PgPoolOptions};
use testcontainers::{
    core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, GenericImage, ImageExt,
};
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::descriptor::{ServiceDescriptor, SERVICES};
use crate::envfile;
use crate::error::HarnessError;
use crate::sqlscript;

/// How long a started container may take to accept connections.
const CONNECT_WAIT: Duration = Duration::from_secs(15);
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// A running database instance bound to one service.
///
/// Connection coordinates are immutable once assigned. The pool is
/// shared with the reset coordinator; test scenarios never touch it
/// directly.
pub struct ProvisionedDatabase {
    pub descriptor: &'static ServiceDescriptor,
    pub host: String,
    pub port: u16,
    pool: PgPool,
    container: ContainerAsync<GenericImage>,
}

impl ProvisionedDatabase {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connection URL for operator display.
    pub fn connection_url(&self, user: &str) -> String {
        format!(
            "postgresql://{user}@{}:{}/{}",
            self.host, self.port, self.descriptor.db_name
        )
    }
}

/// Starts, seeds, and tears down the per-service databases.
pub struct DatabaseProvisioner {
    config: HarnessConfig,
    databases: Vec<ProvisionedDatabase>,
}

impl DatabaseProvisioner {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            databases: Vec::new(),
        }
    }

    /// The provisioned databases, empty until `start_all` succeeds.
    pub fn databases(&self) -> &[ProvisionedDatabase] {
        &self.databases
    }

    /// Concurrently provision one database per service descriptor.
    ///
    /// Fire-all/await-all: every container launch runs concurrently and
    /// the first failure fails the whole call. Nothing is committed to
    /// internal state unless every service came up, so `stop_all` after
    /// a failed start has nothing stale to skip over.
    pub async fn start_all(&mut self) -> Result<(), HarnessError> {
        info!(services = SERVICES.len(), "Starting ephemeral databases");

        let started = try_join_all(SERVICES.iter().map(|s| self.provision_one(s))).await?;
        self.databases = started;

        for db in &self.databases {
            info!(
                service = db.descriptor.name,
                url = %db.connection_url(&self.config.db_user),
                "Database ready"
            );
        }

        if self.config.emit_env_files {
            self.write_env_files()?;
        }

        Ok(())
    }

    async fn provision_one(
        &self,
        service: &'static ServiceDescriptor,
    ) -> Result<ProvisionedDatabase, HarnessError> {
        let db_start = |source| HarnessError::DbStart {
            service: service.name,
            source,
        };

        let container = GenericImage::new("postgres", self.config.db_image_tag.as_str())
            .with_exposed_port(5432.tcp())
            .with_env_var("POSTGRES_USER", self.config.db_user.as_str())
            .with_env_var("POSTGRES_PASSWORD", self.config.db_password.as_str())
            .with_env_var("POSTGRES_DB", service.db_name)
            .start()
            .await
            .map_err(db_start)?;

        let host = container.get_host().await.map_err(db_start)?.to_string();
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .map_err(db_start)?;

        debug!(service = service.name, host = %host, port, "Database container started");

        let url = format!(
            "postgres://{}:{}@{}:{}/{}",
            self.config.db_user, self.config.db_password, host, port, service.db_name
        );
        let pool = connect_with_retry(service.name, &url).await?;

        self.load_scripts(service, &pool).await?;

        Ok(ProvisionedDatabase {
            descriptor: service,
            host,
            port,
            pool,
            container,
        })
    }

    /// Apply schema then seed, exactly once per provisioned database.
    /// Both scripts are optional and skipped silently when absent.
    async fn load_scripts(
        &self,
        service: &'static ServiceDescriptor,
        pool: &PgPool,
    ) -> Result<(), HarnessError> {
        if let Some(schema) = sqlscript::load_optional(&self.config.schema_path(service)).await? {
            sqlx::raw_sql(&schema)
                .execute(pool)
                .await
                .map_err(|source| HarnessError::SchemaLoad {
                    service: service.name,
                    source,
                })?;
            debug!(service = service.name, "Schema loaded");
        }

        if let Some(seed) = sqlscript::load_optional(&self.config.seed_path(service)).await? {
            sqlx::raw_sql(&seed)
                .execute(pool)
                .await
                .map_err(|source| HarnessError::SeedLoad {
                    service: service.name,
                    source,
                })?;
            debug!(service = service.name, "Seed data loaded");
        }

        Ok(())
    }

    fn write_env_files(&self) -> Result<(), HarnessError> {
        for db in &self.databases {
            envfile::write(
                &self.config.env_file_path(db.descriptor),
                db.descriptor,
                &db.host,
                db.port,
                &self.config.db_user,
                &self.config.db_password,
            )?;
        }
        Ok(())
    }

    /// Close every pool and stop every container, clearing state.
    ///
    /// Safe to call after a failed or partial `start_all` (nothing was
    /// committed, so there is nothing to stop) and safe to call twice.
    /// Failures are teardown-grade: logged, never propagated.
    pub async fn stop_all(&mut self) {
        if self.databases.is_empty() {
            return;
        }

        info!(databases = self.databases.len(), "Stopping ephemeral databases");
        for db in self.databases.drain(..) {
            db.pool.close().await;
            if let Err(e) = db.container.stop().await {
                warn!(
                    service = db.descriptor.name,
                    error = %e,
                    "Failed to stop database container"
                );
            } else {
                debug!(service = db.descriptor.name, "Database container stopped");
            }
        }
    }
}

/// Poll until Postgres accepts connections, bounded by `CONNECT_WAIT`.
async fn connect_with_retry(
    service: &'static str,
    database_url: &str,
) -> Result<PgPool, HarnessError> {
    let start = Instant::now();

    loop {
        match PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(source) => {
                if start.elapsed() > CONNECT_WAIT {
                    return Err(HarnessError::DbConnect {
                        service,
                        waited_secs: CONNECT_WAIT.as_secs(),
                        source,
                    });
                }
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }
}
