//! Docker-backed lifecycle tests for the test environment orchestrator.
//!
//! These tests provision real Postgres containers per service, load the
//! fixture schemas and seeds, and validate:
//!
//! 1. One reachable database per service descriptor after `start_all`
//! 2. Seeded baseline content
//! 3. `reset_all` restores exact baseline after scenario mutations, and
//!    is idempotent across consecutive calls
//! 4. Optional scripts are skipped silently; env files carry exact
//!    connection coordinates
//! 5. A broken script fails the whole `start_all`, and `stop_all` is
//!    safe afterwards
//!
//! ## Running
//!
//! ```bash
//! cargo test -p pointstack-e2e --test full_stack
//! ```
//!
//! Requires a running Docker daemon.

use std::path::PathBuf;

use pointstack_harness::{
    DatabaseProvisioner, HarnessConfig, HarnessError, ProvisionedDatabase, ResetCoordinator,
    SERVICES,
};
use sqlx::Row;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pointstack_harness=debug,sqlx=warn".into()),
        )
        .with_test_writer()
        .try_init();
}

fn fixtures_config() -> HarnessConfig {
    HarnessConfig {
        services_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
        emit_env_files: false,
        ..HarnessConfig::default()
    }
}

fn db_for<'a>(dbs: &'a [ProvisionedDatabase], name: &str) -> &'a ProvisionedDatabase {
    dbs.iter()
        .find(|db| db.descriptor.name == name)
        .unwrap_or_else(|| panic!("no provisioned database for {name}"))
}

async fn count(pool: &sqlx::PgPool, table: &str) -> i64 {
    sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
        .get("n")
}

async fn user_emails(pool: &sqlx::PgPool) -> Vec<String> {
    sqlx::query("SELECT email FROM users ORDER BY email")
        .fetch_all(pool)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.get("email"))
        .collect()
}

#[tokio::test]
async fn provision_seed_mutate_reset_cycle() {
    init_tracing();
    let config = fixtures_config();

    let mut provisioner = DatabaseProvisioner::new(config.clone());
    provisioner.start_all().await.expect("start_all failed");

    let dbs = provisioner.databases();
    assert_eq!(dbs.len(), SERVICES.len(), "one database per descriptor");
    for db in dbs {
        sqlx::query("SELECT 1").execute(db.pool()).await.unwrap();
    }

    let users = db_for(dbs, "user-service");
    let auth = db_for(dbs, "auth-service");
    let points = db_for(dbs, "point-service");

    // Seeded baseline.
    assert_eq!(count(users.pool(), "users").await, 5);
    assert_eq!(count(auth.pool(), "user_credentials").await, 5);
    assert_eq!(count(auth.pool(), "login_history").await, 2);
    assert_eq!(count(points.pool(), "points").await, 3);
    assert_eq!(count(points.pool(), "point_history").await, 3);
    let baseline_emails = user_emails(users.pool()).await;

    // Scenario mutations: add, update, delete across services.
    sqlx::query("INSERT INTO users (name, email) VALUES ('Mallory Intruder', 'mallory@example.com')")
        .execute(users.pool())
        .await
        .unwrap();
    sqlx::query("UPDATE points SET balance = 9999 WHERE user_id = '11111111-1111-1111-1111-111111111111'")
        .execute(points.pool())
        .await
        .unwrap();
    sqlx::query("DELETE FROM point_history WHERE transaction_type = 'SPEND'")
        .execute(points.pool())
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO session_tokens (token, user_id, expires_at) \
         VALUES ('tok-scenario', '11111111-1111-1111-1111-111111111111', NOW() + INTERVAL '1 hour')",
    )
    .execute(auth.pool())
    .await
    .unwrap();

    // Reset restores the exact seeded baseline.
    let reset = ResetCoordinator::new(config.clone());
    reset.reset_all(dbs).await.expect("reset_all failed");

    assert_eq!(count(users.pool(), "users").await, 5);
    assert_eq!(user_emails(users.pool()).await, baseline_emails);
    assert_eq!(count(auth.pool(), "session_tokens").await, 0);
    assert_eq!(count(points.pool(), "point_history").await, 3);

    let balance: i32 = sqlx::query(
        "SELECT balance FROM points WHERE user_id = '11111111-1111-1111-1111-111111111111'",
    )
    .fetch_one(points.pool())
    .await
    .unwrap()
    .get("balance");
    assert_eq!(balance, 1000, "seed balance restored");

    // Idempotent: a second reset yields identical content.
    reset.reset_all(dbs).await.expect("second reset failed");
    assert_eq!(user_emails(users.pool()).await, baseline_emails);
    assert_eq!(count(points.pool(), "points").await, 3);

    provisioner.stop_all().await;
    assert!(provisioner.databases().is_empty());
}

#[tokio::test]
async fn missing_scripts_skipped_and_env_files_written() {
    init_tracing();

    // Empty services root: no schema, no seed. Both are optional and
    // must be skipped silently.
    let root = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        services_root: root.path().to_path_buf(),
        emit_env_files: true,
        ..HarnessConfig::default()
    };

    let mut provisioner = DatabaseProvisioner::new(config.clone());
    provisioner.start_all().await.expect("start_all failed");

    for db in provisioner.databases() {
        let env_path = config.env_file_path(db.descriptor);
        let content = std::fs::read_to_string(&env_path).expect("env file written");

        let prefix = db.descriptor.env_prefix;
        assert!(content.contains(&format!("{prefix}_HOST={}\n", db.host)));
        assert!(content.contains(&format!("{prefix}_PORT={}\n", db.port)));
        assert!(content.contains(&format!("{prefix}_NAME={}\n", db.descriptor.db_name)));
        assert!(content.contains(&format!("{prefix}_USER=testuser\n")));
        assert!(content.contains(&format!("{prefix}_PASSWORD=testpass\n")));
    }

    provisioner.stop_all().await;
}

#[tokio::test]
async fn broken_schema_fails_whole_startup() {
    init_tracing();

    // One of three services has an invalid schema; the whole call must
    // fail and commit nothing.
    let root = tempfile::tempdir().unwrap();
    let db_dir = root.path().join("user-service").join("database");
    std::fs::create_dir_all(&db_dir).unwrap();
    std::fs::write(db_dir.join("schema.sql"), "CREATE TABL oops;").unwrap();

    let config = HarnessConfig {
        services_root: root.path().to_path_buf(),
        emit_env_files: false,
        ..HarnessConfig::default()
    };

    let mut provisioner = DatabaseProvisioner::new(config);
    let err = provisioner.start_all().await.unwrap_err();
    assert!(matches!(
        err,
        HarnessError::SchemaLoad {
            service: "user-service",
            ..
        }
    ));
    assert!(provisioner.databases().is_empty(), "no partial state");

    // stop_all after a failed start is a no-op, not an error.
    provisioner.stop_all().await;
}
