//! Scenario reset: restore every database to its seeded baseline.
//!
//! Runs between scenarios against already-provisioned databases. Each
//! service's application tables are truncated (CASCADE covers dependent
//! rows) and its seed script is re-applied. Schema migration never
//! re-runs here. Per-service resets are independent and run
//! concurrently.

use futures_util::future::try_join_all;
use tracing::debug;

use crate::config::HarnessConfig;
use crate::descriptor::tables_for;
use crate::error::HarnessError;
use crate::provision::ProvisionedDatabase;

pub struct ResetCoordinator {
    config: HarnessConfig,
}

impl ResetCoordinator {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Restore every database to seeded baseline. Idempotent: any number
    /// of consecutive calls yields identical table content.
    pub async fn reset_all(&self, databases: &[ProvisionedDatabase]) -> Result<(), HarnessError> {
        try_join_all(databases.iter().map(|db| self.reset_one(db))).await?;
        debug!(databases = databases.len(), "All databases reset to baseline");
        Ok(())
    }

    async fn reset_one(&self, db: &ProvisionedDatabase) -> Result<(), HarnessError> {
        let service = db.descriptor.name;
        let tables = tables_for(service)?;

        sqlx::raw_sql(&truncate_statement(tables))
            .execute(db.pool())
            .await
            .map_err(|source| HarnessError::Reset { service, source })?;

        let seed_path = self.config.seed_path(db.descriptor);
        if let Some(seed) = crate::sqlscript::load_optional(&seed_path).await? {
            sqlx::raw_sql(&seed)
                .execute(db.pool())
                .await
                .map_err(|source| HarnessError::Reset { service, source })?;
        }

        debug!(service, "Reset to seeded baseline");
        Ok(())
    }
}

fn truncate_statement(tables: &[&str]) -> String {
    format!("TRUNCATE TABLE {} CASCADE", tables.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_single_table() {
        assert_eq!(truncate_statement(&["users"]), "TRUNCATE TABLE users CASCADE");
    }

    #[test]
    fn test_truncate_joins_table_list() {
        let stmt = truncate_statement(&["user_credentials", "session_tokens", "login_history"]);
        assert_eq!(
            stmt,
            "TRUNCATE TABLE user_credentials, session_tokens, login_history CASCADE"
        );
    }
}
