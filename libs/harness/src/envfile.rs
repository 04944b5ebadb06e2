//! Generated per-service environment files.
//!
//! Independently-launched service processes discover their ephemeral
//! database through a `.env.e2e` file written next to each service
//! directory. Keys are `{PREFIX}_HOST`, `{PREFIX}_PORT`, `{PREFIX}_NAME`,
//! `{PREFIX}_USER`, `{PREFIX}_PASSWORD`.

use std::path::Path;

use tracing::info;

use crate::descriptor::ServiceDescriptor;
use crate::error::HarnessError;

const BANNER: &str = "# E2E Test Database Configuration (generated)\n\
                      # DO NOT EDIT MANUALLY - this file is overwritten on every suite start\n";

/// Render the env file content for one provisioned database.
pub fn render(
    service: &ServiceDescriptor,
    host: &str,
    port: u16,
    user: &str,
    password: &str,
) -> String {
    let prefix = service.env_prefix;
    format!(
        "{BANNER}\n\
         {prefix}_HOST={host}\n\
         {prefix}_PORT={port}\n\
         {prefix}_NAME={db_name}\n\
         {prefix}_USER={user}\n\
         {prefix}_PASSWORD={password}\n",
        db_name = service.db_name,
    )
}

/// Write one env file, creating the service directory if needed.
pub fn write(
    path: &Path,
    service: &ServiceDescriptor,
    host: &str,
    port: u16,
    user: &str,
    password: &str,
) -> Result<(), HarnessError> {
    let to_err = |source: std::io::Error| HarnessError::EnvFileWrite {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(to_err)?;
    }
    std::fs::write(path, render(service, host, port, user, password)).map_err(to_err)?;

    info!(service = service.name, path = %path.display(), "Wrote env file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SERVICES;

    #[test]
    fn test_render_exact_keys() {
        let user_service = &SERVICES[0];
        let content = render(user_service, "localhost", 55432, "testuser", "testpass");

        assert!(content.contains("DB_USER_SERVICE_HOST=localhost\n"));
        assert!(content.contains("DB_USER_SERVICE_PORT=55432\n"));
        assert!(content.contains("DB_USER_SERVICE_NAME=user_service_db\n"));
        assert!(content.contains("DB_USER_SERVICE_USER=testuser\n"));
        assert!(content.contains("DB_USER_SERVICE_PASSWORD=testpass\n"));
    }

    #[test]
    fn test_render_has_generated_banner() {
        let content = render(&SERVICES[1], "127.0.0.1", 5432, "u", "p");
        assert!(content.starts_with('#'));
        assert!(content.contains("DO NOT EDIT"));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("point-service").join(".env.e2e");

        write(&path, &SERVICES[2], "localhost", 5433, "testuser", "testpass").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("DB_POINT_SERVICE_PORT=5433\n"));
    }
}
