//! Loading and sanitization of schema/seed scripts.
//!
//! Scripts are written for psql and may carry client meta-commands such
//! as `\c user_service_db;`. Those are meaningless on a network
//! connection that is already scoped to the target database, so every
//! line whose first non-whitespace character is a backslash is dropped
//! before the script is sent.

use std::path::Path;

use crate::error::HarnessError;

/// Strip psql meta-command lines, keeping all SQL statements verbatim.
pub fn sanitize(script: &str) -> String {
    script
        .lines()
        .filter(|line| !line.trim_start().starts_with('\\'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read and sanitize a script, returning `None` when the file is absent.
///
/// Absence is expected (schema and seed are both optional per service);
/// any other I/O failure is an error.
pub async fn load_optional(path: &Path) -> Result<Option<String>, HarnessError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(sanitize(&text))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HarnessError::ScriptRead {
            path: path.display().to_string(),
            source: e,
        }),
    }
}
