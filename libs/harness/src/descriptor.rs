//! Static service topology for the pointstack stack.
//!
//! The descriptor set is defined once and immutable for the suite's
//! lifetime. Exactly one database is provisioned per descriptor; the
//! table lists used by scenario reset live in a separate mapping so an
//! unrecognized name surfaces as a configuration error instead of a
//! silent no-op.

use crate::error::HarnessError;

/// A database-backed backend service under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Logical service name, also the service's directory name.
    pub name: &'static str,

    /// Database name the service expects.
    pub db_name: &'static str,

    /// Base URL the running service listens on.
    pub base_url: &'static str,

    /// Prefix for the generated environment file keys.
    pub env_prefix: &'static str,
}

/// The three database-backed services of the pointstack application.
pub const SERVICES: &[ServiceDescriptor] = &[
    ServiceDescriptor {
        name: "user-service",
        db_name: "user_service_db",
        base_url: "http://localhost:8080",
        env_prefix: "DB_USER_SERVICE",
    },
    ServiceDescriptor {
        name: "auth-service",
        db_name: "auth_service_db",
        base_url: "http://localhost:8081",
        env_prefix: "DB_AUTH_SERVICE",
    },
    ServiceDescriptor {
        name: "point-service",
        db_name: "point_service_db",
        base_url: "http://localhost:8082",
        env_prefix: "DB_POINT_SERVICE",
    },
];

/// Application tables cleared (with CASCADE) before each scenario.
///
/// Ordering within a list does not matter; TRUNCATE handles dependent
/// rows. Schema migration tables are intentionally absent.
pub fn tables_for(service: &str) -> Result<&'static [&'static str], HarnessError> {
    match service {
        "user-service" => Ok(&["users"]),
        "auth-service" => Ok(&["user_credentials", "session_tokens", "login_history"]),
        "point-service" => Ok(&["points", "point_history"]),
        other => Err(HarnessError::UnknownService(other.to_string())),
    }
}

/// An HTTP endpoint probed during readiness polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthTarget {
    pub name: String,
    pub url: String,
}

impl HealthTarget {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Everything that must answer before scenarios may run: the three
/// backends plus the BFF and the frontend dev server.
pub fn default_health_targets() -> Vec<HealthTarget> {
    let mut targets: Vec<HealthTarget> = SERVICES
        .iter()
        .map(|s| HealthTarget::new(s.name, s.base_url))
        .collect();
    targets.push(HealthTarget::new("bff", "http://localhost:8090"));
    targets.push(HealthTarget::new("frontend", "http://localhost:3000"));
    targets
}
