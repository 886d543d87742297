//! Catalog data models.
//!
//! This module defines the static description of each target database as it
//! is read from the catalog file.

use serde::{Deserialize, Serialize};
use url::Url;

/// Supported backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    #[serde(alias = "postgresql")]
    Postgres,
    /// Includes MariaDB
    #[serde(alias = "mariadb")]
    MySql,
    SQLite,
}

impl BackendKind {
    /// Get the display name for this backend kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Get the default port for this backend kind.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Postgres => Some(5432),
            Self::MySql => Some(3306),
            Self::SQLite => None,
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::SQLite => "sqlite",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Privilege mode used when connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessRole {
    #[default]
    Normal,
    #[serde(alias = "sysoper")]
    ElevatedOperator,
    #[serde(alias = "sysdba")]
    ElevatedAdmin,
}

impl AccessRole {
    pub fn is_elevated(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

impl std::fmt::Display for AccessRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::ElevatedOperator => write!(f, "elevated-operator"),
            Self::ElevatedAdmin => write!(f, "elevated-admin"),
        }
    }
}

/// How to reach a target database.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    #[serde(default)]
    pub kind: BackendKind,
    pub user: String,
    /// Sensitive - never logged
    #[serde(default, skip_serializing)]
    pub password: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// Database name for PostgreSQL/MySQL, file path for SQLite.
    pub service_name: String,
    #[serde(default)]
    pub role: AccessRole,
    /// Backend role assumed (`SET ROLE`) when `role` is elevated.
    #[serde(default)]
    pub elevated_role: Option<String>,
}

impl ConnectionDescriptor {
    /// `host/service` form, for display.
    pub fn dsn(&self) -> String {
        format!("{}/{}", self.host, self.service_name)
    }

    /// Build the sqlx connection URL for this descriptor.
    pub fn connection_url(&self) -> Result<String, String> {
        if self.kind == BackendKind::SQLite {
            if self.service_name.trim().is_empty() {
                return Err("SQLite requires a database file path in service_name".to_string());
            }
            return Ok(format!("sqlite:{}", self.service_name));
        }

        let mut url = Url::parse(&format!("{}://localhost", self.kind.scheme()))
            .map_err(|e| format!("Invalid URL: {e}"))?;
        url.set_host(Some(&self.host))
            .map_err(|e| format!("Invalid host '{}': {e}", self.host))?;
        url.set_port(self.port.or(self.kind.default_port()))
            .map_err(|_| "Cannot set port".to_string())?;
        url.set_username(&self.user)
            .map_err(|_| "Cannot set user".to_string())?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| "Cannot set password".to_string())?;
        }
        url.set_path(&self.service_name);
        Ok(url.to_string())
    }
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("kind", &self.kind)
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("service_name", &self.service_name)
            .field("role", &self.role)
            .field("elevated_role", &self.elevated_role)
            .finish()
    }
}

/// One entry of the database catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub connection: ConnectionDescriptor,
}
