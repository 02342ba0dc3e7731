//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for one service
//! in the chain. All types derive Serde traits for deserialization from
//! config files, and every section has defaults so a file only needs the
//! values it changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The role a service plays in the chain.
///
/// All three roles run the same middleware stack; the role only decides the
/// resource name, the service name stamped on telemetry and the default port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Users,
    Products,
    Orders,
}

impl Role {
    /// Resource segment used in routes (`/users`, `/products`, `/orders`).
    pub fn resource(&self) -> &'static str {
        match self {
            Role::Users => "users",
            Role::Products => "products",
            Role::Orders => "orders",
        }
    }

    /// Service name used for the `service` label and log field.
    pub fn service_name(&self) -> &'static str {
        match self {
            Role::Users => "users-service",
            Role::Products => "products-service",
            Role::Orders => "orders-service",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Role::Users => 8000,
            Role::Products => 8001,
            Role::Orders => 8002,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "users" | "users-service" => Ok(Role::Users),
            "products" | "products-service" => Ok(Role::Products),
            "orders" | "orders-service" => Ok(Role::Orders),
            other => Err(format!("unknown role '{other}' (expected users, products or orders)")),
        }
    }
}

/// Root configuration for one service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Identity and listener.
    pub service: ServiceSection,

    /// Base URLs of the services this one may call.
    pub downstream: DownstreamConfig,

    /// Chain wiring for the cascade fault.
    pub chain: ChainConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Correlation header handling.
    pub correlation: CorrelationConfig,

    /// Structured logging output.
    pub logging: LoggingConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// In-memory resource store.
    pub store: StoreConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::for_role(Role::Users)
    }
}

impl ServiceConfig {
    /// Defaults for a role on a single host (ports 8000-8002).
    ///
    /// Orders validates against Users and Products and cascades into
    /// Products; the other roles have no downstream.
    pub fn for_role(role: Role) -> Self {
        let mut downstream = DownstreamConfig::default();
        let mut chain = ChainConfig::default();
        if role == Role::Orders {
            downstream.users = Some(format!("http://localhost:{}", Role::Users.default_port()));
            downstream.products =
                Some(format!("http://localhost:{}", Role::Products.default_port()));
            chain.next = Some(Role::Products);
        }

        Self {
            service: ServiceSection {
                role,
                name: None,
                bind_address: None,
            },
            downstream,
            chain,
            timeouts: TimeoutConfig::default(),
            correlation: CorrelationConfig::default(),
            logging: LoggingConfig::default(),
            limits: LimitsConfig::default(),
            store: StoreConfig::default(),
        }
    }

    /// Address the listener binds to.
    pub fn bind_address(&self) -> String {
        self.service
            .bind_address
            .clone()
            .unwrap_or_else(|| format!("0.0.0.0:{}", self.service.role.default_port()))
    }

    /// Service name stamped on every metric and log record.
    pub fn service_name(&self) -> String {
        self.service
            .name
            .clone()
            .unwrap_or_else(|| self.service.role.service_name().to_string())
    }
}

/// Service identity and listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSection {
    pub role: Role,

    /// Overrides the role's default service name.
    pub name: Option<String>,

    /// Bind address (e.g., "0.0.0.0:8000"); defaults to the role's port on
    /// all interfaces.
    pub bind_address: Option<String>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            role: Role::Users,
            name: None,
            bind_address: None,
        }
    }
}

/// Downstream base URLs, one optional entry per role.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DownstreamConfig {
    pub users: Option<String>,
    pub products: Option<String>,
    pub orders: Option<String>,
}

impl DownstreamConfig {
    /// Base URL configured for `role`, if any.
    pub fn url(&self, role: Role) -> Option<&str> {
        match role {
            Role::Users => self.users.as_deref(),
            Role::Products => self.products.as_deref(),
            Role::Orders => self.orders.as_deref(),
        }
    }

    /// Set (or clear) the base URL for `role`.
    pub fn set(&mut self, role: Role, url: Option<String>) {
        match role {
            Role::Users => self.users = url,
            Role::Products => self.products = url,
            Role::Orders => self.orders = url,
        }
    }

    /// Configured `(role, url)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (Role, &str)> {
        [Role::Users, Role::Products, Role::Orders]
            .into_iter()
            .filter_map(move |role| self.url(role).map(|url| (role, url)))
    }
}

/// Chain wiring.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Downstream role whose `error` route `cascade-error` calls.
    /// The `cascade-error` route is only mounted when this is set.
    pub next: Option<Role>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a single handler invocation, in seconds.
    pub handler_secs: u64,

    /// Total deadline for one downstream call, in milliseconds.
    pub downstream_ms: u64,

    /// Connection establishment deadline for downstream calls, in milliseconds.
    pub downstream_connect_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            handler_secs: 120,
            downstream_ms: 5_000,
            downstream_connect_ms: 1_000,
        }
    }
}

/// Correlation header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Header carrying the correlation id, inbound and outbound.
    pub header: String,

    /// Longest client-supplied id adopted verbatim.
    pub max_length: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            header: "X-Trace-ID".to_string(),
            max_length: 128,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    #[default]
    Json,
    /// Human readable, for local development.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{other}' (expected json or pretty)")),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,

    pub format: LogFormat,

    /// Directory for a daily-rotated JSON log file. Stdout only when unset.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            directory: None,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Resource store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Start with the two sample records per resource.
    pub seed: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { seed: true }
    }
}
