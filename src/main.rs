//! service-chain
//!
//! Runs one service of the chain. The role decides the resource, the service
//! name and the default port:
//!
//! ```text
//!   client ──▶ orders-service (8002) ──▶ users-service (8000)
//!                     │
//!                     └──────────────▶ products-service (8001)
//! ```
//!
//! Configuration comes from an optional TOML file, then command-line flags
//! and environment variables override individual values.

use std::path::PathBuf;

use clap::Parser;

use service_chain::config::{load_config, LogFormat, Role, ServiceConfig};
use service_chain::lifecycle::{self, wait_for_termination};
use service_chain::observability::init_logging;

#[derive(Parser, Debug)]
#[command(name = "service-chain")]
#[command(about = "One service of the correlated users/products/orders chain", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SERVICE_CONFIG")]
    config: Option<PathBuf>,

    /// Service role (users, products, orders)
    #[arg(short, long, env = "SERVICE_ROLE")]
    role: Option<Role>,

    /// Bind address, e.g. 0.0.0.0:8002
    #[arg(long, env = "BIND_ADDRESS")]
    bind: Option<String>,

    /// Port on 0.0.0.0; ignored when --bind is given
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Base URL of the users service
    #[arg(long, env = "USERS_SERVICE_URL")]
    users_url: Option<String>,

    /// Base URL of the products service
    #[arg(long, env = "PRODUCTS_SERVICE_URL")]
    products_url: Option<String>,

    /// Log output format (json, pretty)
    #[arg(long, env = "LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

impl Args {
    fn into_config(self) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
        let mut config = match (&self.config, self.role) {
            (Some(path), _) => load_config(path)?,
            (None, Some(role)) => ServiceConfig::for_role(role),
            (None, None) => ServiceConfig::default(),
        };

        if let Some(role) = self.role {
            config.service.role = role;
        }
        if let Some(port) = self.port {
            config.service.bind_address = Some(format!("0.0.0.0:{port}"));
        }
        if let Some(bind) = self.bind {
            config.service.bind_address = Some(bind);
        }
        if let Some(url) = self.users_url {
            config.downstream.set(Role::Users, Some(url));
        }
        if let Some(url) = self.products_url {
            config.downstream.set(Role::Products, Some(url));
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().into_config()?;
    let _logging = init_logging(&config.logging, &config.service_name())?;

    tracing::info!(
        service = %config.service_name(),
        role = %config.service.role,
        bind_address = %config.bind_address(),
        users_url = ?config.downstream.users,
        products_url = ?config.downstream.products,
        chain_next = ?config.chain.next,
        handler_timeout_secs = config.timeouts.handler_secs,
        downstream_timeout_ms = config.timeouts.downstream_ms,
        "Configuration loaded"
    );

    let service = lifecycle::start(config).await?;
    service.run_until(wait_for_termination()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
