//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the server (telemetry, client, router)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{validate_config, ConfigError, ServiceConfig};
use crate::http::server::{ServerError, ServiceServer};
use crate::lifecycle::Shutdown;
use crate::observability::metrics::Telemetry;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A service accepting traffic on a background task.
#[derive(Debug)]
pub struct RunningService {
    name: String,
    addr: SocketAddr,
    telemetry: Arc<Telemetry>,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), ServerError>>,
}

/// Validate `config`, bind its address and start serving.
pub async fn start(config: ServiceConfig) -> Result<RunningService, StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let server = ServiceServer::new(config)?;
    let address = server.config().bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;
    let addr = listener.local_addr().map_err(ServerError::from)?;

    let name = server.config().service_name();
    let telemetry = server.telemetry();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(listener, shutdown.wait()));

    tracing::info!(service = %name, address = %addr, "Service ready");
    Ok(RunningService {
        name,
        addr,
        telemetry,
        shutdown,
        task,
    })
}

impl RunningService {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://{addr}`, suitable as a downstream base URL.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Trigger graceful shutdown and wait for in-flight requests to drain.
    pub async fn stop(self) -> Result<(), StartupError> {
        self.shutdown.trigger();
        Ok(self.task.await??)
    }

    /// Serve until `signal` resolves or the server exits on its own.
    pub async fn run_until<F>(self, signal: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            name,
            shutdown,
            mut task,
            ..
        } = self;

        tokio::select! {
            () = signal => {}
            joined = &mut task => return Ok(joined??),
        }

        tracing::info!(service = %name, "Draining in-flight requests");
        shutdown.trigger();
        Ok(task.await??)
    }
}
