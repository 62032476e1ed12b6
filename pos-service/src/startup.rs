//! Application startup and lifecycle management.

use axum::Router;
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{PosConfig, StoreBackend};
use crate::services::{InMemoryRepository, PgRepository, PosRepository, SquareClient};
use crate::{build_router, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect the store, construct the processor client and bind the
    /// listener.
    pub async fn build(config: PosConfig) -> Result<Self, AppError> {
        let repository: Arc<dyn PosRepository> = match config.store {
            StoreBackend::Postgres => {
                let repository = PgRepository::connect(&config.database)
                    .await
                    .map_err(|e| {
                        tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                        e
                    })?;
                repository.run_migrations().await.map_err(|e| {
                    tracing::error!(error = %e, "Failed to run migrations");
                    e
                })?;
                Arc::new(repository)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store - local records are not persisted");
                Arc::new(InMemoryRepository::new())
            }
        };

        let square = SquareClient::new(config.square.clone())?;
        if square.is_configured() {
            tracing::info!(
                location_id = %config.square.location_id,
                base_url = %config.square.api_base_url,
                "Square client initialized"
            );
        } else {
            tracing::warn!("Square credentials not configured - processor calls will fail");
        }

        let state = AppState::new(config.clone(), repository, Arc::new(square));
        let router = build_router(state);

        let host: std::net::IpAddr = config.common.host.parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("invalid host '{}': {}", config.common.host, e))
        })?;
        let addr = SocketAddr::from((host, config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "pos-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, self.router).await
    }
}
