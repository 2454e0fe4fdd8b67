//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every subsystem from a validated config, in dependency order
//! - Start background tasks (event dispatcher, admin API)
//! - Serve the user API until shutdown, then wait for the background tasks

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::admin::{self, AdminState};
use crate::config::ServiceConfig;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::resilience::BreakerRegistry;
use crate::users::{ChannelPublisher, EventDispatcher, InMemoryUserRepository, UserRepository, UserService};

/// The wired-up service, ready to serve.
pub struct Application {
    config: ServiceConfig,
    breakers: Arc<BreakerRegistry>,
    users: Arc<UserService>,
    dispatcher: EventDispatcher,
}

impl Application {
    /// Assemble with the in-memory user store.
    pub fn assemble(config: ServiceConfig) -> Self {
        Self::assemble_with(config, Arc::new(InMemoryUserRepository::new()))
    }

    /// Assemble around a caller-provided user store.
    pub fn assemble_with(config: ServiceConfig, repository: Arc<dyn UserRepository>) -> Self {
        let breakers = Arc::new(BreakerRegistry::from_config(&config.circuit_breakers));
        let (publisher, events) = ChannelPublisher::new(config.events.channel_capacity);
        let dispatcher = EventDispatcher::new(config.events.topic.clone(), events);
        let users = Arc::new(UserService::new(repository, Arc::new(publisher), &breakers, &config.users));

        tracing::info!(breakers = ?breakers.names(), "Application assembled");

        Self {
            config,
            breakers,
            users,
            dispatcher,
        }
    }

    pub fn breakers(&self) -> Arc<BreakerRegistry> {
        self.breakers.clone()
    }

    pub fn users(&self) -> Arc<UserService> {
        self.users.clone()
    }

    pub fn http_server(&self) -> HttpServer {
        HttpServer::new(
            &self.config,
            AppState {
                users: self.users.clone(),
            },
        )
    }

    pub fn admin_state(&self) -> AdminState {
        AdminState::new(self.breakers.clone(), &self.config.admin.api_key)
    }

    /// Serve until `shutdown` fires. The admin API runs only when a listener
    /// for it is given.
    pub async fn run(
        self,
        listener: TcpListener,
        admin_listener: Option<TcpListener>,
        shutdown: Arc<Shutdown>,
    ) -> Result<(), std::io::Error> {
        let server = self.http_server();
        let admin_state = self.admin_state();

        let dispatcher = tokio::spawn(self.dispatcher.run(shutdown.subscribe()));
        let admin = admin_listener.map(|listener| {
            tokio::spawn(admin::serve(listener, admin_state, shutdown.subscribe()))
        });

        let served = server.run(listener, shutdown.subscribe()).await;

        if let Some(admin) = admin {
            match admin.await {
                Ok(Err(e)) => tracing::error!(error = %e, "Admin API failed"),
                Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
                Ok(Ok(())) => {}
            }
        }
        match dispatcher.await {
            Ok(delivered) => tracing::info!(delivered, "Event dispatcher drained"),
            Err(e) => tracing::error!(error = %e, "Event dispatcher task panicked"),
        }

        served
    }
}
