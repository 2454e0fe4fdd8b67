//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use user_service::config::ServiceConfig;
use user_service::resilience::BreakerRegistry;
use user_service::users::{InMemoryUserRepository, RepositoryError, User, UserDraft, UserRepository};
use user_service::{Application, Shutdown};

pub const ADMIN_KEY: &str = "integration-admin-key";

/// A running service bound to ephemeral ports.
pub struct TestApp {
    pub addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub breakers: Arc<BreakerRegistry>,
    pub shutdown: Arc<Shutdown>,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestApp {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn admin_url(&self, path: &str) -> String {
        format!("http://{}{}", self.admin_addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap().unwrap();
    }
}

pub async fn spawn_app(mut config: ServiceConfig, repository: Arc<dyn UserRepository>) -> TestApp {
    config.admin.api_key = ADMIN_KEY.to_string();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let admin_addr = admin_listener.local_addr().unwrap();

    let app = Application::assemble_with(config, repository);
    let breakers = app.breakers();
    let shutdown = Arc::new(Shutdown::new());
    let handle = tokio::spawn(app.run(listener, Some(admin_listener), shutdown.clone()));

    TestApp {
        addr,
        admin_addr,
        breakers,
        shutdown,
        handle,
    }
}

/// Client that never reuses connections, so a stopped server is noticed.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// In-memory store that can be switched into failing mode and counts calls.
#[derive(Default)]
pub struct FlakyRepository {
    inner: InMemoryUserRepository,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyRepository {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable("database unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserRepository for FlakyRepository {
    async fn save(&self, user: UserDraft) -> Result<User, RepositoryError> {
        self.check()?;
        self.inner.save(user).await
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        self.inner.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.check()?;
        self.inner.find_by_email(email).await
    }

    async fn delete_by_id(&self, id: u64) -> Result<(), RepositoryError> {
        self.check()?;
        self.inner.delete_by_id(id).await
    }
}
