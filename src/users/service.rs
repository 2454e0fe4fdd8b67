//! User business operations.
//!
//! Every operation runs through a named circuit breaker from the registry.
//! Writes (create, update, delete) share one breaker, lookups use another,
//! so a read outage does not block writes and vice versa.

use std::fmt;
use std::sync::Arc;

use crate::config::UsersConfig;
use crate::resilience::{BreakerRegistry, CircuitBreaker, FallbackCause};
use crate::users::error::{ServiceError, UserLookup};
use crate::users::events::{EventPublisher, UserEvent};
use crate::users::model::{normalize_email, User, UserDraft};
use crate::users::repository::UserRepository;

pub struct UserService {
    repository: Arc<dyn UserRepository>,
    publisher: Arc<dyn EventPublisher>,
    writes: Arc<CircuitBreaker>,
    reads: Arc<CircuitBreaker>,
    classify_domain_errors: bool,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        publisher: Arc<dyn EventPublisher>,
        breakers: &BreakerRegistry,
        config: &UsersConfig,
    ) -> Self {
        Self {
            repository,
            publisher,
            writes: breakers.get(&config.write_breaker),
            reads: breakers.get(&config.read_breaker),
            classify_domain_errors: config.classify_domain_errors,
        }
    }

    /// Create a user and announce it with a `CREATE` event.
    pub async fn create_user(&self, email: &str) -> Result<User, ServiceError> {
        let email = normalize_email(email)?;
        self.writes
            .execute_classified(
                email,
                move |email| self.insert_user(email),
                |input, cause| Err(degraded(&self.writes, "create_user", &input, cause)),
                self.failure_filter(),
            )
            .await
    }

    /// Change the email of an existing user.
    pub async fn update_user_email(&self, id: u64, email: &str) -> Result<User, ServiceError> {
        let email = normalize_email(email)?;
        self.writes
            .execute_classified(
                (id, email),
                move |(id, email)| self.change_email(id, email),
                |input, cause| Err(degraded(&self.writes, "update_user_email", &input, cause)),
                self.failure_filter(),
            )
            .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<User, ServiceError> {
        let email = normalize_email(email)?;
        self.reads
            .execute_classified(
                email,
                move |email| self.lookup_by_email(email),
                |input, cause| Err(degraded(&self.reads, "get_user_by_email", &input, cause)),
                self.failure_filter(),
            )
            .await
    }

    /// Delete a user if present. Deleting an unknown id succeeds.
    pub async fn delete_user(&self, id: u64) -> Result<(), ServiceError> {
        self.writes
            .execute_classified(
                id,
                move |id| self.remove_user(id),
                |input, cause| Err(degraded(&self.writes, "delete_user", &input, cause)),
                self.failure_filter(),
            )
            .await
    }

    fn failure_filter(&self) -> impl Fn(&ServiceError) -> bool {
        let classify = self.classify_domain_errors;
        move |e: &ServiceError| !classify || e.trips_breaker()
    }

    async fn insert_user(&self, email: String) -> Result<User, ServiceError> {
        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::AlreadyExists(email));
        }
        let user = self.repository.save(UserDraft::new(email)).await?;
        self.publish(UserEvent::created(user.email.clone()));
        Ok(user)
    }

    async fn change_email(&self, id: u64, email: String) -> Result<User, ServiceError> {
        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(UserLookup::Id(id)))?;
        if user.email == email {
            return Ok(user);
        }
        if let Some(owner) = self.repository.find_by_email(&email).await? {
            if owner.id != id {
                return Err(ServiceError::AlreadyExists(email));
            }
        }
        Ok(self.repository.save(user.with_email(email)).await?)
    }

    async fn lookup_by_email(&self, email: String) -> Result<User, ServiceError> {
        match self.repository.find_by_email(&email).await? {
            Some(user) => Ok(user),
            None => Err(ServiceError::NotFound(UserLookup::Email(email))),
        }
    }

    async fn remove_user(&self, id: u64) -> Result<(), ServiceError> {
        if let Some(user) = self.repository.find_by_id(id).await? {
            self.repository.delete_by_id(id).await?;
            self.publish(UserEvent::deleted(user.email));
        }
        Ok(())
    }

    fn publish(&self, event: UserEvent) {
        if let Err(e) = self.publisher.publish(event.clone()) {
            tracing::warn!(
                event_type = event.event_type.as_str(),
                email = %event.email,
                error = %e,
                "Failed to publish user event"
            );
        }
    }
}

/// Fallback shared by every operation: log the cause, answer unavailable.
fn degraded(
    breaker: &CircuitBreaker,
    operation: &'static str,
    input: &dyn fmt::Debug,
    cause: FallbackCause<ServiceError>,
) -> ServiceError {
    match cause {
        FallbackCause::Rejected => tracing::warn!(
            breaker = breaker.name(),
            operation,
            input = ?input,
            "Call short-circuited, serving degraded response"
        ),
        FallbackCause::Failed(e) => tracing::error!(
            breaker = breaker.name(),
            operation,
            input = ?input,
            error = %e,
            "Call failed, serving degraded response"
        ),
    }
    ServiceError::ServiceUnavailable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{BreakerSettings, CircuitState};
    use crate::users::events::{ChannelPublisher, EventType};
    use crate::users::repository::{InMemoryUserRepository, RepositoryError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Store that can be switched into failing mode and counts calls.
    #[derive(Default)]
    struct FlakyRepository {
        inner: InMemoryUserRepository,
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    impl FlakyRepository {
        fn check(&self) -> Result<(), RepositoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(RepositoryError::Unavailable("connection refused".into()))
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

    struct Fixture {
        service: UserService,
        repository: Arc<FlakyRepository>,
        registry: BreakerRegistry,
        events: mpsc::Receiver<UserEvent>,
    }

    fn fixture(config: UsersConfig) -> Fixture {
        let registry = BreakerRegistry::new(BreakerSettings {
            failure_rate_threshold: 50.0,
            sliding_window_size: 4,
            minimum_number_of_calls: 2,
            wait_duration_in_open_state: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
        });
        let repository = Arc::new(FlakyRepository::default());
        let (publisher, events) = ChannelPublisher::new(16);
        let service = UserService::new(repository.clone(), Arc::new(publisher), &registry, &config);
        Fixture {
            service,
            repository,
            registry,
            events,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_crud_scenario() {
        let mut fx = fixture(UsersConfig::default());
        let svc = &fx.service;

        let created = svc.create_user("a@x.com").await.unwrap();
        assert_eq!(
            svc.create_user("a@x.com").await,
            Err(ServiceError::AlreadyExists("a@x.com".into()))
        );
        assert_eq!(svc.get_user_by_email("a@x.com").await.unwrap().id, created.id);

        let updated = svc.update_user_email(created.id, "b@x.com").await.unwrap();
        assert_eq!(updated, User { id: created.id, email: "b@x.com".into() });
        assert_eq!(
            svc.get_user_by_email("a@x.com").await,
            Err(ServiceError::NotFound(UserLookup::Email("a@x.com".into())))
        );

        svc.delete_user(created.id).await.unwrap();
        svc.delete_user(created.id).await.unwrap();

        assert_eq!(fx.events.recv().await, Some(UserEvent::created("a@x.com")));
        assert_eq!(fx.events.recv().await, Some(UserEvent::deleted("b@x.com")));
        assert!(fx.events.try_recv().is_err(), "update and repeated delete publish nothing");
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_unknown_id_is_silent() {
        let mut fx = fixture(UsersConfig::default());
        assert_eq!(fx.service.delete_user(404).await, Ok(()));
        assert_eq!(fx.service.delete_user(404).await, Ok(()));
        assert!(fx.events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_errors() {
        let fx = fixture(UsersConfig::default());
        let svc = &fx.service;
        let a = svc.create_user("a@x.com").await.unwrap();
        svc.create_user("b@x.com").await.unwrap();

        assert_eq!(
            svc.update_user_email(99, "c@x.com").await,
            Err(ServiceError::NotFound(UserLookup::Id(99)))
        );
        assert_eq!(
            svc.update_user_email(a.id, "b@x.com").await,
            Err(ServiceError::AlreadyExists("b@x.com".into()))
        );
        assert_eq!(svc.update_user_email(a.id, " a@x.com ").await, Ok(a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_email_never_reaches_breaker() {
        let fx = fixture(UsersConfig::default());
        assert!(matches!(
            fx.service.create_user("nope").await,
            Err(ServiceError::InvalidEmail(_))
        ));
        assert_eq!(fx.repository.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fx.registry.get("user-writes").snapshot().buffered_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_domain_errors_do_not_trip() {
        let fx = fixture(UsersConfig::default());
        fx.service.create_user("a@x.com").await.unwrap();
        for _ in 0..10 {
            assert!(matches!(fx.service.create_user("a@x.com").await, Err(ServiceError::AlreadyExists(_))));
            assert!(matches!(fx.service.get_user_by_email("z@x.com").await, Err(ServiceError::NotFound(_))));
        }
        assert_eq!(fx.registry.get("user-writes").state(), CircuitState::Closed);
        assert_eq!(fx.registry.get("user-reads").state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unclassified_domain_errors_trip() {
        let config = UsersConfig {
            classify_domain_errors: false,
            ..UsersConfig::default()
        };
        let fx = fixture(config);
        for _ in 0..2 {
            assert_eq!(
                fx.service.get_user_by_email("z@x.com").await,
                Err(ServiceError::ServiceUnavailable)
            );
        }
        assert_eq!(fx.registry.get("user-reads").state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_store_trips_writes_then_recovers() {
        let fx = fixture(UsersConfig::default());
        fx.repository.failing.store(true, Ordering::SeqCst);

        for _ in 0..2 {
            assert_eq!(fx.service.create_user("a@x.com").await, Err(ServiceError::ServiceUnavailable));
        }
        let writes = fx.registry.get("user-writes");
        assert_eq!(writes.state(), CircuitState::Open);

        let calls_at_trip = fx.repository.calls.load(Ordering::SeqCst);
        for _ in 0..5 {
            assert_eq!(fx.service.create_user("a@x.com").await, Err(ServiceError::ServiceUnavailable));
            assert_eq!(
                fx.service.update_user_email(1, "c@x.com").await,
                Err(ServiceError::ServiceUnavailable)
            );
            assert_eq!(fx.service.delete_user(1).await, Err(ServiceError::ServiceUnavailable));
        }
        assert_eq!(fx.repository.calls.load(Ordering::SeqCst), calls_at_trip);

        // Reads have their own breaker and still reach the store.
        assert_eq!(
            fx.service.get_user_by_email("a@x.com").await,
            Err(ServiceError::ServiceUnavailable)
        );
        assert_eq!(fx.repository.calls.load(Ordering::SeqCst), calls_at_trip + 1);

        fx.repository.failing.store(false, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(30)).await;

        let user = fx.service.create_user("a@x.com").await.unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(writes.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failure_does_not_fail_create() {
        let fx = fixture(UsersConfig::default());
        drop(fx.events);
        let user = fx.service.create_user("a@x.com").await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(fx.registry.get("user-writes").snapshot().failed_calls, 0);
    }

    #[test]
    fn test_event_types() {
        assert_eq!(UserEvent::created("a@x.com").event_type, EventType::Create);
        assert_eq!(UserEvent::deleted("a@x.com").event_type, EventType::Delete);
    }
}
