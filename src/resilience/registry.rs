//! Named circuit breaker registry.
//!
//! One registry is built at startup and shared by `Arc`; services look their
//! breakers up by operation group name.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::CircuitBreakersConfig;
use crate::resilience::circuit_breaker::{BreakerSettings, BreakerSnapshot, CircuitBreaker};

/// Owns every named breaker of the process.
#[derive(Debug)]
pub struct BreakerRegistry {
    defaults: BreakerSettings,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Create an empty registry. Breakers created on demand use `defaults`.
    pub fn new(defaults: BreakerSettings) -> Self {
        Self {
            defaults,
            breakers: DashMap::new(),
        }
    }

    /// Build a registry and pre-create every configured instance.
    pub fn from_config(config: &CircuitBreakersConfig) -> Self {
        let registry = Self::new(BreakerSettings::from(&config.default));
        for (name, overrides) in &config.instances {
            let merged = overrides.apply(&config.default);
            registry.register(name.clone(), BreakerSettings::from(&merged));
        }
        registry
    }

    /// Install a breaker under `name`, replacing any previous one.
    pub fn register(&self, name: impl Into<String>, settings: BreakerSettings) -> Arc<CircuitBreaker> {
        let name = name.into();
        tracing::debug!(breaker = %name, ?settings, "Registering circuit breaker");
        let breaker = Arc::new(CircuitBreaker::new(name.clone(), settings));
        self.breakers.insert(name, breaker.clone());
        breaker
    }

    /// Get the breaker for `name`, creating it with the defaults if needed.
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return existing.value().clone();
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.defaults.clone())))
            .value()
            .clone()
    }

    /// Look a breaker up without creating it.
    pub fn find(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|r| r.value().clone())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<BreakerSnapshot> = self.breakers.iter().map(|r| r.value().snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerSettings::default())
    }
}
