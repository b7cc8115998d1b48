use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::engine::FeedEngine;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    engine: Arc<FeedEngine>,
    /// Human-readable backend names for `/health/info`
    backends: Arc<Backends>,
}

#[derive(Debug, Clone)]
pub struct Backends {
    pub store: &'static str,
    pub cache: &'static str,
}

impl Default for Backends {
    fn default() -> Self {
        Self {
            store: "memory",
            cache: "memory",
        }
    }
}

impl AppState {
    pub fn new(engine: Arc<FeedEngine>, backends: Backends) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            engine,
            backends: Arc::new(backends),
        }
    }

    pub fn engine(&self) -> Arc<FeedEngine> {
        Arc::clone(&self.engine)
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }
}
