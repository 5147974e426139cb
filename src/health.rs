//! Health check module
//! Provides health status for the application and its dependencies

use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::warn;

use crate::database;

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Overall health state
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

/// Component state
#[derive(Debug, Serialize, Clone)]
pub enum ComponentState {
    Up,
    Down,
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<u128>) -> Self {
        Self {
            status: ComponentState::Up,
            response_time_ms,
            details: None,
        }
    }

    pub fn down(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Down,
            response_time_ms: None,
            details,
        }
    }
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

/// Runs the dependency checks and aggregates them into one status.
pub async fn check(pool: &sqlx::PgPool) -> HealthStatus {
    let mut checks = HashMap::new();

    let started = Instant::now();
    let db_health = match database::health_check(pool).await {
        Ok(()) => ComponentHealth::up(Some(started.elapsed().as_millis())),
        Err(e) => {
            warn!(error = %e, "database health check failed");
            ComponentHealth::down(Some(e.to_string()))
        }
    };

    let status = match db_health.status {
        ComponentState::Up => HealthState::Healthy,
        ComponentState::Down => HealthState::Unhealthy,
    };
    checks.insert("database".to_string(), db_health);

    HealthStatus {
        status,
        checks,
        timestamp: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_status_reflects_component_state() {
        let mut checks = HashMap::new();
        checks.insert("database".to_string(), ComponentHealth::up(Some(3)));
        let status = HealthStatus {
            status: HealthState::Healthy,
            checks,
            timestamp: chrono::Utc::now(),
        };
        assert!(status.is_healthy());
    }
}
