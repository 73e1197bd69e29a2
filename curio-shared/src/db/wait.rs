/// Startup readiness wait
///
/// Blocks process startup until the database accepts connections. In a
/// containerized deployment PostgreSQL is often still initializing when
/// the API process starts; connecting eagerly would crash the process,
/// so we poll with a fixed backoff instead.
///
/// Transient connectivity failures during normal operation are NOT
/// retried here; this wait runs once, before the server begins
/// accepting requests.
///
/// # Example
///
/// ```no_run
/// use curio_shared::db::wait::{wait_for_db, WaitConfig};
///
/// # async fn example() -> Result<(), curio_shared::db::wait::WaitError> {
/// let pool = wait_for_db("postgresql://localhost/curio", WaitConfig::default()).await?;
/// # Ok(())
/// # }
/// ```

use crate::db::pool::{create_pool, DatabaseConfig};
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

/// Error returned when the database never became reachable
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// Database was still unreachable after the final attempt
    #[error("database unreachable after {attempts} attempts: {source}")]
    Unavailable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

/// Configuration for the readiness wait
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Maximum number of connection attempts before giving up
    pub max_attempts: u32,

    /// Delay between attempts
    pub retry_delay: Duration,

    /// Pool configuration used once the database is reachable
    pub pool: DatabaseConfig,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            retry_delay: Duration::from_secs(1),
            pool: DatabaseConfig::default(),
        }
    }
}

/// Waits for the database to become available and returns a pool
///
/// Attempts to create a connection pool (which includes a health check)
/// up to `max_attempts` times, sleeping `retry_delay` between failures.
///
/// # Errors
///
/// Returns `WaitError::Unavailable` if the database is still
/// unreachable after the final attempt.
pub async fn wait_for_db(url: &str, config: WaitConfig) -> Result<PgPool, WaitError> {
    info!("Waiting for database to become available");

    let mut last_error: Option<sqlx::Error> = None;

    for attempt in 1..=config.max_attempts {
        let pool_config = DatabaseConfig {
            url: url.to_string(),
            ..config.pool.clone()
        };

        match create_pool(pool_config).await {
            Ok(pool) => {
                info!(attempt, "Database is available");
                return Ok(pool);
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %e,
                    "Database unavailable, retrying"
                );
                last_error = Some(e);

                if attempt < config.max_attempts {
                    tokio::time::sleep(config.retry_delay).await;
                }
            }
        }
    }

    Err(WaitError::Unavailable {
        attempts: config.max_attempts,
        source: last_error
            .unwrap_or_else(|| sqlx::Error::Protocol("no connection attempt recorded".into())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_config_default() {
        let config = WaitConfig::default();
        assert_eq!(config.max_attempts, 60);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_gives_up_on_unreachable_database() {
        let config = WaitConfig {
            max_attempts: 2,
            retry_delay: Duration::from_millis(10),
            pool: DatabaseConfig {
                connect_timeout_seconds: 1,
                ..DatabaseConfig::default()
            },
        };

        let result = wait_for_db("postgresql://127.0.0.1:1/nope", config).await;
        match result {
            Err(WaitError::Unavailable { attempts, .. }) => assert_eq!(attempts, 2),
            Ok(_) => panic!("expected unreachable database to fail"),
        }
    }
}
