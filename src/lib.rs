pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

pub use services::{
    CodeGenerator, Counter, Delay, Environment, KeyedLock, LockError, SystemClock, TokioDelay,
};
pub use utils::ServicesConfig;

use services::random::ThreadRandom;

/// Shared bundle of service instances wired from one configuration
///
/// The lock keys on plain strings, which is what callers naming shared
/// resources ("collection:patients", "invoice:42", ...) end up using.
pub struct Services {
    pub env: Environment,
    pub lock: KeyedLock<String>,
    pub counter: Counter,
    pub codes: CodeGenerator,
    pub clock: SystemClock,
    pub config: Arc<ServicesConfig>,
}

impl Services {
    /// Wire every service from `config`
    ///
    /// Fails when the configured environment name is unknown, so a typo in
    /// deployment configuration surfaces at startup rather than at runtime.
    pub fn from_config(config: ServicesConfig) -> Result<Self> {
        let env: Environment = config
            .env
            .parse()
            .context("Failed to validate the configured environment")?;

        let lock = match config.lock.default_timeout_ms {
            Some(ms) => KeyedLock::with_default_timeout(Duration::from_millis(ms)),
            None => KeyedLock::new(),
        };
        let counter = Counter::new(config.counter.first_count);
        let codes = CodeGenerator::with_charset(
            &config.codes.chars_set,
            config.codes.length,
            Arc::new(ThreadRandom),
        );

        tracing::info!(%env, "services initialized");
        Ok(Self {
            env,
            lock,
            counter,
            codes,
            clock: SystemClock,
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn services_wire_from_the_default_config() {
        let services = Services::from_config(ServicesConfig::default()).unwrap();

        assert_eq!(services.env, Environment::Development);
        assert_eq!(services.counter.next(), 1);
        assert_eq!(services.codes.generate().chars().count(), 6);

        services.lock.take("wired".to_string()).await.unwrap();
        services.lock.release(&"wired".to_string()).unwrap();
    }

    #[test]
    fn unknown_environment_fails_wiring() {
        let config = ServicesConfig {
            env: "staging".to_string(),
            ..ServicesConfig::default()
        };

        assert!(Services::from_config(config).is_err());
    }

    #[tokio::test]
    async fn configured_lock_timeout_is_applied() {
        let config = ServicesConfig {
            lock: utils::LockSettings {
                default_timeout_ms: Some(10),
            },
            ..ServicesConfig::default()
        };
        let services = Services::from_config(config).unwrap();

        services.lock.take("busy".to_string()).await.unwrap();
        let err = services.lock.take("busy".to_string()).await.unwrap_err();
        assert!(matches!(
            err,
            LockError::Timeout { timeout, .. } if timeout == Duration::from_millis(10)
        ));
    }
}
