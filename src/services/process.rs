use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Environments a process is allowed to run in
///
/// Parsing the configured name through this enum is what keeps an
/// unintentional development build from shipping to production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

/// The configured environment name is not one of the known ones
#[derive(Debug, Error)]
#[error("unknown environment {0:?}, expected development, test or production")]
pub struct EnvironmentError(pub String);

impl FromStr for Environment {
    type Err = EnvironmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "development" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" => Ok(Self::Production),
            other => Err(EnvironmentError(other.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT)
///
/// Completes on the first signal so the caller can start a graceful
/// shutdown. A second signal received while that shutdown is still in
/// flight exits the process immediately with status 1.
pub async fn shutdown_signal() {
    wait_for_signal().await;
    tracing::warn!("shutdown signal received, send it again to exit immediately");

    tokio::spawn(async {
        wait_for_signal().await;
        tracing::warn!("second shutdown signal received, exiting now");
        std::process::exit(1);
    });
}

async fn wait_for_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
