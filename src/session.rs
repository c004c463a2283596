// ABOUTME: Session context shared by every operation: config, lazy engines, operation lock
// ABOUTME: Engines load once on first use; concurrent first uses wait on the same load

use crate::config::Config;
use crate::engine::SqlEngine;
use crate::error::{ConversionError, Result};
use crate::paste::{ExternalFormatter, MarkdownFormatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OnceCell};

/// Explicit context passed to every operation
///
/// Holds the loaded configuration and the lazily initialized SQL engine and
/// Markdown formatter. Operations run one at a time: each holds the guard
/// returned by [`Session::begin_operation`] until it finishes.
pub struct Session {
    config: Config,
    engine: OnceCell<Arc<SqlEngine>>,
    formatter: OnceCell<Arc<dyn MarkdownFormatter>>,
    operation: Mutex<()>,
    engine_loads: AtomicUsize,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            engine: OnceCell::new(),
            formatter: OnceCell::new(),
            operation: Mutex::new(()),
            engine_loads: AtomicUsize::new(0),
        }
    }

    /// Session with a ready formatter instead of the configured executable
    pub fn with_formatter(config: Config, formatter: Arc<dyn MarkdownFormatter>) -> Self {
        Self {
            formatter: OnceCell::new_with(Some(formatter)),
            ..Self::new(config)
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The SQL engine, loaded on first call
    ///
    /// # Errors
    ///
    /// Returns `EngineLoadFailure` if loading fails. A failed load is not
    /// cached, so the next call tries again.
    pub async fn engine(&self) -> Result<Arc<SqlEngine>> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                self.engine_loads.fetch_add(1, Ordering::SeqCst);
                tracing::info!("Loading SQL engine...");
                let engine = tokio::task::spawn_blocking(SqlEngine::load)
                    .await
                    .map_err(|e| {
                        ConversionError::EngineLoadFailure(format!("engine loader panicked: {}", e))
                    })??;
                Ok::<_, ConversionError>(Arc::new(engine))
            })
            .await?;
        Ok(Arc::clone(engine))
    }

    /// Number of times an engine load was started
    pub fn engine_loads(&self) -> usize {
        self.engine_loads.load(Ordering::SeqCst)
    }

    /// The Markdown formatter, located on first call
    pub async fn formatter(&self) -> Result<Arc<dyn MarkdownFormatter>> {
        let formatter = self
            .formatter
            .get_or_try_init(|| async {
                let config = self.config.formatter.clone();
                let formatter = tokio::task::spawn_blocking(move || ExternalFormatter::locate(&config))
                    .await
                    .map_err(|e| {
                        ConversionError::EngineLoadFailure(format!(
                            "formatter lookup panicked: {}",
                            e
                        ))
                    })??;
                Ok::<_, ConversionError>(Arc::new(formatter) as Arc<dyn MarkdownFormatter>)
            })
            .await?;
        Ok(Arc::clone(formatter))
    }

    /// Wait for any running operation to finish and claim the session
    pub async fn begin_operation(&self) -> MutexGuard<'_, ()> {
        self.operation.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paste::{FormatOptions, Formatted};

    struct Upper;

    impl MarkdownFormatter for Upper {
        fn format(&self, text: &str, _options: &FormatOptions) -> anyhow::Result<Formatted> {
            Ok(Formatted {
                output: text.to_uppercase(),
                warnings: vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_use_loads_engine_once() {
        let session = Arc::new(Session::new(Config::default()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.engine().await.map(|_| ()) })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(session.engine_loads(), 1);

        let first = session.engine().await.unwrap();
        let second = session.engine().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(session.engine_loads(), 1);
    }

    #[tokio::test]
    async fn test_injected_formatter_is_used() {
        let session = Session::with_formatter(Config::default(), Arc::new(Upper));
        let formatter = session.formatter().await.unwrap();
        let formatted = formatter.format("hi", &FormatOptions::default()).unwrap();
        assert_eq!(formatted.output, "HI");
    }

    #[tokio::test]
    async fn test_missing_formatter_fails_to_load() {
        let mut config = Config::default();
        config.formatter.command = "npconv-no-such-formatter".to_string();
        let session = Session::new(config);
        assert!(matches!(
            session.formatter().await,
            Err(ConversionError::EngineLoadFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_operations_are_serialized() {
        let session = Session::new(Config::default());
        let guard = session.begin_operation().await;
        assert!(session.operation.try_lock().is_err());
        drop(guard);
        assert!(session.operation.try_lock().is_ok());
    }
}
