//! Context helpers for attaching a message to lower-level failures.

use super::{Result, StarbenchError};

/// Attach context to a fallible result.
pub trait ResultExt<T> {
    /// Wrap the error with a context message.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::WithContext` if `self` is an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Wrap the error with a lazily built context message.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::WithContext` if `self` is an error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|source| StarbenchError::WithContext {
            context: context.into(),
            source: Box::new(source),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| StarbenchError::WithContext {
            context: f().into(),
            source: Box::new(source),
        })
    }
}

/// Turn a missing value into a configuration error.
pub trait OptionExt<T> {
    /// # Errors
    ///
    /// Returns `StarbenchError::Config` if `self` is `None`.
    fn ok_or_config(self, message: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_config(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| StarbenchError::Config(message.into()))
    }
}
