//! Where the code under benchmark comes from.
//!
//! - [`FileTreeProvider`] - populates and returns a directory of buildable source
//! - [`PasswordProvider`] - supplies a secret, e.g. a git personal access token
//! - [`ProviderRegistry`] - builds either kind from a string discriminator and
//!   a parameter mapping

mod git;
mod registry;
mod secret;

pub use git::GitCloner;
pub use registry::{ProviderParams, ProviderRegistry};
pub use secret::{LiteralPassword, PasswordFile};

use crate::error::{Result, StarbenchError};
use std::fmt;
use std::path::PathBuf;

/// Provides a directory containing the source tree to build.
pub trait FileTreeProvider: fmt::Debug {
    /// Populate the tree if needed and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be made available.
    fn source_tree_path(&self) -> Result<PathBuf>;
}

/// Provides a password or access token.
pub trait PasswordProvider: fmt::Debug {
    /// # Errors
    ///
    /// Returns an error if the secret cannot be read.
    fn password(&self) -> Result<String>;
}

/// A source tree that is already on disk, used as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingDir {
    dir_path: PathBuf,
}

impl ExistingDir {
    #[must_use]
    pub fn new(dir_path: impl Into<PathBuf>) -> Self {
        Self {
            dir_path: dir_path.into(),
        }
    }
}

impl FileTreeProvider for ExistingDir {
    fn source_tree_path(&self) -> Result<PathBuf> {
        if !self.dir_path.is_dir() {
            return Err(StarbenchError::config(format!(
                "source directory {} does not exist",
                self.dir_path.display()
            )));
        }
        Ok(self.dir_path.clone())
    }
}
