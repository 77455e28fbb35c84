use super::{FileTreeProvider, PasswordProvider};
use crate::error::{Result, ResultExt, StarbenchError};
use crate::util::redact_url;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Clones a git repository, optionally at a given branch or commit.
#[derive(Debug)]
pub struct GitCloner {
    repos_url: String,
    src_dir: PathBuf,
    code_version: Option<String>,
    git_user: Option<String>,
    password_provider: Option<Box<dyn PasswordProvider>>,
    git_exe: PathBuf,
}

impl GitCloner {
    /// Clone `repos_url` into `src_dir`.
    #[must_use]
    pub fn new(repos_url: impl Into<String>, src_dir: impl Into<PathBuf>) -> Self {
        Self {
            repos_url: repos_url.into(),
            src_dir: src_dir.into(),
            code_version: None,
            git_user: None,
            password_provider: None,
            git_exe: PathBuf::from("git"),
        }
    }

    /// Branch, tag or commit id to check out after cloning.
    #[must_use]
    pub fn code_version(mut self, version: impl Into<String>) -> Self {
        self.code_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn git_user(mut self, user: impl Into<String>) -> Self {
        self.git_user = Some(user.into());
        self
    }

    #[must_use]
    pub fn password_provider(mut self, provider: Box<dyn PasswordProvider>) -> Self {
        self.password_provider = Some(provider);
        self
    }

    #[must_use]
    pub fn git_exe(mut self, git_exe: impl Into<PathBuf>) -> Self {
        self.git_exe = git_exe.into();
        self
    }

    #[must_use]
    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    /// The clone URL with `user:password@` injected into `https://` URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the password provider fails.
    pub fn authenticated_url(&self) -> Result<String> {
        let mut credentials = Vec::new();
        if let Some(user) = &self.git_user {
            credentials.push(user.clone());
        }
        if let Some(provider) = &self.password_provider {
            credentials.push(provider.password()?);
        }
        if credentials.is_empty() {
            return Ok(self.repos_url.clone());
        }
        Ok(self
            .repos_url
            .replacen("https://", &format!("https://{}@", credentials.join(":")), 1))
    }

    fn git(&self, args: &[&str], display: &str) -> Result<()> {
        let status = Command::new(&self.git_exe)
            .args(args)
            .current_dir(&self.src_dir)
            .status()
            .with_context(|| format!("Failed to run {}", self.git_exe.display()))?;
        if !status.success() {
            return Err(StarbenchError::CommandFailed {
                command: display.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl FileTreeProvider for GitCloner {
    fn source_tree_path(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.src_dir)
            .with_context(|| format!("Failed to create {}", self.src_dir.display()))?;

        let url = self.authenticated_url()?;
        let redacted = redact_url(&url);
        info!(url = %redacted, src_dir = %self.src_dir.display(), "Cloning repository");
        // Runs inside src_dir, so relative destinations stay correct.
        self.git(
            &["clone", url.as_str(), "."],
            &format!("git clone {redacted} {}", self.src_dir.display()),
        )?;

        if let Some(version) = &self.code_version {
            info!(version = %version, "Checking out code version");
            self.git(&["checkout", version.as_str()], &format!("git checkout {version}"))?;
        }
        Ok(self.src_dir.clone())
    }
}
