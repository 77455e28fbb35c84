use super::PasswordProvider;
use crate::error::{Result, ResultExt, StarbenchError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A password stored alone on the single line of a file.
///
/// The file is expected to be readable only by its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordFile {
    path: PathBuf,
}

impl PasswordFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PasswordProvider for PasswordFile {
    fn password(&self) -> Result<String> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read password file {}", self.path.display()))?;
        let lines: Vec<&str> = content.lines().collect();
        match lines.as_slice() {
            [password] => Ok((*password).to_string()),
            _ => Err(StarbenchError::SecretFile {
                path: self.path.clone(),
                num_lines: lines.len(),
            }),
        }
    }
}

/// A password given directly, e.g. on the command line.
#[derive(Clone, PartialEq, Eq)]
pub struct LiteralPassword(String);

impl LiteralPassword {
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }
}

impl fmt::Debug for LiteralPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LiteralPassword(***)")
    }
}

impl PasswordProvider for LiteralPassword {
    fn password(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn password_file(content: &str) -> (TempDir, PasswordFile) {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("token.pat");
        fs::write(&path, content).expect("write");
        (temp, PasswordFile::new(path))
    }

    #[test]
    fn reads_single_line_without_newline() {
        let (_temp, provider) = password_file("ghp_abc123\n");
        assert_eq!(provider.password().unwrap(), "ghp_abc123");
    }

    #[test]
    fn accepts_missing_trailing_newline() {
        let (_temp, provider) = password_file("s3cret");
        assert_eq!(provider.password().unwrap(), "s3cret");
    }

    #[test]
    fn rejects_two_lines() {
        let (_temp, provider) = password_file("one\ntwo\n");
        match provider.password().unwrap_err() {
            StarbenchError::SecretFile { num_lines, .. } => assert_eq!(num_lines, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_empty_file() {
        let (_temp, provider) = password_file("");
        match provider.password().unwrap_err() {
            StarbenchError::SecretFile { num_lines, .. } => assert_eq!(num_lines, 0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let provider = PasswordFile::new("/definitely/not/here.pat");
        assert!(matches!(
            provider.password().unwrap_err(),
            StarbenchError::WithContext { .. }
        ));
    }

    #[test]
    fn literal_password_is_not_debug_printed() {
        let provider = LiteralPassword::new("hunter2");
        assert_eq!(provider.password().unwrap(), "hunter2");
        assert!(!format!("{provider:?}").contains("hunter2"));
    }
}
