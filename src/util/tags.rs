//! Placeholder substitution in command arguments and path templates.
//!
//! Templates carry tags such as `<worker_id>` that are replaced by a value
//! specific to the worker running the command, so that parallel runs of the
//! same command can use distinct directories and output files. Substitution is
//! a pure string operation; creating directories is left to the caller.

use crate::model::WorkerId;
use std::path::{Path, PathBuf};

/// Tag replaced by the zero-padded worker id.
pub const WORKER_ID_TAG: &str = "<worker_id>";

/// Render a worker id the way it appears in resolved templates (`7` -> `007`).
#[must_use]
pub fn format_worker_id(worker_id: WorkerId) -> String {
    format!("{worker_id:03}")
}

/// An ordered set of `tag -> value` substitutions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagValues {
    values: Vec<(String, String)>,
}

impl TagValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The substitutions used for a run on `worker_id`.
    #[must_use]
    pub fn for_worker(worker_id: WorkerId) -> Self {
        Self::new().with(WORKER_ID_TAG, format_worker_id(worker_id))
    }

    /// Add (or replace) a substitution.
    #[must_use]
    pub fn with(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        let tag = tag.into();
        let value = value.into();
        if let Some(existing) = self.values.iter_mut().find(|(t, _)| *t == tag) {
            existing.1 = value;
        } else {
            self.values.push((tag, value));
        }
        self
    }

    /// Replace every occurrence of every tag in `template`.
    #[must_use]
    pub fn apply(&self, template: &str) -> String {
        interpret_tags(template, &self.values)
    }

    /// Resolve a path template.
    #[must_use]
    pub fn apply_path(&self, template: &Path) -> PathBuf {
        PathBuf::from(self.apply(&template.to_string_lossy()))
    }

    /// Resolve every argument of a command template.
    #[must_use]
    pub fn apply_all(&self, templates: &[String]) -> Vec<String> {
        templates.iter().map(|arg| self.apply(arg)).collect()
    }
}

/// Replace every occurrence of each tag by its value, in table order.
#[must_use]
pub fn interpret_tags<T, V>(tagged: &str, tags: &[(T, V)]) -> String
where
    T: AsRef<str>,
    V: AsRef<str>,
{
    tags.iter().fold(tagged.to_string(), |acc, (tag, value)| {
        acc.replace(tag.as_ref(), value.as_ref())
    })
}
