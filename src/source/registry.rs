//! Caller-owned factories for source and password providers.
//!
//! A provider is described by a discriminator (`"git-cloner"`) and a mapping
//! of parameters. Descriptions usually come from a YAML file:
//!
//! ```yaml
//! type: git-cloner
//! repos-url: https://github.com/hibridon/hibridon
//! src-dir: /tmp/hibench/source.git
//! code-version: a3bed1c3ccfbca572003020d3e3d3b1ff3934fad
//! git-user: g-raffy
//! password-provider:
//!   type: password-file
//!   password-file-path: /home/me/.github/bench.pat
//! ```

use super::{ExistingDir, FileTreeProvider, GitCloner, PasswordFile, PasswordProvider};
use crate::error::{Result, StarbenchError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Free-form provider parameters.
pub type ProviderParams = Map<String, Value>;

/// Key holding the discriminator in a provider description.
const TYPE_KEY: &str = "type";

type TreeFactory =
    Box<dyn Fn(&ProviderParams, &ProviderRegistry) -> Result<Box<dyn FileTreeProvider>> + Send + Sync>;
type PasswordFactory =
    Box<dyn Fn(&ProviderParams, &ProviderRegistry) -> Result<Box<dyn PasswordProvider>> + Send + Sync>;

/// Maps discriminators to provider constructors.
///
/// Constructors receive the registry itself so that a provider can build the
/// providers it depends on (a git cloner builds its password provider).
#[derive(Default)]
pub struct ProviderRegistry {
    tree_factories: BTreeMap<String, TreeFactory>,
    password_factories: BTreeMap<String, PasswordFactory>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("tree_providers", &self.tree_provider_ids())
            .field("password_providers", &self.password_provider_ids())
            .finish()
    }
}

impl ProviderRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing `existing-dir`, `git-cloner` and `password-file`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_tree_provider("existing-dir", |params, _| {
            let dir_path = required_str(params, "existing-dir", "dir-path")?;
            Ok(Box::new(ExistingDir::new(dir_path)))
        });
        registry.register_tree_provider("git-cloner", build_git_cloner);
        registry.register_password_provider("password-file", |params, _| {
            let path = required_str(params, "password-file", "password-file-path")?;
            Ok(Box::new(PasswordFile::new(path)))
        });
        registry
    }

    /// Register (or replace) a source tree provider constructor.
    pub fn register_tree_provider<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderParams, &Self) -> Result<Box<dyn FileTreeProvider>> + Send + Sync + 'static,
    {
        self.tree_factories.insert(id.into(), Box::new(factory));
    }

    /// Register (or replace) a password provider constructor.
    pub fn register_password_provider<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderParams, &Self) -> Result<Box<dyn PasswordProvider>> + Send + Sync + 'static,
    {
        self.password_factories.insert(id.into(), Box::new(factory));
    }

    #[must_use]
    pub fn tree_provider_ids(&self) -> Vec<&str> {
        self.tree_factories.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn password_provider_ids(&self) -> Vec<&str> {
        self.password_factories.keys().map(String::as_str).collect()
    }

    /// Build the source tree provider registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::UnknownProvider` for an unregistered `id`, or
    /// the constructor's error for bad parameters.
    pub fn create_tree_provider(
        &self,
        id: &str,
        params: &ProviderParams,
    ) -> Result<Box<dyn FileTreeProvider>> {
        let factory = self
            .tree_factories
            .get(id)
            .ok_or_else(|| StarbenchError::UnknownProvider {
                kind: "file tree",
                id: id.to_string(),
            })?;
        debug!(provider = id, "Creating file tree provider");
        factory(params, self)
    }

    /// Build the password provider registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::UnknownProvider` for an unregistered `id`, or
    /// the constructor's error for bad parameters.
    pub fn create_password_provider(
        &self,
        id: &str,
        params: &ProviderParams,
    ) -> Result<Box<dyn PasswordProvider>> {
        let factory = self
            .password_factories
            .get(id)
            .ok_or_else(|| StarbenchError::UnknownProvider {
                kind: "password",
                id: id.to_string(),
            })?;
        debug!(provider = id, "Creating password provider");
        factory(params, self)
    }

    /// Build a source tree provider from a description carrying its `type`.
    ///
    /// # Errors
    ///
    /// Returns an error if `type` is missing or unknown, or if the
    /// parameters are invalid.
    pub fn tree_provider_from_description(
        &self,
        description: &ProviderParams,
    ) -> Result<Box<dyn FileTreeProvider>> {
        let id = required_str(description, "source", TYPE_KEY)?;
        self.create_tree_provider(id, description)
    }

    /// Parse a YAML description and build the source tree provider it names.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is not a mapping or the description is
    /// invalid.
    pub fn tree_provider_from_yaml(&self, yaml: &str) -> Result<Box<dyn FileTreeProvider>> {
        let value: Value = serde_yaml::from_str(yaml)?;
        let Value::Object(description) = value else {
            return Err(StarbenchError::config(
                "a source description must be a mapping",
            ));
        };
        self.tree_provider_from_description(&description)
    }
}

fn build_git_cloner(
    params: &ProviderParams,
    registry: &ProviderRegistry,
) -> Result<Box<dyn FileTreeProvider>> {
    const PROVIDER: &str = "git-cloner";

    let repos_url = required_str(params, PROVIDER, "repos-url")?;
    let src_dir = required_str(params, PROVIDER, "src-dir")?;
    let mut cloner = GitCloner::new(repos_url, src_dir);

    if let Some(version) = optional_str(params, PROVIDER, "code-version")? {
        cloner = cloner.code_version(version);
    }
    if let Some(user) = optional_str(params, PROVIDER, "git-user")? {
        cloner = cloner.git_user(user);
    }
    match params.get("password-provider") {
        None | Some(Value::Null) => {}
        Some(Value::Object(provider_params)) => {
            let id = required_str(provider_params, "password-provider", TYPE_KEY)?;
            cloner = cloner.password_provider(registry.create_password_provider(id, provider_params)?);
        }
        Some(_) => {
            return Err(StarbenchError::missing_parameter(
                PROVIDER,
                "password-provider (mapping)",
            ));
        }
    }
    Ok(Box::new(cloner))
}

fn required_str<'a>(params: &'a ProviderParams, provider: &str, key: &str) -> Result<&'a str> {
    optional_str(params, provider, key)?
        .ok_or_else(|| StarbenchError::missing_parameter(provider, key))
}

fn optional_str<'a>(
    params: &'a ProviderParams,
    provider: &str,
    key: &str,
) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(StarbenchError::missing_parameter(
            provider,
            format!("{key} (string)"),
        )),
    }
}
