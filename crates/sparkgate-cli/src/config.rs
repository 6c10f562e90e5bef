//! Credential store at `~/.sparkcli/config`.
//!
//! A small kubeconfig-shaped YAML file remembering which gateway and user were
//! used last:
//!
//! ```yaml
//! apiVersion: v1
//! kind: SparkClientConfig
//! clusters:
//!   - name: http://gateway:8080/sparkapi/v1
//!     cluster: {server: http://gateway:8080/sparkapi/v1}
//! contexts:
//!   - name: http://gateway:8080/sparkapi/v1
//!     context: {cluster: http://gateway:8080/sparkapi/v1, user: alice}
//! current-context: http://gateway:8080/sparkapi/v1
//! users:
//!   - name: alice
//!     user: {password: secret}
//! ```
//!
//! Clusters and contexts are named after the server URL.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::filelock::wait_lock_file;
use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = ".sparkcli";
const CONFIG_FILE_NAME: &str = "config";
const API_VERSION: &str = "v1";
const KIND: &str = "SparkClientConfig";
const STORE_LOCK_WAIT: Duration = Duration::from_secs(5);

/// Persistent credential store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(rename = "current-context", default)]
    pub current_context: String,
    #[serde(default)]
    pub users: Vec<NamedUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub server: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Context {
    pub cluster: String,
    pub user: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedUser {
    pub name: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub password: String,
}

/// Server, user and password for one gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub server: String,
    pub user: String,
    pub password: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            clusters: Vec::new(),
            contexts: Vec::new(),
            current_context: String::new(),
            users: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Load `path`, or an empty config when it does not exist
    pub fn load_if_exists(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) if data.trim().is_empty() => Ok(Self::default()),
            Ok(data) => serde_yaml::from_str(&data).map_err(|e| {
                Error::command_failed(format!("failed to parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::command_failed(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Write the config to `path`, creating its directory
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                Error::command_failed(format!("failed to create {}: {}", dir.display(), e))
            })?;
        }
        let data = serde_yaml::to_string(self)?;
        std::fs::write(path, data)
            .map_err(|e| Error::command_failed(format!("failed to write {}: {}", path.display(), e)))
    }

    /// Remember `user`/`password` for `server` and make it the current context
    pub fn update_current_user_password(&mut self, server: &str, user: &str, password: &str) {
        let cluster = Cluster {
            server: server.to_string(),
        };
        match self.clusters.iter_mut().find(|c| c.name == server) {
            Some(existing) => existing.cluster = cluster,
            None => self.clusters.push(NamedCluster {
                name: server.to_string(),
                cluster,
            }),
        }

        let context = Context {
            cluster: server.to_string(),
            user: user.to_string(),
        };
        match self.contexts.iter_mut().find(|c| c.name == server) {
            Some(existing) => existing.context = context,
            None => self.contexts.push(NamedContext {
                name: server.to_string(),
                context,
            }),
        }

        let details = User {
            password: password.to_string(),
        };
        match self.users.iter_mut().find(|u| u.name == user) {
            Some(existing) => existing.user = details,
            None => self.users.push(NamedUser {
                name: user.to_string(),
                user: details,
            }),
        }

        self.current_context = server.to_string();
    }

    /// Credential of the current context
    pub fn current_credential(&self) -> Result<Credential> {
        if self.current_context.is_empty() {
            return Err(Error::credential_not_found("current context is not set"));
        }
        self.credential_for_context(&self.current_context)
    }

    /// Credential last used with `server`
    pub fn credential_by_server(&self, server: &str) -> Result<Credential> {
        let cluster = self
            .clusters
            .iter()
            .find(|c| c.cluster.server == server)
            .ok_or_else(|| Error::credential_not_found(format!("no cluster for server {}", server)))?;
        let context = self
            .contexts
            .iter()
            .find(|c| c.context.cluster == cluster.name)
            .ok_or_else(|| {
                Error::credential_not_found(format!("no context for cluster {}", cluster.name))
            })?;
        self.credential_for_context(&context.name)
    }

    fn credential_for_context(&self, name: &str) -> Result<Credential> {
        let context = self
            .contexts
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::credential_not_found(format!("no details for context {}", name)))?;
        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.context.cluster)
            .ok_or_else(|| {
                Error::credential_not_found(format!(
                    "no details for cluster {}",
                    context.context.cluster
                ))
            })?;
        let user = self
            .users
            .iter()
            .find(|u| u.name == context.context.user)
            .ok_or_else(|| {
                Error::credential_not_found(format!("no details for user {}", context.context.user))
            })?;

        Ok(Credential {
            server: cluster.cluster.server.clone(),
            user: user.name.clone(),
            password: user.user.password.clone(),
        })
    }
}

/// Path to `~/.sparkcli/config`
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Error::command_failed("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// What the command line said about the gateway
#[derive(Debug, Clone, Default)]
pub struct CredentialArgs {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Resolve the gateway credential from the command line and the store at `path`.
///
/// - url, user and password all given: remembered in the store and used
/// - none given: the store's current context
/// - url given without user or password: the missing parts come from the
///   credential stored for that url
///
/// Without a store the command line is used as is. A url is always required.
pub async fn resolve_credential(args: &CredentialArgs, path: Option<&Path>) -> Result<Credential> {
    let url = args.url.clone().filter(|v| !v.is_empty());
    let user = args.user.clone().filter(|v| !v.is_empty());
    let password = args.password.clone().filter(|v| !v.is_empty());

    let Some(path) = path else {
        return finish(url, user, password);
    };

    match (url, user, password) {
        (Some(url), Some(user), Some(password)) => {
            let _lock = wait_lock_file(path, STORE_LOCK_WAIT, true).await?;
            let mut config = ClientConfig::load_if_exists(path)?;
            config.update_current_user_password(&url, &user, &password);
            config.save_to_file(path)?;
            Ok(Credential {
                server: url,
                user,
                password,
            })
        }
        (None, None, None) => {
            let credential = ClientConfig::load_if_exists(path)?.current_credential()?;
            info!(
                server = %credential.server,
                user = %credential.user,
                "Using credential from current context"
            );
            Ok(credential)
        }
        (Some(url), user, password) => {
            let stored = ClientConfig::load_if_exists(path)?.credential_by_server(&url)?;
            info!(server = %url, "Using stored credential for server");
            Ok(Credential {
                server: url,
                user: user.unwrap_or(stored.user),
                password: password.unwrap_or(stored.password),
            })
        }
        (None, user, password) => finish(None, user, password),
    }
}

fn finish(url: Option<String>, user: Option<String>, password: Option<String>) -> Result<Credential> {
    let server = url.ok_or_else(|| {
        Error::validation(
            "please provide server information using --url, e.g. --url http://server:port/sparkapi/v1",
        )
    })?;
    Ok(Credential {
        server,
        user: user.unwrap_or_default(),
        password: password.unwrap_or_default(),
    })
}
