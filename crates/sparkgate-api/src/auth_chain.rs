//! Basic-auth credential validators
//!
//! Every validator answers one question: is this user/password pair allowed.
//! [`AuthChain`] tries several in order and accepts the first success.
//!
//! # Usage
//!
//! ```rust,ignore
//! let chain = AuthChain::new(vec![
//!     Arc::new(SingleUserValidator::new("admin", "secret")),
//!     Arc::new(MultiUserValidator::new(users)),
//! ]);
//! chain.validate("admin", "secret")?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};

/// Decides whether a username/password pair is authorized
pub trait CredentialValidator: Send + Sync {
    /// `Ok(())` when authorized, `Error::Unauthorized` otherwise
    fn validate(&self, user: &str, password: &str) -> Result<()>;
}

/// Accepts exactly one user
pub struct SingleUserValidator {
    user: String,
    password: String,
}

impl SingleUserValidator {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl CredentialValidator for SingleUserValidator {
    fn validate(&self, user: &str, password: &str) -> Result<()> {
        if user == self.user && password == self.password {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!("invalid credentials for user {}", user)))
        }
    }
}

/// Accepts any user from a fixed table
pub struct MultiUserValidator {
    users: HashMap<String, String>,
}

impl MultiUserValidator {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }
}

impl CredentialValidator for MultiUserValidator {
    fn validate(&self, user: &str, password: &str) -> Result<()> {
        match self.users.get(user) {
            Some(expected) if expected == password => Ok(()),
            Some(_) => Err(Error::Unauthorized(format!(
                "invalid credentials for user {}",
                user
            ))),
            None => Err(Error::Unauthorized(format!("unknown user {}", user))),
        }
    }
}

/// Tries validators in order; first success wins
pub struct AuthChain {
    validators: Vec<Arc<dyn CredentialValidator>>,
}

impl AuthChain {
    pub fn new(validators: Vec<Arc<dyn CredentialValidator>>) -> Self {
        Self { validators }
    }

    /// Number of validators in the chain
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl CredentialValidator for AuthChain {
    fn validate(&self, user: &str, password: &str) -> Result<()> {
        let mut last_error = None;
        for validator in &self.validators {
            match validator.validate(user, password) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(error = %e, "Credential rejected, trying next validator");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| Error::Unauthorized("no credential validators configured".into())))
    }
}
