//! Per-request identity and the kinds of access it can ask for.

use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of access requested on a collection.
///
/// There is no hierarchy between the two: holding WRITE does not grant READ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Read,
    Write,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Read => "read",
            AccessType::Write => "write",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved identity and role scopes of one request.
///
/// A principal always holds the anonymous role, whether authenticated or not.
/// It is built by the credential resolver and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    authenticated: bool,
    username: Option<String>,
    scopes: BTreeSet<String>,
}

impl Principal {
    /// Principal of a request without a credential
    pub fn anonymous(anonymous_role: &str) -> Self {
        Self {
            authenticated: false,
            username: None,
            scopes: BTreeSet::from([anonymous_role.to_string()]),
        }
    }

    /// Principal of a request with a verified credential
    pub fn authenticated<I, S>(username: Option<String>, roles: I, anonymous_role: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scopes: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        scopes.insert(anonymous_role.to_string());
        Self {
            authenticated: true,
            username,
            scopes,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.scopes.contains(role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Build the denial matching this principal: anonymous callers are asked
    /// to authenticate (401), authenticated ones are refused outright (403).
    pub fn deny(&self, message: impl Into<String>) -> Error {
        if self.authenticated {
            Error::forbidden(message)
        } else {
            Error::unauthorized(message)
        }
    }
}
