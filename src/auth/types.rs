//! Credential and session types

use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Login credentials for one organisation
///
/// Credential files written for other clients use PascalCase keys
/// (`UserName`, `OrgID`, ...), so both spellings are accepted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(alias = "UserName")]
    pub user_name: String,
    #[serde(alias = "Password")]
    pub password: String,
    #[serde(alias = "OrgID", alias = "OrgId")]
    pub org_id: String,
    #[serde(alias = "DevKey")]
    pub dev_key: String,
}

impl Credentials {
    /// Create credentials from their parts
    pub fn new(
        user_name: impl Into<String>,
        password: impl Into<String>,
        org_id: impl Into<String>,
        dev_key: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
            org_id: org_id.into(),
            dev_key: dev_key.into(),
        }
    }

    /// Load credentials from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let credentials: Credentials = serde_json::from_str(&content)
            .with_context(|| format!("Invalid credentials file {}", path.display()))?;
        credentials.validate()?;
        Ok(credentials)
    }

    /// Check that no field is empty
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("user_name", &self.user_name),
            ("password", &self.password),
            ("org_id", &self.org_id),
            ("dev_key", &self.dev_key),
        ] {
            if value.trim().is_empty() {
                return Err(Error::missing_field(field));
            }
        }
        Ok(())
    }

    /// Form fields of a login request
    pub(crate) fn login_form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("userName", self.user_name.clone()),
            ("password", self.password.clone()),
            ("orgId", self.org_id.clone()),
            ("devKey", self.dev_key.clone()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("org_id", &self.org_id)
            .field("dev_key", &"<redacted>")
            .finish()
    }
}

/// An authenticated session
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    session_id: String,
    dev_key: String,
}

impl Session {
    /// Wrap an existing session id
    pub fn new(session_id: impl Into<String>, dev_key: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            dev_key: dev_key.into(),
        }
    }

    /// Session id returned by the login call
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Developer key the session was opened with
    pub fn dev_key(&self) -> &str {
        &self.dev_key
    }

    /// Form fields of an authenticated request carrying `data`
    pub fn form(&self, data: String) -> Vec<(&'static str, String)> {
        vec![
            ("data", data),
            ("sessionId", self.session_id.clone()),
            ("devKey", self.dev_key.clone()),
        ]
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &"<redacted>")
            .finish_non_exhaustive()
    }
}
