//! Desired-state description of a single grant.
//!
//! A [`GrantSpec`] is validated once when it is built or deserialized, so the
//! statement builder and the reconciler can work with it without re-checking.
//! Every field is creation-only: a change to any of them is a replacement.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GrantError, Result};

pub const DEFAULT_HOST: &str = "localhost";

/// Database sentinel meaning "all databases".
pub const ALL_DATABASES: &str = "*";

/// Raw resource fields as delivered by the tracking system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantFields {
    pub user: String,
    #[serde(default = "default_host")]
    pub host: String,
    pub database: String,
    pub privileges: BTreeSet<String>,
    #[serde(default)]
    pub grant: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "GrantFields", into = "GrantFields")]
pub struct GrantSpec {
    user: String,
    host: String,
    database: String,
    privileges: BTreeSet<String>,
    grant_option: bool,
}

impl GrantSpec {
    /// Build a spec for `user@localhost` without grant option.
    pub fn new<I, S>(user: impl Into<String>, database: impl Into<String>, privileges: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = Self {
            user: user.into(),
            host: DEFAULT_HOST.to_string(),
            database: database.into(),
            privileges: privileges.into_iter().map(Into::<String>::into).collect(),
            grant_option: false,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Result<Self> {
        self.host = host.into();
        self.validate()?;
        Ok(self)
    }

    pub fn with_grant_option(mut self, grant_option: bool) -> Self {
        self.grant_option = grant_option;
        self
    }

    /// Parse and validate the resource field surface from a JSON object.
    pub fn from_fields(value: &serde_json::Value) -> Result<Self> {
        let fields = GrantFields::deserialize(value)
            .map_err(|e| GrantError::InvalidSpec(e.to_string()))?;
        Self::try_from(fields)
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Privileges in lexicographic order.
    pub fn privileges(&self) -> &BTreeSet<String> {
        &self.privileges
    }

    pub fn grant_option(&self) -> bool {
        self.grant_option
    }

    pub fn is_all_databases(&self) -> bool {
        self.database == ALL_DATABASES
    }

    pub fn identity(&self) -> GrantIdentity {
        GrantIdentity(format!("{}@{}:{}", self.user, self.host, self.database))
    }

    /// Any difference at all forces Remove(old) followed by Apply(new).
    pub fn requires_replacement(&self, other: &GrantSpec) -> bool {
        self != other
    }

    /// Reject values that would render to unparsable SQL.
    ///
    /// Names are interpolated without escaping, so quote characters are refused
    /// here rather than escaped later.
    pub fn validate(&self) -> Result<()> {
        if self.user.is_empty() {
            return Err(GrantError::InvalidSpec("user must not be empty".into()));
        }
        validate_quoted("user", &self.user)?;
        if self.host.is_empty() {
            return Err(GrantError::InvalidSpec("host must not be empty".into()));
        }
        validate_quoted("host", &self.host)?;
        if self.database.is_empty() {
            return Err(GrantError::InvalidSpec("database must not be empty".into()));
        }
        if self.database.chars().any(char::is_control) {
            return Err(GrantError::InvalidSpec(format!(
                "database contains a control character: {:?}",
                self.database
            )));
        }
        if self.database.contains('`') {
            return Err(GrantError::InvalidSpec(format!(
                "database contains a backtick: {}",
                self.database
            )));
        }
        if self.privileges.is_empty() {
            return Err(GrantError::InvalidSpec(
                "privileges must contain at least one entry".into(),
            ));
        }
        for privilege in &self.privileges {
            validate_privilege(privilege)?;
        }
        Ok(())
    }
}

/// Values rendered inside `'...'`: a backslash would escape the closing quote.
fn validate_quoted(field: &str, value: &str) -> Result<()> {
    if let Some(c) = value
        .chars()
        .find(|c| *c == '\'' || *c == '\\' || c.is_control())
    {
        return Err(GrantError::InvalidSpec(format!(
            "{} contains forbidden character {:?}: {:?}",
            field, c, value
        )));
    }
    Ok(())
}

fn validate_privilege(privilege: &str) -> Result<()> {
    if privilege.trim().is_empty() {
        return Err(GrantError::InvalidSpec("privilege must not be empty".into()));
    }
    if privilege != privilege.trim() || privilege.contains("  ") {
        return Err(GrantError::InvalidSpec(format!(
            "privilege has stray whitespace: {:?}",
            privilege
        )));
    }
    let valid = privilege
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ');
    if !valid {
        return Err(GrantError::InvalidSpec(format!(
            "privilege contains invalid characters: {}",
            privilege
        )));
    }
    Ok(())
}

impl TryFrom<GrantFields> for GrantSpec {
    type Error = GrantError;

    fn try_from(fields: GrantFields) -> Result<Self> {
        let spec = Self {
            user: fields.user,
            host: fields.host,
            database: fields.database,
            privileges: fields.privileges,
            grant_option: fields.grant,
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl From<GrantSpec> for GrantFields {
    fn from(spec: GrantSpec) -> Self {
        Self {
            user: spec.user,
            host: spec.host,
            database: spec.database,
            privileges: spec.privileges,
            grant: spec.grant_option,
        }
    }
}

/// Opaque existence marker, `user@host:database`.
///
/// Never parsed back; the principal for SHOW GRANTS always comes from the spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantIdentity(String);

impl GrantIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
