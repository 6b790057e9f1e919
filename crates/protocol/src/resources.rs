//! Platform API resources.
//!
//! Field names follow the published platform API so the structs serialize
//! straight onto the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An API credential bound to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub user: User,
    /// Seconds until expiry, `None` for tokens that never expire
    pub expires_in: Option<u64>,
}

/// An application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A release version number.
///
/// Parses both the bare form (`3`) and the prefixed form (`v3`) that
/// command line clients print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u32);

impl FromStr for Version {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('v').unwrap_or(s);
        digits
            .parse::<u32>()
            .map(Version)
            .map_err(|_| ValidationError::new(format!("invalid release version: {s:?}")))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Reference to the build artifact a release runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugRef {
    pub id: String,
}

/// The user who created a release, as embedded in the release resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseUser {
    pub id: String,
    pub email: String,
}

/// An immutable (slug, config) pair deployed for an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: String,
    pub version: Version,
    pub slug: SlugRef,
    pub description: String,
    pub user: ReleaseUser,
    pub created_at: DateTime<Utc>,
}

/// An app's environment.
pub type ConfigVars = BTreeMap<String, String>;

/// A config change. `None` unsets the variable.
pub type ConfigPatch = BTreeMap<String, Option<String>>;

/// Release reference embedded in a dyno.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynoRelease {
    pub version: Version,
}

/// A running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dyno {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub process_type: String,
    pub command: String,
    pub state: String,
    pub size: String,
    pub release: DynoRelease,
    pub updated_at: DateTime<Utc>,
}

/// Desired process count and size for one process type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    #[serde(rename = "type")]
    pub process_type: String,
    pub quantity: u32,
    pub size: String,
}

/// A requested change to one process type's formation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationUpdate {
    pub process: String,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
}

/// The outcome of deploying an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deploy {
    pub id: String,
    pub image: String,
    pub app: String,
    pub release: Release,
}
