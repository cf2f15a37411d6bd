use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Capability;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Credential record; empty means the account has no usable password.
    #[serde(skip)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub can_list: bool,
    pub can_create: bool,
    pub can_download: bool,
    pub can_update: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A fresh, inactive user with no capabilities and an unusable password.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            email: None,
            password: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: false,
            is_admin: false,
            can_list: false,
            can_create: false,
            can_download: false,
            can_update: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::List => self.can_list,
            Capability::Create => self.can_create,
            Capability::Download => self.can_download,
            Capability::Update => self.can_update,
            Capability::Admin => self.is_admin,
        }
    }

    pub fn set(&mut self, capability: Capability, value: bool) {
        match capability {
            Capability::List => self.can_list = value,
            Capability::Create => self.can_create = value,
            Capability::Download => self.can_download = value,
            Capability::Update => self.can_update = value,
            Capability::Admin => self.is_admin = value,
        }
    }

    pub fn grant_all(&mut self) {
        for capability in Capability::ALL {
            self.set(capability, true);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub name: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Package {
    #[must_use]
    pub fn new(name: impl Into<String>, author_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            author_id: author_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub package_id: String,
    pub version: String,
    /// 1-based semver rank within the package, 0 when the version does not parse.
    pub version_order: i64,
    pub summary: String,
    pub description: String,
    pub home_page: String,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_id: Option<i64>,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Version {
    #[must_use]
    pub fn new(
        package_id: impl Into<String>,
        version: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            package_id: package_id.into(),
            version: version.into(),
            version_order: 0,
            summary: String::new(),
            description: String::new(),
            home_page: String::new(),
            comment: String::new(),
            license_id: None,
            author_id: author_id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionFile {
    pub id: String,
    pub version_id: String,
    pub filename: String,
    pub relative_path: String,
    pub sha256_digest: String,
    pub size: i64,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

impl VersionFile {
    /// URL path of the file below `/packages/`. The filename is
    /// percent-encoded so names holding `#`, `?` or `%` stay reachable.
    #[must_use]
    pub fn download_path(&self) -> String {
        format!(
            "{}/{}",
            self.relative_path,
            urlencoding::encode(&self.filename)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classifier {
    pub id: i64,
    pub name: String,
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub content: String,
    pub approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub description: String,
    pub value: bool,
}

/// Aggregated downloads of one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsItem {
    pub bucket: DateTime<Utc>,
    pub downloads: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub packages: i64,
    pub active_users: i64,
    pub licenses: i64,
    pub downloads: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionWithFiles {
    #[serde(flatten)]
    pub version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classifiers: Vec<Classifier>,
    pub files: Vec<VersionFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDetail {
    #[serde(flatten)]
    pub package: Package,
    pub maintainers: Vec<User>,
    pub versions: Vec<VersionWithFiles>,
}
