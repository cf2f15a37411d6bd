use std::fmt;

use serde::{Deserialize, Serialize};

/// A boolean capability a user may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    List,
    Create,
    Download,
    Update,
    Admin,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::List,
        Capability::Create,
        Capability::Download,
        Capability::Update,
        Capability::Admin,
    ];

    /// Capabilities a regular package uploader gets by default.
    pub const UPLOADER: [Capability; 4] = [
        Capability::List,
        Capability::Create,
        Capability::Download,
        Capability::Update,
    ];

    pub fn parse(s: &str) -> Option<Capability> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" | "can_list" => Some(Self::List),
            "create" | "can_create" => Some(Self::Create),
            "download" | "can_download" => Some(Self::Download),
            "update" | "can_update" => Some(Self::Update),
            "admin" | "is_admin" => Some(Self::Admin),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Download => "download",
            Self::Update => "update",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
