//! Domain models shared between the API service and its storage layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// User account record
///
/// The stored document keeps the argon2 hash; it never leaves the service.
/// Handlers expose [`UserProfile`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new customer account with an already-hashed password
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            role: Role::Customer,
            created_at: Utc::now(),
        }
    }
}

/// Public view of a user, safe to return to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Display technology of an outdoor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutdoorKind {
    Led,
    Lcd,
    Projector,
}

/// Operational status of an outdoor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutdoorStatus {
    Active,
    Inactive,
    Maintenance,
}

/// Outdoor (billboard display) record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outdoor {
    pub id: String,

    pub name: String,

    /// Free-form location string
    pub location: String,

    pub kind: OutdoorKind,

    /// Unique lookup code for playback clients; immutable once assigned
    pub public_code: String,

    pub status: OutdoorStatus,

    /// Owning user id
    pub owner_id: String,

    /// Linked advertisement ids, mirrored on each ad's `outdoor_ids`
    pub ad_ids: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Outdoor {
    /// Create a new outdoor; the public code is assigned by the storage
    /// layer once a unique one has been reserved.
    pub fn new(name: String, location: String, kind: OutdoorKind, owner_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            location,
            kind,
            public_code: String::new(),
            status: OutdoorStatus::Active,
            owner_id,
            ad_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Media kind of an advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Whether a MIME type agrees with this declared kind
    pub fn matches_mime(&self, mime: &str) -> bool {
        match self {
            MediaKind::Image => mime.starts_with("image/"),
            MediaKind::Video => mime.starts_with("video/"),
        }
    }
}

/// Advertisement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdStatus {
    Active,
    Inactive,
}

/// Advertisement record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
    pub id: String,

    pub title: String,

    pub kind: MediaKind,

    /// Stored filename in the media store
    pub file: String,

    /// Playback duration in seconds, always positive
    pub duration_secs: u32,

    /// Owning user id
    pub owner_id: String,

    pub status: AdStatus,

    /// Linked outdoor ids, mirrored on each outdoor's `ad_ids`
    pub outdoor_ids: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ad {
    /// Create a new active advertisement referencing a stored file
    pub fn new(
        title: String,
        kind: MediaKind,
        file: String,
        duration_secs: u32,
        owner_id: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            kind,
            file,
            duration_secs,
            owner_id,
            status: AdStatus::Active,
            outdoor_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"customer\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&OutdoorStatus::Maintenance).unwrap(),
            "\"maintenance\""
        );
        assert_eq!(serde_json::to_string(&AdStatus::Active).unwrap(), "\"active\"");
        let kind: OutdoorKind = serde_json::from_str("\"projector\"").unwrap();
        assert_eq!(kind, OutdoorKind::Projector);
    }

    #[test]
    fn test_media_kind_matches_mime() {
        assert!(MediaKind::Image.matches_mime("image/png"));
        assert!(!MediaKind::Image.matches_mime("video/mp4"));
        assert!(MediaKind::Video.matches_mime("video/webm"));
        assert!(!MediaKind::Video.matches_mime("image/gif"));
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let user = User::new(
            "Alice".to_string(),
            "alice@example.com".to_string(),
            "$argon2id$fake".to_string(),
        );
        let profile = UserProfile::from(&user);
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "alice@example.com");
    }
}
