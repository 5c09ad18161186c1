//! Core types for CampusFeed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated principal, as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

/// A session returned by the auth provider.
///
/// When the provider requires email verification, sign-up returns a session
/// that carries the new identity but no access token yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user: Identity,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    /// Whether this session can authorize backend calls
    pub fn is_usable(&self) -> bool {
        self.access_token.is_some()
    }
}

/// A stored post record.
///
/// `profiles` is populated only when the record was fetched with the author
/// join (feed queries); single-record lookups leave it `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<AuthorRef>,
}

/// Author display data joined into a feed row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorRef {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// The field-set a submission writes.
///
/// Fields left `None` are omitted from the serialized record, so an update
/// leaves the corresponding stored columns unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostFields {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A user profile, upserted wholesale on every save
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub hobby: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// A locally selected file, not yet uploaded to durable storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its final path component as the name
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let bytes = std::fs::read(path)?;
        Ok(Self { name, bytes })
    }

    /// File extension without the dot, if the name has one
    pub fn extension(&self) -> Option<&str> {
        self.name
            .rsplit_once('.')
            .map(|(stem, ext)| (stem, ext))
            .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
            .map(|(_, ext)| ext)
    }
}

/// Attachment category, which determines the storage prefix and the
/// staging-slot behavior (many images, single video, single file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentKind {
    Image,
    Video,
    File,
}

impl AttachmentKind {
    /// Category-scoped storage prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Video => "videos",
            Self::File => "files",
        }
    }
}

impl std::fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
            Self::File => write!(f, "file"),
        }
    }
}
