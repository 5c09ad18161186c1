//! CampusFeed - client library for a small social-feed service
//!
//! This library orchestrates multi-step workflows against an external
//! backend (auth, relational store, object store) and keeps visible feed
//! state consistent with stored state: staging local attachments,
//! sequencing multi-asset uploads, composing and editing posts, and
//! reconciling the feed after every mutation.

pub mod auth;
pub mod backend;
pub mod composer;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod profile;
pub mod render;
pub mod session;
pub mod staging;
pub mod types;
pub mod uploader;

// Re-export commonly used types
pub use composer::{Composer, ComposerMode};
pub use config::Config;
pub use error::{CampusfeedError, Result};
pub use feed::{FeedPost, FeedService};
pub use staging::StagedAttachments;
pub use types::{AttachmentKind, Identity, LocalFile, Post, Profile, Session};
