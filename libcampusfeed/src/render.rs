//! Post rendering
//!
//! Pure transforms from a feed row plus viewer identity to a display
//! fragment. Nothing here touches the backend; the owner-only affordance
//! flag is a display decision, and the real authorization lives in the
//! store's ownership-scoped mutations.

use chrono::{DateTime, Utc};

use crate::feed::FeedPost;

/// Display-ready representation of one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFragment {
    pub display_name: String,
    pub initials: String,
    pub timestamp: DateTime<Utc>,
    pub content: Option<String>,
    pub media: Vec<MediaItem>,
    /// Edit/delete affordances are shown iff the viewer owns the post
    pub owned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaItem {
    Image { url: String },
    Video { url: String },
    FileLink { url: String, label: String },
}

/// Render one feed row for a viewer
pub fn render(entry: &FeedPost, viewer_id: &str) -> DisplayFragment {
    let post = &entry.post;
    let mut media = Vec::new();

    if let Some(urls) = &post.image_urls {
        for url in urls {
            // Empty URLs are skipped, not rendered as broken
            if !url.is_empty() {
                media.push(MediaItem::Image { url: url.clone() });
            }
        }
    }

    if let Some(url) = post.video_url.as_deref().filter(|u| !u.is_empty()) {
        media.push(MediaItem::Video {
            url: url.to_string(),
        });
    }

    if let Some(url) = post.file_url.as_deref().filter(|u| !u.is_empty()) {
        let label = post
            .file_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Download file")
            .to_string();
        media.push(MediaItem::FileLink {
            url: url.to_string(),
            label,
        });
    }

    DisplayFragment {
        display_name: entry.display_name.clone(),
        initials: initials(&entry.display_name),
        timestamp: post.created_at,
        content: post.content.clone().filter(|c| !c.is_empty()),
        media,
        owned: post.user_id == viewer_id,
    }
}

/// Author initials: first letter of each whitespace-separated token,
/// uppercased, capped at two characters
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|token| token.chars().next())
        .flat_map(|c| c.to_uppercase())
        .take(2)
        .collect()
}

impl DisplayFragment {
    /// Thin presentation adapter for terminal output
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "[{}] {} · {}\n",
            self.initials,
            self.display_name,
            self.timestamp.format("%Y-%m-%d %H:%M")
        ));

        if let Some(content) = &self.content {
            out.push_str(content);
            out.push('\n');
        }

        for item in &self.media {
            match item {
                MediaItem::Image { url } => out.push_str(&format!("  image: {}\n", url)),
                MediaItem::Video { url } => out.push_str(&format!("  video: {}\n", url)),
                MediaItem::FileLink { url, label } => {
                    out.push_str(&format!("  file: {} ({})\n", label, url))
                }
            }
        }

        if self.owned {
            out.push_str("  (yours: edit/delete available)\n");
        }
        out
    }
}
