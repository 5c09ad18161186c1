//! Attachment staging area
//!
//! Holds the files a user has selected but not yet uploaded. Purely local
//! state: no network calls and no validation beyond non-empty checks.
//! Images form an ordered, wholesale-replaceable set; video and file are
//! single slots where a new selection discards the previous one.

use crate::types::{AttachmentKind, LocalFile};

#[derive(Debug, Clone, Default)]
pub struct StagedAttachments {
    images: Vec<LocalFile>,
    video: Option<LocalFile>,
    file: Option<LocalFile>,
}

impl StagedAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending selection for a category
    ///
    /// `Image` replaces the whole image set with `files` in the given
    /// order. `Video` and `File` keep only the last file offered, matching
    /// a single-selection input.
    pub fn stage(&mut self, kind: AttachmentKind, files: Vec<LocalFile>) {
        match kind {
            AttachmentKind::Image => self.images = files,
            AttachmentKind::Video => self.video = files.into_iter().next_back(),
            AttachmentKind::File => self.file = files.into_iter().next_back(),
        }
    }

    /// Remove one pending item
    ///
    /// For images, `index` selects which one; remaining images keep their
    /// relative order. For video/file the slot is simply cleared and
    /// `index` is ignored. Returns the removed file, if any.
    pub fn unstage(&mut self, kind: AttachmentKind, index: Option<usize>) -> Option<LocalFile> {
        match kind {
            AttachmentKind::Image => {
                let index = index?;
                if index < self.images.len() {
                    Some(self.images.remove(index))
                } else {
                    None
                }
            }
            AttachmentKind::Video => self.video.take(),
            AttachmentKind::File => self.file.take(),
        }
    }

    pub fn images(&self) -> &[LocalFile] {
        &self.images
    }

    pub fn video(&self) -> Option<&LocalFile> {
        self.video.as_ref()
    }

    pub fn file(&self) -> Option<&LocalFile> {
        self.file.as_ref()
    }

    /// True when nothing is staged in any category
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.video.is_none() && self.file.is_none()
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.video = None;
        self.file = None;
    }
}
