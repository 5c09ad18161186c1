//! Post composer
//!
//! Owns the compose-or-edit form state and drives submission: staged
//! attachments are uploaded strictly in order (images in selection order,
//! then video, then file), and only after every required upload resolves is
//! the single create-or-update call issued. The persistence write never
//! races its own uploads, and an explicit in-flight guard keeps a second
//! submission from interleaving with the first.
//!
//! Failure anywhere in the sequence leaves the form content and staged
//! attachments untouched so the user can retry without re-selecting files.
//! Assets uploaded before the failing step stay in the object store,
//! unreferenced by any post.

use serde_json::Value;
use tracing::{debug, info};

use crate::backend::{DataStore, ObjectStore, OwnerPredicate};
use crate::error::{CampusfeedError, DbError, Result};
use crate::staging::StagedAttachments;
use crate::types::{AttachmentKind, Identity, LocalFile, Post, PostFields};
use crate::uploader::AssetUploader;

/// Whether the form targets a new post or an in-place edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerMode {
    Creating,
    Editing(String),
}

pub struct Composer {
    mode: ComposerMode,
    content: String,
    staging: StagedAttachments,
    in_flight: bool,
}

impl Composer {
    pub fn new() -> Self {
        Self {
            mode: ComposerMode::Creating,
            content: String::new(),
            staging: StagedAttachments::new(),
            in_flight: false,
        }
    }

    pub fn mode(&self) -> &ComposerMode {
        &self.mode
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// True while a submission is running; callers must disable the
    /// submit affordance when this is set
    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    pub fn staged(&self) -> &StagedAttachments {
        &self.staging
    }

    /// Replace the pending selection for one attachment category
    pub fn stage(&mut self, kind: AttachmentKind, files: Vec<LocalFile>) {
        self.staging.stage(kind, files);
    }

    /// Remove one pending attachment
    pub fn unstage(&mut self, kind: AttachmentKind, index: Option<usize>) -> Option<LocalFile> {
        self.staging.unstage(kind, index)
    }

    /// Switch the form to editing an existing post
    ///
    /// Loads the target's content and clears staged attachments: editing
    /// attachments means replacing them, so previews never pre-populate.
    /// Choosing a different post while already editing resets the form
    /// before entering the new edit.
    ///
    /// # Errors
    ///
    /// Rejected while a submission is in flight.
    pub fn begin_edit(&mut self, post: &Post) -> Result<()> {
        self.guard_idle()?;
        self.content = post.content.clone().unwrap_or_default();
        self.staging.clear();
        self.mode = ComposerMode::Editing(post.id.clone());
        Ok(())
    }

    /// Abandon an edit: clears the form and returns to create mode
    ///
    /// # Errors
    ///
    /// Rejected while a submission is in flight.
    pub fn cancel(&mut self) -> Result<()> {
        self.guard_idle()?;
        self.content.clear();
        self.staging.clear();
        self.mode = ComposerMode::Creating;
        Ok(())
    }

    /// Submit the form: upload staged attachments, then persist
    ///
    /// In `Creating` mode this inserts a new post owned by `viewer`; in
    /// `Editing` mode it issues an ownership-scoped update that overwrites
    /// exactly the fields this submission produced. On success the form is
    /// cleared and the composer returns to `Creating`; the caller should
    /// reload the feed. On failure the form and staged attachments are left
    /// as they were.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if a submission is already in flight, or if content
    ///   is empty and nothing is staged (checked before any network call)
    /// - `UploadError` if the object store rejects a write
    /// - `DbError` if the persistence call fails
    pub async fn submit(
        &mut self,
        viewer: &Identity,
        store: &dyn DataStore,
        objects: &dyn ObjectStore,
    ) -> Result<Post> {
        self.guard_idle()?;

        let content = self.content.trim().to_string();
        if content.is_empty() && self.staging.is_empty() {
            return Err(CampusfeedError::InvalidInput(
                "A post needs content or at least one attachment".to_string(),
            ));
        }

        self.in_flight = true;
        let result = self.perform_submission(viewer, store, objects, content).await;
        self.in_flight = false;

        let post = result?;

        self.content.clear();
        self.staging.clear();
        self.mode = ComposerMode::Creating;
        Ok(post)
    }

    fn guard_idle(&self) -> Result<()> {
        if self.in_flight {
            return Err(CampusfeedError::InvalidInput(
                "A submission is already in progress".to_string(),
            ));
        }
        Ok(())
    }

    async fn perform_submission(
        &self,
        viewer: &Identity,
        store: &dyn DataStore,
        objects: &dyn ObjectStore,
        content: String,
    ) -> Result<Post> {
        let uploader = AssetUploader::new(objects);
        let mut fields = PostFields {
            content,
            ..Default::default()
        };

        if !self.staging.images().is_empty() {
            let mut urls = Vec::with_capacity(self.staging.images().len());
            for image in self.staging.images() {
                urls.push(uploader.upload(image, AttachmentKind::Image).await?);
            }
            fields.image_urls = Some(urls);
        }

        if let Some(video) = self.staging.video() {
            fields.video_url = Some(uploader.upload(video, AttachmentKind::Video).await?);
        }

        if let Some(file) = self.staging.file() {
            fields.file_url = Some(uploader.upload(file, AttachmentKind::File).await?);
            fields.file_name = Some(file.name.clone());
        }

        let row = match &self.mode {
            ComposerMode::Editing(id) => {
                debug!(post_id = %id, "updating post");
                store
                    .update(
                        "posts",
                        id,
                        OwnerPredicate::new("user_id", &viewer.id),
                        to_record(&fields)?,
                    )
                    .await?
            }
            ComposerMode::Creating => {
                fields.user_id = Some(viewer.id.clone());
                debug!("creating post");
                store.insert("posts", to_record(&fields)?).await?
            }
        };

        let post: Post = serde_json::from_value(row)
            .map_err(|e| DbError::Malformed(format!("stored post: {}", e)))?;
        info!(post_id = %post.id, "post saved");
        Ok(post)
    }
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

fn to_record(fields: &PostFields) -> Result<Value> {
    serde_json::to_value(fields).map_err(|e| DbError::Malformed(format!("post fields: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;

    fn viewer() -> Identity {
        Identity {
            id: "viewer-1".to_string(),
            email: "viewer@example.edu".to_string(),
        }
    }

    fn file(name: &str) -> LocalFile {
        LocalFile::new(name, vec![0xAB])
    }

    #[tokio::test]
    async fn test_empty_submission_rejected_without_network() {
        let backend = MockBackend::new();
        let viewer = viewer();
        let mut composer = Composer::new();
        composer.set_content("   ");

        let result = composer.submit(&viewer, &backend, &backend).await;
        assert!(matches!(
            result.unwrap_err(),
            CampusfeedError::InvalidInput(_)
        ));

        // No uploads, no inserts: rejected before any backend call
        assert_eq!(backend.put_call_count(), 0);
        assert_eq!(backend.insert_call_count(), 0);
        assert!(!composer.is_submitting());
    }

    #[tokio::test]
    async fn test_attachment_only_submission_is_valid() {
        let backend = MockBackend::new();
        let viewer = viewer();
        let mut composer = Composer::new();
        composer.stage(AttachmentKind::Image, vec![file("a.png")]);

        let post = composer.submit(&viewer, &backend, &backend).await.unwrap();
        assert_eq!(post.content.as_deref(), Some(""));
        assert_eq!(post.image_urls.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_successful_create_clears_form() {
        let backend = MockBackend::new();
        let viewer = viewer();
        let mut composer = Composer::new();
        composer.set_content("hello");
        composer.stage(AttachmentKind::Image, vec![file("a.png")]);

        let post = composer.submit(&viewer, &backend, &backend).await.unwrap();

        assert_eq!(post.user_id, viewer.id);
        assert_eq!(composer.content(), "");
        assert!(composer.staged().is_empty());
        assert_eq!(*composer.mode(), ComposerMode::Creating);
    }

    #[tokio::test]
    async fn test_upload_sequence_and_image_order() {
        let backend = MockBackend::new();
        let viewer = viewer();
        let mut composer = Composer::new();
        composer.set_content("media post");
        composer.stage(AttachmentKind::Image, vec![file("a.png"), file("b.jpg")]);
        composer.stage(AttachmentKind::Video, vec![file("clip.mp4")]);
        composer.stage(AttachmentKind::File, vec![file("notes.pdf")]);

        let post = composer.submit(&viewer, &backend, &backend).await.unwrap();

        // Fixed upload order: images in selection order, then video, then file
        let order = backend.put_order();
        assert_eq!(order.len(), 4);
        assert!(order[0].starts_with("images/") && order[0].ends_with(".png"));
        assert!(order[1].starts_with("images/") && order[1].ends_with(".jpg"));
        assert!(order[2].starts_with("videos/"));
        assert!(order[3].starts_with("files/"));

        // The stored field-set preserves selection order
        let urls = post.image_urls.unwrap();
        assert!(urls[0].ends_with(".png"));
        assert!(urls[1].ends_with(".jpg"));
        assert_eq!(post.file_name.as_deref(), Some("notes.pdf"));
        assert!(post.video_url.unwrap().contains("videos/"));
    }

    #[tokio::test]
    async fn test_second_image_upload_failure_preserves_form() {
        let backend = MockBackend::put_failure_on(2);
        let viewer = viewer();
        let mut composer = Composer::new();
        composer.set_content("hello");
        composer.stage(AttachmentKind::Image, vec![file("a.png"), file("b.png")]);

        let result = composer.submit(&viewer, &backend, &backend).await;
        assert!(result.is_err());

        // No post record was created
        assert!(backend.rows("posts").is_empty());
        // The composer returned to its prior idle state with the form intact
        assert_eq!(*composer.mode(), ComposerMode::Creating);
        assert!(!composer.is_submitting());
        assert_eq!(composer.content(), "hello");
        assert_eq!(composer.staged().images().len(), 2);
        // The first image stays stored but unreferenced
        assert_eq!(backend.object_count(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_preserves_form() {
        let backend = MockBackend::insert_failure();
        let viewer = viewer();
        let mut composer = Composer::new();
        composer.set_content("hello");
        composer.stage(AttachmentKind::Image, vec![file("a.png")]);

        let result = composer.submit(&viewer, &backend, &backend).await;
        assert!(result.is_err());

        // The upload succeeded before persistence failed: orphaned asset
        assert_eq!(backend.object_count(), 1);
        assert_eq!(composer.content(), "hello");
        assert_eq!(composer.staged().images().len(), 1);
        assert!(!composer.is_submitting());
    }

    #[tokio::test]
    async fn test_begin_edit_loads_content_and_clears_staging() {
        let backend = MockBackend::new();
        let viewer = viewer();
        let mut composer = Composer::new();
        composer.set_content("original");
        let original = composer.submit(&viewer, &backend, &backend).await.unwrap();

        composer.stage(AttachmentKind::Image, vec![file("stale.png")]);
        composer.begin_edit(&original).unwrap();

        assert_eq!(composer.content(), "original");
        // Edit never pre-populates attachment previews
        assert!(composer.staged().is_empty());
        assert_eq!(*composer.mode(), ComposerMode::Editing(original.id));
    }

    #[tokio::test]
    async fn test_cancel_returns_to_creating_and_leaves_post_unchanged() {
        let backend = MockBackend::new();
        let viewer = viewer();
        let mut composer = Composer::new();
        composer.set_content("keep me");
        let post = composer.submit(&viewer, &backend, &backend).await.unwrap();

        composer.begin_edit(&post).unwrap();
        composer.set_content("discarded edit");
        composer.cancel().unwrap();

        assert_eq!(composer.content(), "");
        assert!(composer.staged().is_empty());
        assert_eq!(*composer.mode(), ComposerMode::Creating);

        let stored = backend.rows("posts");
        assert_eq!(stored[0]["content"], "keep me");
    }

    #[tokio::test]
    async fn test_edit_submission_updates_only_target_post() {
        let backend = MockBackend::new();
        let viewer = viewer();
        let mut composer = Composer::new();

        composer.set_content("first");
        let first = composer.submit(&viewer, &backend, &backend).await.unwrap();
        composer.set_content("second");
        let second = composer.submit(&viewer, &backend, &backend).await.unwrap();

        composer.begin_edit(&first).unwrap();
        composer.set_content("first, edited");
        let updated = composer.submit(&viewer, &backend, &backend).await.unwrap();

        assert_eq!(updated.id, first.id);
        assert_eq!(*composer.mode(), ComposerMode::Creating);

        let rows = backend.rows("posts");
        let content_of = |id: &str| {
            rows.iter()
                .find(|r| r["id"] == id)
                .map(|r| r["content"].as_str().unwrap().to_string())
                .unwrap()
        };
        assert_eq!(content_of(&first.id), "first, edited");
        assert_eq!(content_of(&second.id), "second");
    }

    #[tokio::test]
    async fn test_edit_without_new_attachments_keeps_existing_urls() {
        let backend = MockBackend::new();
        let viewer = viewer();
        let mut composer = Composer::new();
        composer.set_content("with image");
        composer.stage(AttachmentKind::Image, vec![file("a.png")]);
        let post = composer.submit(&viewer, &backend, &backend).await.unwrap();

        composer.begin_edit(&post).unwrap();
        composer.set_content("edited text only");
        let updated = composer.submit(&viewer, &backend, &backend).await.unwrap();

        // Omitted fields leave stored columns unchanged
        assert_eq!(updated.image_urls.unwrap().len(), 1);
        assert_eq!(updated.content.as_deref(), Some("edited text only"));
    }

    #[tokio::test]
    async fn test_edit_of_unowned_post_is_rejected_by_predicate() {
        let backend = MockBackend::new();
        let owner = Identity {
            id: "owner".to_string(),
            email: "owner@example.edu".to_string(),
        };
        let intruder = Identity {
            id: "intruder".to_string(),
            email: "intruder@example.edu".to_string(),
        };

        let mut composer = Composer::new();
        composer.set_content("mine");
        let post = composer.submit(&owner, &backend, &backend).await.unwrap();

        composer.begin_edit(&post).unwrap();
        composer.set_content("stolen");
        let result = composer.submit(&intruder, &backend, &backend).await;
        assert!(result.is_err());

        assert_eq!(backend.rows("posts")[0]["content"], "mine");
        // Failure preserved the edit in progress
        assert_eq!(*composer.mode(), ComposerMode::Editing(post.id));
    }
}
