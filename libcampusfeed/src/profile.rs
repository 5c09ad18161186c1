//! Profile management
//!
//! One profile per authenticated identity, created lazily and saved
//! wholesale: every save upserts the entire record, so fields absent from
//! the saved profile are cleared rather than merged.

use std::sync::Arc;

use tracing::info;

use crate::backend::DataStore;
use crate::error::{CampusfeedError, DbError, Result};
use crate::types::{Identity, Profile};

pub struct ProfileService {
    store: Arc<dyn DataStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Load the viewer's profile, or an empty one for first-time users
    pub async fn load(&self, viewer: &Identity) -> Result<Profile> {
        match self.store.select_one("profiles", &viewer.id).await {
            Ok(row) => serde_json::from_value(row)
                .map_err(|e| DbError::Malformed(format!("stored profile: {}", e)).into()),
            Err(CampusfeedError::Db(DbError::NotFound(_))) => Ok(Profile {
                id: viewer.id.clone(),
                ..Default::default()
            }),
            Err(e) => Err(e),
        }
    }

    /// Save the whole profile (no partial-field update)
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the profile's id does not match the
    /// viewer; `DbError` if the upsert fails.
    pub async fn save(&self, viewer: &Identity, mut profile: Profile) -> Result<Profile> {
        if profile.id.is_empty() {
            profile.id = viewer.id.clone();
        }
        if profile.id != viewer.id {
            return Err(CampusfeedError::InvalidInput(
                "Profile id does not match the signed-in user".to_string(),
            ));
        }

        let record = serde_json::to_value(&profile)
            .map_err(|e| DbError::Malformed(format!("profile: {}", e)))?;
        let row = self.store.upsert("profiles", record).await?;
        info!(user_id = %viewer.id, "profile saved");

        serde_json::from_value(row)
            .map_err(|e| DbError::Malformed(format!("stored profile: {}", e)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;

    fn viewer() -> Identity {
        Identity {
            id: "u1".to_string(),
            email: "u1@example.edu".to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_missing_profile_returns_empty() {
        let backend = MockBackend::new();
        let service = ProfileService::new(Arc::new(backend));

        let profile = service.load(&viewer()).await.unwrap();
        assert_eq!(profile.id, "u1");
        assert!(profile.full_name.is_none());
        assert!(profile.nickname.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let backend = MockBackend::new();
        let service = ProfileService::new(Arc::new(backend));

        let profile = Profile {
            id: "u1".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
            nickname: Some("ada".to_string()),
            age: Some(21),
            department: Some("Mathematics".to_string()),
            ..Default::default()
        };
        service.save(&viewer(), profile).await.unwrap();

        let loaded = service.load(&viewer()).await.unwrap();
        assert_eq!(loaded.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(loaded.age, Some(21));
    }

    #[tokio::test]
    async fn test_save_is_wholesale() {
        let backend = MockBackend::new();
        let service = ProfileService::new(Arc::new(backend));

        service
            .save(
                &viewer(),
                Profile {
                    id: "u1".to_string(),
                    hobby: Some("chess".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // A later save without the hobby clears it
        service
            .save(
                &viewer(),
                Profile {
                    id: "u1".to_string(),
                    full_name: Some("Ada".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let loaded = service.load(&viewer()).await.unwrap();
        assert_eq!(loaded.full_name.as_deref(), Some("Ada"));
        assert!(loaded.hobby.is_none());
    }

    #[tokio::test]
    async fn test_save_rejects_mismatched_id() {
        let backend = MockBackend::new();
        let service = ProfileService::new(Arc::new(backend));

        let result = service
            .save(
                &viewer(),
                Profile {
                    id: "someone-else".to_string(),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            result.unwrap_err(),
            CampusfeedError::InvalidInput(_)
        ));
    }

    #[tokio::test]
    async fn test_save_fills_missing_id_from_viewer() {
        let backend = MockBackend::new();
        let service = ProfileService::new(Arc::new(backend));

        let saved = service.save(&viewer(), Profile::default()).await.unwrap();
        assert_eq!(saved.id, "u1");
    }
}
