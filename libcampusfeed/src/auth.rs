//! Authentication workflows
//!
//! Thin orchestration over the auth provider: cheap client-side checks run
//! before any network call, and sign-up lazily creates the user's profile
//! row. Session lifecycle, credential validation, and email verification
//! are the provider's concern.

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{AuthProvider, DataStore};
use crate::error::{CampusfeedError, Result};
use crate::types::{Identity, Session};

/// Minimum password length enforced before any network call
pub const MIN_PASSWORD_LEN: usize = 6;

pub struct AuthService {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn DataStore>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn AuthProvider>, store: Arc<dyn DataStore>) -> Self {
        Self { provider, store }
    }

    /// Register a new account
    ///
    /// Checks password confirmation and minimum length locally, registers
    /// with the provider, then creates the profile row. A profile-row
    /// failure is logged but does not fail the sign-up; the profile is
    /// recreated wholesale on the first save anyway.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for failed local checks and `AuthError` when
    /// the provider rejects the registration.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
        full_name: &str,
    ) -> Result<Session> {
        if password != confirm_password {
            return Err(CampusfeedError::InvalidInput(
                "Passwords do not match".to_string(),
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(CampusfeedError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let session = self.provider.sign_up(email, password, full_name).await?;
        info!(user_id = %session.user.id, "account created");

        let profile = serde_json::json!({
            "id": session.user.id,
            "full_name": full_name,
        });
        if let Err(e) = self.store.insert("profiles", profile).await {
            warn!("profile row creation failed: {}", e);
        }

        Ok(session)
    }

    /// Sign in with email and password
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.provider.sign_in(email, password).await?;
        info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    /// End the current session
    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await
    }

    /// The currently authenticated principal, if any
    pub async fn current_user(&self) -> Result<Option<Identity>> {
        self.provider.current_user().await
    }
}
