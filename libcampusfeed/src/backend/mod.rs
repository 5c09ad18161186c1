//! Backend collaborator contracts
//!
//! The client delegates all persistence, authentication, and object storage
//! to an external backend service. This module defines one trait per
//! collaborator so every component upstream of the wire is testable against
//! the in-memory mock.
//!
//! Records travel as `serde_json::Value`; typed components deserialize at
//! their own boundary. Mutations that must be restricted to the calling
//! user's own rows take an [`OwnerPredicate`], so ownership scoping happens
//! at the store rather than in display logic.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{Identity, Session};

pub mod mock;
pub mod rest;

/// Ownership predicate for scoped mutations
///
/// `column` names the owner column on the target table (`user_id` for
/// posts), `id` is the calling user's id. A mutation carrying this predicate
/// affects only rows where `column == id`.
#[derive(Debug, Clone, Copy)]
pub struct OwnerPredicate<'a> {
    pub column: &'a str,
    pub id: &'a str,
}

impl<'a> OwnerPredicate<'a> {
    pub fn new(column: &'a str, id: &'a str) -> Self {
        Self { column, id }
    }
}

/// Sort order for `select_all`
#[derive(Debug, Clone, Copy)]
pub struct Order<'a> {
    pub column: &'a str,
    pub descending: bool,
}

impl<'a> Order<'a> {
    /// Newest-first ordering on a timestamp column
    pub fn newest_first(column: &'a str) -> Self {
        Self {
            column,
            descending: true,
        }
    }
}

/// Authentication provider contract
///
/// Owns session lifecycle, credential validation, and email verification.
/// The client performs its own cheap checks (password confirmation, minimum
/// length) before calling any of these.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new account
    ///
    /// The returned session may lack an access token when the provider
    /// requires email verification before first sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the provider rejects the registration.
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session>;

    /// Sign in with email and password
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for bad credentials and
    /// `AuthError::EmailNotVerified` when the account exists but has not
    /// confirmed its email address.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// End the current session
    async fn sign_out(&self) -> Result<()>;

    /// The currently authenticated principal, if any
    async fn current_user(&self) -> Result<Option<Identity>>;
}

/// Relational data store contract
///
/// Owns persistence, query filtering, ordering, and row-level authorization.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Insert a record, returning the stored row (with server-assigned
    /// id and timestamp populated)
    async fn insert(&self, table: &str, record: Value) -> Result<Value>;

    /// Update the fields present in `fields` on the row matching `id`,
    /// scoped by the ownership predicate; omitted fields are left unchanged
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if no row matched the id and predicate.
    async fn update(
        &self,
        table: &str,
        id: &str,
        owner: OwnerPredicate<'_>,
        fields: Value,
    ) -> Result<Value>;

    /// Insert-or-replace a whole record keyed by its `id` field
    async fn upsert(&self, table: &str, record: Value) -> Result<Value>;

    /// Delete the row matching `id`, scoped by the ownership predicate
    ///
    /// A predicate that matches nothing deletes nothing and is not an error.
    async fn delete(&self, table: &str, id: &str, owner: OwnerPredicate<'_>) -> Result<()>;

    /// Fetch every row of a table in the given order, optionally with an
    /// embedded join (e.g. `profiles(full_name,nickname)`)
    async fn select_all(
        &self,
        table: &str,
        order: Order<'_>,
        join: Option<&str>,
    ) -> Result<Vec<Value>>;

    /// Fetch a single row by id
    ///
    /// # Errors
    ///
    /// Returns `DbError::NotFound` if no row has that id.
    async fn select_one(&self, table: &str, id: &str) -> Result<Value>;
}

/// Object store contract
///
/// Owns binary storage and public URL issuance. Size, type, and quota
/// limits are the store's concern; the client only checks that a path is
/// collision-resistant.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store one binary object at `path`
    ///
    /// # Errors
    ///
    /// Returns `UploadError` if the store rejects the write.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;

    /// Public URL for an object path; pure string construction, no network
    fn public_url(&self, path: &str) -> String;
}
